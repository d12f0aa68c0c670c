// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Exception vector table builder and the default handler
//! OWNERS: @kernel-boot-team
//! STATUS: Functional
//! API_STABILITY: Unstable
//! PUBLIC API: VectorTable, Vector, Handler, ResetVector, exception_slot(), DefaultHandler, HALT_OPCODE
//! DEPENDS_ON: static_assertions
//! INVARIANTS: Slot 0 = initial SP; slot 1 = reset; reserved slots hold 0; unbound slots hold the default handler
//!
//! Exceptions are addressed by their CMSIS number: NMI = -14 up to
//! SysTick = -1, external interrupt `n` = `n`. The table slot is the number
//! plus 16.

use static_assertions::assert_eq_size;

/// Interrupt or exception handler.
pub type Handler = unsafe extern "C" fn();

/// Reset entry; never returns.
pub type ResetVector = unsafe extern "C" fn() -> !;

/// One word of the vector table.
#[repr(C)]
#[derive(Clone, Copy)]
pub union Vector {
    handler: Handler,
    reset: ResetVector,
    stack: *const u32,
    bits: usize,
}

assert_eq_size!(Vector, usize);

// SAFETY: vector words are immutable once the table is built.
unsafe impl Sync for Vector {}

/// Number of core exception slots preceding external interrupt 0.
pub const CORE_SLOTS: usize = 16;

const RESET: i16 = -15;

/// Table slot of exception `number`.
pub const fn exception_slot(number: i16) -> usize {
    (number as isize + CORE_SLOTS as isize) as usize
}

const fn is_reserved(slot: usize) -> bool {
    matches!(slot, 7..=10 | 13)
}

/// Vector table with `N` words, `N - 16` of them external interrupts.
#[repr(C, align(512))]
pub struct VectorTable<const N: usize> {
    entries: [Vector; N],
}

impl<const N: usize> VectorTable<N> {
    /// Table with every handler slot bound to `default`.
    pub const fn new(stack_top: *const u32, reset: ResetVector, default: Handler) -> Self {
        assert!(N >= CORE_SLOTS, "vector table shorter than the core exceptions");
        let mut entries = [Vector { handler: default }; N];
        entries[0] = Vector { stack: stack_top };
        entries[1] = Vector { reset };
        let mut slot = 2;
        while slot < CORE_SLOTS {
            if is_reserved(slot) {
                entries[slot] = Vector { bits: 0 };
            }
            slot += 1;
        }
        Self { entries }
    }

    /// Binds `handler` to exception `number`.
    ///
    /// Panics (at compile time in a `static` initialiser) when the number is
    /// the reset vector, a reserved slot or past the end of the table.
    pub const fn bind(mut self, number: i16, handler: Handler) -> Self {
        if number <= RESET {
            panic!("exception number is not bindable");
        }
        let slot = exception_slot(number);
        if slot >= N {
            panic!("interrupt number past the end of the vector table");
        }
        if is_reserved(slot) {
            panic!("exception slot is reserved");
        }
        self.entries[slot] = Vector { handler };
        self
    }

    /// Raw word stored at `slot`.
    pub fn entry(&self, slot: usize) -> usize {
        // SAFETY: every variant is one pointer-sized word.
        unsafe { self.entries[slot].bits }
    }

    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Address of the first word.
    pub fn as_ptr(&self) -> *const u32 {
        self.entries.as_ptr().cast()
    }
}

/// Thumb encoding of `b .` (branch to self); the whole body of `DefaultHandler`.
pub const HALT_OPCODE: u16 = 0xE7FE;

#[cfg(all(target_arch = "arm", target_os = "none"))]
core::arch::global_asm!(
    ".pushsection .text.armcm_boot.default_handler,\"ax\",%progbits",
    ".global DefaultHandler",
    ".type DefaultHandler,%function",
    ".thumb_func",
    "DefaultHandler:",
    ".inst.n {op}",
    ".size DefaultHandler, . - DefaultHandler",
    ".popsection",
    op = const HALT_OPCODE,
);

#[cfg(all(target_arch = "arm", target_os = "none"))]
extern "C" {
    /// Parks the core on a single `b .` so a debugger finds the PC at a fixed address.
    pub fn DefaultHandler();
}
