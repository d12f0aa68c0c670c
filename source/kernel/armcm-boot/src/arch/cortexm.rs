// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Cortex-M specific helpers used across the boot path.
//!
//! Host builds compile the same entry points as stubs (barriers degrade to
//! compiler fences, mask changes are no-ops) so higher level sequencing can
//! be exercised without silicon.

use core::sync::atomic::{compiler_fence, Ordering};

/// Masks configurable interrupts (PRIMASK).
#[inline(always)]
pub fn disable_irq() {
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    cortex_m::interrupt::disable();
    #[cfg(not(all(target_arch = "arm", target_os = "none")))]
    compiler_fence(Ordering::SeqCst);
}

/// Unmasks configurable interrupts (PRIMASK).
#[inline(always)]
pub fn enable_irq() {
    // SAFETY: callers only unmask once the vector table and NVIC state are valid.
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    unsafe {
        cortex_m::interrupt::enable();
    }
    #[cfg(not(all(target_arch = "arm", target_os = "none")))]
    compiler_fence(Ordering::SeqCst);
}

/// Runs `f` with PRIMASK set, restoring the previous mask afterwards.
#[inline(always)]
pub fn interrupt_free<R>(f: impl FnOnce() -> R) -> R {
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    {
        cortex_m::interrupt::free(|_| f())
    }
    #[cfg(not(all(target_arch = "arm", target_os = "none")))]
    {
        f()
    }
}

/// Masks everything but NMI (FAULTMASK). No-op on cores without FAULTMASK.
#[inline(always)]
pub fn disable_fault_irq() {
    #[cfg(all(target_arch = "arm", target_os = "none", any(armv7m, armv8m_main)))]
    unsafe {
        core::arch::asm!("cpsid f", options(nostack, preserves_flags));
    }
    compiler_fence(Ordering::SeqCst);
}

/// Clears FAULTMASK. No-op on cores without FAULTMASK.
#[inline(always)]
pub fn enable_fault_irq() {
    compiler_fence(Ordering::SeqCst);
    #[cfg(all(target_arch = "arm", target_os = "none", any(armv7m, armv8m_main)))]
    unsafe {
        core::arch::asm!("cpsie f", options(nostack, preserves_flags));
    }
}

/// Data synchronization barrier.
#[inline(always)]
pub fn dsb() {
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    cortex_m::asm::dsb();
    #[cfg(not(all(target_arch = "arm", target_os = "none")))]
    compiler_fence(Ordering::SeqCst);
}

/// Instruction synchronization barrier.
#[inline(always)]
pub fn isb() {
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    cortex_m::asm::isb();
    #[cfg(not(all(target_arch = "arm", target_os = "none")))]
    compiler_fence(Ordering::SeqCst);
}

#[inline(always)]
pub fn compiler_barrier() {
    compiler_fence(Ordering::SeqCst);
}

/// Issues a WFI instruction or yields on the host.
#[inline]
pub fn wait_for_interrupt() {
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    cortex_m::asm::wfi();
    #[cfg(not(all(target_arch = "arm", target_os = "none")))]
    core::hint::spin_loop();
}

/// Spins forever with the program counter parked in this loop.
#[inline(always)]
pub fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

/// Loads `sp` into the stack pointer and branches to `entry` without
/// recording a return address.
///
/// # Safety
///
/// `sp` must be the top of a valid, word-aligned stack and `entry` must
/// never return. Nothing on the current stack survives the jump.
#[inline(always)]
pub unsafe fn jump_with_stack(sp: usize, entry: unsafe extern "C" fn() -> !) -> ! {
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    unsafe {
        core::arch::asm!(
            "mov sp, {sp}",
            "bx {entry}",
            sp = in(reg) sp,
            entry = in(reg) entry,
            options(noreturn)
        );
    }
    #[cfg(not(all(target_arch = "arm", target_os = "none")))]
    {
        let _ = sp;
        unsafe { entry() }
    }
}
