// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Stage two of the reset path: controller scrub, memory image, hand-off
//! OWNERS: @kernel-boot-team
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: tests/boot_sequence.rs, tests/memory_image.rs
//! PUBLIC API: reset_interrupt_controller(), reset_system_exceptions(), build_image(), initialize(), enter()
//! DEPENDS_ON: hal::Machine, layout::MemoryLayout, mem
//! INVARIANTS: Runs on the definitive stack; never returns; nothing reads .data/.bss before build_image
//!
//! Nothing here logs: the log sink itself lives in `.bss`.

use crate::hal::{Cpu, InterruptController, Machine, SysTickTimer, SystemControl};
use crate::layout::MemoryLayout;
use crate::mem;
use crate::regs::{Icsr, SysTickCtrl};

/// Disables and unpends every external interrupt line, then zeroes their priorities.
#[inline(always)]
pub fn reset_interrupt_controller<M: Cpu + InterruptController>(machine: &M) {
    for group in 0..machine.line_groups() {
        machine.disable_group(group);
        // A line still latched from before the disable must be cleared too.
        machine.dsb();
        machine.unpend_group(group);
    }
    for slot in 0..machine.priority_slots() {
        machine.clear_priority(slot);
    }
}

/// Stops the SysTick interrupt, unpends PendSV/SysTick and zeroes system handler priorities.
#[inline(always)]
pub fn reset_system_exceptions<M: Cpu + SysTickTimer + SystemControl>(machine: &M) {
    let ctrl = machine.control();
    machine.set_control(ctrl & SysTickCtrl::CLKSOURCE);
    machine.dsb();
    machine.write_icsr(Icsr::PENDSVCLR | Icsr::PENDSTCLR);
    for slot in 0..machine.system_priority_slots() {
        machine.clear_system_priority(slot);
    }
}

/// Copies `.data` from its load image and zeroes `.bss`.
///
/// # Safety
///
/// `layout` must describe writable RAM that nothing else references, and a
/// readable `.data` load image. Both lengths must be word multiples.
#[inline(always)]
pub unsafe fn build_image<M: Cpu>(machine: &M, layout: &MemoryLayout) {
    unsafe {
        mem::copy_words(layout.data.as_mut_ptr(), layout.data_image().as_ptr(), layout.data_len());
        mem::zero_words(layout.bss.as_mut_ptr(), layout.bss_len());
    }
    machine.compiler_barrier();
}

/// Brings the controller and exception state to reset defaults, unmasks
/// interrupts and builds the memory image.
///
/// # Safety
///
/// Same contract as [`build_image`].
#[inline(always)]
pub unsafe fn initialize<M: Machine>(machine: &M, layout: &MemoryLayout) {
    reset_interrupt_controller(machine);
    reset_system_exceptions(machine);
    machine.dsb();
    machine.isb();
    machine.enable_irq();
    unsafe { build_image(machine, layout) };
}

/// Runs [`initialize`], calls `main` and halts if it ever comes back.
///
/// # Safety
///
/// Same contract as [`build_image`].
#[inline(always)]
pub unsafe fn enter<M: Machine, F: FnOnce()>(machine: &M, layout: &MemoryLayout, main: F) -> ! {
    unsafe { initialize(machine, layout) };
    main();
    machine.halt()
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
extern "Rust" {
    fn armcm_main();
}

/// Stage two entry, reached from stage one with the stack pointer at `_stack_end`.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[link_section = ".text.armcm_boot.stage_two"]
pub(crate) unsafe extern "C" fn reset_handler_stage_two() -> ! {
    use crate::regs::CORTEX_M;

    // SAFETY: the link script places .data/.bss in RAM owned by this image.
    unsafe { enter(&CORTEX_M, &MemoryLayout::linked(), || armcm_main()) }
}
