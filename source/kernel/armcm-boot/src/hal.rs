// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Hardware abstraction seams for the reset sequence.
//!
//! Each trait maps onto one register group touched during boot. The boot
//! stages are generic over them so the exact order of register writes can be
//! observed on the host.

use crate::regs::{Bdcr, Icsr, MemMode, SysTickCtrl};

/// Processor core state: interrupt masks, barriers, halting.
pub trait Cpu {
    /// Sets PRIMASK (`cpsid i`).
    fn disable_irq(&self);
    /// Clears PRIMASK (`cpsie i`).
    fn enable_irq(&self);
    /// Sets FAULTMASK (`cpsid f`) where the core implements it.
    fn disable_fault_irq(&self);
    /// Clears FAULTMASK (`cpsie f`) where the core implements it.
    fn enable_fault_irq(&self);
    /// Data synchronization barrier.
    fn dsb(&self);
    /// Instruction synchronization barrier.
    fn isb(&self);
    /// Orders memory accesses at the compiler level only.
    fn compiler_barrier(&self);
    /// Parks the core forever.
    fn halt(&self) -> !;
}

/// NVIC enable, pending and priority state for user interrupts.
pub trait InterruptController {
    /// Number of 32-line groups (ICER/ICPR words).
    fn line_groups(&self) -> usize;
    /// Clears every enable bit in `group`.
    fn disable_group(&self, group: usize);
    /// Clears every pending bit in `group`.
    fn unpend_group(&self, group: usize);
    /// Number of priority register slots.
    fn priority_slots(&self) -> usize;
    /// Writes 0 to priority slot `slot`.
    fn clear_priority(&self, slot: usize);
}

/// System control block.
pub trait SystemControl {
    fn write_icsr(&self, value: Icsr);
    /// Number of system handler priority slots.
    fn system_priority_slots(&self) -> usize;
    /// Writes 0 to system handler priority slot `slot`.
    fn clear_system_priority(&self, slot: usize);
}

/// SysTick control register.
pub trait SysTickTimer {
    fn control(&self) -> SysTickCtrl;
    fn set_control(&self, value: SysTickCtrl);
}

/// Vendor peripherals a resident bootloader may leave configured.
pub trait BootloaderHandoff {
    fn watchdog_key(&self) -> u32;
    fn write_watchdog_key(&self, key: u32);
    fn backup_domain(&self) -> Bdcr;
    fn set_backup_domain(&self, value: Bdcr);
    fn memory_mode(&self) -> MemMode;
    fn set_memory_mode(&self, value: MemMode);
}

/// Everything stage two needs.
pub trait Machine: Cpu + InterruptController + SystemControl + SysTickTimer {}

impl<T: Cpu + InterruptController + SystemControl + SysTickTimer> Machine for T {}
