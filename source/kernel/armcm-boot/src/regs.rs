// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Memory-mapped registers touched by the reset path
//! OWNERS: @kernel-arch-team
//! PUBLIC API: CORTEX_M, CortexM, SysTickCtrl, Icsr, Bdcr, MemMode, register addresses
//! DEPENDS_ON: profile::CoreRevision, arch::cortexm
//! INVARIANTS: CORTEX_M is const-initialised (usable before .data/.bss exist); host builds never touch MMIO
//!
//! Core peripheral addresses are fixed by the ARMv6-M/v7-M/v8-M
//! architecture. The bootloader hand-off peripherals (IWDG, RCC, SYSCFG)
//! follow the STM32F0 memory map.

use bitflags::bitflags;

use crate::arch::cortexm;
use crate::hal::{BootloaderHandoff, Cpu, InterruptController, SysTickTimer, SystemControl};
use crate::profile::{CoreRevision, PriorityBank, RegWidth};

pub const SYST_CSR: usize = 0xE000_E010;
pub const NVIC_ICER: usize = 0xE000_E180;
pub const NVIC_ICPR: usize = 0xE000_E280;
pub const SCB_ICSR: usize = 0xE000_ED04;

pub const IWDG_KR: usize = 0x4000_3000;
/// Key written to IWDG_KR to reload the down-counter.
pub const IWDG_RELOAD_KEY: u32 = 0xAAAA;
pub const RCC_BDCR: usize = 0x4002_1020;
pub const SYSCFG_CFGR1: usize = 0x4001_0000;

bitflags! {
    /// SysTick control and status register (SYST_CSR).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SysTickCtrl: u32 {
        const ENABLE = 1 << 0;
        const TICKINT = 1 << 1;
        const CLKSOURCE = 1 << 2;
        const COUNTFLAG = 1 << 16;
    }
}

bitflags! {
    /// Interrupt control and state register (ICSR), write side.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Icsr: u32 {
        const PENDSTCLR = 1 << 25;
        const PENDSTSET = 1 << 26;
        const PENDSVCLR = 1 << 27;
        const PENDSVSET = 1 << 28;
        const NMIPENDSET = 1 << 31;
    }
}

bitflags! {
    /// RCC backup domain control register (RCC_BDCR).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Bdcr: u32 {
        const LSEON = 1 << 0;
        const LSERDY = 1 << 1;
        const LSEBYP = 1 << 2;
        const RTCSEL = 0b11 << 8;
        const RTCEN = 1 << 15;
        const BDRST = 1 << 16;

        const _ = !0;
    }
}

bitflags! {
    /// SYSCFG_CFGR1 memory mapping selection.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MemMode: u32 {
        const MEM_MODE_0 = 1 << 0;
        const MEM_MODE_1 = 1 << 1;
        /// Embedded SRAM aliased at 0x0000_0000.
        const SRAM = Self::MEM_MODE_0.bits() | Self::MEM_MODE_1.bits();

        const _ = !0;
    }
}

mod mmio {
    #[inline(always)]
    pub unsafe fn write32(addr: usize, value: u32) {
        #[cfg(all(target_arch = "arm", target_os = "none"))]
        unsafe {
            core::ptr::write_volatile(addr as *mut u32, value);
        }
        #[cfg(not(all(target_arch = "arm", target_os = "none")))]
        let _ = (addr, value);
    }

    #[inline(always)]
    pub unsafe fn read32(addr: usize) -> u32 {
        #[cfg(all(target_arch = "arm", target_os = "none"))]
        unsafe {
            core::ptr::read_volatile(addr as *const u32)
        }
        #[cfg(not(all(target_arch = "arm", target_os = "none")))]
        {
            let _ = addr;
            0
        }
    }

    #[inline(always)]
    pub unsafe fn write8(addr: usize, value: u8) {
        #[cfg(all(target_arch = "arm", target_os = "none"))]
        unsafe {
            core::ptr::write_volatile(addr as *mut u8, value);
        }
        #[cfg(not(all(target_arch = "arm", target_os = "none")))]
        let _ = (addr, value);
    }
}

impl PriorityBank {
    /// Writes 0 to `slot` using the bank's access width.
    ///
    /// # Safety
    ///
    /// `slot` must be below `self.slots` and the bank must describe real
    /// registers of the running core.
    #[inline(always)]
    pub unsafe fn clear(&self, slot: usize) {
        let addr = self.slot_addr(slot);
        unsafe {
            match self.width {
                RegWidth::Byte => mmio::write8(addr, 0),
                RegWidth::Word => mmio::write32(addr, 0),
            }
        }
    }
}

/// Handle over the core peripherals of the running Cortex-M.
pub struct CortexM {
    core: CoreRevision,
}

/// Process-wide register handle; lives in flash so it is valid at reset.
pub static CORTEX_M: CortexM = CortexM::new(CoreRevision::current());

impl CortexM {
    pub const fn new(core: CoreRevision) -> Self {
        Self { core }
    }

    pub const fn core(&self) -> CoreRevision {
        self.core
    }
}

impl Cpu for CortexM {
    #[inline(always)]
    fn disable_irq(&self) {
        cortexm::disable_irq();
    }

    #[inline(always)]
    fn enable_irq(&self) {
        cortexm::enable_irq();
    }

    #[inline(always)]
    fn disable_fault_irq(&self) {
        if self.core.has_fault_mask() {
            cortexm::disable_fault_irq();
        }
    }

    #[inline(always)]
    fn enable_fault_irq(&self) {
        if self.core.has_fault_mask() {
            cortexm::enable_fault_irq();
        }
    }

    #[inline(always)]
    fn dsb(&self) {
        cortexm::dsb();
    }

    #[inline(always)]
    fn isb(&self) {
        cortexm::isb();
    }

    #[inline(always)]
    fn compiler_barrier(&self) {
        cortexm::compiler_barrier();
    }

    #[inline(always)]
    fn halt(&self) -> ! {
        cortexm::halt()
    }
}

impl InterruptController for CortexM {
    #[inline(always)]
    fn line_groups(&self) -> usize {
        self.core.nvic_groups()
    }

    #[inline(always)]
    fn disable_group(&self, group: usize) {
        // SAFETY: ICER is write-one-to-clear; group < line_groups().
        unsafe { mmio::write32(NVIC_ICER + group * 4, u32::MAX) }
    }

    #[inline(always)]
    fn unpend_group(&self, group: usize) {
        // SAFETY: ICPR is write-one-to-clear; group < line_groups().
        unsafe { mmio::write32(NVIC_ICPR + group * 4, u32::MAX) }
    }

    #[inline(always)]
    fn priority_slots(&self) -> usize {
        self.core.user_priorities().slots
    }

    #[inline(always)]
    fn clear_priority(&self, slot: usize) {
        // SAFETY: the bank geometry matches the core selected at build time.
        unsafe { self.core.user_priorities().clear(slot) }
    }
}

impl SystemControl for CortexM {
    #[inline(always)]
    fn write_icsr(&self, value: Icsr) {
        // SAFETY: ICSR set/clear bits are write-only strobes.
        unsafe { mmio::write32(SCB_ICSR, value.bits()) }
    }

    #[inline(always)]
    fn system_priority_slots(&self) -> usize {
        self.core.system_priorities().slots
    }

    #[inline(always)]
    fn clear_system_priority(&self, slot: usize) {
        // SAFETY: the bank geometry matches the core selected at build time.
        unsafe { self.core.system_priorities().clear(slot) }
    }
}

impl SysTickTimer for CortexM {
    #[inline(always)]
    fn control(&self) -> SysTickCtrl {
        // SAFETY: SYST_CSR is always implemented on the supported cores.
        SysTickCtrl::from_bits_truncate(unsafe { mmio::read32(SYST_CSR) })
    }

    #[inline(always)]
    fn set_control(&self, value: SysTickCtrl) {
        // SAFETY: SYST_CSR only gates the SysTick counter and its interrupt.
        unsafe { mmio::write32(SYST_CSR, value.bits()) }
    }
}

impl BootloaderHandoff for CortexM {
    #[inline(always)]
    fn watchdog_key(&self) -> u32 {
        // SAFETY: IWDG_KR reads have no side effect.
        unsafe { mmio::read32(IWDG_KR) }
    }

    #[inline(always)]
    fn write_watchdog_key(&self, key: u32) {
        // SAFETY: KR accepts only the documented keys; the reload key restarts the counter.
        unsafe { mmio::write32(IWDG_KR, key) }
    }

    #[inline(always)]
    fn backup_domain(&self) -> Bdcr {
        // SAFETY: RCC_BDCR reads have no side effect.
        Bdcr::from_bits_retain(unsafe { mmio::read32(RCC_BDCR) })
    }

    #[inline(always)]
    fn set_backup_domain(&self, value: Bdcr) {
        // SAFETY: only called from stage one, before anything depends on LSE/RTC state.
        unsafe { mmio::write32(RCC_BDCR, value.bits()) }
    }

    #[inline(always)]
    fn memory_mode(&self) -> MemMode {
        // SAFETY: SYSCFG_CFGR1 reads have no side effect.
        MemMode::from_bits_retain(unsafe { mmio::read32(SYSCFG_CFGR1) })
    }

    #[inline(always)]
    fn set_memory_mode(&self, value: MemMode) {
        // SAFETY: the remap only changes what address 0 aliases; the SRAM copy is in place first.
        unsafe { mmio::write32(SYSCFG_CFGR1, value.bits()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_handle_reflects_build_profile() {
        assert_eq!(CORTEX_M.core(), CoreRevision::current());
        assert_eq!(CORTEX_M.line_groups(), CoreRevision::current().nvic_groups());
    }

    #[test]
    fn pending_clear_strobes_are_distinct_bits() {
        let strobe = Icsr::PENDSVCLR | Icsr::PENDSTCLR;
        assert_eq!(strobe.bits(), 0x0A00_0000);
        assert!(!strobe.intersects(Icsr::PENDSVSET | Icsr::PENDSTSET));
    }

    #[test]
    fn sram_mode_sets_both_mem_mode_bits() {
        assert_eq!(MemMode::SRAM.bits(), 0b11);
        let cfgr1 = MemMode::from_bits_retain(0x0000_0100);
        assert_eq!((cfgr1 | MemMode::SRAM).bits(), 0x0000_0103);
    }

    #[test]
    fn backup_domain_reset_is_bit_16() {
        assert_eq!(Bdcr::BDRST.bits(), 0x0001_0000);
        let bdcr = Bdcr::from_bits_retain(0x0000_8101);
        assert_eq!((bdcr | Bdcr::BDRST).bits(), 0x0001_8101);
    }
}
