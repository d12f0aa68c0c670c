// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Stage one of the reset path, entered straight from the reset vector
//! OWNERS: @kernel-boot-team
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: tests/boot_sequence.rs, tests/relocation.rs
//! PUBLIC API: ResetHandler, take_over_from_bootloader(), relocate_vector_table()
//! DEPENDS_ON: hal traits, layout (symbol addresses only), arch::cortexm::jump_with_stack
//! INVARIANTS: Touches no .data/.bss; every transfer onward reloads SP and never returns
//!
//! Without `ram-vectortable` stage one only masks interrupts and moves onto
//! the definitive stack. With it, the state a resident bootloader may have
//! left behind is torn down and the vector table is served from SRAM.
//!
//! The order of the core mask re-disable and the backup domain reset is kept
//! exactly as documented for the STM32F0 bootloader hand-off.

use crate::hal::{BootloaderHandoff, Cpu, SysTickTimer};
use crate::layout::VectorRelocation;
use crate::mem;
use crate::regs::{Bdcr, MemMode, SysTickCtrl, IWDG_RELOAD_KEY};

/// Silences SysTick and the watchdog and resets the backup domain.
#[inline(always)]
pub fn take_over_from_bootloader<M: Cpu + SysTickTimer + BootloaderHandoff>(machine: &M) {
    let ctrl = machine.control();
    machine.set_control(ctrl - (SysTickCtrl::TICKINT | SysTickCtrl::ENABLE));

    // KR reads back zero unless the bootloader started the watchdog.
    if machine.watchdog_key() != 0 {
        machine.write_watchdog_key(IWDG_RELOAD_KEY);
    }

    machine.disable_irq();
    machine.disable_fault_irq();

    // Asserting BDRST wipes LSE/RTC state, so the release must re-read BDCR.
    machine.set_backup_domain(machine.backup_domain() | Bdcr::BDRST);
    machine.set_backup_domain(machine.backup_domain() - Bdcr::BDRST);
}

/// Copies the compiled vector table to SRAM, maps SRAM at address 0 and
/// unmasks interrupts.
///
/// # Safety
///
/// `relocation` must describe the linked flash table and a free, word
/// aligned SRAM slot of the same size at the start of SRAM.
#[inline(always)]
pub unsafe fn relocate_vector_table<M: Cpu + BootloaderHandoff>(
    machine: &M,
    relocation: &VectorRelocation,
) {
    let flash = relocation.flash;
    unsafe {
        mem::copy_words(relocation.ram().as_mut_ptr(), flash.as_ptr(), flash.len());
    }
    machine.dsb();

    let mode = machine.memory_mode();
    machine.set_memory_mode(mode - MemMode::SRAM);
    machine.set_memory_mode((mode - MemMode::SRAM) | MemMode::SRAM);
    machine.isb();

    machine.enable_irq();
    machine.enable_fault_irq();
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod entry {
    use crate::arch::cortexm::jump_with_stack;
    use crate::hal::Cpu;
    use crate::layout::stack_end;
    use crate::regs::CORTEX_M;
    use crate::stage_two::reset_handler_stage_two;

    /// Reset vector target.
    #[no_mangle]
    #[link_section = ".text.armcm_boot.stage_one"]
    pub unsafe extern "C" fn ResetHandler() -> ! {
        CORTEX_M.disable_irq();

        #[cfg(feature = "ram-vectortable")]
        let next: unsafe extern "C" fn() -> ! = {
            super::take_over_from_bootloader(&CORTEX_M);
            relocate_stage
        };
        #[cfg(not(feature = "ram-vectortable"))]
        let next: unsafe extern "C" fn() -> ! = reset_handler_stage_two;

        // SAFETY: _stack_end is the top of the reserved stack region.
        unsafe { jump_with_stack(stack_end(), next) }
    }

    /// Second half of stage one, running on a freshly loaded stack.
    #[cfg(feature = "ram-vectortable")]
    #[link_section = ".text.armcm_boot.stage_one"]
    unsafe extern "C" fn relocate_stage() -> ! {
        let layout = crate::layout::MemoryLayout::linked();
        if let Some(relocation) = layout.vectors {
            // SAFETY: the link script reserves the SRAM slot for the table copy.
            unsafe { super::relocate_vector_table(&CORTEX_M, &relocation) };
        }
        // SAFETY: as above; the stack is reloaded so stage two starts clean.
        unsafe { jump_with_stack(stack_end(), reset_handler_stage_two) }
    }
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use entry::ResetHandler;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Region;
    use core::cell::{Cell, RefCell};
    use std::vec::Vec;

    #[derive(Default)]
    struct Board {
        ops: RefCell<Vec<std::string::String>>,
        ctrl: Cell<u32>,
        kr: Cell<u32>,
        bdcr: Cell<u32>,
        cfgr1: Cell<u32>,
    }

    impl Board {
        fn push(&self, op: std::string::String) {
            self.ops.borrow_mut().push(op);
        }
    }

    impl Cpu for Board {
        fn disable_irq(&self) {
            self.push("cpsid i".into());
        }
        fn enable_irq(&self) {
            self.push("cpsie i".into());
        }
        fn disable_fault_irq(&self) {
            self.push("cpsid f".into());
        }
        fn enable_fault_irq(&self) {
            self.push("cpsie f".into());
        }
        fn dsb(&self) {
            self.push("dsb".into());
        }
        fn isb(&self) {
            self.push("isb".into());
        }
        fn compiler_barrier(&self) {}
        fn halt(&self) -> ! {
            panic!("halted");
        }
    }

    impl SysTickTimer for Board {
        fn control(&self) -> SysTickCtrl {
            SysTickCtrl::from_bits_retain(self.ctrl.get())
        }
        fn set_control(&self, value: SysTickCtrl) {
            self.ctrl.set(value.bits());
            self.push(std::format!("syst {:#x}", value.bits()));
        }
    }

    impl BootloaderHandoff for Board {
        fn watchdog_key(&self) -> u32 {
            self.kr.get()
        }
        fn write_watchdog_key(&self, key: u32) {
            self.push(std::format!("kr {key:#x}"));
        }
        fn backup_domain(&self) -> Bdcr {
            Bdcr::from_bits_retain(self.bdcr.get())
        }
        fn set_backup_domain(&self, value: Bdcr) {
            // BDRST holds every other backup domain bit at its reset value.
            let stored = if value.contains(Bdcr::BDRST) { Bdcr::BDRST } else { value };
            self.bdcr.set(stored.bits());
            self.push(std::format!("bdcr {:#x}", value.bits()));
        }
        fn memory_mode(&self) -> MemMode {
            MemMode::from_bits_retain(self.cfgr1.get())
        }
        fn set_memory_mode(&self, value: MemMode) {
            self.cfgr1.set(value.bits());
            self.push(std::format!("cfgr1 {:#x}", value.bits()));
        }
    }

    #[test]
    fn bootloader_state_is_torn_down_in_order() {
        let board = Board::default();
        board.ctrl.set(0b111);
        board.kr.set(0xCCCC);
        board.bdcr.set(0x8101);

        take_over_from_bootloader(&board);

        assert_eq!(
            *board.ops.borrow(),
            ["syst 0x4", "kr 0xaaaa", "cpsid i", "cpsid f", "bdcr 0x18101", "bdcr 0x0"]
        );
    }

    #[test]
    fn backup_domain_release_does_not_restore_bootloader_bits() {
        let board = Board::default();
        board.bdcr.set((Bdcr::LSEON | Bdcr::RTCSEL | Bdcr::RTCEN).bits());

        take_over_from_bootloader(&board);

        assert_eq!(board.backup_domain(), Bdcr::empty());
    }

    #[test]
    fn idle_watchdog_is_left_alone() {
        let board = Board::default();
        take_over_from_bootloader(&board);
        assert!(!board.ops.borrow().iter().any(|op| op.starts_with("kr")));
    }

    #[test]
    fn relocation_remaps_sram_then_unmasks() {
        let compiled: Vec<u32> = (0..48).map(|i| 0x0800_0000 + i * 4 + 1).collect();
        let mut ram = std::vec![0u32; 48];
        let flash_start = compiled.as_ptr() as usize;
        let relocation = VectorRelocation {
            flash: Region::with_len(flash_start, compiled.len() * 4),
            ram_start: ram.as_mut_ptr() as usize,
        };
        let board = Board::default();
        board.cfgr1.set(0x0000_0101);

        unsafe { relocate_vector_table(&board, &relocation) };

        assert_eq!(ram, compiled);
        assert_eq!(
            *board.ops.borrow(),
            ["dsb", "cfgr1 0x100", "cfgr1 0x103", "isb", "cpsie i", "cpsie f"]
        );
    }
}
