// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Recording register model shared by the host boot tests
//! OWNERS: @kernel-boot-team
//!
//! `Board` implements every HAL trait, keeps the NVIC/SCB state the reset
//! path is expected to scrub and logs each register access as an [`Event`].
//! `halt` panics with "halted" so fail-stop paths are observable.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use armcm_boot::hal::{BootloaderHandoff, Cpu, InterruptController, SysTickTimer, SystemControl};
use armcm_boot::regs::{Bdcr, Icsr, MemMode, SysTickCtrl};
use armcm_boot::CoreRevision;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    DisableIrq,
    EnableIrq,
    DisableFaultIrq,
    EnableFaultIrq,
    Dsb,
    Isb,
    CompilerBarrier,
    Icer(usize),
    Icpr(usize),
    Ipr(usize),
    IcsrWrite(Icsr),
    Shpr(usize),
    SysTick(SysTickCtrl),
    WatchdogKey(u32),
    BdcrWrite(Bdcr),
    MemModeWrite(MemMode),
}

pub struct Board {
    pub events: RefCell<Vec<Event>>,
    pub enabled: RefCell<Vec<u32>>,
    pub pending: RefCell<Vec<u32>>,
    pub priority: RefCell<Vec<u32>>,
    pub system_priority: RefCell<Vec<u32>>,
    pub pendsv: Cell<bool>,
    pub pendst: Cell<bool>,
    pub systick: Cell<SysTickCtrl>,
    pub watchdog_key: Cell<u32>,
    pub bdcr: Cell<Bdcr>,
    pub mem_mode: Cell<MemMode>,
}

impl Board {
    /// Board left in the state a bootloader or previous image might leave:
    /// every line enabled and pending, non-zero priorities, SysTick running.
    pub fn dirty(groups: usize, priorities: usize, system_priorities: usize) -> Self {
        Self {
            events: RefCell::new(Vec::new()),
            enabled: RefCell::new(vec![u32::MAX; groups]),
            pending: RefCell::new(vec![0x8000_0001; groups]),
            priority: RefCell::new(vec![0xC0; priorities]),
            system_priority: RefCell::new(vec![0x40; system_priorities]),
            pendsv: Cell::new(true),
            pendst: Cell::new(true),
            systick: Cell::new(SysTickCtrl::all()),
            watchdog_key: Cell::new(0),
            bdcr: Cell::new(Bdcr::from_bits_retain(0x0000_8101)),
            mem_mode: Cell::new(MemMode::empty()),
        }
    }

    /// Dirty board sized like `core`.
    pub fn for_core(core: CoreRevision) -> Self {
        Self::dirty(core.nvic_groups(), core.user_priorities().slots, core.system_priorities().slots)
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn position(&self, event: Event) -> Option<usize> {
        self.events.borrow().iter().position(|e| *e == event)
    }

    /// Word fetched from vector slot `slot` through the alias at address 0.
    pub fn fetch_vector(&self, slot: usize, flash: &[usize], sram: &[usize]) -> usize {
        if self.mem_mode.get().contains(MemMode::SRAM) {
            sram[slot]
        } else {
            flash[slot]
        }
    }

    pub fn controller_is_clean(&self) -> bool {
        self.enabled.borrow().iter().all(|w| *w == 0)
            && self.pending.borrow().iter().all(|w| *w == 0)
            && self.priority.borrow().iter().all(|p| *p == 0)
            && self.system_priority.borrow().iter().all(|p| *p == 0)
            && !self.pendsv.get()
            && !self.pendst.get()
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

impl Cpu for Board {
    fn disable_irq(&self) {
        self.record(Event::DisableIrq);
    }

    fn enable_irq(&self) {
        self.record(Event::EnableIrq);
    }

    fn disable_fault_irq(&self) {
        self.record(Event::DisableFaultIrq);
    }

    fn enable_fault_irq(&self) {
        self.record(Event::EnableFaultIrq);
    }

    fn dsb(&self) {
        self.record(Event::Dsb);
    }

    fn isb(&self) {
        self.record(Event::Isb);
    }

    fn compiler_barrier(&self) {
        self.record(Event::CompilerBarrier);
    }

    fn halt(&self) -> ! {
        panic!("halted");
    }
}

impl InterruptController for Board {
    fn line_groups(&self) -> usize {
        self.enabled.borrow().len()
    }

    fn disable_group(&self, group: usize) {
        self.enabled.borrow_mut()[group] = 0;
        self.record(Event::Icer(group));
    }

    fn unpend_group(&self, group: usize) {
        self.pending.borrow_mut()[group] = 0;
        self.record(Event::Icpr(group));
    }

    fn priority_slots(&self) -> usize {
        self.priority.borrow().len()
    }

    fn clear_priority(&self, slot: usize) {
        self.priority.borrow_mut()[slot] = 0;
        self.record(Event::Ipr(slot));
    }
}

impl SystemControl for Board {
    fn write_icsr(&self, value: Icsr) {
        if value.contains(Icsr::PENDSVCLR) {
            self.pendsv.set(false);
        }
        if value.contains(Icsr::PENDSTCLR) {
            self.pendst.set(false);
        }
        self.record(Event::IcsrWrite(value));
    }

    fn system_priority_slots(&self) -> usize {
        self.system_priority.borrow().len()
    }

    fn clear_system_priority(&self, slot: usize) {
        self.system_priority.borrow_mut()[slot] = 0;
        self.record(Event::Shpr(slot));
    }
}

impl SysTickTimer for Board {
    fn control(&self) -> SysTickCtrl {
        self.systick.get()
    }

    fn set_control(&self, value: SysTickCtrl) {
        self.systick.set(value);
        self.record(Event::SysTick(value));
    }
}

impl BootloaderHandoff for Board {
    fn watchdog_key(&self) -> u32 {
        self.watchdog_key.get()
    }

    fn write_watchdog_key(&self, key: u32) {
        self.record(Event::WatchdogKey(key));
    }

    fn backup_domain(&self) -> Bdcr {
        self.bdcr.get()
    }

    fn set_backup_domain(&self, value: Bdcr) {
        // While BDRST is asserted the rest of the backup domain reads as reset.
        let stored = if value.contains(Bdcr::BDRST) { Bdcr::BDRST } else { value };
        self.bdcr.set(stored);
        self.record(Event::BdcrWrite(value));
    }

    fn memory_mode(&self) -> MemMode {
        self.mem_mode.get()
    }

    fn set_memory_mode(&self, value: MemMode) {
        self.mem_mode.set(value);
        self.record(Event::MemModeWrite(value));
    }
}
