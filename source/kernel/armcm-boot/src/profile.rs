// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Per-architecture geometry of the NVIC and SCB priority registers
//! OWNERS: @kernel-arch-team
//! PUBLIC API: CoreRevision, PriorityBank, RegWidth
//! DEPENDS_ON: build.rs cfg (armv6m, armv7m, armv8m_base, armv8m_main)
//! INVARIANTS: Variant fixed at build time; every variant describes full register banks
//!
//! The CMSIS headers spell the priority registers differently per core
//! (`IP`/`IPR`, `SHP`/`SHPR`, byte or word arrays). All of them reduce to a
//! base address, a slot count and an access width.

/// Access width of one slot in a priority register bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegWidth {
    Byte,
    Word,
}

impl RegWidth {
    pub const fn bytes(self) -> usize {
        match self {
            RegWidth::Byte => 1,
            RegWidth::Word => 4,
        }
    }
}

/// Contiguous bank of priority registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriorityBank {
    pub base: usize,
    pub slots: usize,
    pub width: RegWidth,
}

impl PriorityBank {
    /// Address of `slot`.
    pub const fn slot_addr(&self, slot: usize) -> usize {
        self.base + slot * self.width.bytes()
    }

    /// Total size of the bank in bytes.
    pub const fn span(&self) -> usize {
        self.slots * self.width.bytes()
    }
}

const NVIC_IPR: usize = 0xE000_E400;
const SCB_SHPR1: usize = 0xE000_ED18;
const SCB_SHPR2: usize = 0xE000_ED1C;

/// Cortex-M architecture profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoreRevision {
    /// Cortex-M0/M0+.
    V6M,
    /// Cortex-M3/M4/M7.
    V7M,
    /// Cortex-M23.
    V8MBaseline,
    /// Cortex-M33/M55.
    V8MMainline,
}

impl CoreRevision {
    /// Profile selected for this build. Host builds use the v7-M geometry.
    pub const fn current() -> Self {
        #[cfg(armv6m)]
        {
            CoreRevision::V6M
        }
        #[cfg(armv8m_base)]
        {
            CoreRevision::V8MBaseline
        }
        #[cfg(armv8m_main)]
        {
            CoreRevision::V8MMainline
        }
        #[cfg(not(any(armv6m, armv8m_base, armv8m_main)))]
        {
            CoreRevision::V7M
        }
    }

    /// Number of 32-line groups behind ICER/ICPR.
    pub const fn nvic_groups(self) -> usize {
        match self {
            CoreRevision::V6M => 1,
            CoreRevision::V7M => 8,
            CoreRevision::V8MBaseline | CoreRevision::V8MMainline => 16,
        }
    }

    /// User interrupt priority registers (`NVIC->IP` / `NVIC->IPR`).
    pub const fn user_priorities(self) -> PriorityBank {
        match self {
            CoreRevision::V6M => PriorityBank { base: NVIC_IPR, slots: 8, width: RegWidth::Word },
            CoreRevision::V7M => PriorityBank { base: NVIC_IPR, slots: 240, width: RegWidth::Byte },
            CoreRevision::V8MBaseline => {
                PriorityBank { base: NVIC_IPR, slots: 124, width: RegWidth::Word }
            }
            CoreRevision::V8MMainline => {
                PriorityBank { base: NVIC_IPR, slots: 496, width: RegWidth::Byte }
            }
        }
    }

    /// System handler priority registers (`SCB->SHP` / `SCB->SHPR`).
    pub const fn system_priorities(self) -> PriorityBank {
        match self {
            CoreRevision::V6M | CoreRevision::V8MBaseline => {
                PriorityBank { base: SCB_SHPR2, slots: 2, width: RegWidth::Word }
            }
            CoreRevision::V7M | CoreRevision::V8MMainline => {
                PriorityBank { base: SCB_SHPR1, slots: 12, width: RegWidth::Byte }
            }
        }
    }

    /// FAULTMASK (`cpsid f`) is implemented.
    pub const fn has_fault_mask(self) -> bool {
        matches!(self, CoreRevision::V7M | CoreRevision::V8MMainline)
    }
}
