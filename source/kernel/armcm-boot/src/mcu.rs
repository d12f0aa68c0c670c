// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: MCU family derived from the configured part name
//! OWNERS: @kernel-boot-team
//! PUBLIC API: McuFamily
//! DEPENDS_ON: nothing (also compiled into build.rs)
//! INVARIANTS: Only families with a SYSCFG SRAM remap may build `ram-vectortable`

/// Vendor family of the configured part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum McuFamily {
    /// STM32F0: SYSCFG_CFGR1.MEM_MODE can alias SRAM at address 0.
    Stm32F0,
    /// STM32F1: 0x4001_0000 is AFIO; no SRAM remap.
    Stm32F1,
    Other,
}

impl McuFamily {
    /// Family of `mcu`, e.g. `stm32f042` or `STM32F103`.
    pub fn of(mcu: &str) -> Self {
        let prefix = mcu.get(..7).unwrap_or("");
        if prefix.eq_ignore_ascii_case("stm32f0") {
            McuFamily::Stm32F0
        } else if prefix.eq_ignore_ascii_case("stm32f1") {
            McuFamily::Stm32F1
        } else {
            McuFamily::Other
        }
    }

    /// Vector fetches at address 0 can be redirected to SRAM.
    pub const fn has_sram_remap(self) -> bool {
        matches!(self, McuFamily::Stm32F0)
    }

    pub const fn name(self) -> &'static str {
        match self {
            McuFamily::Stm32F0 => "stm32f0",
            McuFamily::Stm32F1 => "stm32f1",
            McuFamily::Other => "other",
        }
    }
}
