// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Two-stage reset path for ARM Cortex-M firmware images
//! OWNERS: @kernel-boot-team
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests per module + host integration tests (tests/)
//! PUBLIC API: ResetHandler, DefaultHandler, stage_one, stage_two, dynmem_start/end, MCU
//! DEPENDS_ON: link script symbols (_data_*, _bss_*, _stack_*, _text_vectortable_*)
//! INVARIANTS: No globals touched before the image is built; stage two never returns
//!
//! Hardware entry lands in [`stage_one`], which only relies on the stack the
//! core fetched from vector slot 0. It reloads the definitive stack and
//! tail-jumps into [`stage_two`], which scrubs the interrupt controller,
//! builds `.data`/`.bss` and calls the firmware's `armcm_main`.
//!
//! Sequencing logic is written against the [`hal`] traits so host builds can
//! drive it with a recording mock; the `CORTEX_M` handle in [`regs`] is the
//! only implementation that touches silicon.

#![cfg_attr(not(test), no_std)]
#![forbid(clippy::unwrap_used)]

#[macro_use]
pub mod log;

pub mod arch;
pub mod hal;
pub mod layout;
pub mod mcu;
pub mod mem;
pub mod panic;
pub mod profile;
pub mod regs;
pub mod stage_one;
pub mod stage_two;
pub mod vectors;

pub use layout::{DynamicRange, LayoutError, MemoryLayout, Region, VectorRelocation};
pub use mcu::McuFamily;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use layout::{dynmem_end, dynmem_start};
pub use profile::CoreRevision;
pub use regs::CORTEX_M;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use stage_one::ResetHandler;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use vectors::DefaultHandler;
pub use vectors::{Handler, Vector, VectorTable};

/// MCU family this image was configured for (`ARMCM_MCU` at build time).
pub const MCU: &str = env!("ARMCM_MCU");

/// Named string constant published for host-side configuration tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantStr {
    pub name: &'static str,
    pub value: &'static str,
}

/// Family of [`MCU`].
pub fn mcu_family() -> McuFamily {
    McuFamily::of(MCU)
}

#[used]
#[cfg_attr(target_os = "none", link_section = ".armcm.constants")]
pub static MCU_CONSTANT: ConstantStr = ConstantStr { name: "MCU", value: MCU };

/// Declares the firmware entry point invoked by stage two.
///
/// The target must have type `fn() -> !`. Stage two still halts if a
/// hand-written `armcm_main` returns.
///
/// ```ignore
/// armcm_boot::armcm_entry!(firmware_main);
///
/// fn firmware_main() -> ! {
///     loop {}
/// }
/// ```
#[macro_export]
macro_rules! armcm_entry {
    ($path:path) => {
        #[no_mangle]
        pub fn armcm_main() {
            let entry: fn() -> ! = $path;
            entry()
        }
    };
}
