// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#[allow(dead_code)]
#[path = "src/mcu.rs"]
mod mcu;

use mcu::McuFamily;

const CORE_CFGS: &[&str] = &["armv6m", "armv7m", "armv8m_base", "armv8m_main"];
const DEFAULT_MCU: &str = "stm32f103";
/// Default part when the vector table is relocated; needs the SYSCFG remap.
const DEFAULT_RELOCATING_MCU: &str = "stm32f042";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/mcu.rs");
    for cfg in CORE_CFGS {
        println!("cargo:rustc-check-cfg=cfg({cfg})");
    }

    // Priority register geometry follows the architecture profile of the target triple.
    let target = std::env::var("TARGET").unwrap_or_default();
    let core = if target.starts_with("thumbv6m") {
        Some("armv6m")
    } else if target.starts_with("thumbv7m") || target.starts_with("thumbv7em") {
        Some("armv7m")
    } else if target.starts_with("thumbv8m.base") {
        Some("armv8m_base")
    } else if target.starts_with("thumbv8m.main") {
        Some("armv8m_main")
    } else {
        None
    };
    if let Some(core) = core {
        println!("cargo:rustc-cfg={core}");
    }

    println!("cargo:rerun-if-env-changed=ARMCM_MCU");
    let relocating = std::env::var_os("CARGO_FEATURE_RAM_VECTORTABLE").is_some();
    let default = if relocating { DEFAULT_RELOCATING_MCU } else { DEFAULT_MCU };
    let mcu = std::env::var("ARMCM_MCU").unwrap_or_else(|_| default.to_string());
    let family = McuFamily::of(&mcu);
    if relocating && !family.has_sram_remap() {
        panic!(
            "feature `ram-vectortable` needs a part with a SYSCFG SRAM remap (stm32f0*); \
             ARMCM_MCU={mcu} is {}",
            family.name()
        );
    }
    println!("cargo:rustc-env=ARMCM_MCU={mcu}");

    // Published to dependents as DEP_ARMCM_BOOT_MCU / DEP_ARMCM_BOOT_FAMILY.
    println!("cargo:mcu={mcu}");
    println!("cargo:family={}", family.name());
}
