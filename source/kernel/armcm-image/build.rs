// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::fs;
use std::path::PathBuf;

/// FLASH / RAM lengths for the family armcm-boot was configured for.
fn memory_map(family: &str) -> (&'static str, &'static str) {
    match family {
        // STM32F042: the smallest part the relocating build targets.
        "stm32f0" => ("32K", "6K"),
        _ => ("64K", "20K"),
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=ARMCM_LINKER_SCRIPT");
    println!("cargo:rustc-check-cfg=cfg(stm32f0)");

    let family = env::var("DEP_ARMCM_BOOT_FAMILY").unwrap_or_default();
    if family == "stm32f0" {
        println!("cargo:rustc-cfg=stm32f0");
    }

    // Host builds produce an inert binary and must not see the firmware map.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("none") {
        return;
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let (flash, ram) = memory_map(&family);
    let memory = format!(
        "MEMORY\n{{\n    FLASH (rx)  : ORIGIN = 0x08000000, LENGTH = {flash}\n    \
         RAM   (rwx) : ORIGIN = 0x20000000, LENGTH = {ram}\n}}\n"
    );
    fs::write(out_dir.join("memory.x"), memory).expect("memory.x must be writable");
    println!("cargo:rustc-link-search={}", out_dir.display());

    let manifest_dir =
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo"));
    let linker_script = env::var_os("ARMCM_LINKER_SCRIPT")
        .map(PathBuf::from)
        .unwrap_or_else(|| manifest_dir.join("armcm_link.ld"));
    println!("cargo:rerun-if-changed={}", linker_script.display());
    let abs_script = linker_script.canonicalize().expect("linker script must exist");
    println!("cargo:rustc-link-arg=-T{}", abs_script.display());
}
