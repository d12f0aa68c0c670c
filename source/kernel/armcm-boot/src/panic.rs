// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fail-stop panic handler, enabled with the `panic_handler` feature.
//!
//! Images that bring their own handler leave the feature off.

#[cfg(all(feature = "panic_handler", target_os = "none"))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo<'_>) -> ! {
    use crate::hal::Cpu;
    use crate::regs::CORTEX_M;

    CORTEX_M.disable_irq();
    match info.location() {
        Some(location) => crate::log::emit_panic(format_args!(
            "{}:{}: {}",
            location.file(),
            location.line(),
            info.message()
        )),
        None => crate::log::emit_panic(format_args!("{}", info.message())),
    }
    CORTEX_M.halt()
}
