// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Firmware image for the armcm-boot reset path. Binds the vector table,
//! declares the main entry and routes boot logs to USART1.
//!
//! Host builds compile to an empty binary so the workspace builds and tests
//! without a Cortex-M toolchain.

#![cfg_attr(target_os = "none", no_std, no_main)]

#[cfg(target_os = "none")]
mod usart;

#[cfg(target_os = "none")]
mod firmware {
    use armcm_boot::arch::cortexm::wait_for_interrupt;
    use armcm_boot::{dynmem_end, dynmem_start, log_info, MemoryLayout, VectorTable, MCU};
    use armcm_boot::{DefaultHandler, ResetHandler};

    use crate::usart;

    /// External interrupt lines on the STM32F103 medium-density parts.
    #[cfg(not(stm32f0))]
    const IRQ_LINES: usize = 43;
    /// External interrupt lines on the STM32F04x/F07x parts.
    #[cfg(stm32f0)]
    const IRQ_LINES: usize = 32;

    extern "C" {
        static _stack_end: u32;
    }

    #[no_mangle]
    #[used]
    #[link_section = ".vector_table"]
    pub static ARMCM_VECTORS: VectorTable<{ 16 + IRQ_LINES }> =
        VectorTable::new(unsafe { core::ptr::addr_of!(_stack_end) }, ResetHandler, DefaultHandler);

    armcm_boot::armcm_entry!(firmware_main);

    fn firmware_main() -> ! {
        usart::init();
        armcm_boot::log::set_sink(usart::sink);

        log_info!(target: "image", "armcm-boot up on {}", MCU);
        MemoryLayout::linked().log_summary();
        log_info!(target: "image", "heap {:p}..{:p}", dynmem_start(), dynmem_end());

        loop {
            wait_for_interrupt();
        }
    }

    #[cfg(not(feature = "panic_handler"))]
    #[panic_handler]
    fn panic(_info: &core::panic::PanicInfo<'_>) -> ! {
        use armcm_boot::hal::Cpu;
        armcm_boot::CORTEX_M.halt()
    }
}

#[cfg(not(target_os = "none"))]
fn main() {}
