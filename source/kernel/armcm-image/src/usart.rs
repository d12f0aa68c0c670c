// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Polling USART1 transmitter used as the boot log sink (TX on PA9, 8 MHz HSI).
//!
//! The register map follows the MCU family armcm-boot was built for:
//! STM32F1 (AFIO-era GPIO, SR/DR) or STM32F0 (`cfg(stm32f0)`, MODER/AFR, ISR/TDR).

use core::fmt::{self, Write};
use spin::Mutex;

#[cfg(not(stm32f0))]
mod map {
    pub const USART_SR: usize = 0x00;
    pub const USART_DR: usize = 0x04;
    pub const USART_BRR: usize = 0x08;
    pub const USART_CR1: usize = 0x0C;
    pub const CR1_UE: u32 = 1 << 13;

    const RCC_APB2ENR: usize = 0x4002_1018;
    const APB2ENR_IOPAEN: u32 = 1 << 2;
    const APB2ENR_USART1EN: u32 = 1 << 14;
    const GPIOA_CRH: usize = 0x4001_0804;

    /// Clocks GPIOA and USART1; PA9 as alternate function push-pull, 50 MHz.
    pub unsafe fn route_tx() {
        unsafe {
            let apb2enr = RCC_APB2ENR as *mut u32;
            apb2enr.write_volatile(apb2enr.read_volatile() | APB2ENR_IOPAEN | APB2ENR_USART1EN);
            let crh = GPIOA_CRH as *mut u32;
            crh.write_volatile((crh.read_volatile() & !(0xF << 4)) | (0xB << 4));
        }
    }
}

#[cfg(stm32f0)]
mod map {
    pub const USART_CR1: usize = 0x00;
    pub const USART_BRR: usize = 0x0C;
    pub const USART_SR: usize = 0x1C;
    pub const USART_DR: usize = 0x28;
    pub const CR1_UE: u32 = 1 << 0;

    const RCC_AHBENR: usize = 0x4002_1014;
    const AHBENR_IOPAEN: u32 = 1 << 17;
    const RCC_APB2ENR: usize = 0x4002_1018;
    const APB2ENR_USART1EN: u32 = 1 << 14;
    const GPIOA_MODER: usize = 0x4800_0000;
    const GPIOA_AFRH: usize = 0x4800_0024;

    /// Clocks GPIOA and USART1; PA9 in alternate function 1.
    pub unsafe fn route_tx() {
        unsafe {
            let ahbenr = RCC_AHBENR as *mut u32;
            ahbenr.write_volatile(ahbenr.read_volatile() | AHBENR_IOPAEN);
            let apb2enr = RCC_APB2ENR as *mut u32;
            apb2enr.write_volatile(apb2enr.read_volatile() | APB2ENR_USART1EN);
            let moder = GPIOA_MODER as *mut u32;
            moder.write_volatile((moder.read_volatile() & !(0b11 << 18)) | (0b10 << 18));
            let afrh = GPIOA_AFRH as *mut u32;
            afrh.write_volatile((afrh.read_volatile() & !(0xF << 4)) | (0x1 << 4));
        }
    }
}

use map::{CR1_UE, USART_BRR, USART_CR1, USART_DR, USART_SR};

const USART1_BASE: usize = 0x4001_3800;
/// TXE sits at bit 7 of SR (F1) and ISR (F0).
const SR_TXE: u32 = 1 << 7;
const CR1_TE: u32 = 1 << 3;
/// 8 MHz / 115200.
const BRR_115200: u32 = 0x45;

static USART1: Mutex<Usart> = Mutex::new(Usart::new(USART1_BASE));

pub struct Usart {
    base: usize,
}

impl Usart {
    pub const fn new(base: usize) -> Self {
        Self { base }
    }

    fn read(&self, offset: usize) -> u32 {
        // SAFETY: `base` is the USART1 block and `offset` one of its registers.
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    fn write(&self, offset: usize, value: u32) {
        // SAFETY: as for `read`.
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }

    fn put(&self, byte: u8) {
        while self.read(USART_SR) & SR_TXE == 0 {}
        self.write(USART_DR, byte as u32);
    }
}

impl Write for Usart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &byte in s.as_bytes() {
            if byte == b'\n' {
                self.put(b'\r');
            }
            self.put(byte);
        }
        Ok(())
    }
}

/// Clocks USART1, routes TX to PA9 and enables the transmitter.
pub fn init() {
    // SAFETY: runs once from armcm_main before any other RCC/GPIOA user.
    unsafe { map::route_tx() };
    let usart = USART1.lock();
    usart.write(USART_BRR, BRR_115200);
    usart.write(USART_CR1, CR1_UE | CR1_TE);
}

/// Log sink handed to `armcm_boot::log::set_sink`.
pub fn sink(s: &str) {
    let _ = USART1.lock().write_str(s);
}
