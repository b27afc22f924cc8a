// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Polled LPUART transmitter and the shared firmware console.

use kplat::mmio::MmioDeref;
use lazyinit::LazyInit;
use spin::Mutex;
use tock_registers::{
    interfaces::{Readable, Writeable},
    register_bitfields, register_structs,
    registers::ReadWrite,
};

use crate::config::devices::LPUART1_BASE;

// TDRE: transmit data register empty.
register_bitfields! [u32,
    STAT [
        TDRE OFFSET(23) NUMBITS(1) []
    ]
];

register_structs! {
    LpuartRegs {
        (0x00 => _reserved0),
        (0x14 => stat: ReadWrite<u32, STAT::Register>),
        (0x18 => _reserved1),
        (0x1c => data: ReadWrite<u32>),
        (0x20 => @END),
    }
}

static UART: LazyInit<Mutex<Lpuart>> = LazyInit::new();

/// An LPUART already configured by the boot ROM or an earlier stage.
pub struct Lpuart {
    regs: MmioDeref<LpuartRegs>,
}

impl Lpuart {
    /// # Safety
    ///
    /// `base` must be a mapped LPUART register block.
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            // SAFETY: guaranteed by the caller.
            regs: unsafe { MmioDeref::new(base) },
        }
    }

    pub fn send(&mut self, c: u8) {
        while !self.regs.stat.is_set(STAT::TDRE) {
            core::hint::spin_loop();
        }
        self.regs.data.set(c as u32);
    }
}

/// Write one byte, translating LF to CRLF.
fn do_putchar(uart: &mut Lpuart, c: u8) {
    match c {
        b'\n' => {
            uart.send(b'\r');
            uart.send(b'\n');
        }
        c => uart.send(c),
    }
}

/// Write bytes to the console. Output is dropped before [`early_init`].
pub fn write_data(bytes: &[u8]) {
    if let Some(uart) = UART.get() {
        let mut uart = uart.lock();
        for c in bytes {
            do_putchar(&mut uart, *c);
        }
    }
}

/// Sets up the console on LPUART1. Later calls do nothing.
pub fn early_init() {
    if UART.is_inited() {
        return;
    }
    // SAFETY: LPUART1 is mapped by this image.
    UART.init_once(Mutex::new(unsafe { Lpuart::new(LPUART1_BASE) }));
}
