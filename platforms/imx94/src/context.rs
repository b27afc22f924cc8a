// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Peripheral context lost when the NOC mix powers down.

use bitflags::bitflags;
use kplat::{
    gic::InterruptController,
    mmio::Mmio,
    timer::{Clock, PollBudget, PollTimeout, poll_until},
};

use crate::config::devices::{GPIO_PORTS, WDOG_BASES, XSPI_BASES};

pub const GPIO_CTRL_REG_NUM: usize = 8;
pub const GPIO_PIN_MAX_NUM: usize = 32;
/// The leading port-control registers hold secure permissions.
const GPIO_PERM_REG_NUM: usize = 4;
const GPIO_CTRL_OFFSET: [usize; GPIO_CTRL_REG_NUM] = [0xc, 0x10, 0x14, 0x18, 0x1c, 0x40, 0x54, 0x58];
const GPIO_ICR_OFFSET: usize = 0x80;

const WDOG_CS: usize = 0x0;
const WDOG_TOVAL: usize = 0x8;
/// Unlocked for reconfiguration.
pub const WDOG_CS_ULK: u32 = 1 << 11;
/// Reconfiguration applied.
pub const WDOG_CS_RCS: u32 = 1 << 10;

const XSPI_MTO: usize = 0x928;

bitflags! {
    /// Context groups handled by one save or restore.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ContextSet: u8 {
        const GIC = 1 << 0;
        const XSPI = 1 << 1;
        const GPIO = 1 << 2;
        const WDOG = 1 << 3;
        /// Everything outside the interrupt controller.
        const PERIPHERALS = Self::XSPI.bits() | Self::GPIO.bits() | Self::WDOG.bits();
    }
}

/// Saved state of one GPIO port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioPortCtx {
    pub base: usize,
    pub pin_num: usize,
    pub port_ctrl: [u32; GPIO_CTRL_REG_NUM],
    pub pin_icr: [u32; GPIO_PIN_MAX_NUM],
}

impl GpioPortCtx {
    const fn new(base: usize, pin_num: usize) -> Self {
        Self {
            base,
            pin_num,
            port_ctrl: [0; GPIO_CTRL_REG_NUM],
            pin_icr: [0; GPIO_PIN_MAX_NUM],
        }
    }

    fn icr(&self, pin: usize) -> usize {
        self.base + GPIO_ICR_OFFSET + 4 * pin
    }

    fn ctrl(&self, i: usize) -> usize {
        self.base + GPIO_CTRL_OFFSET[i]
    }

    /// Reads the port. Returns whether any pin has its interrupt enabled.
    ///
    /// The permission registers are cleared while the pin registers are
    /// read so the non-secure view is visible, then put back.
    fn save<M: Mmio>(&mut self, mmio: &M) -> bool {
        for i in 0..GPIO_CTRL_REG_NUM {
            self.port_ctrl[i] = mmio.read32(self.ctrl(i));
            if i < GPIO_PERM_REG_NUM {
                mmio.write32(self.ctrl(i), 0);
            }
        }

        let mut wakeup = false;
        for pin in 0..self.pin_num {
            self.pin_icr[pin] = mmio.read32(self.icr(pin));
            wakeup |= self.pin_icr[pin] != 0;
        }

        for i in 0..GPIO_PERM_REG_NUM {
            mmio.write32(self.ctrl(i), self.port_ctrl[i]);
        }
        wakeup
    }

    /// Interrupt control is only writable with permissions cleared, and
    /// the permissions go back last.
    fn restore<M: Mmio>(&self, mmio: &M) {
        for i in 0..GPIO_PERM_REG_NUM {
            mmio.write32(self.ctrl(i), 0);
        }
        for pin in 0..self.pin_num {
            mmio.write32(self.icr(pin), self.pin_icr[pin]);
        }
        for i in GPIO_PERM_REG_NUM..GPIO_CTRL_REG_NUM {
            mmio.write32(self.ctrl(i), self.port_ctrl[i]);
        }
        for i in 0..GPIO_PERM_REG_NUM {
            mmio.write32(self.ctrl(i), self.port_ctrl[i]);
        }
    }
}

/// Saved control and timeout of one watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WdogCtx {
    pub base: usize,
    pub cs: u32,
    pub toval: u32,
}

impl WdogCtx {
    fn save<M: Mmio>(&mut self, mmio: &M) {
        self.cs = mmio.read32(self.base + WDOG_CS);
        self.toval = mmio.read32(self.base + WDOG_TOVAL);
    }

    fn restore<M: Mmio, K: Clock>(&self, mmio: &M, clock: &K, budget: PollBudget) -> Result<(), PollTimeout> {
        let cs = self.base + WDOG_CS;
        let live = (mmio.read32(cs), mmio.read32(self.base + WDOG_TOVAL));
        if live == (self.cs, self.toval) {
            return Ok(());
        }

        mmio.write32(cs, self.cs);
        mmio.write32(self.base + WDOG_TOVAL, self.toval);
        poll_until(clock, budget, || mmio.read32(cs) & WDOG_CS_ULK == 0)?;
        poll_until(clock, budget, || mmio.read32(cs) & WDOG_CS_RCS != 0)
    }
}

/// Saved timing of one flash controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XspiCtx {
    pub base: usize,
    pub mto: u32,
}

/// Everything captured before the NOC mix powers down, plus the
/// interrupt controller state of type `G`.
pub struct SnapshotStore<G> {
    gic: G,
    gpio: [GpioPortCtx; GPIO_PORTS.len()],
    wdog: [WdogCtx; WDOG_BASES.len()],
    xspi: [XspiCtx; XSPI_BASES.len()],
    gpio_wakeup: bool,
}

impl<G: Default> Default for SnapshotStore<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Default> SnapshotStore<G> {
    pub fn new() -> Self {
        Self {
            gic: G::default(),
            gpio: GPIO_PORTS.map(|(base, pins)| GpioPortCtx::new(base, pins)),
            wdog: WDOG_BASES.map(|base| WdogCtx { base, cs: 0, toval: 0 }),
            xspi: XSPI_BASES.map(|base| XspiCtx { base, mto: 0 }),
            gpio_wakeup: false,
        }
    }

    /// Whether a GPIO pin had its interrupt enabled when last saved. Cleared
    /// by a GPIO restore.
    pub fn gpio_wakeup(&self) -> bool {
        self.gpio_wakeup
    }

    pub fn gpio(&self) -> &[GpioPortCtx] {
        &self.gpio
    }

    pub fn wdog(&self) -> &[WdogCtx] {
        &self.wdog
    }

    pub fn xspi(&self) -> &[XspiCtx] {
        &self.xspi
    }

    /// Captures `set` in the order GIC, XSPI, GPIO, WDOG.
    pub fn save<M, I>(&mut self, set: ContextSet, mmio: &M, gic: &mut I)
    where
        M: Mmio,
        I: InterruptController<Context = G>,
    {
        if set.contains(ContextSet::GIC) {
            gic.save(&mut self.gic);
        }
        if set.contains(ContextSet::XSPI) {
            for x in self.xspi.iter_mut() {
                x.mto = mmio.read32(x.base + XSPI_MTO);
            }
        }
        if set.contains(ContextSet::GPIO) {
            for port in self.gpio.iter_mut() {
                self.gpio_wakeup |= port.save(mmio);
            }
        }
        if set.contains(ContextSet::WDOG) {
            for w in self.wdog.iter_mut() {
                w.save(mmio);
            }
        }
        trace!("saved {set:?}, gpio wakeup {}", self.gpio_wakeup);
    }

    /// Writes `set` back in the order GIC, XSPI, GPIO, WDOG.
    ///
    /// A watchdog whose live control and timeout both equal the snapshot is
    /// left alone; otherwise it is reprogrammed and polled until unlocked
    /// and reconfigured. Every watchdog is handled even after one times
    /// out; the first timeout is returned.
    pub fn restore<M, I, K>(
        &mut self,
        set: ContextSet,
        mmio: &M,
        gic: &mut I,
        clock: &K,
        budget: PollBudget,
    ) -> Result<(), PollTimeout>
    where
        M: Mmio,
        I: InterruptController<Context = G>,
        K: Clock,
    {
        if set.contains(ContextSet::GIC) {
            gic.restore(&self.gic);
        }
        if set.contains(ContextSet::XSPI) {
            for x in self.xspi.iter() {
                mmio.write32(x.base + XSPI_MTO, x.mto);
            }
        }
        if set.contains(ContextSet::GPIO) {
            for port in self.gpio.iter() {
                port.restore(mmio);
            }
            self.gpio_wakeup = false;
        }
        let mut res = Ok(());
        if set.contains(ContextSet::WDOG) {
            for w in self.wdog.iter() {
                if let Err(e) = w.restore(mmio, clock, budget) {
                    warn!("WDOG@{:#x} restore timed out", w.base);
                    res = res.and(Err(e));
                }
            }
        }
        trace!("restored {set:?}");
        res
    }
}
