// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Which wakeup paths survive a NOC mix power-down.
//!
//! Interrupts routed through the WAKEUPMIX can wake the system only while
//! that mix stays powered, and peripherals in it keep their clocks only if
//! the SM is asked to hold their low-power handshake in run/wait/stop.

use kplat::gic::InterruptController;
use kscmi::{LpmSetting, PerLpmConfig};

use crate::config::scmi::*;

/// Number of 32-line SPI banks the SM tracks for IRQ wakeup.
pub const IMR_NUM: usize = 15;

/// Per SPI bank, the lines that belong to the WAKEUPMIX.
pub const WAKEUPMIX_IRQ_MASK: [u32; IMR_NUM] = [0x2000, 0x5500, 0x0, 0x10_0003, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

/// One peripheral needing a q-channel handshake while the NOC is down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HskEntry {
    /// Low-power interface index at the SM.
    pub per_idx: u32,
    /// SPI number, or `None` for a peripheral that only needs its clock.
    pub wakeup_irq: Option<u32>,
    pub active_wakeup: bool,
}

impl HskEntry {
    const fn irq(per_idx: u32, spi: u32) -> Self {
        Self {
            per_idx,
            wakeup_irq: Some(spi),
            active_wakeup: false,
        }
    }

    const fn clock_only(per_idx: u32) -> Self {
        Self {
            per_idx,
            wakeup_irq: None,
            active_wakeup: false,
        }
    }
}

pub const HSK_NUM: usize = 11;

const HSK_CONFIG: [HskEntry; HSK_NUM] = [
    HskEntry::irq(PER_LPI_CAN2, 40),
    HskEntry::irq(PER_LPI_CAN3, 42),
    HskEntry::irq(PER_LPI_CAN4, 44),
    HskEntry::irq(PER_LPI_CAN5, 46),
    HskEntry::irq(PER_LPI_LPUART1, 21),
    HskEntry::clock_only(PER_LPI_GPIO2),
    HskEntry::clock_only(PER_LPI_GPIO3),
    HskEntry::clock_only(PER_LPI_GPIO4),
    HskEntry::clock_only(PER_LPI_GPIO5),
    HskEntry::clock_only(PER_LPI_GPIO6),
    HskEntry::clock_only(PER_LPI_GPIO7),
];

/// Scratch wakeup state, recomputed on every system suspend.
#[derive(Debug, Clone)]
pub struct WakeupPolicy {
    hsk: [HskEntry; HSK_NUM],
    has_wakeup_irq: bool,
}

impl Default for WakeupPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeupPolicy {
    pub const fn new() -> Self {
        Self {
            hsk: HSK_CONFIG,
            has_wakeup_irq: false,
        }
    }

    pub fn entries(&self) -> &[HskEntry] {
        &self.hsk
    }

    /// Whether a WAKEUPMIX interrupt was left unmasked at the last
    /// evaluation.
    pub fn has_wakeup_irq(&self) -> bool {
        self.has_wakeup_irq
    }

    /// Builds the SM wake masks from the live controller enables and marks
    /// each IRQ-backed peripheral active iff its line is enabled.
    ///
    /// Bank `i` covers SPIs `32 * i .. 32 * i + 31`, i.e. GIC lines starting
    /// at `32 * (i + 1)`. A set mask bit means the line cannot wake.
    pub fn capture<G: InterruptController>(&mut self, gic: &G) -> [u32; IMR_NUM] {
        let mut irq_mask = [!0u32; IMR_NUM];
        for (bank, mask) in irq_mask.iter_mut().enumerate() {
            *mask = !gic.enable_mask(bank + 1);
            for e in self.hsk.iter_mut() {
                match e.wakeup_irq {
                    Some(spi) if spi as usize / 32 == bank => {
                        e.active_wakeup = *mask & (1 << (spi % 32)) == 0;
                    }
                    _ => {}
                }
            }
        }
        irq_mask
    }

    /// Recomputes [`Self::has_wakeup_irq`] from the masks about to be sent.
    /// Masks from a wake-up path (all lines masked) leave it cleared.
    pub fn evaluate(&mut self, irq_mask: &[u32; IMR_NUM]) -> bool {
        self.has_wakeup_irq = irq_mask
            .iter()
            .zip(WAKEUPMIX_IRQ_MASK)
            .any(|(m, wm)| m & wm != wm);
        self.has_wakeup_irq
    }

    /// Fills `out` with the handshake request for entering (`enter`) or
    /// leaving a NOC power-down. Returns how many entries were written.
    ///
    /// Entering holds every active peripheral and every clock-only one in
    /// run/wait/stop. Leaving puts each previously held peripheral back to
    /// always-on and clears the active set.
    pub fn handshake(&mut self, enter: bool, out: &mut [PerLpmConfig; HSK_NUM]) -> usize {
        let mut n = 0;
        for e in self.hsk.iter_mut() {
            if enter {
                if e.wakeup_irq.is_none() {
                    e.active_wakeup = true;
                }
                if e.active_wakeup {
                    out[n] = PerLpmConfig::new(e.per_idx, LpmSetting::OnRunWaitStop);
                    n += 1;
                }
            } else if e.active_wakeup {
                out[n] = PerLpmConfig::new(e.per_idx, LpmSetting::OnAlways);
                n += 1;
                e.active_wakeup = false;
            }
        }
        n
    }
}
