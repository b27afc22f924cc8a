// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Register-mapped messaging unit.

use core::time::Duration;

use kplat::{
    mmio::Mmio,
    timer::{Clock, PollBudget, poll_until},
};

use crate::{Channel, ChannelError, Request, Response, check_args};

/// Receiver status register.
pub const MU_RSR_OFFSET: usize = 0x12c;
/// First transmit register.
pub const MU_TR_OFFSET: usize = 0x200;
/// First receive register.
pub const MU_RR_OFFSET: usize = 0x280;
/// Number of receive registers.
pub const MU_RR_COUNT: usize = 8;
/// Argument words that follow the opcode in TR1..TR4.
pub const MU_MAX_ARGS: usize = 4;
/// `RSR` pattern once both the header and status words are latched.
pub const MU_RSR_RESPONSE_READY: u32 = 0x3;

const fn tr(i: usize) -> usize {
    MU_TR_OFFSET + 4 * i
}

const fn rr(i: usize) -> usize {
    MU_RR_OFFSET + 4 * i
}

/// A messaging unit driven by polling.
///
/// The opcode goes to `TR0` and arguments to `TR1..`. The response header
/// is read from `RR0`, the status from `RR1` and payload words from `RR2..`.
/// Receive registers are read only as far as the caller asks, since a read
/// consumes the latched word.
pub struct MuChannel<M: Mmio, K: Clock> {
    mmio: M,
    clock: K,
    base: usize,
    budget: PollBudget,
}

impl<M: Mmio, K: Clock> MuChannel<M, K> {
    /// Creates a channel on the messaging unit at `base`.
    pub fn new(mmio: M, clock: K, base: usize) -> Self {
        Self {
            mmio,
            clock,
            base,
            budget: PollBudget::Within(Duration::from_millis(100)),
        }
    }

    /// Overrides the response poll budget.
    pub fn with_budget(mut self, budget: PollBudget) -> Self {
        self.budget = budget;
        self
    }
}

impl<M: Mmio, K: Clock> Channel for MuChannel<M, K> {
    fn max_args(&self) -> usize {
        MU_MAX_ARGS
    }

    fn transact(&mut self, req: &Request<'_>, payload: &mut [u32]) -> Result<Response, ChannelError> {
        check_args(req, MU_MAX_ARGS)?;

        self.mmio.write32(self.base + tr(0), req.opcode);
        for (i, arg) in req.args.iter().enumerate() {
            self.mmio.write32(self.base + tr(i + 1), *arg);
        }

        let rsr = self.base + MU_RSR_OFFSET;
        poll_until(&self.clock, self.budget, || {
            self.mmio.read32(rsr) & MU_RSR_RESPONSE_READY == MU_RSR_RESPONSE_READY
        })
        .inspect_err(|_| warn!("MU {:#x}: no response to {:#010x}", self.base, req.opcode))?;

        let header = self.mmio.read32(self.base + rr(0));
        let status = self.mmio.read32(self.base + rr(1));
        let len = payload.len().min(MU_RR_COUNT - 2);
        for (i, word) in payload.iter_mut().take(len).enumerate() {
            *word = self.mmio.read32(self.base + rr(i + 2));
        }
        trace!("MU {:#x}: {:#010x} -> hdr {header:#010x} status {status:#x}", self.base, req.opcode);

        Ok(Response {
            header,
            status,
            len,
        })
    }
}
