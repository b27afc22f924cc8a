// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! SCMI shared-memory transport with a messaging-unit doorbell.

use core::{
    sync::atomic::{Ordering, fence},
    time::Duration,
};

use kplat::{
    mmio::Mmio,
    timer::{Clock, PollBudget, poll_until},
};

use crate::{Channel, ChannelError, Request, Response, check_args};

const SMT_CHANNEL_STATUS: usize = 0x04;
const SMT_FLAGS: usize = 0x10;
const SMT_LENGTH: usize = 0x14;
const SMT_HEADER: usize = 0x18;
const SMT_PAYLOAD: usize = 0x1c;

/// Channel is owned by the agent.
pub const SMT_STATUS_FREE: u32 = 1 << 0;
/// Platform reported a channel error.
pub const SMT_STATUS_ERROR: u32 = 1 << 1;
/// Payload words the shared area can hold, status word included.
pub const SMT_MAX_PAYLOAD_WORDS: usize = 32;
/// General control register of the doorbell messaging unit.
pub const MU_GCR_OFFSET: usize = 0x114;
/// General interrupt request 0.
pub const MU_GCR_GIR0: u32 = 1 << 0;

/// An SCMI agent channel in shared memory.
///
/// The request header goes to the message-header slot and arguments to the
/// payload area. The first payload word of the response is the SCMI status.
pub struct SmtChannel<M: Mmio, K: Clock> {
    mmio: M,
    clock: K,
    shmem: usize,
    doorbell: usize,
    budget: PollBudget,
}

impl<M: Mmio, K: Clock> SmtChannel<M, K> {
    /// Creates a channel on the shared area at `shmem`, signalled through
    /// the messaging unit at `mu_base`.
    pub fn new(mmio: M, clock: K, shmem: usize, mu_base: usize) -> Self {
        Self {
            mmio,
            clock,
            shmem,
            doorbell: mu_base + MU_GCR_OFFSET,
            budget: PollBudget::Within(Duration::from_millis(100)),
        }
    }

    /// Overrides the poll budget for channel ownership and completion.
    pub fn with_budget(mut self, budget: PollBudget) -> Self {
        self.budget = budget;
        self
    }

    fn status(&self) -> u32 {
        self.mmio.read32(self.shmem + SMT_CHANNEL_STATUS)
    }

    fn wait_free(&self) -> Result<(), ChannelError> {
        poll_until(&self.clock, self.budget, || self.status() & SMT_STATUS_FREE != 0)?;
        Ok(())
    }
}

impl<M: Mmio, K: Clock> Channel for SmtChannel<M, K> {
    fn max_args(&self) -> usize {
        SMT_MAX_PAYLOAD_WORDS
    }

    fn transact(&mut self, req: &Request<'_>, payload: &mut [u32]) -> Result<Response, ChannelError> {
        check_args(req, SMT_MAX_PAYLOAD_WORDS)?;
        self.wait_free()
            .inspect_err(|_| warn!("SMT {:#x}: channel never released", self.shmem))?;

        let m = &self.mmio;
        m.write32(self.shmem + SMT_FLAGS, 0);
        m.write32(self.shmem + SMT_LENGTH, 4 * (1 + req.args.len() as u32));
        m.write32(self.shmem + SMT_HEADER, req.opcode);
        for (i, arg) in req.args.iter().enumerate() {
            m.write32(self.shmem + SMT_PAYLOAD + 4 * i, *arg);
        }
        fence(Ordering::SeqCst);
        m.write32(self.shmem + SMT_CHANNEL_STATUS, 0);
        m.setbits32(self.doorbell, MU_GCR_GIR0);

        self.wait_free()
            .inspect_err(|_| warn!("SMT {:#x}: no response to {:#010x}", self.shmem, req.opcode))?;
        fence(Ordering::SeqCst);

        let m = &self.mmio;
        if self.status() & SMT_STATUS_ERROR != 0 {
            return Err(ChannelError::Transport);
        }
        let bytes = m.read32(self.shmem + SMT_LENGTH) as usize;
        let words = (bytes / 4).min(1 + SMT_MAX_PAYLOAD_WORDS);
        if words < 2 {
            return Err(ChannelError::Transport);
        }
        let header = m.read32(self.shmem + SMT_HEADER);
        let status = m.read32(self.shmem + SMT_PAYLOAD);
        let len = payload.len().min(words - 2);
        for (i, word) in payload.iter_mut().take(len).enumerate() {
            *word = m.read32(self.shmem + SMT_PAYLOAD + 4 * (i + 1));
        }

        Ok(Response {
            header,
            status,
            len,
        })
    }
}
