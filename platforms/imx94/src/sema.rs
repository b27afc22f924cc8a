// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Two-party lock shared with the System Manager.
//!
//! The SM and the application processor both reprogram the GIC
//! redistributor wake state. They serialize on a Peterson lock in shared
//! memory: each side owns a request byte and both write a turn word. The lock
//! only ever has these two parties; it is not a general mutex.
//!
//! ```text
//! +0  flag_sm  u8   SM requests the lock
//! +1  flag_ap  u8   AP requests the lock
//! +4  turn     u32  0: SM may enter, 1: AP may enter
//! ```

use core::sync::atomic::{Ordering, fence};

use kplat::{
    gic::InterruptController,
    mmio::Mmio,
    timer::{Clock, PollBudget, PollTimeout, poll_until},
};

const FLAG_SM: usize = 0;
const FLAG_AP: usize = 1;
const TURN: usize = 4;
const TURN_SM: u32 = 0;

/// The AP side of the SM/AP lock.
pub struct SmApSemaphore<M: Mmio> {
    mmio: M,
    addr: usize,
}

/// Holds the lock until dropped.
#[must_use = "the lock is released when the guard is dropped"]
pub struct SemaGuard<'a, M: Mmio> {
    sema: &'a SmApSemaphore<M>,
}

impl<M: Mmio> SmApSemaphore<M> {
    pub const fn new(mmio: M, addr: usize) -> Self {
        Self { mmio, addr }
    }

    /// Requests the lock, yields the turn to the SM and waits until the SM
    /// is either not interested or has handed the turn back.
    ///
    /// On timeout the request is withdrawn before returning.
    pub fn acquire<K: Clock>(&self, clock: &K, budget: PollBudget) -> Result<SemaGuard<'_, M>, PollTimeout> {
        self.mmio.write8(self.addr + FLAG_AP, 1);
        self.mmio.write32(self.addr + TURN, TURN_SM);
        fence(Ordering::SeqCst);

        let res = poll_until(clock, budget, || {
            fence(Ordering::Acquire);
            self.mmio.read8(self.addr + FLAG_SM) == 0 || self.mmio.read32(self.addr + TURN) != TURN_SM
        });
        match res {
            Ok(()) => Ok(SemaGuard { sema: self }),
            Err(e) => {
                self.release();
                Err(e)
            }
        }
    }

    fn release(&self) {
        fence(Ordering::SeqCst);
        self.mmio.write8(self.addr + FLAG_AP, 0);
    }
}

impl<M: Mmio> Drop for SemaGuard<'_, M> {
    fn drop(&mut self) {
        self.sema.release();
    }
}

/// An interrupt controller whose CPU interface transitions run under the
/// SM/AP lock.
pub struct SmSyncedGic<G, M: Mmio, K: Clock> {
    inner: G,
    sema: SmApSemaphore<M>,
    clock: K,
    budget: PollBudget,
}

impl<G: InterruptController, M: Mmio, K: Clock> SmSyncedGic<G, M, K> {
    pub fn new(inner: G, sema: SmApSemaphore<M>, clock: K, budget: PollBudget) -> Self {
        Self {
            inner,
            sema,
            clock,
            budget,
        }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    fn locked(&mut self, core: usize, f: impl FnOnce(&mut G, usize)) {
        match self.sema.acquire(&self.clock, self.budget) {
            Ok(_guard) => f(&mut self.inner, core),
            Err(e) => {
                error!("SM/AP semaphore: {e}, core {core} proceeds unlocked");
                f(&mut self.inner, core);
            }
        }
    }
}

impl<G: InterruptController, M: Mmio, K: Clock> InterruptController for SmSyncedGic<G, M, K> {
    type Context = G::Context;

    fn save(&mut self, ctx: &mut Self::Context) {
        self.inner.save(ctx);
    }

    fn restore(&mut self, ctx: &Self::Context) {
        self.inner.restore(ctx);
    }

    fn pcpu_init(&mut self, core: usize) {
        self.inner.pcpu_init(core);
    }

    fn cpuif_enable(&mut self, core: usize) {
        self.locked(core, G::cpuif_enable);
    }

    fn cpuif_disable(&mut self, core: usize) {
        self.locked(core, G::cpuif_disable);
    }

    fn enable_mask(&self, bank: usize) -> u32 {
        self.inner.enable_mask(bank)
    }

    fn disable_all_groups(&mut self) {
        self.inner.disable_all_groups();
    }
}
