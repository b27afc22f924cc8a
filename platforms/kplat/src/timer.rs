// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Monotonic time source and deadline-bounded polling.

use core::{fmt, time::Duration};

/// Nanoseconds per second.
pub const NS_SEC: u64 = 1_000_000_000;
/// Nanoseconds per millisecond.
pub const NS_MS: u64 = 1_000_000;
/// Nanoseconds per microsecond.
pub const NS_US: u64 = 1_000;

/// A monotonic clock.
pub trait Clock {
    /// Returns the current monotonic time in nanoseconds.
    fn now_ns(&self) -> u64;

    /// Returns the current monotonic time as a `Duration`.
    fn now(&self) -> Duration {
        Duration::from_nanos(self.now_ns())
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ns(&self) -> u64 {
        (**self).now_ns()
    }
}

/// How long a polling loop may wait for hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollBudget {
    /// Spin until the condition holds, however long that takes.
    Unbounded,
    /// Give up once this much time has passed.
    Within(Duration),
}

impl PollBudget {
    fn limit_ns(self) -> Option<u64> {
        match self {
            PollBudget::Unbounded => None,
            PollBudget::Within(d) => Some(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)),
        }
    }
}

/// A polling loop ran out of budget before its condition held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimeout {
    /// Time spent waiting, in nanoseconds.
    pub waited_ns: u64,
}

impl fmt::Display for PollTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hardware poll timed out after {} us", self.waited_ns / NS_US)
    }
}

/// Spins until `done` returns true or `budget` is exhausted.
///
/// `done` is evaluated at least once, and once more after the deadline
/// passes, so a condition that becomes true while the clock is sampled is
/// never reported as a timeout.
pub fn poll_until<C, F>(clock: &C, budget: PollBudget, mut done: F) -> Result<(), PollTimeout>
where
    C: Clock + ?Sized,
    F: FnMut() -> bool,
{
    if done() {
        return Ok(());
    }
    let limit = budget.limit_ns();
    let start = clock.now_ns();
    loop {
        if done() {
            return Ok(());
        }
        if let Some(limit) = limit {
            let waited = clock.now_ns().saturating_sub(start);
            if waited >= limit {
                if done() {
                    return Ok(());
                }
                trace!("poll gave up after {waited} ns");
                return Err(PollTimeout { waited_ns: waited });
            }
        }
        core::hint::spin_loop();
    }
}

/// The AArch64 generic timer, read through `CNTPCT_EL0`.
#[cfg(target_arch = "aarch64")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchTimer;

#[cfg(target_arch = "aarch64")]
impl ArchTimer {
    /// Returns the raw counter value.
    pub fn now_ticks(&self) -> u64 {
        use aarch64_cpu::registers::{CNTPCT_EL0, Readable};
        CNTPCT_EL0.get()
    }

    /// Returns the counter frequency in Hz.
    pub fn freq(&self) -> u64 {
        use aarch64_cpu::registers::{CNTFRQ_EL0, Readable};
        CNTFRQ_EL0.get()
    }

    /// Converts ticks to nanoseconds.
    pub fn t2ns(&self, ticks: u64) -> u64 {
        let freq = self.freq().max(1);
        ((ticks as u128 * NS_SEC as u128) / freq as u128) as u64
    }
}

#[cfg(target_arch = "aarch64")]
impl Clock for ArchTimer {
    fn now_ns(&self) -> u64 {
        self.t2ns(self.now_ticks())
    }
}
