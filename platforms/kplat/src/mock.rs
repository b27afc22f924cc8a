// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Host fakes of every hardware seam.
//!
//! All fakes are cheap handles over shared state: clone one, hand the clone
//! to the code under test, and inspect the original afterwards.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
};

use crate::{
    cpu::CpuOps,
    gic::{GIC_BANKS, InterruptController},
    mmio::Mmio,
    timer::Clock,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// One recorded register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(usize, u32),
    Write(usize, u32),
}

/// Backing store of [`FakeMmio`], handed to write hooks.
#[derive(Debug, Default)]
pub struct Regs {
    words: HashMap<usize, u32>,
}

impl Regs {
    /// Returns the word at `addr`, zero if never written.
    pub fn get(&self, addr: usize) -> u32 {
        self.words.get(&addr).copied().unwrap_or(0)
    }

    /// Stores a word at `addr`.
    pub fn set(&mut self, addr: usize, value: u32) {
        self.words.insert(addr, value);
    }

    fn get8(&self, addr: usize) -> u8 {
        (self.get(addr & !3) >> ((addr & 3) * 8)) as u8
    }

    fn set8(&mut self, addr: usize, value: u8) {
        let shift = (addr & 3) * 8;
        let word = self.get(addr & !3) & !(0xff << shift);
        self.set(addr & !3, word | ((value as u32) << shift));
    }
}

type WriteHook = Box<dyn FnMut(u32, &mut Regs) + Send>;

#[derive(Default)]
struct MmioState {
    regs: Regs,
    scripted: HashMap<usize, VecDeque<u32>>,
    hooks: HashMap<usize, Vec<WriteHook>>,
    log: Vec<Access>,
}

/// A sparse register file with scripted reads and write hooks.
#[derive(Clone, Default)]
pub struct FakeMmio {
    inner: Arc<Mutex<MmioState>>,
}

impl FakeMmio {
    /// Creates an all-zero register file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Presets a register without logging.
    pub fn set(&self, addr: usize, value: u32) {
        lock(&self.inner).regs.set(addr, value);
    }

    /// Returns the stored register value without logging.
    pub fn get(&self, addr: usize) -> u32 {
        lock(&self.inner).regs.get(addr)
    }

    /// Queues values returned by the next reads of `addr`, ahead of the
    /// stored value.
    pub fn script<I: IntoIterator<Item = u32>>(&self, addr: usize, values: I) {
        lock(&self.inner)
            .scripted
            .entry(addr)
            .or_default()
            .extend(values);
    }

    /// Runs `hook` after every write to `addr`.
    pub fn on_write<F>(&self, addr: usize, hook: F)
    where
        F: FnMut(u32, &mut Regs) + Send + 'static,
    {
        lock(&self.inner)
            .hooks
            .entry(addr)
            .or_default()
            .push(Box::new(hook));
    }

    /// Returns every access since creation or the last [`Self::clear_log`].
    pub fn log(&self) -> Vec<Access> {
        lock(&self.inner).log.clone()
    }

    /// Returns every write as `(addr, value)`.
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.log()
            .into_iter()
            .filter_map(|a| match a {
                Access::Write(addr, v) => Some((addr, v)),
                Access::Read(..) => None,
            })
            .collect()
    }

    /// Returns the values written to `addr`, oldest first.
    pub fn writes_to(&self, addr: usize) -> Vec<u32> {
        self.writes()
            .into_iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, v)| v)
            .collect()
    }

    /// Returns how many times `addr` was read.
    pub fn reads_of(&self, addr: usize) -> usize {
        self.log()
            .iter()
            .filter(|a| matches!(a, Access::Read(r, _) if *r == addr))
            .count()
    }

    /// Forgets recorded accesses.
    pub fn clear_log(&self) {
        lock(&self.inner).log.clear();
    }

    fn run_hooks(state: &mut MmioState, addr: usize, value: u32) {
        if let Some(hooks) = state.hooks.get_mut(&addr) {
            for hook in hooks.iter_mut() {
                hook(value, &mut state.regs);
            }
        }
    }
}

impl Mmio for FakeMmio {
    fn read32(&self, addr: usize) -> u32 {
        let mut s = lock(&self.inner);
        let v = match s.scripted.get_mut(&addr).and_then(VecDeque::pop_front) {
            Some(v) => v,
            None => s.regs.get(addr),
        };
        s.log.push(Access::Read(addr, v));
        v
    }

    fn write32(&self, addr: usize, value: u32) {
        let mut s = lock(&self.inner);
        s.regs.set(addr, value);
        s.log.push(Access::Write(addr, value));
        Self::run_hooks(&mut s, addr, value);
    }

    fn read8(&self, addr: usize) -> u8 {
        let mut s = lock(&self.inner);
        let v = s.regs.get8(addr);
        s.log.push(Access::Read(addr, v as u32));
        v
    }

    fn write8(&self, addr: usize, value: u8) {
        let mut s = lock(&self.inner);
        s.regs.set8(addr, value);
        s.log.push(Access::Write(addr, value as u32));
        Self::run_hooks(&mut s, addr, value as u32);
    }
}

/// A clock that advances by a fixed step on every read.
#[derive(Clone)]
pub struct FakeClock {
    now: Arc<AtomicU64>,
    step: u64,
    reads: Arc<AtomicUsize>,
}

impl FakeClock {
    /// Creates a clock at zero advancing `step_ns` per read.
    pub fn new(step_ns: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(0)),
            step: step_ns,
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns how many times the clock was read.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl Clock for FakeClock {
    fn now_ns(&self) -> u64 {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.now.fetch_add(self.step, Ordering::Relaxed) + self.step
    }
}

#[derive(Default)]
struct CpuState {
    pwrdn: Vec<u64>,
    wfi: usize,
}

/// A core whose index is chosen by the test.
#[derive(Clone, Default)]
pub struct FakeCpu {
    core: Arc<AtomicUsize>,
    state: Arc<Mutex<CpuState>>,
}

impl FakeCpu {
    /// Creates a fake running as `core`.
    pub fn new(core: usize) -> Self {
        let cpu = Self::default();
        cpu.set_core(core);
        cpu
    }

    /// Switches the calling core.
    pub fn set_core(&self, core: usize) {
        self.core.store(core, Ordering::Relaxed);
    }

    /// Returns every value written to `CLUSTERPWRDN_EL1`.
    pub fn cluster_pwrdn_writes(&self) -> Vec<u64> {
        lock(&self.state).pwrdn.clone()
    }

    /// Returns how many `wfi` were executed.
    pub fn wfi_count(&self) -> usize {
        lock(&self.state).wfi
    }
}

impl CpuOps for FakeCpu {
    fn core_index(&self) -> usize {
        self.core.load(Ordering::Relaxed)
    }

    fn write_cluster_pwrdn(&self, value: u64) {
        lock(&self.state).pwrdn.push(value);
    }

    fn wait_for_interrupt(&self) {
        lock(&self.state).wfi += 1;
    }
}

/// Operations observed by [`FakeGic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GicEvent {
    Save,
    Restore,
    PcpuInit(usize),
    CpuifEnable(usize),
    CpuifDisable(usize),
    DisableGroups,
}

#[derive(Default)]
struct GicState {
    enable: [u32; GIC_BANKS],
    cpuif: HashMap<usize, bool>,
    events: Vec<GicEvent>,
}

/// Saved state of [`FakeGic`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeGicContext {
    pub enable: [u32; GIC_BANKS],
}

/// An interrupt controller reduced to enable masks and an event log.
#[derive(Clone, Default)]
pub struct FakeGic {
    state: Arc<Mutex<GicState>>,
}

impl FakeGic {
    /// Creates a controller with every line disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables interrupt line `irq`.
    pub fn enable_irq(&self, irq: usize) {
        lock(&self.state).enable[irq / 32] |= 1 << (irq % 32);
    }

    /// Overwrites the enable mask of one bank.
    pub fn set_enable_mask(&self, bank: usize, mask: u32) {
        lock(&self.state).enable[bank] = mask;
    }

    /// Returns whether the CPU interface of `core` is enabled.
    pub fn cpuif_enabled(&self, core: usize) -> bool {
        lock(&self.state).cpuif.get(&core).copied().unwrap_or(false)
    }

    /// Returns the operations performed so far.
    pub fn events(&self) -> Vec<GicEvent> {
        lock(&self.state).events.clone()
    }
}

impl InterruptController for FakeGic {
    type Context = FakeGicContext;

    fn save(&mut self, ctx: &mut Self::Context) {
        let mut s = lock(&self.state);
        ctx.enable = s.enable;
        s.events.push(GicEvent::Save);
    }

    fn restore(&mut self, ctx: &Self::Context) {
        let mut s = lock(&self.state);
        s.enable = ctx.enable;
        s.events.push(GicEvent::Restore);
    }

    fn pcpu_init(&mut self, core: usize) {
        lock(&self.state).events.push(GicEvent::PcpuInit(core));
    }

    fn cpuif_enable(&mut self, core: usize) {
        let mut s = lock(&self.state);
        s.cpuif.insert(core, true);
        s.events.push(GicEvent::CpuifEnable(core));
    }

    fn cpuif_disable(&mut self, core: usize) {
        let mut s = lock(&self.state);
        s.cpuif.insert(core, false);
        s.events.push(GicEvent::CpuifDisable(core));
    }

    fn enable_mask(&self, bank: usize) -> u32 {
        lock(&self.state).enable.get(bank).copied().unwrap_or(0)
    }

    fn disable_all_groups(&mut self) {
        lock(&self.state).events.push(GicEvent::DisableGroups);
    }
}
