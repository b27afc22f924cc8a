//! A host-side i.MX94 built from the fakes, and helpers that decode what
//! the platform sent to the SM

#![allow(unused)]

use core::time::Duration;

use imx94::{PowerController, Soc, SocParts, config::PlatformConfig};
use kele::DmaRegion;
use kmbox::mock::{Reply, ScriptedChannel, SentRequest};
use kplat::{
    mock::{FakeClock, FakeCpu, FakeGic, FakeMmio},
    timer::PollBudget,
};
use kscmi::header;

pub const BUDGET: PollBudget = PollBudget::Within(Duration::from_micros(20));
pub const SEC_ENTRY: u64 = 0x8a20_0000;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Enclave memory that reads back word `i` at word offset `i` after each
/// completed transfer.
pub struct PatternDma {
    buf: [u8; 256],
}

impl PatternDma {
    pub fn new() -> Self {
        Self { buf: [0; 256] }
    }
}

impl DmaRegion for PatternDma {
    fn bus_addr(&self) -> u64 {
        0x2_0051_0000
    }

    fn size(&self) -> usize {
        self.buf.len()
    }

    fn prepare(&mut self) {}

    fn complete(&mut self) {
        for (i, w) in self.buf.chunks_exact_mut(4).enumerate() {
            w.copy_from_slice(&(i as u32).to_le_bytes());
        }
    }

    fn bytes(&self) -> &[u8] {
        &self.buf
    }
}

pub struct TestSoc;

impl Soc for TestSoc {
    type Mmio = FakeMmio;
    type Clock = FakeClock;
    type Scmi = ScriptedChannel;
    type Ele = ScriptedChannel;
    type Dma = PatternDma;
    type Gic = FakeGic;
    type Cpu = FakeCpu;
}

/// The controller under test plus handles on every fake it owns.
pub struct Board {
    pub ctrl: PowerController<TestSoc>,
    pub mmio: FakeMmio,
    pub scmi: ScriptedChannel,
    pub ele: ScriptedChannel,
    pub gic: FakeGic,
    pub cpu: FakeCpu,
}

impl Board {
    pub fn new() -> Self {
        init_logging();
        let mmio = FakeMmio::new();
        let scmi = ScriptedChannel::default();
        let ele = ScriptedChannel::new(4);
        // Success for every command and a ready TRNG.
        ele.set_responder(|_| Some(Reply::status(0xd6, &[0x0203])));
        let gic = FakeGic::new();
        let cpu = FakeCpu::new(0);
        let parts = SocParts::<TestSoc> {
            mmio: mmio.clone(),
            clock: FakeClock::new(1_000),
            scmi: scmi.clone(),
            ele: ele.clone(),
            dma: PatternDma::new(),
            gic: gic.clone(),
            cpu: cpu.clone(),
        };
        Self {
            ctrl: PowerController::new(parts, PlatformConfig { poll: BUDGET }),
            mmio,
            scmi,
            ele,
            gic,
            cpu,
        }
    }

    /// A board past `setup`, with the setup traffic forgotten.
    pub fn ready() -> Self {
        let mut board = Self::new();
        board.ctrl.setup(SEC_ENTRY).unwrap();
        board.scmi.clear();
        board
    }

    /// SM requests since the last clear, as `(protocol, message, args)`.
    pub fn sm_requests(&self) -> Vec<(u8, u8, Vec<u32>)> {
        self.scmi.sent().iter().map(decode).collect()
    }

    /// Arguments of every i.MX CPU protocol request with message `msg`.
    pub fn cpu_calls(&self, msg: u8) -> Vec<Vec<u32>> {
        self.sm_requests()
            .into_iter()
            .filter(|(p, m, _)| *p == header::protocol::IMX_CPU && *m == msg)
            .map(|(_, _, args)| args)
            .collect()
    }

    /// ELE opcodes sent since creation.
    pub fn ele_opcodes(&self) -> Vec<u32> {
        self.ele.sent().iter().map(|r| r.opcode).collect()
    }
}

pub fn decode(req: &SentRequest) -> (u8, u8, Vec<u32>) {
    (
        header::protocol_id(req.opcode),
        header::message_id(req.opcode),
        req.args.clone(),
    )
}

/// Packs an agent name the way DISCOVER_AGENT returns it.
pub fn agent_reply(id: u32, name: &str) -> Reply {
    let mut raw = [0u8; 16];
    raw[..name.len()].copy_from_slice(name.as_bytes());
    let mut payload = vec![id];
    payload.extend(raw.chunks_exact(4).map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])));
    Reply::status(0, &payload)
}
