//! Fake DMA memory that the fake enclave "writes" on completion

#![allow(unused)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use kele::DmaRegion;
use kmbox::mock::{Reply, ScriptedChannel};

pub const FAKE_BUS_ADDR: u64 = 0x2_0051_0000;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Each completed transfer fills the buffer with the next run of a byte
/// counter, so consecutive chunks are distinguishable.
pub struct CountingDma {
    buf: [u8; 256],
    next: u8,
    pub completions: Arc<AtomicUsize>,
    pub fill: Option<[u8; 256]>,
}

impl CountingDma {
    pub fn new() -> Self {
        Self {
            buf: [0xee; 256],
            next: 0,
            completions: Arc::new(AtomicUsize::new(0)),
            fill: None,
        }
    }
}

impl DmaRegion for CountingDma {
    fn bus_addr(&self) -> u64 {
        FAKE_BUS_ADDR
    }

    fn size(&self) -> usize {
        self.buf.len()
    }

    fn prepare(&mut self) {}

    fn complete(&mut self) {
        self.completions.fetch_add(1, Ordering::Relaxed);
        if let Some(fill) = self.fill {
            self.buf = fill;
            return;
        }
        for b in self.buf[..16].iter_mut() {
            *b = self.next;
            self.next = self.next.wrapping_add(1);
        }
    }

    fn bytes(&self) -> &[u8] {
        &self.buf
    }
}

/// An enclave that answers every command with `0xd6` and a ready TRNG.
pub fn ready_enclave() -> ScriptedChannel {
    let chan = ScriptedChannel::new(4);
    chan.set_responder(|_| Some(Reply::status(0xd6, &[0x0203])));
    chan
}
