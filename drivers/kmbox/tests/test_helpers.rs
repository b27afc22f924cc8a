//! Remote-side emulation for channel tests

#![allow(unused)]

use kplat::mock::{FakeClock, FakeMmio};

pub const MU_BASE: usize = 0x4754_0000;
pub const SHMEM: usize = 0x204d_6000;
pub const DOORBELL_MU: usize = 0x4422_0000;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A clock stepping one microsecond per read.
pub fn clock() -> FakeClock {
    FakeClock::new(1_000)
}

/// Makes the fake platform answer every doorbell with `status` and
/// `payload`, echoing the request header.
pub fn answer_doorbell(mmio: &FakeMmio, status: i32, payload: &'static [u32]) {
    mmio.set(SHMEM + 0x04, 1);
    mmio.on_write(DOORBELL_MU + 0x114, move |_, regs| {
        let header = regs.get(SHMEM + 0x18);
        regs.set(SHMEM + 0x18, header);
        regs.set(SHMEM + 0x14, 4 * (2 + payload.len() as u32));
        regs.set(SHMEM + 0x1c, status as u32);
        for (i, w) in payload.iter().enumerate() {
            regs.set(SHMEM + 0x20 + 4 * i, *w);
        }
        regs.set(SHMEM + 0x04, 1);
    });
}
