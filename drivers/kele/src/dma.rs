// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Buffers shared with the enclave's bus master.

use kplat::cpu::clean_inval_dcache_range;

/// Memory the enclave writes into.
pub trait DmaRegion {
    /// Address the enclave uses to reach the buffer.
    fn bus_addr(&self) -> u64;
    /// Buffer size in bytes.
    fn size(&self) -> usize;
    /// Makes the buffer safe to hand to the device.
    fn prepare(&mut self);
    /// Makes device writes visible to the CPU.
    fn complete(&mut self);
    /// Buffer contents.
    fn bytes(&self) -> &[u8];
}

/// A cache-line aligned buffer in identity-mapped memory.
#[repr(C, align(64))]
pub struct DmaBuffer<const N: usize> {
    buf: [u8; N],
}

impl<const N: usize> DmaBuffer<N> {
    pub const fn new() -> Self {
        Self { buf: [0; N] }
    }
}

impl<const N: usize> Default for DmaBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> DmaRegion for DmaBuffer<N> {
    fn bus_addr(&self) -> u64 {
        self.buf.as_ptr() as u64
    }

    fn size(&self) -> usize {
        N
    }

    fn prepare(&mut self) {
        clean_inval_dcache_range(self.buf.as_ptr() as usize, N);
    }

    fn complete(&mut self) {
        clean_inval_dcache_range(self.buf.as_ptr() as usize, N);
    }

    fn bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl<T: DmaRegion + ?Sized> DmaRegion for &mut T {
    fn bus_addr(&self) -> u64 {
        (**self).bus_addr()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn prepare(&mut self) {
        (**self).prepare()
    }

    fn complete(&mut self) {
        (**self).complete()
    }

    fn bytes(&self) -> &[u8] {
        (**self).bytes()
    }
}
