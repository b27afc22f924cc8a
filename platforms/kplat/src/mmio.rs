// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Memory-mapped register access.

use core::{marker::PhantomData, ops::Deref};

/// Register access by physical address.
///
/// EL3 firmware runs with device memory identity mapped, so addresses are
/// physical. Every access is a single volatile load or store of the stated
/// width.
pub trait Mmio {
    /// Reads a 32-bit register.
    fn read32(&self, addr: usize) -> u32;
    /// Writes a 32-bit register.
    fn write32(&self, addr: usize, value: u32);
    /// Reads one byte.
    fn read8(&self, addr: usize) -> u8;
    /// Writes one byte.
    fn write8(&self, addr: usize, value: u8);

    /// Reads a 64-bit register as two 32-bit halves, low half first.
    fn read64(&self, addr: usize) -> u64 {
        let lo = self.read32(addr) as u64;
        let hi = self.read32(addr + 4) as u64;
        lo | (hi << 32)
    }

    /// Writes a 64-bit register as two 32-bit halves, low half first.
    fn write64(&self, addr: usize, value: u64) {
        self.write32(addr, value as u32);
        self.write32(addr + 4, (value >> 32) as u32);
    }

    /// Read-modify-write: clears `clear` then sets `set`.
    fn modify32(&self, addr: usize, clear: u32, set: u32) {
        let v = self.read32(addr);
        self.write32(addr, (v & !clear) | set);
    }

    /// Sets bits in a 32-bit register.
    fn setbits32(&self, addr: usize, bits: u32) {
        self.modify32(addr, 0, bits);
    }

    /// Clears bits in a 32-bit register.
    fn clrbits32(&self, addr: usize, bits: u32) {
        self.modify32(addr, bits, 0);
    }
}

impl<T: Mmio + ?Sized> Mmio for &T {
    fn read32(&self, addr: usize) -> u32 {
        (**self).read32(addr)
    }

    fn write32(&self, addr: usize, value: u32) {
        (**self).write32(addr, value)
    }

    fn read8(&self, addr: usize) -> u8 {
        (**self).read8(addr)
    }

    fn write8(&self, addr: usize, value: u8) {
        (**self).write8(addr, value)
    }
}

/// Volatile access to the physical address space.
#[derive(Debug, Clone, Copy)]
pub struct RawMmio {
    _private: (),
}

impl RawMmio {
    /// Creates the accessor.
    ///
    /// # Safety
    ///
    /// Every address later passed to the accessor must be a mapped device
    /// or shared-memory location that tolerates the access width.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl Mmio for RawMmio {
    #[inline]
    fn read32(&self, addr: usize) -> u32 {
        // SAFETY: guaranteed by the contract of `RawMmio::new`.
        unsafe { core::ptr::read_volatile(addr as *const u32) }
    }

    #[inline]
    fn write32(&self, addr: usize, value: u32) {
        // SAFETY: guaranteed by the contract of `RawMmio::new`.
        unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
    }

    #[inline]
    fn read8(&self, addr: usize) -> u8 {
        // SAFETY: guaranteed by the contract of `RawMmio::new`.
        unsafe { core::ptr::read_volatile(addr as *const u8) }
    }

    #[inline]
    fn write8(&self, addr: usize, value: u8) {
        // SAFETY: guaranteed by the contract of `RawMmio::new`.
        unsafe { core::ptr::write_volatile(addr as *mut u8, value) }
    }
}

/// A register block of type `T` at a fixed address, reached through
/// `Deref`.
pub struct MmioDeref<T> {
    base: usize,
    _block: PhantomData<fn() -> T>,
}

impl<T> MmioDeref<T> {
    /// Wraps the block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the address of a mapped block laid out as `T` that
    /// stays mapped for the lifetime of the wrapper.
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            base,
            _block: PhantomData,
        }
    }

    pub const fn base(&self) -> usize {
        self.base
    }
}

impl<T> Clone for MmioDeref<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MmioDeref<T> {}

impl<T> Deref for MmioDeref<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: guaranteed by the contract of `MmioDeref::new`.
        unsafe { &*(self.base as *const T) }
    }
}
