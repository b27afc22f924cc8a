// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Core-local operations: identity, idle and cluster power control.

/// Bit position of affinity level 1 in `MPIDR_EL1`.
pub const MPIDR_AFF1_SHIFT: u64 = 8;
/// Width mask of one affinity field.
pub const MPIDR_AFFLVL_MASK: u64 = 0xff;
/// Data cache line size assumed for maintenance loops.
pub const CACHE_LINE_SIZE: usize = 64;

/// Returns the core index encoded in an MPIDR value.
///
/// Cortex-A55 clusters with the MT bit set report the core number in
/// affinity level 1.
pub const fn mpidr_core_index(mpidr: u64) -> usize {
    ((mpidr >> MPIDR_AFF1_SHIFT) & MPIDR_AFFLVL_MASK) as usize
}

/// Operations on the calling core.
pub trait CpuOps {
    /// Returns the index of the calling core.
    fn core_index(&self) -> usize;
    /// Writes the DSU `CLUSTERPWRDN_EL1` register.
    fn write_cluster_pwrdn(&self, value: u64);
    /// Executes one `wfi`.
    fn wait_for_interrupt(&self);
}

/// Cleans and invalidates the data cache over `[addr, addr + len)`.
///
/// Used around buffers shared with non-coherent bus masters.
pub fn clean_inval_dcache_range(addr: usize, len: usize) {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "aarch64")] {
            let end = addr.saturating_add(len);
            let mut line = addr & !(CACHE_LINE_SIZE - 1);
            while line < end {
                // SAFETY: data cache maintenance by VA has no memory-safety effect.
                unsafe { core::arch::asm!("dc civac, {0}", in(reg) line) };
                line += CACHE_LINE_SIZE;
            }
            // SAFETY: barrier only.
            unsafe { core::arch::asm!("dsb sy") };
        } else {
            let _ = (addr, len);
            core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
        }
    }
}

/// The executing Cortex-A55 core.
#[cfg(target_arch = "aarch64")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchCpu;

#[cfg(target_arch = "aarch64")]
impl CpuOps for ArchCpu {
    fn core_index(&self) -> usize {
        use aarch64_cpu::registers::{MPIDR_EL1, Readable};
        mpidr_core_index(MPIDR_EL1.get())
    }

    fn write_cluster_pwrdn(&self, value: u64) {
        // CLUSTERPWRDN_EL1
        // SAFETY: the register only expresses a power-down preference.
        unsafe {
            core::arch::asm!("msr S3_0_C15_C3_6, {0}", "isb", in(reg) value);
        }
    }

    fn wait_for_interrupt(&self) {
        aarch64_cpu::asm::wfi();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_index_comes_from_aff1() {
        assert_eq!(mpidr_core_index(0x8100_0000), 0);
        assert_eq!(mpidr_core_index(0x8100_0300), 3);
        assert_eq!(mpidr_core_index(0x0000_0100), 1);
    }
}
