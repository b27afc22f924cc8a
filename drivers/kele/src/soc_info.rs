// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use bytemuck::AnyBitPattern;

/// Size of the descriptor written by GET_INFO.
pub const SOC_INFO_SIZE: usize = core::mem::size_of::<SocInfo>();

/// SoC identity descriptor, in the enclave's word order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, AnyBitPattern)]
#[repr(C)]
pub struct SocInfo {
    pub hdr: u32,
    pub soc: u32,
    pub lc: u32,
    pub uid: [u32; 4],
    pub sha256_rom_patch: [u32; 8],
    pub sha_fw: [u32; 8],
    pub oem_srkh: [u32; 16],
    pub state: u32,
    pub oem_pqc_srkh: [u32; 16],
    pub reserved: [u32; 8],
}

impl SocInfo {
    /// Decodes a descriptor as the enclave wrote it, in little-endian
    /// target order. Bytes past [`SOC_INFO_SIZE`] are ignored and missing
    /// ones read as zero.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut raw = [0u8; SOC_INFO_SIZE];
        let n = bytes.len().min(SOC_INFO_SIZE);
        raw[..n].copy_from_slice(&bytes[..n]);
        bytemuck::pod_read_unaligned(&raw)
    }

    /// The 128-bit UID packed as two words, most significant word first in
    /// each half.
    pub fn uid_pair(&self) -> (u64, u64) {
        (
            self.uid[1] as u64 | (self.uid[0] as u64) << 32,
            self.uid[3] as u64 | (self.uid[2] as u64) << 32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_is_256_bytes() {
        assert_eq!(SOC_INFO_SIZE, 256);
    }

    #[test]
    fn decodes_fields_in_order() {
        let mut raw = [0u8; SOC_INFO_SIZE];
        for (i, c) in raw.chunks_exact_mut(4).enumerate() {
            c.copy_from_slice(&(i as u32).to_le_bytes());
        }
        let info = SocInfo::from_bytes(&raw);
        assert_eq!(info.soc, 1);
        assert_eq!(info.uid, [3, 4, 5, 6]);
        assert_eq!(info.state, 3 + 4 + 8 + 8 + 16);
        assert_eq!(info.reserved[7], 63);
    }

    #[test]
    fn short_descriptor_reads_zero_past_the_end() {
        let raw = [0x11u8; 8];
        let info = SocInfo::from_bytes(&raw);
        assert_eq!(info.soc, 0x1111_1111);
        assert_eq!(info.lc, 0);
    }

    #[test]
    fn uid_pair_packs_high_word_first() {
        let info = SocInfo {
            uid: [0xa, 0xb, 0xc, 0xd],
            ..SocInfo::default()
        };
        assert_eq!(info.uid_pair(), (0xa_0000_000b, 0xc_0000_000d));
    }
}
