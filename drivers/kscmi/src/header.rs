// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! SCMI message header and protocol/message identifiers.

const MSG_ID_MASK: u32 = 0xff;
const MSG_TYPE_SHIFT: u32 = 8;
const PROTOCOL_ID_SHIFT: u32 = 10;
const PROTOCOL_ID_MASK: u32 = 0xff;
const TOKEN_SHIFT: u32 = 18;
/// Tokens are 10 bits wide.
pub const TOKEN_MASK: u16 = 0x3ff;

/// Message type of synchronous commands.
pub const MSG_TYPE_COMMAND: u32 = 0;

/// Packs a command header.
pub const fn pack(protocol: u8, message: u8, token: u16) -> u32 {
    (message as u32)
        | (MSG_TYPE_COMMAND << MSG_TYPE_SHIFT)
        | ((protocol as u32) << PROTOCOL_ID_SHIFT)
        | (((token & TOKEN_MASK) as u32) << TOKEN_SHIFT)
}

/// Returns the message id of a header.
pub const fn message_id(header: u32) -> u8 {
    (header & MSG_ID_MASK) as u8
}

/// Returns the protocol id of a header.
pub const fn protocol_id(header: u32) -> u8 {
    ((header >> PROTOCOL_ID_SHIFT) & PROTOCOL_ID_MASK) as u8
}

/// Returns the token of a header.
pub const fn token(header: u32) -> u16 {
    ((header >> TOKEN_SHIFT) as u16) & TOKEN_MASK
}

pub mod protocol {
    pub const BASE: u8 = 0x10;
    pub const POWER: u8 = 0x11;
    pub const SYSTEM: u8 = 0x12;
    pub const IMX_LMM: u8 = 0x80;
    pub const IMX_CPU: u8 = 0x82;
}

pub mod base {
    pub const PROTOCOL_ATTRIBUTES: u8 = 0x1;
    pub const DISCOVER_AGENT: u8 = 0x7;
    pub const RESET_AGENT_CONFIGURATION: u8 = 0xb;
}

pub mod power {
    pub const STATE_SET: u8 = 0x4;
    pub const STATE_GET: u8 = 0x5;
}

pub mod system {
    pub const POWER_STATE_SET: u8 = 0x3;
}

pub mod cpu {
    pub const START: u8 = 0x4;
    pub const STOP: u8 = 0x5;
    pub const RESET_VECTOR_SET: u8 = 0x6;
    pub const SLEEP_MODE_SET: u8 = 0x7;
    pub const IRQ_WAKE_SET: u8 = 0x8;
    pub const NON_IRQ_WAKE_SET: u8 = 0x9;
    pub const PD_LPM_CONFIG_SET: u8 = 0xa;
    pub const PER_LPM_CONFIG_SET: u8 = 0xb;
    pub const INFO_GET: u8 = 0xc;
}

pub mod lmm {
    pub const PROTOCOL_ATTRIBUTES: u8 = 0x1;
    pub const BOOT: u8 = 0x4;
    pub const SHUTDOWN: u8 = 0x6;
    pub const POWER_ON: u8 = 0xb;
    pub const RESET_VECTOR_SET: u8 = 0xc;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_and_unpack() {
        let h = pack(protocol::IMX_CPU, cpu::SLEEP_MODE_SET, 0x155);
        assert_eq!(message_id(h), cpu::SLEEP_MODE_SET);
        assert_eq!(protocol_id(h), protocol::IMX_CPU);
        assert_eq!(token(h), 0x155);
        assert_eq!((h >> 8) & 0x3, MSG_TYPE_COMMAND);
    }

    #[test]
    fn token_wraps_at_ten_bits() {
        assert_eq!(token(pack(protocol::BASE, 1, 0x400)), 0);
    }
}
