// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! EdgeLock Enclave (ELE) client.
//!
//! ELE commands travel over the ELE messaging unit. Bulk results (the SoC
//! info descriptor, random bytes) are written by the enclave into a DMA
//! buffer whose bus address is passed in the request.
#![no_std]

#[macro_use]
extern crate log;

pub mod dma;
mod soc_info;

use core::fmt;

pub use dma::{DmaBuffer, DmaRegion};
use kmbox::{Channel, ChannelError, Request};
pub use soc_info::{SOC_INFO_SIZE, SocInfo};

/// Status word of a successful ELE command.
pub const ELE_SUCCESS_STATUS: u32 = 0xd6;

pub const ELE_GET_INFO_REQ: u32 = 0x17da_0406;
pub const ELE_GET_RNG: u32 = 0x17cd_0407;
pub const ELE_GET_TRNG_STATE: u32 = 0x17a4_0106;
pub const ELE_RELEASE_GMID: u32 = 0x17e4_0106;

/// Largest number of random bytes one GET_RNG transfer returns.
pub const ELE_TRNG_MAX_SIZE: usize = 16;
const ELE_RNG_REQ_FLAGS: u32 = 0x2;

const TRNG_STATUS_READY: u8 = 0x3;
const CSAL_STATUS_READY: u8 = 0x2;

/// Errors returned by [`Ele`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EleError {
    Channel(ChannelError),
    /// The enclave answered with a non-success status.
    Failed { status: u32 },
    /// The entropy source is not seeded yet.
    NotReady(TrngState),
    /// Empty output or a DMA buffer too small for the command.
    InvalidArgument,
}

impl From<ChannelError> for EleError {
    fn from(e: ChannelError) -> Self {
        EleError::Channel(e)
    }
}

impl fmt::Display for EleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EleError::Channel(e) => write!(f, "ELE channel: {e}"),
            EleError::Failed { status } => write!(f, "ELE command failed: {status:#x}"),
            EleError::NotReady(s) => write!(f, "TRNG not ready (trng {}, csal {})", s.trng, s.csal),
            EleError::InvalidArgument => write!(f, "invalid ELE request"),
        }
    }
}

/// TRNG and CSAL status bytes from GET_TRNG_STATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrngState {
    pub trng: u8,
    pub csal: u8,
}

impl TrngState {
    pub const fn from_word(word: u32) -> Self {
        Self {
            trng: word as u8,
            csal: (word >> 8) as u8,
        }
    }

    /// Both the TRNG and the CSAL DRBG are seeded.
    pub const fn is_ready(&self) -> bool {
        self.trng == TRNG_STATUS_READY && self.csal == CSAL_STATUS_READY
    }
}

/// ELE client over `chan`, using `dma` for bulk results.
pub struct Ele<C: Channel, D: DmaRegion> {
    chan: C,
    dma: D,
}

impl<C: Channel, D: DmaRegion> Ele<C, D> {
    pub fn new(chan: C, dma: D) -> Self {
        Self { chan, dma }
    }

    fn command(&mut self, opcode: u32, args: &[u32], payload: &mut [u32]) -> Result<(), EleError> {
        let resp = self.chan.transact(&Request::new(opcode, args), payload)?;
        trace!("ELE {opcode:#010x}: msg {:#x} resp {:#x}", resp.header, resp.status);
        if resp.status != ELE_SUCCESS_STATUS {
            return Err(EleError::Failed {
                status: resp.status,
            });
        }
        Ok(())
    }

    /// Reads the SoC info descriptor.
    pub fn soc_info(&mut self) -> Result<SocInfo, EleError> {
        if self.dma.size() < SOC_INFO_SIZE {
            return Err(EleError::InvalidArgument);
        }
        let addr = self.dma.bus_addr();
        self.dma.prepare();
        self.command(
            ELE_GET_INFO_REQ,
            &[(addr >> 32) as u32, addr as u32, SOC_INFO_SIZE as u32],
            &mut [],
        )?;
        self.dma.complete();
        let info = SocInfo::from_bytes(&self.dma.bytes()[..SOC_INFO_SIZE]);
        debug!("ELE soc {:#x} lc {:#x} state {:#x}", info.soc, info.lc, info.state);
        Ok(info)
    }

    /// Queries TRNG and CSAL readiness.
    pub fn trng_state(&mut self) -> Result<TrngState, EleError> {
        let mut state = [0u32; 1];
        self.command(ELE_GET_TRNG_STATE, &[], &mut state)?;
        Ok(TrngState::from_word(state[0]))
    }

    /// Fills `out` with random bytes.
    ///
    /// Readiness is checked once up front. Bytes are then fetched in
    /// [`ELE_TRNG_MAX_SIZE`] transfers, the last one truncated to what is
    /// left.
    pub fn get_trng(&mut self, out: &mut [u8]) -> Result<(), EleError> {
        if out.is_empty() || self.dma.size() < ELE_TRNG_MAX_SIZE {
            return Err(EleError::InvalidArgument);
        }
        let state = self.trng_state()?;
        if !state.is_ready() {
            info!("TRNG is not ready");
            return Err(EleError::NotReady(state));
        }

        let addr = self.dma.bus_addr() as u32;
        for chunk in out.chunks_mut(ELE_TRNG_MAX_SIZE) {
            self.dma.prepare();
            self.command(
                ELE_GET_RNG,
                &[ELE_RNG_REQ_FLAGS, addr, ELE_TRNG_MAX_SIZE as u32],
                &mut [],
            )
            .inspect_err(|e| warn!("TRNG generation failed: {e}"))?;
            self.dma.complete();
            chunk.copy_from_slice(&self.dma.bytes()[..chunk.len()]);
        }
        Ok(())
    }

    /// Releases the global master id held for the flash controllers.
    pub fn release_gmid(&mut self) -> Result<(), EleError> {
        self.command(ELE_RELEASE_GMID, &[], &mut [])
    }
}
