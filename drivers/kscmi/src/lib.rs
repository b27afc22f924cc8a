// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! SCMI client for the i.MX9 System Manager.
//!
//! Covers the standard base, power-domain and system-power protocols plus
//! the i.MX CPU and logical-machine (LMM) vendor protocols. Each operation
//! is one blocking request on a [`kmbox::Channel`]; non-zero SCMI status is
//! returned as [`ScmiError::Status`] and never retried.
#![no_std]

#[macro_use]
extern crate log;

mod client;
pub mod header;
pub mod types;

use core::fmt;

pub use client::ScmiClient;
use kmbox::ChannelError;
use strum::FromRepr;
pub use types::*;

/// SCMI status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(i32)]
pub enum ScmiStatus {
    Success = 0,
    NotSupported = -1,
    InvalidParameters = -2,
    Denied = -3,
    NotFound = -4,
    OutOfRange = -5,
    Busy = -6,
    CommsError = -7,
    GenericError = -8,
    HardwareError = -9,
    ProtocolError = -10,
}

impl ScmiStatus {
    /// Decodes a raw status word. Codes outside the standard set are
    /// reported as [`ScmiStatus::GenericError`].
    pub fn from_word(word: u32) -> Self {
        Self::from_repr(word as i32).unwrap_or(ScmiStatus::GenericError)
    }
}

/// Errors returned by [`ScmiClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScmiError {
    /// The System Manager rejected or failed the command.
    Status(ScmiStatus),
    /// The request never completed.
    Channel(ChannelError),
    /// The reply did not match the request or was too short.
    BadResponse,
}

impl ScmiError {
    /// Returns the SCMI status code reported across the monitor boundary.
    pub fn code(&self) -> i32 {
        match self {
            ScmiError::Status(s) => *s as i32,
            ScmiError::Channel(_) => ScmiStatus::CommsError as i32,
            ScmiError::BadResponse => ScmiStatus::ProtocolError as i32,
        }
    }
}

impl From<ChannelError> for ScmiError {
    fn from(e: ChannelError) -> Self {
        ScmiError::Channel(e)
    }
}

impl fmt::Display for ScmiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScmiError::Status(s) => write!(f, "SCMI status {s:?}"),
            ScmiError::Channel(e) => write!(f, "SCMI channel: {e}"),
            ScmiError::BadResponse => write!(f, "malformed SCMI response"),
        }
    }
}

pub type ScmiResult<T = ()> = Result<T, ScmiError>;
