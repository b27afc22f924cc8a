// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use core::fmt;

use kele::EleError;
use kplat::timer::PollTimeout;
use kscmi::{ScmiError, ScmiStatus};
use strum::FromRepr;

/// Returned in `x0` for an unrecognised SiP function or sub-command.
pub const SMC_UNK: i64 = -1;

/// PSCI return codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(i32)]
pub enum PsciStatus {
    Success = 0,
    NotSupported = -1,
    InvalidParams = -2,
    Denied = -3,
    AlreadyOn = -4,
    OnPending = -5,
    InternalFailure = -6,
    NotPresent = -7,
    Disabled = -8,
    InvalidAddress = -9,
}

/// Platform errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatError {
    /// The System Manager rejected a request or never answered.
    Scmi(ScmiError),
    /// The enclave failed a request.
    Ele(EleError),
    /// A hardware handshake did not complete in time.
    Timeout(PollTimeout),
    /// A power state, core index or address is outside what the platform
    /// supports.
    InvalidArgument,
    /// An auxiliary core has no agent known to the System Manager.
    NotFound,
    /// Unrecognised monitor call.
    UnknownCall,
    /// A platform hook ran before the platform was set up.
    Uninitialized,
}

pub type PlatResult<T = ()> = Result<T, PlatError>;

impl PlatError {
    /// Status reported by a PSCI hook.
    pub fn psci_status(&self) -> PsciStatus {
        match self {
            PlatError::InvalidArgument => PsciStatus::InvalidParams,
            PlatError::UnknownCall | PlatError::NotFound => PsciStatus::NotSupported,
            PlatError::Scmi(ScmiError::Status(ScmiStatus::Denied)) => PsciStatus::Denied,
            _ => PsciStatus::InternalFailure,
        }
    }

    /// Value returned in `x0` by a SiP call.
    pub fn smc_code(&self) -> i64 {
        match self {
            PlatError::Scmi(e) => e.code() as i64,
            PlatError::InvalidArgument => ScmiStatus::InvalidParameters as i64,
            PlatError::NotFound => ScmiStatus::NotFound as i64,
            PlatError::Ele(_) | PlatError::Timeout(_) | PlatError::UnknownCall | PlatError::Uninitialized => SMC_UNK,
        }
    }
}

impl From<ScmiError> for PlatError {
    fn from(e: ScmiError) -> Self {
        PlatError::Scmi(e)
    }
}

impl From<EleError> for PlatError {
    fn from(e: EleError) -> Self {
        PlatError::Ele(e)
    }
}

impl From<PollTimeout> for PlatError {
    fn from(e: PollTimeout) -> Self {
        PlatError::Timeout(e)
    }
}

impl fmt::Display for PlatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatError::Scmi(e) => write!(f, "{e}"),
            PlatError::Ele(e) => write!(f, "ELE: {e}"),
            PlatError::Timeout(e) => write!(f, "{e}"),
            PlatError::InvalidArgument => f.write_str("invalid argument"),
            PlatError::NotFound => f.write_str("agent not found"),
            PlatError::UnknownCall => f.write_str("unknown call"),
            PlatError::Uninitialized => f.write_str("platform not set up"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scmi_status_passes_through_smc() {
        let e = PlatError::from(ScmiError::Status(ScmiStatus::Busy));
        assert_eq!(e.smc_code(), -6);
        assert_eq!(e.psci_status(), PsciStatus::InternalFailure);
    }

    #[test]
    fn invalid_argument_is_invalid_params() {
        assert_eq!(PlatError::InvalidArgument.psci_status(), PsciStatus::InvalidParams);
        assert_eq!(PsciStatus::from_repr(-2), Some(PsciStatus::InvalidParams));
    }

    #[test]
    fn unknown_call_is_smc_unk() {
        assert_eq!(PlatError::UnknownCall.smc_code(), SMC_UNK);
    }
}
