// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! EL3 platform support for the NXP i.MX94.
//!
//! The application cores never touch power hardware directly. Every core,
//! cluster and power-mix transition is requested from the System Manager
//! (SM) over SCMI, while this crate keeps the state the SM cannot: boot
//! versus resume vectors, wakeup masks and peripheral context lost when the
//! NOC mix is cut.
//!
//! [`PowerController`] owns all of that state. It is generic over a
//! [`Soc`] so the same sequencing runs against real registers on target and
//! against the `kplat`/`kmbox` fakes on the host.
#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;

pub mod config;
pub mod context;
mod error;
pub mod lpuart;
pub mod pstate;
mod psci;
pub mod sema;
pub mod sip;
mod soc;
pub mod wakeup;

cfg_if::cfg_if! {
    if #[cfg(target_arch = "aarch64")] {
        pub mod board;
        pub use board::plat_setup_psci_ops;
    }
}

pub use error::{PlatError, PlatResult, PsciStatus, SMC_UNK};
pub use psci::PowerController;
pub use soc::{Soc, SocParts};
