// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Hardware seams for secure-world platform firmware.
//!
//! Platform crates talk to the SoC only through the traits in this crate:
//! [`mmio::Mmio`] for registers, [`timer::Clock`] for deadlines,
//! [`cpu::CpuOps`] for core-local system registers and
//! [`gic::InterruptController`] for the interrupt controller. Real
//! implementations sit next to each trait; host fakes live in [`mock`].
#![cfg_attr(not(any(test, feature = "mock")), no_std)]

#[macro_use]
extern crate log;

pub mod cpu;
pub mod gic;
pub mod mmio;
pub mod timer;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
