// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use kele::DmaRegion;
use kmbox::Channel;
use kplat::{cpu::CpuOps, gic::InterruptController, mmio::Mmio, timer::Clock};

/// The hardware a [`PowerController`](crate::PowerController) drives.
pub trait Soc {
    type Mmio: Mmio;
    type Clock: Clock;
    /// Channel to the System Manager.
    type Scmi: Channel;
    /// Channel to the EdgeLock Enclave.
    type Ele: Channel;
    /// Buffer the enclave writes responses into.
    type Dma: DmaRegion;
    type Gic: InterruptController;
    type Cpu: CpuOps;
}

/// Instances of every [`Soc`] seam, handed over at construction.
pub struct SocParts<S: Soc> {
    pub mmio: S::Mmio,
    pub clock: S::Clock,
    pub scmi: S::Scmi,
    pub ele: S::Ele,
    pub dma: S::Dma,
    pub gic: S::Gic,
    pub cpu: S::Cpu,
}

/// Saved interrupt controller state of a [`Soc`].
pub type GicContext<S> = <<S as Soc>::Gic as InterruptController>::Context;
