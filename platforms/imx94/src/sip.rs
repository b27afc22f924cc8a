// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Vendor (SiP) monitor calls: auxiliary core control, logical machines
//! and SoC identity.

use kele::SocInfo;
use kmbox::Channel;
use kscmi::{LmmShutdownFlags, RunMode, ScmiClient, ScmiResult, VecFlags};
use strum::FromRepr;

use crate::{
    PowerController,
    error::{PlatError, PlatResult},
    soc::Soc,
};

pub const IMX_SIP_SRC: u32 = 0xc200_0005;
pub const IMX_SIP_GET_SOC_INFO: u32 = 0xc200_0006;
pub const IMX_SIP_LMM: u32 = 0xc200_000f;

/// `IMX_SIP_SRC` sub-commands, passed in `x1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u64)]
pub enum SrcCommand {
    /// Start the core in `x3` from the boot vector `x2`.
    Start = 0,
    /// Report whether the core in `x3` is running.
    Started = 1,
    /// Stop the core in `x3` and reset its agent's configuration.
    Stop = 2,
    /// Set the vector `x2` of the core in `x4` with flags `x3`.
    ResetAddrSet = 3,
}

/// `IMX_SIP_LMM` sub-commands, passed in `x1`. The LM id is in `x2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u64)]
pub enum LmmCommand {
    Boot = 0,
    Shutdown = 1,
}

/// Arguments of a SiP call after the function id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmcArgs {
    pub x1: u64,
    pub x2: u64,
    pub x3: u64,
    pub x4: u64,
}

/// Values written back to `x0..x3`; only the first `count` are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmcReturn {
    pub regs: [u64; 4],
    pub count: usize,
}

impl SmcReturn {
    pub const fn ret1(x0: u64) -> Self {
        Self {
            regs: [x0, 0, 0, 0],
            count: 1,
        }
    }

    pub const fn ret2(x0: u64, x1: u64) -> Self {
        Self {
            regs: [x0, x1, 0, 0],
            count: 2,
        }
    }

    pub const fn ret4(x0: u64, x1: u64, x2: u64, x3: u64) -> Self {
        Self {
            regs: [x0, x1, x2, x3],
            count: 4,
        }
    }

    pub fn error(e: PlatError) -> Self {
        Self::ret1(e.smc_code() as u64)
    }

    /// `x0` as a signed status.
    pub fn status(&self) -> i64 {
        self.regs[0] as i64
    }
}

/// SM agent names of the auxiliary cores, indexed by [`mcore_idx`].
pub const MCORE_AGENT_NAMES: [&str; 3] = ["M7", "M71", "M33S-S"];

/// Maps the SCMI CPU id of an auxiliary core to its agent slot.
pub fn mcore_idx(cpu: u64) -> Option<usize> {
    match cpu {
        1 => Some(0),
        7 => Some(1),
        8 => Some(2),
        _ => None,
    }
}

/// What is known about the SM agent of one auxiliary core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AgentSlot {
    /// Discovery has not run.
    #[default]
    Unresolved,
    /// Discovery ran and the SM reported no agent of that name.
    Absent,
    Resolved(u32),
}

/// Agent ids of the auxiliary cores, resolved once at init.
#[derive(Debug, Clone, Default)]
pub struct McoreAgents {
    slots: [AgentSlot; MCORE_AGENT_NAMES.len()],
}

impl McoreAgents {
    pub const fn new() -> Self {
        Self {
            slots: [AgentSlot::Unresolved; MCORE_AGENT_NAMES.len()],
        }
    }

    pub fn slot(&self, idx: usize) -> AgentSlot {
        self.slots.get(idx).copied().unwrap_or(AgentSlot::Absent)
    }

    /// Walks every agent the SM knows and records the auxiliary ones.
    /// Agents that fail to describe themselves are skipped.
    pub fn resolve<C: Channel>(&mut self, scmi: &mut ScmiClient<C>) -> ScmiResult {
        let attrs = scmi.base_protocol_attributes()?;
        for id in 0..u32::from(attrs.num_agents) {
            let agent = match scmi.base_discover_agent(id) {
                Ok(agent) => agent,
                Err(e) => {
                    debug!("agent {id}: {e}");
                    continue;
                }
            };
            let Some(idx) = MCORE_AGENT_NAMES.iter().position(|n| *n == agent.name()) else {
                continue;
            };
            if self.slots[idx] == AgentSlot::Unresolved {
                self.slots[idx] = AgentSlot::Resolved(agent.agent_id);
            }
        }

        for (name, slot) in MCORE_AGENT_NAMES.iter().zip(self.slots.iter_mut()) {
            if *slot == AgentSlot::Unresolved {
                *slot = AgentSlot::Absent;
            }
            debug!("agent {name}: {slot:?}");
        }
        Ok(())
    }

    fn agent_id(&self, idx: usize) -> PlatResult<u32> {
        match self.slot(idx) {
            AgentSlot::Resolved(id) => Ok(id),
            _ => Err(PlatError::NotFound),
        }
    }
}

/// Dispatcher of the SiP calls, with the state resolved at init.
#[derive(Debug, Clone, Default)]
pub struct SipService {
    agents: McoreAgents,
    soc_info: Option<SocInfo>,
}

impl SipService {
    pub const fn new() -> Self {
        Self {
            agents: McoreAgents::new(),
            soc_info: None,
        }
    }

    pub fn agents(&self) -> &McoreAgents {
        &self.agents
    }

    /// Resolves auxiliary core agents and caches the SoC descriptor.
    ///
    /// Failures are logged; the affected calls then report an error.
    pub fn init<S: Soc>(&mut self, ctrl: &mut PowerController<S>) {
        if let Err(e) = self.agents.resolve(ctrl.scmi()) {
            warn!("SM agent discovery failed: {e}");
        }
        match ctrl.soc_info() {
            Ok(info) => self.soc_info = Some(info),
            Err(e) => warn!("SoC info unavailable: {e}"),
        }
    }

    /// Handles SiP function `fid`. Errors become the `x0` status.
    pub fn handle<S: Soc>(&mut self, ctrl: &mut PowerController<S>, fid: u32, args: &SmcArgs) -> SmcReturn {
        let res = match fid {
            IMX_SIP_SRC => self.src(ctrl.scmi(), args),
            IMX_SIP_LMM => Self::lmm(ctrl.scmi(), args),
            IMX_SIP_GET_SOC_INFO => self.get_soc_info(),
            _ => Err(PlatError::UnknownCall),
        };
        res.unwrap_or_else(|e| {
            debug!("SiP {fid:#x}/{:#x}: {e}", args.x1);
            SmcReturn::error(e)
        })
    }

    fn src<C: Channel>(&self, scmi: &mut ScmiClient<C>, args: &SmcArgs) -> PlatResult<SmcReturn> {
        let reg32 = |x: u64| u32::try_from(x).map_err(|_| PlatError::InvalidArgument);
        let cmd = SrcCommand::from_repr(args.x1).ok_or(PlatError::UnknownCall)?;
        match cmd {
            SrcCommand::ResetAddrSet => {
                let flags = VecFlags::from_bits_retain(reg32(args.x3)?);
                scmi.core_set_reset_addr(reg32(args.x4)?, flags, args.x2)?;
                Ok(SmcReturn::ret1(0))
            }
            SrcCommand::Start => {
                let cpu = reg32(args.x3)?;
                scmi.core_set_reset_addr(cpu, VecFlags::BOOT, args.x2)?;
                scmi.core_start(cpu)?;
                Ok(SmcReturn::ret1(0))
            }
            SrcCommand::Started => {
                let info = scmi.core_info_get(reg32(args.x3)?)?;
                let running = matches!(info.run_mode(), Some(RunMode::Start | RunMode::Sleep));
                Ok(SmcReturn::ret1(running as u64))
            }
            SrcCommand::Stop => {
                let idx = mcore_idx(args.x3).ok_or(PlatError::InvalidArgument)?;
                let agent = self.agents.agent_id(idx)?;
                scmi.core_stop(reg32(args.x3)?)?;
                scmi.base_reset_agent_config(agent, 0)?;
                Ok(SmcReturn::ret2(0, 0))
            }
        }
    }

    fn lmm<C: Channel>(scmi: &mut ScmiClient<C>, args: &SmcArgs) -> PlatResult<SmcReturn> {
        let cmd = LmmCommand::from_repr(args.x1).ok_or(PlatError::UnknownCall)?;
        let lm = u32::try_from(args.x2).map_err(|_| PlatError::InvalidArgument)?;
        match cmd {
            LmmCommand::Boot => scmi.lmm_boot(lm)?,
            LmmCommand::Shutdown => scmi.lmm_shutdown(lm, LmmShutdownFlags::GRACEFUL)?,
        }
        Ok(SmcReturn::ret1(0))
    }

    /// `x0` success, `x1` the SoC id, `x2`/`x3` the packed UID.
    fn get_soc_info(&self) -> PlatResult<SmcReturn> {
        let info = self.soc_info.as_ref().ok_or(PlatError::NotFound)?;
        let (uid_lo, uid_hi) = info.uid_pair();
        Ok(SmcReturn::ret4(0, info.soc as u64, uid_lo, uid_hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcore_index_mapping() {
        assert_eq!(mcore_idx(1), Some(0));
        assert_eq!(mcore_idx(7), Some(1));
        assert_eq!(mcore_idx(8), Some(2));
        assert_eq!(mcore_idx(0), None);
        assert_eq!(mcore_idx(3), None);
        assert_eq!(mcore_idx(9), None);
    }

    #[test]
    fn error_return_carries_code() {
        assert_eq!(SmcReturn::error(PlatError::UnknownCall).status(), -1);
        assert_eq!(SmcReturn::error(PlatError::NotFound).status(), -4);
    }
}
