// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

use kmbox::{Channel, Request};

use crate::{
    ScmiError, ScmiResult, ScmiStatus,
    header::{self, base, cpu, lmm, power, protocol, system},
    types::*,
};

/// SCMI agent on one channel.
pub struct ScmiClient<C: Channel> {
    chan: C,
    token: u16,
}

impl<C: Channel> ScmiClient<C> {
    pub fn new(chan: C) -> Self {
        Self { chan, token: 0 }
    }

    /// Returns the underlying channel.
    pub fn channel(&self) -> &C {
        &self.chan
    }

    /// Sends one command and returns exactly `R` payload words.
    fn call<const R: usize>(&mut self, proto: u8, msg: u8, args: &[u32]) -> ScmiResult<[u32; R]> {
        let hdr = header::pack(proto, msg, self.token);
        self.token = self.token.wrapping_add(1) & header::TOKEN_MASK;

        let mut out = [0u32; R];
        let resp = self.chan.transact(&Request::new(hdr, args), &mut out)?;
        if header::message_id(resp.header) != msg || header::protocol_id(resp.header) != proto {
            warn!("SCMI {proto:#x}/{msg:#x}: reply header {:#010x}", resp.header);
            return Err(ScmiError::BadResponse);
        }
        let status = ScmiStatus::from_word(resp.status);
        if status != ScmiStatus::Success {
            debug!("SCMI {proto:#x}/{msg:#x} failed: {status:?}");
            return Err(ScmiError::Status(status));
        }
        if resp.len < R {
            return Err(ScmiError::BadResponse);
        }
        Ok(out)
    }

    // ---- Base protocol ----

    /// Returns the number of protocols and agents the platform exposes.
    pub fn base_protocol_attributes(&mut self) -> ScmiResult<BaseAttributes> {
        let [attr] = self.call::<1>(protocol::BASE, base::PROTOCOL_ATTRIBUTES, &[])?;
        Ok(BaseAttributes {
            num_protocols: attr as u8,
            num_agents: (attr >> 8) as u8,
        })
    }

    /// Describes `agent_id`.
    pub fn base_discover_agent(&mut self, agent_id: u32) -> ScmiResult<AgentInfo> {
        let r = self.call::<5>(protocol::BASE, base::DISCOVER_AGENT, &[agent_id])?;
        let mut name = [0u8; 16];
        for (chunk, word) in name.chunks_exact_mut(4).zip(&r[1..]) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Ok(AgentInfo {
            agent_id: r[0],
            name,
        })
    }

    /// Resets the configuration an agent was granted.
    pub fn base_reset_agent_config(&mut self, agent_id: u32, flags: u32) -> ScmiResult {
        self.call::<0>(protocol::BASE, base::RESET_AGENT_CONFIGURATION, &[agent_id, flags])?;
        Ok(())
    }

    // ---- Power domain protocol ----

    pub fn pwr_state_set(&mut self, domain: u32, flags: u32, state: u32) -> ScmiResult {
        self.call::<0>(protocol::POWER, power::STATE_SET, &[flags, domain, state])?;
        Ok(())
    }

    pub fn pwr_state_get(&mut self, domain: u32) -> ScmiResult<u32> {
        let [state] = self.call::<1>(protocol::POWER, power::STATE_GET, &[domain])?;
        Ok(state)
    }

    // ---- System power protocol ----

    /// Requests a system-wide power transition.
    pub fn sys_pwr_state_set(&mut self, flags: SysPowerFlags, state: SysPowerState) -> ScmiResult {
        self.call::<0>(
            protocol::SYSTEM,
            system::POWER_STATE_SET,
            &[flags.bits(), state as u32],
        )?;
        Ok(())
    }

    // ---- i.MX CPU protocol ----

    pub fn core_set_reset_addr(&mut self, cpu_id: u32, flags: VecFlags, addr: u64) -> ScmiResult {
        self.call::<0>(
            protocol::IMX_CPU,
            cpu::RESET_VECTOR_SET,
            &[cpu_id, flags.bits(), addr as u32, (addr >> 32) as u32],
        )?;
        Ok(())
    }

    pub fn core_start(&mut self, cpu_id: u32) -> ScmiResult {
        self.call::<0>(protocol::IMX_CPU, cpu::START, &[cpu_id])?;
        Ok(())
    }

    pub fn core_stop(&mut self, cpu_id: u32) -> ScmiResult {
        self.call::<0>(protocol::IMX_CPU, cpu::STOP, &[cpu_id])?;
        Ok(())
    }

    pub fn core_info_get(&mut self, cpu_id: u32) -> ScmiResult<CpuInfo> {
        let [run, sleep, lo, hi] = self.call::<4>(protocol::IMX_CPU, cpu::INFO_GET, &[cpu_id])?;
        Ok(CpuInfo {
            run_mode: run,
            sleep_mode: sleep,
            reset_vector: (lo as u64) | ((hi as u64) << 32),
        })
    }

    /// Sets the sleep target and wakeup routing of a CPU.
    pub fn core_set_sleep_mode(&mut self, cpu_id: u32, flags: WakeupFlags, mode: SleepMode) -> ScmiResult {
        self.call::<0>(
            protocol::IMX_CPU,
            cpu::SLEEP_MODE_SET,
            &[cpu_id, flags.bits(), mode as u32],
        )?;
        Ok(())
    }

    /// Programs GPC IRQ wake masks starting at register `mask_idx`. A set
    /// bit masks the line.
    pub fn core_irq_wake_set(&mut self, cpu_id: u32, mask_idx: u32, masks: &[u32]) -> ScmiResult {
        if masks.len() > MAX_IRQ_WAKE_MASKS {
            return Err(ScmiError::Status(ScmiStatus::InvalidParameters));
        }
        let mut args = [0u32; 3 + MAX_IRQ_WAKE_MASKS];
        args[0] = cpu_id;
        args[1] = mask_idx;
        args[2] = masks.len() as u32;
        args[3..3 + masks.len()].copy_from_slice(masks);
        self.call::<0>(protocol::IMX_CPU, cpu::IRQ_WAKE_SET, &args[..3 + masks.len()])?;
        Ok(())
    }

    /// Programs one non-IRQ wake mask register. A set bit masks the reason.
    pub fn core_non_irq_wake_set(&mut self, cpu_id: u32, mask_idx: u32, mask: u32) -> ScmiResult {
        self.call::<0>(
            protocol::IMX_CPU,
            cpu::NON_IRQ_WAKE_SET,
            &[cpu_id, mask_idx, 1, mask],
        )?;
        Ok(())
    }

    /// Sets power-domain low-power-mode policy for a CPU.
    pub fn core_lpm_mode_set(&mut self, cpu_id: u32, cfgs: &[LpmConfig]) -> ScmiResult {
        if cfgs.len() > MAX_LPM_CONFIGS {
            return Err(ScmiError::Status(ScmiStatus::InvalidParameters));
        }
        let mut args = [0u32; 2 + 3 * MAX_LPM_CONFIGS];
        args[0] = cpu_id;
        args[1] = cfgs.len() as u32;
        for (slot, cfg) in args[2..].chunks_exact_mut(3).zip(cfgs) {
            slot[0] = cfg.power_domain;
            slot[1] = cfg.lpm_setting as u32;
            slot[2] = cfg.retention_mask;
        }
        self.call::<0>(
            protocol::IMX_CPU,
            cpu::PD_LPM_CONFIG_SET,
            &args[..2 + 3 * cfgs.len()],
        )?;
        Ok(())
    }

    /// Sets peripheral clock low-power-mode policy for a CPU.
    pub fn per_lpm_mode_set(&mut self, cpu_id: u32, cfgs: &[PerLpmConfig]) -> ScmiResult {
        if cfgs.len() > MAX_PER_LPM_CONFIGS {
            return Err(ScmiError::Status(ScmiStatus::InvalidParameters));
        }
        let mut args = [0u32; 2 + 2 * MAX_PER_LPM_CONFIGS];
        args[0] = cpu_id;
        args[1] = cfgs.len() as u32;
        for (slot, cfg) in args[2..].chunks_exact_mut(2).zip(cfgs) {
            slot[0] = cfg.per_id;
            slot[1] = cfg.lpm_setting as u32;
        }
        self.call::<0>(
            protocol::IMX_CPU,
            cpu::PER_LPM_CONFIG_SET,
            &args[..2 + 2 * cfgs.len()],
        )?;
        Ok(())
    }

    // ---- i.MX LMM protocol ----

    /// Returns the number of logical machines.
    pub fn lmm_protocol_attributes(&mut self) -> ScmiResult<u32> {
        let [attr] = self.call::<1>(protocol::IMX_LMM, lmm::PROTOCOL_ATTRIBUTES, &[])?;
        Ok(attr & 0x1f)
    }

    pub fn lmm_boot(&mut self, lm_id: u32) -> ScmiResult {
        self.call::<0>(protocol::IMX_LMM, lmm::BOOT, &[lm_id])?;
        Ok(())
    }

    pub fn lmm_shutdown(&mut self, lm_id: u32, flags: LmmShutdownFlags) -> ScmiResult {
        self.call::<0>(protocol::IMX_LMM, lmm::SHUTDOWN, &[lm_id, flags.bits()])?;
        Ok(())
    }

    pub fn lmm_power_on(&mut self, lm_id: u32) -> ScmiResult {
        self.call::<0>(protocol::IMX_LMM, lmm::POWER_ON, &[lm_id])?;
        Ok(())
    }

    pub fn lmm_set_reset_vector(&mut self, lm_id: u32, cpu_id: u32, flags: u32, vector: u64) -> ScmiResult {
        self.call::<0>(
            protocol::IMX_LMM,
            lmm::RESET_VECTOR_SET,
            &[lm_id, cpu_id, flags, vector as u32, (vector >> 32) as u32],
        )?;
        Ok(())
    }
}
