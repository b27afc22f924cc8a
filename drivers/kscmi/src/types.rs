// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Typed arguments and results of SCMI operations.

use bitflags::bitflags;
use strum::FromRepr;

/// Largest wake-mask array one IRQ_WAKE_SET request carries.
pub const MAX_IRQ_WAKE_MASKS: usize = 16;
/// Largest LPM table one PD_LPM_CONFIG_SET request carries.
pub const MAX_LPM_CONFIGS: usize = 8;
/// Largest table one PER_LPM_CONFIG_SET request carries.
pub const MAX_PER_LPM_CONFIGS: usize = 15;

/// When a domain or peripheral clock stays enabled relative to the CPU's
/// sleep mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u32)]
pub enum LpmSetting {
    OnNever = 0,
    OnRun = 1,
    OnRunWait = 2,
    OnRunWaitStop = 3,
    OnAlways = 4,
}

/// CPU sleep target mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u32)]
pub enum SleepMode {
    Run = 0,
    Wait = 1,
    Stop = 2,
    Suspend = 3,
}

/// CPU run mode reported by CPU_INFO_GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u32)]
pub enum RunMode {
    Start = 0,
    Hold = 1,
    Stop = 2,
    Sleep = 3,
}

bitflags! {
    /// Sleep-mode flags: wakeup routing and cluster resume.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WakeupFlags: u32 {
        /// Route wakeup through the GIC instead of the GPC.
        const GIC = 1 << 0;
        /// Resume the CPU when the cluster wakes.
        const RESUME_CPU = 1 << 1;
    }
}

impl WakeupFlags {
    /// Wakeup through the GPC interrupt mask registers.
    pub const GPC: Self = Self::empty();
}

bitflags! {
    /// Flags of CPU_RESET_VECTOR_SET.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VecFlags: u32 {
        const BOOT = 1 << 0;
        const START = 1 << 1;
        const RESUME = 1 << 2;
        const TABLE = 1 << 31;
    }
}

bitflags! {
    /// Flags of SYSTEM_POWER_STATE_SET.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SysPowerFlags: u32 {
        const GRACEFUL = 1 << 0;
    }
}

impl SysPowerFlags {
    pub const FORCEFUL: Self = Self::empty();
}

bitflags! {
    /// Flags of LMM_SHUTDOWN.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LmmShutdownFlags: u32 {
        const GRACEFUL = 1 << 0;
    }
}

impl LmmShutdownFlags {
    pub const FORCEFUL: Self = Self::empty();
}

/// System power states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u32)]
pub enum SysPowerState {
    Shutdown = 0,
    ColdReset = 1,
    WarmReset = 2,
    PowerUp = 3,
    Suspend = 4,
}

/// Power-domain state word meaning "on".
pub const POWER_STATE_ON: u32 = 0;
/// Power-domain state word meaning "off".
pub const POWER_STATE_OFF: u32 = 1 << 30;

/// One power-domain entry of a CPU low-power-mode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LpmConfig {
    pub power_domain: u32,
    pub lpm_setting: LpmSetting,
    pub retention_mask: u32,
}

impl LpmConfig {
    pub const fn new(power_domain: u32, lpm_setting: LpmSetting, retention_mask: u32) -> Self {
        Self {
            power_domain,
            lpm_setting,
            retention_mask,
        }
    }
}

/// One peripheral entry of a CPU low-power-mode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerLpmConfig {
    pub per_id: u32,
    pub lpm_setting: LpmSetting,
}

impl PerLpmConfig {
    pub const fn new(per_id: u32, lpm_setting: LpmSetting) -> Self {
        Self {
            per_id,
            lpm_setting,
        }
    }
}

/// Result of CPU_INFO_GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuInfo {
    /// Raw run mode; see [`RunMode`].
    pub run_mode: u32,
    /// Raw sleep mode; see [`SleepMode`].
    pub sleep_mode: u32,
    pub reset_vector: u64,
}

impl CpuInfo {
    pub fn run_mode(&self) -> Option<RunMode> {
        RunMode::from_repr(self.run_mode)
    }
}

/// Result of BASE_PROTOCOL_ATTRIBUTES.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseAttributes {
    pub num_protocols: u8,
    pub num_agents: u8,
}

/// Result of BASE_DISCOVER_AGENT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentInfo {
    pub agent_id: u32,
    pub name: [u8; 16],
}

impl AgentInfo {
    /// Returns the agent name up to its first NUL.
    pub fn name(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        core::str::from_utf8(&self.name[..end]).unwrap_or("")
    }
}
