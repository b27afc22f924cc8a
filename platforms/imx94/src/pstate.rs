// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Hierarchical power states.
//!
//! Each level carries a small state code. `0` is run, codes up to
//! [`PLAT_MAX_RET_STATE`] are retention and anything above is off. Callers
//! must classify with the threshold helpers, never by comparing against a
//! single code, because intermediate retention encodings exist.

use crate::config::plat::{PLAT_DEEP_PD_STATE_ID, PLAT_MAX_OFF_STATE, PLAT_MAX_PWR_LVL, PLAT_MAX_RET_STATE};

pub const CORE_PWR_LVL: usize = 0;
pub const CLUSTER_PWR_LVL: usize = 1;
pub const SYSTEM_PWR_LVL: usize = PLAT_MAX_PWR_LVL;

/// State code of one power level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct LocalState(pub u8);

impl LocalState {
    pub const RUN: Self = Self(0);
    pub const RET: Self = Self(PLAT_MAX_RET_STATE);
    pub const OFF: Self = Self(PLAT_MAX_OFF_STATE);

    pub const fn is_run(self) -> bool {
        self.0 == 0
    }

    pub const fn is_retention(self) -> bool {
        self.0 > 0 && self.0 <= PLAT_MAX_RET_STATE
    }

    pub const fn is_off(self) -> bool {
        self.0 > PLAT_MAX_RET_STATE
    }
}

/// Target or current state of the core, cluster and system levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerState {
    levels: [LocalState; PLAT_MAX_PWR_LVL + 1],
}

impl PowerState {
    /// Every level running.
    pub const RUN: Self = Self::new(LocalState::RUN, LocalState::RUN, LocalState::RUN);

    pub const fn new(core: LocalState, cluster: LocalState, system: LocalState) -> Self {
        Self {
            levels: [core, cluster, system],
        }
    }

    pub const fn level(&self, lvl: usize) -> LocalState {
        self.levels[lvl]
    }

    pub fn set_level(&mut self, lvl: usize, state: LocalState) {
        self.levels[lvl] = state;
    }

    pub const fn core(&self) -> LocalState {
        self.levels[CORE_PWR_LVL]
    }

    pub const fn cluster(&self) -> LocalState {
        self.levels[CLUSTER_PWR_LVL]
    }

    pub const fn system(&self) -> LocalState {
        self.levels[SYSTEM_PWR_LVL]
    }

    /// Returns `false` if an enclosing level is in a deeper state than a
    /// level it contains, e.g. the cluster off while one of its cores runs.
    pub fn is_consistent(&self) -> bool {
        self.levels.windows(2).all(|w| w[1] <= w[0])
    }
}

/// PSCI `power_state` request type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateType {
    Standby,
    PowerDown,
}

/// Raw `power_state` argument of `CPU_SUSPEND`.
///
/// Layout: `state_id` in `[15:0]`, type in bit 16, power level in `[25:24]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsciPowerState(pub u32);

impl PsciPowerState {
    const ID_MASK: u32 = 0xffff;
    const TYPE_SHIFT: u32 = 16;
    const LVL_SHIFT: u32 = 24;
    const LVL_MASK: u32 = 0x3;

    pub const fn new(lvl: u32, ty: StateType, id: u32) -> Self {
        let ty = match ty {
            StateType::Standby => 0,
            StateType::PowerDown => 1,
        };
        Self(((lvl & Self::LVL_MASK) << Self::LVL_SHIFT) | (ty << Self::TYPE_SHIFT) | (id & Self::ID_MASK))
    }

    pub const fn state_id(self) -> u32 {
        self.0 & Self::ID_MASK
    }

    pub const fn state_type(self) -> StateType {
        if (self.0 >> Self::TYPE_SHIFT) & 1 == 0 {
            StateType::Standby
        } else {
            StateType::PowerDown
        }
    }

    pub const fn pwr_lvl(self) -> u32 {
        (self.0 >> Self::LVL_SHIFT) & Self::LVL_MASK
    }

    /// Whether this request pins the core off with the cluster in retention.
    pub const fn is_deep_standby(self) -> bool {
        matches!(self.state_type(), StateType::Standby) || self.state_id() == PLAT_DEEP_PD_STATE_ID
    }
}
