// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Platform constants and runtime tunables.

use core::time::Duration;

use kplat::timer::PollBudget;

/// Power topology and memory layout.
pub mod plat {
    /// Application cores in the A55 cluster.
    pub const PLATFORM_CORE_COUNT: usize = 4;
    /// Highest power level: core 0, cluster 1, system 2.
    pub const PLAT_MAX_PWR_LVL: usize = 2;
    /// Deepest retention state code.
    pub const PLAT_MAX_RET_STATE: u8 = 2;
    /// Off state code, the highest encoding.
    pub const PLAT_MAX_OFF_STATE: u8 = 4;
    /// `state_id` of the platform deep power-down state.
    pub const PLAT_DEEP_PD_STATE_ID: u32 = 0x33;
    /// Lowest address a non-secure entry point may use.
    pub const PLAT_NS_IMAGE_BASE: u64 = 0x9020_0000;
    pub const BL31_BASE: u64 = 0x8a20_0000;
    pub const COUNTER_FREQUENCY: u64 = 24_000_000;
}

/// Register bases.
pub mod devices {
    pub const GICD_BASE: usize = 0x4800_0000;
    pub const GICR_BASE: usize = 0x4806_0000;

    /// Doorbell MU of the AP-to-SM SCMI channel.
    pub const SM_MU_BASE: usize = 0x4422_0000;
    /// SCMI shared-memory channel.
    pub const SCMI_SHMEM_BASE: usize = 0x4422_1000;
    /// SM/AP semaphore word, at the tail of the SCMI shared memory page.
    pub const SM_AP_SEMA_ADDR: usize = 0x4422_13f8;

    pub const ELE_MU_BASE: usize = 0x4754_0000;
    pub const LPUART1_BASE: usize = 0x4438_0000;

    /// Non-secure GPIO ports whose context is lost with the NOC mix, as
    /// `(base, pins)`.
    pub const GPIO_PORTS: [(usize, usize); 6] = [
        (0x4381_0000, 32),
        (0x4382_0000, 26),
        (0x4384_0000, 32),
        (0x4385_0000, 32),
        (0x4386_0000, 32),
        (0x4387_0000, 22),
    ];

    pub const WDOG3_BASE: usize = 0x4922_0000;
    pub const WDOG4_BASE: usize = 0x4923_0000;
    pub const WDOG_BASES: [usize; 2] = [WDOG3_BASE, WDOG4_BASE];

    pub const XSPI1_BASE: usize = 0x42b9_0000;
    pub const XSPI2_BASE: usize = 0x42be_0000;
    pub const XSPI_BASES: [usize; 2] = [XSPI1_BASE, XSPI2_BASE];
}

/// Identifiers understood by the System Manager.
pub mod scmi {
    /// SCMI CPU ids of cores 0..3 followed by the A55 platform (cluster).
    pub const SCMI_CPU_ID: [u32; 5] = [2, 3, 4, 5, 6];
    /// Index of the A55 platform entry in the per-CPU tables.
    pub const A55P_IDX: usize = 4;

    pub const PWR_MIX_A55C0: u32 = 5;
    pub const PWR_MIX_A55C1: u32 = 6;
    pub const PWR_MIX_A55C2: u32 = 7;
    pub const PWR_MIX_A55C3: u32 = 8;
    pub const PWR_MIX_A55P: u32 = 9;
    pub const PWR_MIX_NOC: u32 = 16;
    pub const PWR_MIX_WAKEUP: u32 = 18;

    pub const PWR_MEM_A55C0: u32 = 2;
    pub const PWR_MEM_A55C1: u32 = 3;
    pub const PWR_MEM_A55C2: u32 = 4;
    pub const PWR_MEM_A55C3: u32 = 5;
    pub const PWR_MEM_A55L3: u32 = 7;
    pub const PWR_MEM_NOC_OCRAM: u32 = 13;

    /// Non-IRQ wake reasons.
    pub const EVENT_WAKEUP: u32 = 1 << 0;
    pub const DEBUG_WAKEUP: u32 = 1 << 1;

    /// Peripheral low-power interface indices.
    pub const PER_LPI_GPIO2: u32 = 1;
    pub const PER_LPI_GPIO3: u32 = 2;
    pub const PER_LPI_GPIO4: u32 = 3;
    pub const PER_LPI_GPIO5: u32 = 4;
    pub const PER_LPI_GPIO6: u32 = 5;
    pub const PER_LPI_GPIO7: u32 = 6;
    pub const PER_LPI_CAN2: u32 = 8;
    pub const PER_LPI_CAN3: u32 = 9;
    pub const PER_LPI_CAN4: u32 = 10;
    pub const PER_LPI_CAN5: u32 = 11;
    pub const PER_LPI_LPUART1: u32 = 12;
    pub const PER_LPI_WDOG3: u32 = 30;
}

/// Static power-domain record of one core or of the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuPdInfo {
    pub cpu_id: u32,
    pub cpu_pd_id: u32,
    pub mem_pd_ids: &'static [u32],
}

/// Cores 0..3, then the A55 platform.
pub const CPU_PD_INFO: [CpuPdInfo; 5] = {
    use scmi::*;
    [
        CpuPdInfo {
            cpu_id: 2,
            cpu_pd_id: PWR_MIX_A55C0,
            mem_pd_ids: &[PWR_MEM_A55C0],
        },
        CpuPdInfo {
            cpu_id: 3,
            cpu_pd_id: PWR_MIX_A55C1,
            mem_pd_ids: &[PWR_MEM_A55C1],
        },
        CpuPdInfo {
            cpu_id: 4,
            cpu_pd_id: PWR_MIX_A55C2,
            mem_pd_ids: &[PWR_MEM_A55C2],
        },
        CpuPdInfo {
            cpu_id: 5,
            cpu_pd_id: PWR_MIX_A55C3,
            mem_pd_ids: &[PWR_MEM_A55C3],
        },
        CpuPdInfo {
            cpu_id: 6,
            cpu_pd_id: PWR_MIX_A55P,
            mem_pd_ids: &[PWR_MEM_A55L3],
        },
    ]
};

/// Runtime tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Budget of every hardware poll driven by the platform.
    pub poll: PollBudget,
}

impl PlatformConfig {
    pub const DEFAULT_POLL: Duration = Duration::from_millis(100);
}

impl Default for PlatformConfig {
    fn default() -> Self {
        let poll = if cfg!(feature = "strict-timing") {
            PollBudget::Unbounded
        } else {
            PollBudget::Within(Self::DEFAULT_POLL)
        };
        Self { poll }
    }
}
