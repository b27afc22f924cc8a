// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! PSCI power-domain hooks.

use kele::{Ele, SocInfo};
use kplat::{
    cpu::{CpuOps, mpidr_core_index},
    gic::InterruptController,
};
use kscmi::{
    LpmConfig, LpmSetting, PerLpmConfig, ScmiClient, ScmiResult, SleepMode, SysPowerFlags, SysPowerState, VecFlags,
    WakeupFlags,
};

use crate::{
    config::{
        CPU_PD_INFO, PlatformConfig,
        plat::{PLAT_MAX_PWR_LVL, PLAT_NS_IMAGE_BASE, PLATFORM_CORE_COUNT},
        scmi::*,
    },
    context::{ContextSet, SnapshotStore},
    error::{PlatError, PlatResult},
    pstate::{CLUSTER_PWR_LVL, CORE_PWR_LVL, LocalState, PowerState, PsciPowerState},
    soc::{GicContext, Soc, SocParts},
    wakeup::{HSK_NUM, IMR_NUM, WakeupPolicy},
};

/// CLUSTERPWRDN_EL1: request cluster power-off.
const DSU_CLUSTER_PWR_OFF: u64 = 0;
/// CLUSTERPWRDN_EL1: keep the L3 in retention.
const DSU_CLUSTER_MEM_RET: u64 = 1 << 1;

const ALL_IRQS_MASKED: [u32; IMR_NUM] = [!0; IMR_NUM];

const fn bit(n: u32) -> u32 {
    1 << n
}

/// Cluster, NOC and WAKEUPMIX policy while the system runs.
const RUN_MODE_LPM: [LpmConfig; 3] = [
    LpmConfig::new(PWR_MIX_A55P, LpmSetting::OnRun, bit(PWR_MEM_A55L3)),
    LpmConfig::new(PWR_MIX_NOC, LpmSetting::OnAlways, 0),
    LpmConfig::new(PWR_MIX_WAKEUP, LpmSetting::OnAlways, 0),
];

/// Logs a failed step and keeps it in `first` unless an earlier step
/// already failed.
fn keep_first_err(first: &mut PlatResult, step: &str, res: PlatResult) {
    if let Err(e) = res {
        warn!("{step}: {e}");
        if first.is_ok() {
            *first = Err(e);
        }
    }
}

/// Owner of all power management state of the platform.
///
/// Every hook runs on the core it concerns, and hooks are serialized by the
/// caller.
pub struct PowerController<S: Soc> {
    mmio: S::Mmio,
    clock: S::Clock,
    cpu: S::Cpu,
    gic: S::Gic,
    scmi: ScmiClient<S::Scmi>,
    ele: Ele<S::Ele, S::Dma>,
    cfg: PlatformConfig,
    sec_entry: u64,
    /// Cores that have not been powered on since boot.
    boot_stage: [bool; PLATFORM_CORE_COUNT],
    snapshots: SnapshotStore<GicContext<S>>,
    wakeup: WakeupPolicy,
}

impl<S: Soc> PowerController<S> {
    pub fn new(parts: SocParts<S>, cfg: PlatformConfig) -> Self {
        Self {
            mmio: parts.mmio,
            clock: parts.clock,
            cpu: parts.cpu,
            gic: parts.gic,
            scmi: ScmiClient::new(parts.scmi),
            ele: Ele::new(parts.ele, parts.dma),
            cfg,
            sec_entry: 0,
            boot_stage: [false, true, true, true],
            snapshots: SnapshotStore::new(),
            wakeup: WakeupPolicy::new(),
        }
    }

    pub fn scmi(&mut self) -> &mut ScmiClient<S::Scmi> {
        &mut self.scmi
    }

    pub fn gic(&self) -> &S::Gic {
        &self.gic
    }

    pub fn snapshots(&self) -> &SnapshotStore<GicContext<S>> {
        &self.snapshots
    }

    pub fn wakeup(&self) -> &WakeupPolicy {
        &self.wakeup
    }

    /// Whether `core` still gets its boot vector on the next power-on.
    pub fn is_boot_pending(&self, core: usize) -> bool {
        self.boot_stage.get(core).copied().unwrap_or(false)
    }

    fn this_core(&self) -> PlatResult<usize> {
        let core = self.cpu.core_index();
        if core >= PLATFORM_CORE_COUNT {
            return Err(PlatError::InvalidArgument);
        }
        Ok(core)
    }

    fn set_cpu_boot_entry(&mut self, core: usize, flags: VecFlags) -> ScmiResult {
        self.scmi.core_set_reset_addr(SCMI_CPU_ID[core], flags, self.sec_entry)
    }

    /// Installs the boot-time policy of core 0 and the cluster.
    ///
    /// `sec_entry` is the warm boot entry of every core.
    pub fn setup(&mut self, sec_entry: u64) -> PlatResult {
        let a55p = SCMI_CPU_ID[A55P_IDX];
        let mask = DEBUG_WAKEUP | EVENT_WAKEUP;

        self.sec_entry = sec_entry;
        self.set_cpu_boot_entry(0, VecFlags::BOOT)?;

        self.scmi.core_non_irq_wake_set(SCMI_CPU_ID[0], 0, mask)?;
        self.scmi.core_non_irq_wake_set(a55p, 0, mask)?;

        self.scmi.core_lpm_mode_set(CPU_PD_INFO[A55P_IDX].cpu_id, &RUN_MODE_LPM)?;
        self.scmi.core_lpm_mode_set(
            CPU_PD_INFO[0].cpu_id,
            &[LpmConfig::new(CPU_PD_INFO[0].cpu_pd_id, LpmSetting::OnRun, 0)],
        )?;

        // The NOC stays up, so the GIC can wake core 0 and the cluster.
        self.scmi.core_set_sleep_mode(SCMI_CPU_ID[0], WakeupFlags::GIC, SleepMode::Wait)?;
        self.scmi.core_set_sleep_mode(a55p, WakeupFlags::GIC, SleepMode::Wait)?;

        self.scmi.per_lpm_mode_set(
            a55p,
            &[PerLpmConfig::new(PER_LPI_WDOG3, LpmSetting::OnRunWaitStop)],
        )?;
        info!("PSCI ready, warm entry {sec_entry:#x}");
        Ok(())
    }

    /// Rejects entry points outside non-secure DRAM.
    pub fn validate_ns_entrypoint(&self, entry: u64) -> PlatResult {
        if entry < PLAT_NS_IMAGE_BASE {
            return Err(PlatError::InvalidArgument);
        }
        Ok(())
    }

    /// Checks a `CPU_SUSPEND` request and pins the core off with the
    /// cluster in retention for standby and the deep power-down state.
    /// Other requests leave `req` as the generic layer filled it.
    pub fn validate_power_state(&self, power_state: u32, req: &mut PowerState) -> PlatResult {
        let ps = PsciPowerState(power_state);
        if ps.pwr_lvl() as usize > PLAT_MAX_PWR_LVL {
            return Err(PlatError::InvalidArgument);
        }
        if ps.is_deep_standby() {
            req.set_level(CORE_PWR_LVL, LocalState::OFF);
            req.set_level(CLUSTER_PWR_LVL, LocalState::RET);
        }
        Ok(())
    }

    /// The state `SYSTEM_SUSPEND` requests: every level off.
    pub fn get_sys_suspend_power_state(&self) -> PowerState {
        PowerState::new(LocalState::OFF, LocalState::OFF, LocalState::OFF)
    }

    /// Powers on the core named by `mpidr`.
    ///
    /// The boot vector is programmed only on the first power-on of a core;
    /// later power-ons resume through the vector set at suspend.
    pub fn domain_on(&mut self, mpidr: u64) -> PlatResult {
        let core = mpidr_core_index(mpidr);
        if core >= PLATFORM_CORE_COUNT {
            return Err(PlatError::InvalidArgument);
        }
        let info = CPU_PD_INFO[core];

        if self.boot_stage[core] {
            self.set_cpu_boot_entry(core, VecFlags::BOOT)?;
            self.boot_stage[core] = false;
        }
        self.scmi.core_start(SCMI_CPU_ID[core])?;

        self.scmi.core_non_irq_wake_set(info.cpu_id, 0, DEBUG_WAKEUP | EVENT_WAKEUP)?;
        self.scmi.core_lpm_mode_set(
            info.cpu_id,
            &[LpmConfig::new(info.cpu_pd_id, LpmSetting::OnRun, 0)],
        )?;
        debug!("core {core} on");
        Ok(())
    }

    /// Runs on a freshly powered core: wake through the GIC in wait mode and
    /// bring up the local CPU interface.
    pub fn domain_on_finish(&mut self, _target: &PowerState) -> PlatResult {
        let core = self.this_core()?;
        self.scmi
            .core_set_sleep_mode(CPU_PD_INFO[core].cpu_id, WakeupFlags::GIC, SleepMode::Wait)?;
        self.gic.pcpu_init(core);
        self.gic.cpuif_enable(core);
        Ok(())
    }

    /// Prepares the calling core for hotplug. Only an explicit software
    /// wakeup brings it back, so every IRQ wake source is masked.
    pub fn domain_off(&mut self, _target: &PowerState) -> PlatResult {
        let core = self.this_core()?;
        let info = CPU_PD_INFO[core];

        self.gic.cpuif_disable(core);
        self.cpu.write_cluster_pwrdn(DSU_CLUSTER_PWR_OFF);

        self.scmi.core_lpm_mode_set(
            info.cpu_id,
            &[LpmConfig::new(info.cpu_pd_id, LpmSetting::OnRunWaitStop, 0)],
        )?;
        self.scmi.core_irq_wake_set(SCMI_CPU_ID[core], 0, &ALL_IRQS_MASKED)?;
        self.scmi
            .core_set_sleep_mode(SCMI_CPU_ID[core], WakeupFlags::GPC, SleepMode::Suspend)?;
        debug!("core {core} off");
        Ok(())
    }

    /// Prepares each level of `target` that leaves run.
    pub fn domain_suspend(&mut self, target: &PowerState) -> PlatResult {
        let core = self.this_core()?;

        if target.core().is_off() {
            self.set_cpu_boot_entry(core, VecFlags::RESUME)?;
            self.gic.cpuif_disable(core);
        }

        let cluster = target.cluster();
        if !cluster.is_run() {
            let pwrdn = if cluster.is_retention() {
                DSU_CLUSTER_PWR_OFF | DSU_CLUSTER_MEM_RET
            } else {
                DSU_CLUSTER_PWR_OFF
            };
            self.cpu.write_cluster_pwrdn(pwrdn);
        }

        if target.system().is_off() {
            self.nocmix_pwr_down(core)?;
            self.snapshots
                .save(ContextSet::PERIPHERALS, &self.mmio, &mut self.gic);
            let keep_wakeupmix = self.snapshots.gpio_wakeup() || self.wakeup.has_wakeup_irq();

            let wakeup = if keep_wakeupmix {
                LpmSetting::OnAlways
            } else {
                LpmSetting::OnRunWaitStop
            };
            self.scmi.core_lpm_mode_set(
                CPU_PD_INFO[A55P_IDX].cpu_id,
                &[
                    LpmConfig::new(CPU_PD_INFO[A55P_IDX].cpu_pd_id, LpmSetting::OnRunWaitStop, 0),
                    LpmConfig::new(PWR_MIX_NOC, LpmSetting::OnRunWaitStop, bit(PWR_MEM_NOC_OCRAM)),
                    LpmConfig::new(PWR_MIX_WAKEUP, wakeup, 0),
                ],
            )?;
            debug!("system suspend from core {core}, wakeupmix kept {keep_wakeupmix}");
        }
        Ok(())
    }

    /// Undoes [`Self::domain_suspend`] after wakeup.
    ///
    /// Every resume step runs even when an earlier one fails, so the
    /// peripherals and the run-mode policy are always back in place. The
    /// first failure is returned.
    pub fn domain_suspend_finish(&mut self, target: &PowerState) -> PlatResult {
        let core = self.this_core()?;
        let mut res = Ok(());

        if target.system().is_off() {
            keep_first_err(&mut res, "NOC mix power-up", self.nocmix_pwr_up(core));
            keep_first_err(&mut res, "GMID release", self.ele.release_gmid().map_err(PlatError::from));
            let restored = self.snapshots.restore(
                ContextSet::PERIPHERALS,
                &self.mmio,
                &mut self.gic,
                &self.clock,
                self.cfg.poll,
            );
            keep_first_err(&mut res, "peripheral restore", restored.map_err(PlatError::from));
            let lpm = self
                .scmi
                .core_lpm_mode_set(CPU_PD_INFO[A55P_IDX].cpu_id, &RUN_MODE_LPM);
            keep_first_err(&mut res, "run-mode LPM", lpm.map_err(PlatError::from));
        }

        if target.core().is_off() {
            self.gic.cpuif_enable(core);
        }
        res
    }

    /// Quiesces the GIC and asks the SM for a forceful cold reset.
    ///
    /// Success means the SM accepted; the caller is expected to lose power
    /// shortly after.
    pub fn request_system_reset(&mut self) -> PlatResult {
        self.gic.disable_all_groups();
        self.scmi
            .sys_pwr_state_set(SysPowerFlags::FORCEFUL, SysPowerState::ColdReset)?;
        Ok(())
    }

    /// Quiesces the GIC and asks the SM for a forceful shutdown.
    pub fn request_system_off(&mut self) -> PlatResult {
        self.gic.disable_all_groups();
        self.scmi
            .sys_pwr_state_set(SysPowerFlags::FORCEFUL, SysPowerState::Shutdown)?;
        Ok(())
    }

    /// Fills `buf` from the enclave TRNG.
    pub fn fill_random(&mut self, buf: &mut [u8]) -> PlatResult {
        self.ele.get_trng(buf)?;
        Ok(())
    }

    /// Reads the enclave's SoC descriptor.
    pub fn soc_info(&mut self) -> PlatResult<SocInfo> {
        Ok(self.ele.soc_info()?)
    }

    /// Saves the GIC, then hands wakeup over to the GPC.
    fn nocmix_pwr_down(&mut self, core: usize) -> PlatResult {
        self.snapshots.save(ContextSet::GIC, &self.mmio, &mut self.gic);
        self.set_sys_wakeup(core, true)
    }

    /// Restores the GIC, then hands wakeup back to it.
    fn nocmix_pwr_up(&mut self, core: usize) -> PlatResult {
        self.snapshots.restore(
            ContextSet::GIC,
            &self.mmio,
            &mut self.gic,
            &self.clock,
            self.cfg.poll,
        )?;
        self.set_sys_wakeup(core, false)
    }

    /// Routes wakeup of `last_core` and the cluster through the GPC while
    /// the NOC is down (`pdn`), or back through the GIC.
    fn set_sys_wakeup(&mut self, last_core: usize, pdn: bool) -> PlatResult {
        let a55p = SCMI_CPU_ID[A55P_IDX];
        let (flags, mode, irq_mask) = if pdn {
            self.scmi
                .core_irq_wake_set(CPU_PD_INFO[last_core].cpu_id, 0, &ALL_IRQS_MASKED)?;
            (WakeupFlags::GPC, SleepMode::Suspend, self.wakeup.capture(&self.gic))
        } else {
            (WakeupFlags::GIC, SleepMode::Wait, ALL_IRQS_MASKED)
        };
        self.wakeup.evaluate(&irq_mask);

        self.scmi.core_irq_wake_set(CPU_PD_INFO[A55P_IDX].cpu_id, 0, &irq_mask)?;
        self.scmi.core_set_sleep_mode(SCMI_CPU_ID[last_core], flags | WakeupFlags::RESUME_CPU, mode)?;
        self.scmi.core_set_sleep_mode(a55p, flags, mode)?;

        let mut hsk = [PerLpmConfig::new(0, LpmSetting::OnNever); HSK_NUM];
        let n = self.wakeup.handshake(pdn, &mut hsk);
        self.scmi.per_lpm_mode_set(a55p, &hsk[..n])?;
        trace!("sys wakeup pdn={pdn} irq wakeup {}", self.wakeup.has_wakeup_irq());
        Ok(())
    }
}
