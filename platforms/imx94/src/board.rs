// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Board bindings and the entry points the monitor calls into.

use core::time::Duration;

use kele::{DmaBuffer, SOC_INFO_SIZE};
use kmbox::{MuChannel, SmtChannel};
use kplat::{
    cpu::{ArchCpu, CpuOps},
    gic::{Gicv3, InterruptController},
    mmio::RawMmio,
    timer::{ArchTimer, Clock},
};
use lazyinit::LazyInit;
use spin::Mutex;

use crate::{
    PlatError, PlatResult, PowerController, PsciStatus, Soc, SocParts,
    config::{PlatformConfig, devices::*, plat::PLATFORM_CORE_COUNT},
    lpuart,
    pstate::PowerState,
    sema::{SmApSemaphore, SmSyncedGic},
    sip::{SipService, SmcArgs, SmcReturn},
};

/// The i.MX94 as seen from EL3.
pub struct Imx94Soc;

type ImxGic = SmSyncedGic<Gicv3<ArchTimer, PLATFORM_CORE_COUNT>, RawMmio, ArchTimer>;

impl Soc for Imx94Soc {
    type Mmio = RawMmio;
    type Clock = ArchTimer;
    type Scmi = SmtChannel<RawMmio, ArchTimer>;
    type Ele = MuChannel<RawMmio, ArchTimer>;
    type Dma = DmaBuffer<SOC_INFO_SIZE>;
    type Gic = ImxGic;
    type Cpu = ArchCpu;
}

struct Firmware {
    psci: PowerController<Imx94Soc>,
    sip: SipService,
}

static FIRMWARE: LazyInit<Mutex<Firmware>> = LazyInit::new();

fn with_firmware<R>(f: impl FnOnce(&mut Firmware) -> PlatResult<R>) -> PlatResult<R> {
    let fw = FIRMWARE.get().ok_or(PlatError::Uninitialized)?;
    f(&mut fw.lock())
}

fn psci_ret(hook: &str, res: PlatResult) -> i32 {
    match res {
        Ok(()) => PsciStatus::Success as i32,
        Err(e) => {
            warn!("{hook}: {e}");
            e.psci_status() as i32
        }
    }
}

fn log_failure(hook: &str, res: PlatResult) {
    if let Err(e) = res {
        error!("{hook}: {e}");
    }
}

fn park() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

/// Power management hooks handed to the generic PSCI layer.
pub struct PlatPsciOps {
    pub validate_ns_entrypoint: fn(u64) -> i32,
    pub validate_power_state: fn(u32, &mut PowerState) -> i32,
    pub pwr_domain_on: fn(u64) -> i32,
    pub pwr_domain_off: fn(&PowerState),
    pub pwr_domain_on_finish: fn(&PowerState),
    pub pwr_domain_suspend: fn(&PowerState),
    pub pwr_domain_suspend_finish: fn(&PowerState),
    pub get_sys_suspend_power_state: fn(&mut PowerState),
    pub pwr_domain_pwr_down_wfi: fn(&PowerState) -> !,
    pub system_reset: fn() -> !,
    pub system_off: fn() -> !,
}

static PSCI_OPS: PlatPsciOps = PlatPsciOps {
    validate_ns_entrypoint: |ep| {
        psci_ret(
            "validate_ns_entrypoint",
            with_firmware(|fw| fw.psci.validate_ns_entrypoint(ep)),
        )
    },
    validate_power_state: |ps, req| {
        psci_ret(
            "validate_power_state",
            with_firmware(|fw| fw.psci.validate_power_state(ps, req)),
        )
    },
    pwr_domain_on: |mpidr| psci_ret("pwr_domain_on", with_firmware(|fw| fw.psci.domain_on(mpidr))),
    pwr_domain_off: |t| log_failure("pwr_domain_off", with_firmware(|fw| fw.psci.domain_off(t))),
    pwr_domain_on_finish: |t| {
        log_failure(
            "pwr_domain_on_finish",
            with_firmware(|fw| fw.psci.domain_on_finish(t)),
        )
    },
    pwr_domain_suspend: |t| log_failure("pwr_domain_suspend", with_firmware(|fw| fw.psci.domain_suspend(t))),
    pwr_domain_suspend_finish: |t| {
        log_failure(
            "pwr_domain_suspend_finish",
            with_firmware(|fw| fw.psci.domain_suspend_finish(t)),
        )
    },
    get_sys_suspend_power_state: |req| {
        log_failure(
            "get_sys_suspend_power_state",
            with_firmware(|fw| {
                *req = fw.psci.get_sys_suspend_power_state();
                Ok(())
            }),
        )
    },
    // The lock is not held: the other cores keep running their hooks.
    pwr_domain_pwr_down_wfi: |_| loop {
        ArchCpu.wait_for_interrupt();
    },
    system_reset: || {
        log_failure("system_reset", with_firmware(|fw| fw.psci.request_system_reset()));
        park()
    },
    system_off: || {
        log_failure("system_off", with_firmware(|fw| fw.psci.request_system_off()));
        park()
    },
};

/// Builds the platform, installs the power-on defaults and returns the PSCI
/// hooks. `sec_entrypoint` is the warm boot entry of every core.
///
/// Called once, on the boot core, before any other core is released.
pub fn plat_setup_psci_ops(sec_entrypoint: u64) -> PlatResult<&'static PlatPsciOps> {
    if FIRMWARE.is_inited() {
        return Err(PlatError::InvalidArgument);
    }

    let cfg = PlatformConfig::default();
    // SAFETY: every address the accessor is used with below is an SoC
    // device or the SM shared page, all mapped by this image.
    let mmio = unsafe { RawMmio::new() };
    let clock = ArchTimer;
    // SAFETY: the GIC frames are device memory mapped by this image.
    let mut gic = unsafe { Gicv3::new(clock, GICD_BASE, GICR_BASE) }.with_budget(cfg.poll);
    gic.init();
    gic.pcpu_init(0);
    let parts = SocParts::<Imx94Soc> {
        mmio,
        clock,
        scmi: SmtChannel::new(mmio, clock, SCMI_SHMEM_BASE, SM_MU_BASE).with_budget(cfg.poll),
        ele: MuChannel::new(mmio, clock, ELE_MU_BASE).with_budget(cfg.poll),
        dma: DmaBuffer::new(),
        gic: SmSyncedGic::new(gic, SmApSemaphore::new(mmio, SM_AP_SEMA_ADDR), clock, cfg.poll),
        cpu: ArchCpu,
    };

    FIRMWARE.init_once(Mutex::new(Firmware {
        psci: PowerController::new(parts, cfg),
        sip: SipService::new(),
    }));
    with_firmware(|fw| {
        fw.psci.setup(sec_entrypoint)?;
        fw.sip.init(&mut fw.psci);
        Ok(())
    })?;
    Ok(&PSCI_OPS)
}

/// Entry of the `0xc2xx_xxxx` SiP call range.
pub fn sip_smc_handler(fid: u32, args: &SmcArgs) -> SmcReturn {
    match FIRMWARE.get() {
        Some(fw) => {
            let mut guard = fw.lock();
            let fw = &mut *guard;
            fw.sip.handle(&mut fw.psci, fid, args)
        }
        None => SmcReturn::error(PlatError::Uninitialized),
    }
}

/// Fills `buf` with random bytes from the enclave.
pub fn plat_get_entropy(buf: &mut [u8]) -> PlatResult {
    with_firmware(|fw| fw.psci.fill_random(buf))
}

/// Brings up the LPUART console and installs the logger.
pub fn console_init(level: &str) {
    lpuart::early_init();
    if klogger::init_klogger().is_ok() {
        klogger::set_log_level(level);
    }
}

struct LoggerAdapterImpl;

#[crate_interface::impl_interface]
impl klogger::LoggerAdapter for LoggerAdapterImpl {
    fn write_str(s: &str) {
        lpuart::write_data(s.as_bytes());
    }

    fn now() -> Duration {
        ArchTimer.now()
    }

    fn cpu_id() -> Option<usize> {
        Some(ArchCpu.core_index())
    }
}
