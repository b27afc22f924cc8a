//! Integration tests of the PSCI hooks against fake SM, ELE and GIC

#![cfg(test)]

mod test_helpers;

use imx94::{
    PlatError, PsciStatus,
    config::{
        devices::{GPIO_PORTS, WDOG3_BASE, WDOG4_BASE, XSPI1_BASE},
        plat::PLAT_NS_IMAGE_BASE,
        scmi::*,
    },
    context::WDOG_CS_RCS,
    pstate::{LocalState, PowerState, PsciPowerState, StateType},
};
use kmbox::{ChannelError, mock::Reply};
use kplat::{gic::InterruptController, mock::GicEvent};
use kscmi::{
    LpmSetting, ScmiStatus, SleepMode, VecFlags, WakeupFlags,
    header::{cpu, protocol, system},
};
use test_helpers::*;

const ALL_MASKED: [u32; 15] = [!0; 15];

fn with_masks(cpu_id: u32, masks: &[u32; 15]) -> Vec<u32> {
    let mut args = vec![cpu_id, 0, 15];
    args.extend_from_slice(masks);
    args
}

fn off() -> PowerState {
    PowerState::new(LocalState::OFF, LocalState::OFF, LocalState::OFF)
}

// ========== Setup Tests ==========

#[test]
fn test_setup_installs_boot_policy() {
    let mut b = Board::new();
    b.ctrl.setup(SEC_ENTRY).unwrap();

    let msgs: Vec<u8> = b.sm_requests().iter().map(|(_, m, _)| *m).collect();
    assert_eq!(
        msgs,
        [
            cpu::RESET_VECTOR_SET,
            cpu::NON_IRQ_WAKE_SET,
            cpu::NON_IRQ_WAKE_SET,
            cpu::PD_LPM_CONFIG_SET,
            cpu::PD_LPM_CONFIG_SET,
            cpu::SLEEP_MODE_SET,
            cpu::SLEEP_MODE_SET,
            cpu::PER_LPM_CONFIG_SET,
        ]
    );
    assert_eq!(
        b.cpu_calls(cpu::RESET_VECTOR_SET),
        [vec![2, VecFlags::BOOT.bits(), SEC_ENTRY as u32, 0]]
    );
    assert_eq!(b.cpu_calls(cpu::NON_IRQ_WAKE_SET), [vec![2, 0, 1, 0b11], vec![6, 0, 1, 0b11]]);
    assert_eq!(
        b.cpu_calls(cpu::PD_LPM_CONFIG_SET),
        [
            vec![6, 3, PWR_MIX_A55P, 1, 1 << PWR_MEM_A55L3, PWR_MIX_NOC, 4, 0, PWR_MIX_WAKEUP, 4, 0],
            vec![2, 1, PWR_MIX_A55C0, 1, 0],
        ]
    );
    assert_eq!(b.cpu_calls(cpu::SLEEP_MODE_SET), [vec![2, 1, 1], vec![6, 1, 1]]);
    assert_eq!(b.cpu_calls(cpu::PER_LPM_CONFIG_SET), [vec![6, 1, PER_LPI_WDOG3, 3]]);
}

#[test]
fn test_only_secondaries_are_boot_pending() {
    let b = Board::ready();
    assert!(!b.ctrl.is_boot_pending(0));
    assert!((1..4).all(|c| b.ctrl.is_boot_pending(c)));
    assert!(!b.ctrl.is_boot_pending(4));
}

#[test]
fn test_setup_stops_at_first_sm_failure() {
    let mut b = Board::new();
    b.scmi.push_reply(Reply::status(0, &[]));
    b.scmi.push_error(ChannelError::Transport);
    let err = b.ctrl.setup(SEC_ENTRY).unwrap_err();
    assert!(matches!(err, PlatError::Scmi(_)));
    assert_eq!(err.psci_status(), PsciStatus::InternalFailure);
    assert_eq!(b.scmi.sent().len(), 2);
}

// ========== Validation Tests ==========

#[test]
fn test_ns_entrypoint_must_be_in_ns_dram() {
    let b = Board::ready();
    assert_eq!(
        b.ctrl.validate_ns_entrypoint(PLAT_NS_IMAGE_BASE - 4),
        Err(PlatError::InvalidArgument)
    );
    assert_eq!(b.ctrl.validate_ns_entrypoint(PLAT_NS_IMAGE_BASE), Ok(()));
}

#[test]
fn test_standby_pins_core_off_cluster_retention() {
    let b = Board::ready();
    let mut req = PowerState::new(LocalState::RET, LocalState::RUN, LocalState::RUN);
    b.ctrl
        .validate_power_state(PsciPowerState::new(0, StateType::Standby, 0).0, &mut req)
        .unwrap();
    assert_eq!(req.core(), LocalState::OFF);
    assert_eq!(req.cluster(), LocalState::RET);
    assert_eq!(req.system(), LocalState::RUN);
    assert!(req.is_consistent());
}

#[test]
fn test_deep_power_down_id_pins_the_same_state() {
    let b = Board::ready();
    let mut req = PowerState::new(LocalState::OFF, LocalState::OFF, LocalState::RUN);
    b.ctrl
        .validate_power_state(PsciPowerState::new(1, StateType::PowerDown, 0x33).0, &mut req)
        .unwrap();
    assert_eq!((req.core(), req.cluster()), (LocalState::OFF, LocalState::RET));
}

#[test]
fn test_other_power_down_keeps_request() {
    let b = Board::ready();
    let mut req = PowerState::new(LocalState::OFF, LocalState::RUN, LocalState::RUN);
    let before = req;
    b.ctrl
        .validate_power_state(PsciPowerState::new(0, StateType::PowerDown, 0x2).0, &mut req)
        .unwrap();
    assert_eq!(req, before);
}

#[test]
fn test_power_level_above_system_is_rejected() {
    let b = Board::ready();
    let mut req = PowerState::RUN;
    let err = b.ctrl.validate_power_state(3 << 24, &mut req).unwrap_err();
    assert_eq!(err.psci_status(), PsciStatus::InvalidParams);
    assert_eq!(req, PowerState::RUN);
}

#[test]
fn test_system_suspend_requests_everything_off() {
    let b = Board::ready();
    let s = b.ctrl.get_sys_suspend_power_state();
    assert!(s.core().is_off() && s.cluster().is_off() && s.system().is_off());
}

// ========== Hotplug Tests ==========

#[test]
fn test_first_power_on_programs_boot_vector() {
    let mut b = Board::ready();
    b.ctrl.domain_on(0x8100_0100).unwrap();

    let msgs: Vec<u8> = b.sm_requests().iter().map(|(_, m, _)| *m).collect();
    assert_eq!(
        msgs,
        [cpu::RESET_VECTOR_SET, cpu::START, cpu::NON_IRQ_WAKE_SET, cpu::PD_LPM_CONFIG_SET]
    );
    assert_eq!(
        b.cpu_calls(cpu::RESET_VECTOR_SET),
        [vec![3, VecFlags::BOOT.bits(), SEC_ENTRY as u32, 0]]
    );
    assert_eq!(b.cpu_calls(cpu::START), [vec![3]]);
    assert_eq!(b.cpu_calls(cpu::PD_LPM_CONFIG_SET), [vec![3, 1, PWR_MIX_A55C1, 1, 0]]);
    assert!(!b.ctrl.is_boot_pending(1));
}

#[test]
fn test_failed_boot_vector_keeps_core_pending() {
    let mut b = Board::ready();
    b.scmi.push_reply(Reply::status(ScmiStatus::Denied as i32 as u32, &[]));
    assert!(b.ctrl.domain_on(0x200).is_err());
    assert!(b.ctrl.is_boot_pending(2));
    assert!(b.cpu_calls(cpu::START).is_empty());
}

#[test]
fn test_out_of_range_core_is_rejected() {
    let mut b = Board::ready();
    assert_eq!(b.ctrl.domain_on(0x400), Err(PlatError::InvalidArgument));
    assert!(b.scmi.sent().is_empty());
}

#[test]
fn test_on_finish_enables_gic_wakeup() {
    let mut b = Board::ready();
    b.cpu.set_core(1);
    b.ctrl.domain_on_finish(&PowerState::RUN).unwrap();

    assert_eq!(
        b.cpu_calls(cpu::SLEEP_MODE_SET),
        [vec![3, WakeupFlags::GIC.bits(), SleepMode::Wait as u32]]
    );
    assert_eq!(b.gic.events(), [GicEvent::PcpuInit(1), GicEvent::CpuifEnable(1)]);
    assert!(b.gic.cpuif_enabled(1));
}

#[test]
fn test_off_masks_every_irq_and_suspends() {
    let mut b = Board::ready();
    b.cpu.set_core(3);
    b.ctrl.domain_off(&off()).unwrap();

    assert_eq!(b.gic.events(), [GicEvent::CpuifDisable(3)]);
    assert_eq!(b.cpu.cluster_pwrdn_writes(), [0]);
    assert_eq!(
        b.cpu_calls(cpu::PD_LPM_CONFIG_SET),
        [vec![5, 1, PWR_MIX_A55C3, LpmSetting::OnRunWaitStop as u32, 0]]
    );
    assert_eq!(b.cpu_calls(cpu::IRQ_WAKE_SET), [with_masks(5, &ALL_MASKED)]);
    assert_eq!(
        b.cpu_calls(cpu::SLEEP_MODE_SET),
        [vec![5, WakeupFlags::GPC.bits(), SleepMode::Suspend as u32]]
    );
}

#[test]
fn test_power_on_after_off_skips_boot_vector() {
    let mut b = Board::ready();
    b.ctrl.domain_on(0x100).unwrap();
    b.cpu.set_core(1);
    b.ctrl.domain_off(&off()).unwrap();
    b.scmi.clear();

    b.ctrl.domain_on(0x100).unwrap();
    assert!(b.cpu_calls(cpu::RESET_VECTOR_SET).is_empty());
    assert_eq!(b.cpu_calls(cpu::START), [vec![3]]);
}

// ========== Suspend Tests ==========

#[test]
fn test_core_suspend_sets_resume_vector() {
    let mut b = Board::ready();
    b.cpu.set_core(2);
    let target = PowerState::new(LocalState::OFF, LocalState::RUN, LocalState::RUN);
    b.ctrl.domain_suspend(&target).unwrap();

    assert_eq!(
        b.sm_requests(),
        [(
            protocol::IMX_CPU,
            cpu::RESET_VECTOR_SET,
            vec![4, VecFlags::RESUME.bits(), SEC_ENTRY as u32, 0]
        )]
    );
    assert!(b.cpu.cluster_pwrdn_writes().is_empty());

    b.ctrl.domain_suspend_finish(&target).unwrap();
    assert_eq!(b.gic.events(), [GicEvent::CpuifDisable(2), GicEvent::CpuifEnable(2)]);
    assert_eq!(b.scmi.sent().len(), 1);
}

#[test]
fn test_cluster_retention_keeps_l3() {
    let mut b = Board::ready();
    let retained = PowerState::new(LocalState::OFF, LocalState::RET, LocalState::RUN);
    b.ctrl.domain_suspend(&retained).unwrap();
    let cluster_off = PowerState::new(LocalState::OFF, LocalState::OFF, LocalState::RUN);
    b.ctrl.domain_suspend(&cluster_off).unwrap();
    assert_eq!(b.cpu.cluster_pwrdn_writes(), [1 << 1, 0]);
}

#[test]
fn test_system_suspend_hands_wakeup_to_gpc() {
    let mut b = Board::ready();
    b.ctrl.domain_suspend(&off()).unwrap();

    assert_eq!(
        b.cpu_calls(cpu::IRQ_WAKE_SET),
        [with_masks(2, &ALL_MASKED), with_masks(6, &ALL_MASKED)]
    );
    assert_eq!(
        b.cpu_calls(cpu::SLEEP_MODE_SET),
        [
            vec![2, WakeupFlags::RESUME_CPU.bits(), SleepMode::Suspend as u32],
            vec![6, WakeupFlags::GPC.bits(), SleepMode::Suspend as u32],
        ]
    );
    // Only the clock-only GPIO ports are held.
    assert_eq!(
        b.cpu_calls(cpu::PER_LPM_CONFIG_SET),
        [vec![6, 6, 1, 3, 2, 3, 3, 3, 4, 3, 5, 3, 6, 3]]
    );
    assert_eq!(
        b.cpu_calls(cpu::PD_LPM_CONFIG_SET),
        [vec![
            6,
            3,
            PWR_MIX_A55P,
            3,
            0,
            PWR_MIX_NOC,
            3,
            1 << PWR_MEM_NOC_OCRAM,
            PWR_MIX_WAKEUP,
            LpmSetting::OnRunWaitStop as u32,
            0,
        ]]
    );
    assert_eq!(b.gic.events()[..2], [GicEvent::CpuifDisable(0), GicEvent::Save]);
}

#[test]
fn test_enabled_wakeup_line_keeps_wakeupmix_on() {
    let mut b = Board::ready();
    b.gic.enable_irq(32 + 42);
    b.ctrl.domain_suspend(&off()).unwrap();

    assert!(b.ctrl.wakeup().has_wakeup_irq());
    let lpm = b.cpu_calls(cpu::PD_LPM_CONFIG_SET);
    assert_eq!(lpm[0][9], LpmSetting::OnAlways as u32);

    let mut expected = ALL_MASKED;
    expected[1] = !(1 << 10);
    assert_eq!(b.cpu_calls(cpu::IRQ_WAKE_SET)[1], with_masks(6, &expected));
    let per = &b.cpu_calls(cpu::PER_LPM_CONFIG_SET)[0];
    assert_eq!(per[..4], [6, 7, PER_LPI_CAN3, 3]);
}

#[test]
fn test_gpio_interrupt_keeps_wakeupmix_on() {
    let mut b = Board::ready();
    let (port, _) = GPIO_PORTS[2];
    b.mmio.set(port + 0x80 + 4 * 5, 0x000a_0000);
    b.ctrl.domain_suspend(&off()).unwrap();

    assert!(b.ctrl.snapshots().gpio_wakeup());
    assert!(!b.ctrl.wakeup().has_wakeup_irq());
    assert_eq!(b.cpu_calls(cpu::PD_LPM_CONFIG_SET)[0][9], LpmSetting::OnAlways as u32);
}

#[test]
fn test_system_resume_restores_lost_context() {
    let mut b = Board::ready();
    let (gpio, _) = GPIO_PORTS[0];
    let icr = gpio + 0x80 + 4 * 3;
    b.mmio.set(gpio + 0xc, 0xffff_0000);
    b.mmio.set(gpio + 0x58, 0x1234);
    b.mmio.set(icr, 0x000a_0000);
    b.mmio.set(XSPI1_BASE + 0x928, 0x55);
    b.mmio.set(WDOG3_BASE, 0x2120);
    b.mmio.set(WDOG3_BASE + 0x8, 0x1000);
    b.mmio.on_write(WDOG3_BASE, |v, regs| regs.set(WDOG3_BASE, v | WDOG_CS_RCS));
    b.gic.set_enable_mask(3, 0xf0);

    b.ctrl.domain_suspend(&off()).unwrap();

    // NOC mix power loss.
    for addr in [gpio + 0xc, gpio + 0x58, icr, XSPI1_BASE + 0x928, WDOG3_BASE, WDOG3_BASE + 0x8] {
        b.mmio.set(addr, 0);
    }
    b.gic.set_enable_mask(3, 0);
    b.scmi.clear();
    b.mmio.clear_log();

    b.ctrl.domain_suspend_finish(&off()).unwrap();

    assert_eq!(b.mmio.get(gpio + 0xc), 0xffff_0000);
    assert_eq!(b.mmio.get(gpio + 0x58), 0x1234);
    assert_eq!(b.mmio.get(icr), 0x000a_0000);
    assert_eq!(b.mmio.get(XSPI1_BASE + 0x928), 0x55);
    assert_eq!(b.mmio.get(WDOG3_BASE + 0x8), 0x1000);
    assert_eq!(b.mmio.writes_to(WDOG3_BASE), [0x2120]);
    // Unchanged watchdogs are not reprogrammed.
    assert!(b.mmio.writes_to(WDOG4_BASE).is_empty());
    assert_eq!(b.gic.enable_mask(3), 0xf0);
    assert!(!b.ctrl.snapshots().gpio_wakeup());
    assert_eq!(*b.ele_opcodes().last().unwrap(), kele::ELE_RELEASE_GMID);

    assert_eq!(b.cpu_calls(cpu::IRQ_WAKE_SET), [with_masks(6, &ALL_MASKED)]);
    assert_eq!(
        b.cpu_calls(cpu::SLEEP_MODE_SET),
        [
            vec![2, (WakeupFlags::GIC | WakeupFlags::RESUME_CPU).bits(), SleepMode::Wait as u32],
            vec![6, WakeupFlags::GIC.bits(), SleepMode::Wait as u32],
        ]
    );
    assert_eq!(
        b.cpu_calls(cpu::PER_LPM_CONFIG_SET),
        [vec![6, 6, 1, 4, 2, 4, 3, 4, 4, 4, 5, 4, 6, 4]]
    );
    assert_eq!(
        b.cpu_calls(cpu::PD_LPM_CONFIG_SET),
        [vec![6, 3, PWR_MIX_A55P, 1, 1 << PWR_MEM_A55L3, PWR_MIX_NOC, 4, 0, PWR_MIX_WAKEUP, 4, 0]]
    );
    assert_eq!(b.gic.events().last(), Some(&GicEvent::CpuifEnable(0)));
}

#[test]
fn test_stuck_watchdog_does_not_skip_later_steps() {
    let mut b = Board::ready();
    b.mmio.set(WDOG3_BASE, 0x2120);
    b.mmio.set(WDOG4_BASE, 0x2120);
    b.mmio.on_write(WDOG4_BASE, |v, regs| regs.set(WDOG4_BASE, v | WDOG_CS_RCS));
    b.ctrl.domain_suspend(&off()).unwrap();
    b.mmio.set(WDOG3_BASE, 0);
    b.mmio.set(WDOG4_BASE, 0);
    b.scmi.clear();

    let err = b.ctrl.domain_suspend_finish(&off()).unwrap_err();
    assert!(matches!(err, PlatError::Timeout(_)));
    assert_eq!(b.mmio.writes_to(WDOG4_BASE), [0x2120]);
    assert_eq!(b.cpu_calls(cpu::PD_LPM_CONFIG_SET).len(), 1);
    assert_eq!(b.gic.events().last(), Some(&GicEvent::CpuifEnable(0)));
}

#[test]
fn test_watchdog_with_new_timeout_is_reprogrammed() {
    let mut b = Board::ready();
    b.mmio.set(WDOG3_BASE, 0x2120);
    b.mmio.set(WDOG3_BASE + 0x8, 0x1000);
    b.mmio.on_write(WDOG3_BASE, |v, regs| regs.set(WDOG3_BASE, v | WDOG_CS_RCS));
    b.ctrl.domain_suspend(&off()).unwrap();
    // Control survives, timeout does not.
    b.mmio.set(WDOG3_BASE + 0x8, 0);

    b.ctrl.domain_suspend_finish(&off()).unwrap();
    assert_eq!(b.mmio.writes_to(WDOG3_BASE), [0x2120]);
    assert_eq!(b.mmio.get(WDOG3_BASE + 0x8), 0x1000);
}

#[test]
fn test_failed_gmid_release_still_restores_everything() {
    let mut b = Board::ready();
    let (gpio, _) = GPIO_PORTS[0];
    b.mmio.set(gpio + 0x58, 0x1234);
    b.mmio.set(XSPI1_BASE + 0x928, 0x55);
    b.ctrl.domain_suspend(&off()).unwrap();
    b.mmio.set(gpio + 0x58, 0);
    b.mmio.set(XSPI1_BASE + 0x928, 0);
    b.scmi.clear();
    b.ele.push_reply(Reply::status(0x29, &[]));

    let err = b.ctrl.domain_suspend_finish(&off()).unwrap_err();
    assert!(matches!(err, PlatError::Ele(_)));
    assert_eq!(b.mmio.get(gpio + 0x58), 0x1234);
    assert_eq!(b.mmio.get(XSPI1_BASE + 0x928), 0x55);
    assert_eq!(
        b.cpu_calls(cpu::PD_LPM_CONFIG_SET),
        [vec![6, 3, PWR_MIX_A55P, 1, 1 << PWR_MEM_A55L3, PWR_MIX_NOC, 4, 0, PWR_MIX_WAKEUP, 4, 0]]
    );
    assert_eq!(b.gic.events().last(), Some(&GicEvent::CpuifEnable(0)));
}

// ========== System Power Tests ==========

#[test]
fn test_reset_quiesces_gic_then_asks_sm() {
    let mut b = Board::ready();
    b.ctrl.request_system_reset().unwrap();
    assert_eq!(b.gic.events(), [GicEvent::DisableGroups]);
    assert_eq!(b.sm_requests(), [(protocol::SYSTEM, system::POWER_STATE_SET, vec![0, 1])]);
}

#[test]
fn test_off_requests_forceful_shutdown() {
    let mut b = Board::ready();
    b.ctrl.request_system_off().unwrap();
    assert_eq!(b.gic.events(), [GicEvent::DisableGroups]);
    assert_eq!(b.sm_requests(), [(protocol::SYSTEM, system::POWER_STATE_SET, vec![0, 0])]);
}

// ========== Entropy Tests ==========

#[test]
fn test_entropy_is_fetched_in_chunks() {
    let mut b = Board::ready();
    let mut buf = [0xaau8; 48];
    b.ctrl.fill_random(&mut buf[..40]).unwrap();

    let rng = b.ele_opcodes().iter().filter(|&&op| op == kele::ELE_GET_RNG).count();
    assert_eq!(rng, 3);
    assert_eq!(buf[4], 1);
    // The last chunk is cut to the 8 bytes still missing.
    assert_eq!(buf[32..40], [0, 0, 0, 0, 1, 0, 0, 0]);
    assert_eq!(buf[40..], [0xaa; 8]);
}

#[test]
fn test_entropy_reports_unready_trng() {
    let mut b = Board::ready();
    b.ele.push_reply(Reply::status(0xd6, &[0x0101]));
    let err = b.ctrl.fill_random(&mut [0u8; 8]).unwrap_err();
    assert!(matches!(err, PlatError::Ele(kele::EleError::NotReady(_))));
}
