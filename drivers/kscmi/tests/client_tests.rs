//! Unit tests for ScmiClient request marshalling and status mapping

#![cfg(test)]


use kmbox::{ChannelError, mock::Reply};
use kscmi::{
    LpmConfig, LpmSetting, PerLpmConfig, RunMode, ScmiError, ScmiStatus, SleepMode, SysPowerFlags,
    SysPowerState, VecFlags, WakeupFlags,
    header::{self, base, cpu, lmm, power, protocol, system},
};
use test_helpers::*;

// ========== CPU Protocol Tests ==========

#[test]
fn test_reset_vector_splits_address() {
    let (mut scmi, chan) = client();
    scmi.core_set_reset_addr(3, VecFlags::BOOT, 0x1_2345_6780).unwrap();

    let (p, m, args) = only_request(&chan);
    assert_eq!((p, m), (protocol::IMX_CPU, cpu::RESET_VECTOR_SET));
    assert_eq!(args, [3, VecFlags::BOOT.bits(), 0x2345_6780, 0x1]);
}

#[test]
fn test_sleep_mode_carries_flags_and_mode() {
    let (mut scmi, chan) = client();
    scmi.core_set_sleep_mode(6, WakeupFlags::GIC | WakeupFlags::RESUME_CPU, SleepMode::Wait)
        .unwrap();

    let (_, m, args) = only_request(&chan);
    assert_eq!(m, cpu::SLEEP_MODE_SET);
    assert_eq!(args, [6, 0b11, SleepMode::Wait as u32]);
}

#[test]
fn test_irq_wake_set_prefixes_count() {
    let (mut scmi, chan) = client();
    let masks = [0xffff_ffff; 15];
    scmi.core_irq_wake_set(2, 0, &masks).unwrap();

    let (_, m, args) = only_request(&chan);
    assert_eq!(m, cpu::IRQ_WAKE_SET);
    assert_eq!(args.len(), 18);
    assert_eq!(args[..3], [2, 0, 15]);
    assert!(args[3..].iter().all(|&w| w == 0xffff_ffff));
}

#[test]
fn test_lpm_table_is_flattened() {
    let (mut scmi, chan) = client();
    scmi.core_lpm_mode_set(
        6,
        &[
            LpmConfig::new(9, LpmSetting::OnRunWaitStop, 0),
            LpmConfig::new(16, LpmSetting::OnRunWaitStop, 1 << 13),
        ],
    )
    .unwrap();

    let (_, m, args) = only_request(&chan);
    assert_eq!(m, cpu::PD_LPM_CONFIG_SET);
    assert_eq!(args, [6, 2, 9, 3, 0, 16, 3, 1 << 13]);
}

#[test]
fn test_per_lpm_table_is_flattened() {
    let (mut scmi, chan) = client();
    scmi.per_lpm_mode_set(
        6,
        &[
            PerLpmConfig::new(10, LpmSetting::OnRunWaitStop),
            PerLpmConfig::new(11, LpmSetting::OnAlways),
        ],
    )
    .unwrap();

    let (_, m, args) = only_request(&chan);
    assert_eq!(m, cpu::PER_LPM_CONFIG_SET);
    assert_eq!(args, [6, 2, 10, 3, 11, 4]);
}

#[test]
fn test_oversized_table_rejected_locally() {
    let (mut scmi, chan) = client();
    let cfgs = [LpmConfig::new(0, LpmSetting::OnRun, 0); 9];

    let err = scmi.core_lpm_mode_set(2, &cfgs).unwrap_err();

    assert_eq!(err, ScmiError::Status(ScmiStatus::InvalidParameters));
    assert!(chan.sent().is_empty());
}

#[test]
fn test_info_get_decodes_vector() {
    let (mut scmi, chan) = client();
    chan.push_reply(Reply::status(0, &[RunMode::Sleep as u32, 1, 0x8000_0000, 0x1]));

    let info = scmi.core_info_get(1).unwrap();

    assert_eq!(info.run_mode(), Some(RunMode::Sleep));
    assert_eq!(info.sleep_mode, 1);
    assert_eq!(info.reset_vector, 0x1_8000_0000);
}

// ========== Base / Power / System Tests ==========

#[test]
fn test_discover_agent_name() {
    let (mut scmi, chan) = client();
    let name = u32::from_le_bytes(*b"M71\0");
    chan.push_reply(Reply::status(0, &[5, name, 0, 0, 0]));

    let agent = scmi.base_discover_agent(5).unwrap();

    assert_eq!(agent.agent_id, 5);
    assert_eq!(agent.name(), "M71");
    let (p, m, args) = only_request(&chan);
    assert_eq!((p, m, args), (protocol::BASE, base::DISCOVER_AGENT, vec![5]));
}

#[test]
fn test_base_attributes() {
    let (mut scmi, chan) = client();
    chan.push_reply(Reply::status(0, &[0x0a07]));

    let attr = scmi.base_protocol_attributes().unwrap();

    assert_eq!(attr.num_protocols, 7);
    assert_eq!(attr.num_agents, 10);
}

#[test]
fn test_power_state_set_argument_order() {
    let (mut scmi, chan) = client();
    scmi.pwr_state_set(4, 0, 0x4000_0000).unwrap();

    let (p, m, args) = only_request(&chan);
    assert_eq!((p, m), (protocol::POWER, power::STATE_SET));
    assert_eq!(args, [0, 4, 0x4000_0000]);
}

#[test]
fn test_system_reset_request() {
    let (mut scmi, chan) = client();
    scmi.sys_pwr_state_set(SysPowerFlags::FORCEFUL, SysPowerState::ColdReset).unwrap();

    let (p, m, args) = only_request(&chan);
    assert_eq!((p, m), (protocol::SYSTEM, system::POWER_STATE_SET));
    assert_eq!(args, [0, 1]);
}

#[test]
fn test_lmm_attributes_mask_count() {
    let (mut scmi, chan) = client();
    chan.push_reply(Reply::status(0, &[0xffff_ff03]));

    assert_eq!(scmi.lmm_protocol_attributes().unwrap(), 3);
    let (p, m, _) = only_request(&chan);
    assert_eq!((p, m), (protocol::IMX_LMM, lmm::PROTOCOL_ATTRIBUTES));
}

// ========== Error Mapping Tests ==========

#[test]
fn test_negative_status_is_propagated() {
    let (mut scmi, chan) = client();
    chan.push_reply(Reply::status(ScmiStatus::Denied as i32 as u32, &[]));

    let err = scmi.core_start(2).unwrap_err();

    assert_eq!(err, ScmiError::Status(ScmiStatus::Denied));
    assert_eq!(err.code(), -3);
}

#[test]
fn test_unknown_status_maps_to_generic() {
    let (mut scmi, chan) = client();
    chan.push_reply(Reply::status(-42i32 as u32, &[]));

    assert_eq!(
        scmi.core_stop(2).unwrap_err(),
        ScmiError::Status(ScmiStatus::GenericError)
    );
}

#[test]
fn test_mismatched_header_is_rejected() {
    let (mut scmi, chan) = client();
    chan.push_reply(Reply {
        header: Some(header::pack(protocol::IMX_CPU, cpu::STOP, 0)),
        status: 0,
        payload: vec![],
    });

    assert_eq!(scmi.core_start(2).unwrap_err(), ScmiError::BadResponse);
}

#[test]
fn test_short_reply_is_rejected() {
    let (mut scmi, chan) = client();
    chan.push_reply(Reply::status(0, &[1, 2]));

    assert_eq!(scmi.core_info_get(1).unwrap_err(), ScmiError::BadResponse);
}

#[test]
fn test_channel_failure_is_not_retried() {
    let (mut scmi, chan) = client();
    chan.push_error(ChannelError::Transport);

    let err = scmi.core_start(4).unwrap_err();

    assert_eq!(err, ScmiError::Channel(ChannelError::Transport));
    assert_eq!(err.code(), ScmiStatus::CommsError as i32);
    assert_eq!(chan.sent().len(), 1);
}

#[test]
fn test_tokens_advance_per_request() {
    let (mut scmi, chan) = client();
    scmi.core_start(2).unwrap();
    scmi.core_start(3).unwrap();

    let sent = chan.sent();
    assert_eq!(header::token(sent[0].opcode), 0);
    assert_eq!(header::token(sent[1].opcode), 1);
}
