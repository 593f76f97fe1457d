//! Reset pass ordering and post-conditions.

use crate::mock_machine::{Call, MockMachine};

use motionctl::app::ports::{CommChannel, SpindleChannel};
use motionctl::config::MachineConfig;
use motionctl::supervisor::reset_subsystems;
use motionctl::system::{AlarmFlag, ExecFlag, OperationalState, RealtimeFlags, SystemState};

const POS: [f32; 6] = [12.5, -3.0, 40.0, 0.0, 90.0, 0.0];

fn registry_at(pos: [f32; 6]) -> SystemState {
    let mut sys = SystemState::zeroed();
    sys.position = pos;
    sys
}

#[test]
fn full_order_with_secondary_hardware() {
    let rt = RealtimeFlags::new();
    let mut hw = MockMachine::new(&rt);
    let mut sys = registry_at(POS);
    let mut config = MachineConfig::default();
    config.comm.secondary_channel = true;
    config.secondary_spindle = true;
    config.default_feed_rate = 350.0;

    reset_subsystems(1, &config, &mut sys, &rt, &mut hw);

    assert_eq!(
        hw.calls,
        vec![
            Call::CommResetReadBuffer(CommChannel::Primary),
            Call::CommResetReadBuffer(CommChannel::Secondary),
            Call::ParserReset,
            Call::SpindleReset(SpindleChannel::Primary),
            Call::SpindleReset(SpindleChannel::Secondary),
            Call::CoolantReset,
            Call::LimitsArm,
            Call::ProbeReset,
            Call::PlannerReset,
            Call::StepperReset,
            Call::PlannerSync(POS),
            Call::ParserSync(POS),
            Call::ParserSetFeedRate(350.0),
            Call::ArmResetButton,
        ]
    );
}

#[test]
fn parser_reset_precedes_planner_sync() {
    let rt = RealtimeFlags::new();
    let mut hw = MockMachine::new(&rt);
    let mut sys = registry_at(POS);
    reset_subsystems(1, &MachineConfig::default(), &mut sys, &rt, &mut hw);

    let parser_reset = hw.index_of(&Call::ParserReset).expect("parser reset");
    let planner_sync = hw.index_of(&Call::PlannerSync(POS)).expect("planner sync");
    let stepper_reset = hw.index_of(&Call::StepperReset).expect("stepper reset");
    assert!(parser_reset < planner_sync);
    assert!(stepper_reset < planner_sync);
}

#[test]
fn logical_positions_match_commanded() {
    let rt = RealtimeFlags::new();
    let mut hw = MockMachine::new(&rt);
    let mut sys = registry_at(POS);
    reset_subsystems(1, &MachineConfig::default(), &mut sys, &rt, &mut hw);

    assert_eq!(hw.parser_position, Some(POS));
    assert_eq!(hw.planner_position, Some(POS));
    assert_eq!(hw.feed_rate, Some(MachineConfig::default().default_feed_rate));
}

#[test]
fn pending_requests_discarded() {
    let rt = RealtimeFlags::new();
    rt.request_abort();
    rt.set_exec(ExecFlag::CycleStart);
    rt.set_exec(ExecFlag::Reset);
    rt.raise_alarm(AlarmFlag::ProbeFail);

    let mut hw = MockMachine::new(&rt);
    hw.queued = 7;
    let mut sys = registry_at(POS);
    sys.suspend = true;

    let report = reset_subsystems(2, &MachineConfig::default(), &mut sys, &rt, &mut hw);

    assert!(!rt.abort_requested());
    assert_eq!(rt.exec_state(), 0);
    assert_eq!(rt.exec_alarm(), 0);
    assert!(rt.reset_button_armed());
    assert!(!sys.suspend);
    assert_eq!(hw.queued, 0);

    assert_eq!(report.pass, 2);
    assert_eq!(report.discarded_segments, 7);
    assert_eq!(report.discarded_alarm, AlarmFlag::ProbeFail.mask());
    assert_ne!(report.discarded_exec & ExecFlag::CycleStart.mask(), 0);
    assert_ne!(report.discarded_exec & ExecFlag::Reset.mask(), 0);
}

#[test]
fn alarm_and_homing_survive() {
    let rt = RealtimeFlags::new();
    let mut hw = MockMachine::new(&rt);
    let mut sys = registry_at(POS);
    sys.transition(OperationalState::Alarm);
    sys.homing_complete = true;

    let report = reset_subsystems(1, &MachineConfig::default(), &mut sys, &rt, &mut hw);

    assert_eq!(report.state, OperationalState::Alarm);
    assert_eq!(sys.state, OperationalState::Alarm);
    assert!(sys.homing_complete);
    assert_eq!(sys.position, POS);
}

#[test]
fn second_pass_changes_nothing() {
    let rt = RealtimeFlags::new();
    rt.request_abort();
    rt.raise_alarm(AlarmFlag::HardLimit);
    let mut hw = MockMachine::new(&rt);
    let mut sys = registry_at(POS);
    sys.suspend = true;
    let config = MachineConfig::default();

    reset_subsystems(1, &config, &mut sys, &rt, &mut hw);
    let first_calls = hw.take_calls();
    let after_first = (sys.clone(), rt.snapshot(), hw.parser_position, hw.feed_rate);

    let report = reset_subsystems(2, &config, &mut sys, &rt, &mut hw);

    assert_eq!(hw.calls, first_calls);
    assert_eq!(
        (sys, rt.snapshot(), hw.parser_position, hw.feed_rate),
        after_first
    );
    assert_eq!(report.discarded_exec, 0);
    assert_eq!(report.discarded_alarm, 0);
    assert_eq!(report.discarded_segments, 0);
}
