//! End-to-end supervisory loop: boot, reset, dispatch, abort, reset again.

use std::time::Duration;

use embedded_hal::digital::OutputPin;

use crate::mock_machine::{Action, MockMachine, ScriptedEngine, VecSink};

use motionctl::adapters::machine::SimMachine;
use motionctl::adapters::planner::Segment;
use motionctl::adapters::protocol::LineProtocol;
use motionctl::adapters::serial::{RxChannel, SerialRx};
use motionctl::app::events::{ResetReport, SupervisorEvent};
use motionctl::config::{BootPolicy, MachineConfig};
use motionctl::drivers::reset_button::reset_button_isr;
use motionctl::settings::SettingsFlag;
use motionctl::supervisor::{Phase, Supervisor};
use motionctl::system::{AlarmFlag, ExecFlag, OperationalState, RealtimeFlags};

fn force_alarm_config() -> MachineConfig {
    MachineConfig {
        boot: BootPolicy {
            homing_init_lock: false,
            force_init_alarm: true,
        },
        ..MachineConfig::default()
    }
}

fn send(rx: &RxChannel, rt: &RealtimeFlags, text: &str) {
    let port = SerialRx::new(rx);
    for b in text.bytes() {
        assert!(port.feed_byte(b, rt), "rx channel full");
    }
}

fn reset_reports(events: &[SupervisorEvent]) -> Vec<ResetReport> {
    events
        .iter()
        .filter_map(|e| match e {
            SupervisorEvent::ResetComplete(r) => Some(*r),
            _ => None,
        })
        .collect()
}

// ── Mocked collaborators ──────────────────────────────────────

#[test]
fn idle_boot_reaches_dispatcher() {
    let rt = RealtimeFlags::new();
    let mut sink = VecSink::default();
    let mut sup = Supervisor::boot(
        MachineConfig::default(),
        &rt,
        MockMachine::new(&rt),
        ScriptedEngine::new(vec![]),
        &mut sink,
    );
    assert_eq!(sup.phase(), Phase::Resetting);

    assert_eq!(sup.step(&mut sink), Phase::Dispatching);
    assert_eq!(sup.step(&mut sink), Phase::Resetting);

    assert_eq!(
        sink.events[0],
        SupervisorEvent::Booted {
            state: OperationalState::Idle
        }
    );
    assert_eq!(
        sink.events[2],
        SupervisorEvent::Dispatching {
            pass: 1,
            state: OperationalState::Idle
        }
    );
    assert_eq!(sup.engine().runs, 1);
}

#[test]
fn engine_never_sees_pending_abort() {
    let rt = RealtimeFlags::new();
    let mut sink = VecSink::default();
    let mut sup = Supervisor::boot(
        MachineConfig::default(),
        &rt,
        MockMachine::new(&rt),
        ScriptedEngine::new(vec![]),
        &mut sink,
    );
    // Boot leaves abort set; the first reset must clear it.
    assert!(sup.rt().abort_requested());
    for _ in 0..3 {
        sup.step(&mut sink);
        assert_eq!(sup.phase(), Phase::Dispatching);
        assert!(!sup.rt().abort_requested());
        sup.step(&mut sink);
        assert!(sup.rt().abort_requested());
    }
    assert_eq!(sup.passes(), 3);
}

#[test]
fn queued_motion_never_survives_reset() {
    let rt = RealtimeFlags::new();
    let mut sink = VecSink::default();
    let mut sup = Supervisor::boot(
        MachineConfig::default(),
        &rt,
        MockMachine::new(&rt),
        ScriptedEngine::new(vec![Action::QueueThenReset(5), Action::QueueThenReset(2)]),
        &mut sink,
    );
    for _ in 0..5 {
        sup.step(&mut sink);
    }

    let reports = reset_reports(&sink.events);
    let discarded: Vec<usize> = reports.iter().map(|r| r.discarded_segments).collect();
    assert_eq!(discarded, [0, 5, 2]);
    assert_eq!(sup.hw().queued, 0);
    assert!(!sup.system().suspend);
    assert_ne!(reports[1].discarded_exec & ExecFlag::FeedHold.mask(), 0);
}

#[test]
fn fault_alarm_persists_through_reset() {
    let rt = RealtimeFlags::new();
    let mut sink = VecSink::default();
    let mut sup = Supervisor::boot(
        MachineConfig::default(),
        &rt,
        MockMachine::new(&rt),
        ScriptedEngine::new(vec![Action::Fault(AlarmFlag::HardLimit)]),
        &mut sink,
    );
    for _ in 0..3 {
        sup.step(&mut sink);
    }
    let reports = reset_reports(&sink.events);
    assert_eq!(reports[1].discarded_alarm, AlarmFlag::HardLimit.mask());
    assert_eq!(reports[1].state, OperationalState::Alarm);
    assert_eq!(sup.state(), OperationalState::Alarm);
    assert_eq!(sup.rt().exec_alarm(), 0);
}

#[test]
fn silent_engine_return_is_forced_into_reset() {
    let rt = RealtimeFlags::new();
    let mut sink = VecSink::default();
    let mut sup = Supervisor::boot(
        MachineConfig::default(),
        &rt,
        MockMachine::new(&rt),
        ScriptedEngine::new(vec![Action::ReturnSilently]),
        &mut sink,
    );
    sup.step(&mut sink);
    assert_eq!(sup.step(&mut sink), Phase::Resetting);

    let exit = sink.events.iter().find_map(|e| match e {
        SupervisorEvent::Aborted(exit) => Some(*exit),
        _ => None,
    });
    assert!(exit.is_some_and(|x| x.forced));
    assert!(sup.rt().abort_requested());
}

#[test]
fn reset_button_fires_once_per_pass() {
    let rt = RealtimeFlags::new();
    let mut sink = VecSink::default();
    let mut sup = Supervisor::boot(
        MachineConfig::default(),
        &rt,
        MockMachine::new(&rt),
        ScriptedEngine::new(vec![Action::ReturnSilently]),
        &mut sink,
    );
    sup.step(&mut sink);

    assert!(reset_button_isr(sup.rt()));
    assert!(sup.rt().abort_requested());
    // Bounce: the second edge lands on a disarmed button.
    assert!(!reset_button_isr(sup.rt()));

    sup.step(&mut sink);
    sup.step(&mut sink);
    assert!(sup.rt().reset_button_armed());
    assert!(reset_button_isr(sup.rt()));
}

// ── Simulated machine and line protocol ───────────────────────

#[test]
fn forced_alarm_locks_motion_until_unlocked() {
    let rt = RealtimeFlags::new();
    let rx = RxChannel::new();
    let config = force_alarm_config();
    let engine = LineProtocol::new(&config)
        .with_idle_limit(3)
        .with_poll_interval(Duration::ZERO);
    let mut sink = VecSink::default();
    let mut sup = Supervisor::boot(config, &rt, SimMachine::new(&rx), engine, &mut sink);
    assert_eq!(sup.state(), OperationalState::Alarm);

    sup.step(&mut sink);
    assert_eq!(sup.state(), OperationalState::Alarm);

    send(&rx, &rt, "G0 X1\n$X\nG0 X1\n");
    sup.step(&mut sink);

    let out: Vec<&str> = sup.hw().serial.responses().collect();
    let locked = out.iter().position(|l| *l == "error:9").expect("motion rejected");
    let unlocked = out
        .iter()
        .position(|l| *l == "[MSG:Caution: Unlocked]")
        .expect("unlocked");
    assert!(locked < unlocked);
    assert_eq!(out.last(), Some(&"ok"));
    assert_eq!(sup.state(), OperationalState::Idle);
    assert_eq!(sup.system().position[0], 1.0);

    // Next pass keeps the unlocked state.
    sup.step(&mut sink);
    assert_eq!(sup.state(), OperationalState::Idle);
}

#[test]
fn alarm_accepts_settings_but_not_motion() {
    let rt = RealtimeFlags::new();
    let rx = RxChannel::new();
    let config = force_alarm_config();
    let engine = LineProtocol::new(&config)
        .with_idle_limit(3)
        .with_poll_interval(Duration::ZERO);
    let mut sink = VecSink::default();
    let mut sup = Supervisor::boot(config, &rt, SimMachine::new(&rx), engine, &mut sink);
    sup.step(&mut sink);

    send(&rx, &rt, "$20=1\nG0 X1\n");
    sup.step(&mut sink);

    let out: Vec<&str> = sup.hw().serial.responses().collect();
    let stored = out.iter().position(|l| *l == "ok").expect("setting accepted");
    let locked = out.iter().position(|l| *l == "error:9").expect("motion rejected");
    assert!(stored < locked);
    assert_eq!(sup.state(), OperationalState::Alarm);
    assert_eq!(sup.system().position, MachineConfig::default().home);

    let settings = sup.hw().settings_store.read_settings().expect("stored image");
    assert!(settings.has_flag(SettingsFlag::SoftLimitEnable));
}

#[test]
fn held_reset_button_triggers_one_reset() {
    let rt = RealtimeFlags::new();
    let rx = RxChannel::new();
    let config = MachineConfig::default();
    let engine = LineProtocol::new(&config)
        .with_idle_limit(64)
        .with_poll_interval(Duration::ZERO);
    let mut sink = VecSink::default();
    let mut sup = Supervisor::boot(config, &rt, SimMachine::new(&rx), engine, &mut sink);
    sup.step(&mut sink);
    assert!(sup.rt().reset_button_armed());

    let pressed = sup.hw_mut().reset_button.pin_mut().set_low();
    assert!(pressed.is_ok());
    sup.step(&mut sink);
    assert!(!sup.rt().reset_button_armed());

    sup.step(&mut sink);
    let reports = reset_reports(&sink.events);
    assert_ne!(reports[1].discarded_exec & ExecFlag::Reset.mask(), 0);
    assert!(sup.rt().reset_button_armed());

    // Still held: the next dispatch ends on the idle limit instead.
    sup.step(&mut sink);
    assert!(sup.rt().reset_button_armed());
    assert_eq!(sup.passes(), 2);
}

#[test]
fn input_sent_before_reset_is_discarded() {
    let rt = RealtimeFlags::new();
    let rx = RxChannel::new();
    let config = MachineConfig::default();
    let engine = LineProtocol::new(&config)
        .with_idle_limit(2)
        .with_poll_interval(Duration::ZERO);
    let mut sink = VecSink::default();
    let mut sup = Supervisor::boot(config, &rt, SimMachine::new(&rx), engine, &mut sink);

    send(&rx, &rt, "G0 X5\n");
    sup.step(&mut sink);
    sup.step(&mut sink);

    assert!(!sup.hw().serial.responses().any(|l| l == "ok"));
    assert_eq!(sup.system().position, MachineConfig::default().home);
}

#[test]
fn sim_planner_flushed_and_resynced() {
    let rt = RealtimeFlags::new();
    let rx = RxChannel::new();
    let config = MachineConfig::default();
    let home = config.home;
    let engine = LineProtocol::new(&config)
        .with_idle_limit(1)
        .with_poll_interval(Duration::ZERO);
    let mut sink = VecSink::default();
    let mut sup = Supervisor::boot(config, &rt, SimMachine::new(&rx), engine, &mut sink);
    sup.step(&mut sink);

    for x in [10.0, 20.0, 30.0] {
        let mut target = home;
        target[0] = x;
        let pushed = sup.hw_mut().planner.push(Segment {
            target,
            feed_rate: 100.0,
            rapid: false,
        });
        assert!(pushed.is_ok());
    }
    rt.request_abort();
    sup.step(&mut sink);
    sup.step(&mut sink);

    let reports = reset_reports(&sink.events);
    assert_eq!(reports[1].discarded_segments, 3);
    assert_eq!(sup.hw().planner.queued(), 0);
    assert_eq!(sup.hw().planner.position(), &home);
    assert_eq!(sup.hw().parser.position(), &home);
}
