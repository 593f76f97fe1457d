//! Power-up bootstrap against the recording mock.

use crate::mock_machine::{Call, MockMachine};

use motionctl::app::ports::CommChannel;
use motionctl::config::{BootPolicy, MachineConfig};
use motionctl::settings::{Settings, SettingsFlag};
use motionctl::supervisor::bootstrap;
use motionctl::system::{OperationalState, RealtimeFlags, RealtimeSnapshot};

fn homing_settings() -> Settings {
    let mut s = Settings::default();
    s.set_flag(SettingsFlag::HomingEnable, true);
    s
}

fn config_with(boot: BootPolicy) -> MachineConfig {
    MachineConfig {
        boot,
        ..MachineConfig::default()
    }
}

#[test]
fn full_call_order() {
    let rt = RealtimeFlags::new();
    let mut hw = MockMachine::new(&rt);
    let mut config = MachineConfig::default();
    config.comm.baud = 250_000;
    config.comm.secondary_channel = true;

    bootstrap(&config, &rt, &mut hw);

    let armed_abort_only = RealtimeSnapshot {
        abort: true,
        ..RealtimeSnapshot::default()
    };
    assert_eq!(
        hw.calls,
        vec![
            Call::CommInit(CommChannel::Primary, 250_000),
            Call::CommInit(CommChannel::Secondary, 250_000),
            Call::LoadSettings,
            Call::StepperInit,
            Call::IoInit,
            Call::EnableInterrupts(armed_abort_only),
            Call::ArmResetButton,
        ]
    );
}

#[test]
fn stale_flags_cleared_before_interrupts() {
    let rt = RealtimeFlags::new();
    // Garbage left over from before power-up.
    rt.set_exec(motionctl::system::ExecFlag::CycleStart);
    rt.raise_alarm(motionctl::system::AlarmFlag::ProbeFail);
    rt.set_reset_button_armed(true);

    let mut hw = MockMachine::new(&rt);
    bootstrap(&MachineConfig::default(), &rt, &mut hw);

    let seen = hw
        .calls
        .iter()
        .find_map(|c| match c {
            Call::EnableInterrupts(s) => Some(*s),
            _ => None,
        })
        .expect("interrupts enabled");
    assert!(seen.abort);
    assert_eq!(seen.exec_state, 0);
    assert_eq!(seen.exec_alarm, 0);
    assert!(!seen.reset_button_armed);
}

#[test]
fn abort_pending_after_boot() {
    let rt = RealtimeFlags::new();
    let mut hw = MockMachine::new(&rt);
    bootstrap(&MachineConfig::default(), &rt, &mut hw);
    assert!(rt.abort_requested());
    assert!(rt.reset_button_armed());
}

#[test]
fn policies_off_boot_idle() {
    let rt = RealtimeFlags::new();
    let mut hw = MockMachine::new(&rt).with_settings(homing_settings());
    let out = bootstrap(&MachineConfig::default(), &rt, &mut hw);
    assert_eq!(out.sys.state, OperationalState::Idle);
}

#[test]
fn homing_lock_with_homing_enabled_boots_alarm() {
    let rt = RealtimeFlags::new();
    let mut hw = MockMachine::new(&rt).with_settings(homing_settings());
    let config = config_with(BootPolicy {
        homing_init_lock: true,
        force_init_alarm: false,
    });
    let out = bootstrap(&config, &rt, &mut hw);
    assert_eq!(out.sys.state, OperationalState::Alarm);
    assert!(out.settings.homing_enabled());
}

#[test]
fn homing_lock_without_homing_boots_idle() {
    let rt = RealtimeFlags::new();
    let mut hw = MockMachine::new(&rt);
    let config = config_with(BootPolicy {
        homing_init_lock: true,
        force_init_alarm: false,
    });
    let out = bootstrap(&config, &rt, &mut hw);
    assert_eq!(out.sys.state, OperationalState::Idle);
}

#[test]
fn force_alarm_always_boots_alarm() {
    for homing in [false, true] {
        let rt = RealtimeFlags::new();
        let mut settings = Settings::default();
        settings.set_flag(SettingsFlag::HomingEnable, homing);
        let mut hw = MockMachine::new(&rt).with_settings(settings);
        let config = config_with(BootPolicy {
            homing_init_lock: false,
            force_init_alarm: true,
        });
        let out = bootstrap(&config, &rt, &mut hw);
        assert_eq!(out.sys.state, OperationalState::Alarm, "homing={homing}");
    }
}

#[test]
fn registry_seeded_from_config() {
    let rt = RealtimeFlags::new();
    let mut hw = MockMachine::new(&rt);
    let mut config = MachineConfig::default();
    config.home = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let out = bootstrap(&config, &rt, &mut hw);

    assert_eq!(out.sys.position, config.home);
    assert_eq!(out.sys.state_last, OperationalState::Idle);
    assert_eq!(out.sys.soft_limit_trigger, 8);
    assert_eq!(out.sys.hard_limit_trigger, 0);
    assert_eq!(out.sys.sym_homing, 0);
    assert_eq!(out.sys.reset_homing, 0);
    assert_eq!(out.sys.calibration, 0);
    assert!(!out.sys.homing_complete);
    assert!(!out.sys.suspend);
}
