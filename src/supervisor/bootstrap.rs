//! One-shot power-up bootstrap.
//!
//! Brings communication, settings, the pulse timer, and the I/O pins into
//! a defined state, zeroes the registry, forces an abort so nothing
//! executes before the first reset pass, and only then enables
//! interrupts.  The order is fixed:
//!
//! 1. comm init (primary, optional secondary)
//! 2. settings load
//! 3. stepper init (needs settings)
//! 4. pin / pin-change interrupt init
//! 5. zero registry
//! 6. abort = true
//! 7. enable interrupts
//! 8. boot policy
//! 9. seed counters, position, reset button

use log::{debug, info, warn};

use crate::app::ports::{CommChannel, CommPort, InterruptPort, IoPort, SettingsPort, StepperPort};
use crate::config::{BootPolicy, MachineConfig};
use crate::settings::Settings;
use crate::system::{OperationalState, RealtimeFlags, SOFT_LIMIT_TRIGGER_DEFAULT, SystemState};

/// Registry and settings produced by bootstrap.
#[derive(Debug, Clone)]
pub struct BootOutcome {
    pub sys: SystemState,
    pub settings: Settings,
}

/// Run the power-up sequence.  Call exactly once per power cycle.
pub fn bootstrap(
    config: &MachineConfig,
    rt: &RealtimeFlags,
    hw: &mut (impl CommPort + SettingsPort + StepperPort + IoPort + InterruptPort),
) -> BootOutcome {
    info!("bootstrap: starting");

    // 1. Communication
    hw.comm_init(CommChannel::Primary, config.comm.baud);
    if config.comm.secondary_channel {
        hw.comm_init(CommChannel::Secondary, config.comm.baud);
    }
    debug!("bootstrap: comm up at {} baud", config.comm.baud);

    // 2-3. Settings, then the pulse timer that depends on them
    let settings = hw.load_settings();
    hw.stepper_init(&settings);

    // 4. Pins and pin-change sources
    hw.io_init();

    // 5-6. Registry cleared, abort forced before anything can run
    let mut sys = SystemState::zeroed();
    rt.zero();
    rt.request_abort();

    // 7. Interrupt handlers may now observe the registry
    hw.enable_interrupts();
    debug!("bootstrap: interrupts enabled");

    // 8. Power-up safety policy
    apply_boot_policy(config.boot, &settings, &mut sys);

    // 9. Defaults that live outside the reset pass
    sys.state_last = OperationalState::Idle;
    sys.sym_homing = 0;
    sys.reset_homing = 0;
    sys.calibration = 0;
    sys.soft_limit_trigger = SOFT_LIMIT_TRIGGER_DEFAULT;
    sys.hard_limit_trigger = 0;
    sys.position = config.home;
    sys.homing_complete = false;

    hw.arm_reset_button();
    rt.set_reset_button_armed(true);

    info!("bootstrap: complete, state={:?}", sys.state);
    BootOutcome { sys, settings }
}

/// Force Alarm at power-up where the policy requires it.
///
/// Alarm locks out every motion command (including startup blocks) but
/// still allows settings access and `$X` / `$H`.
pub fn apply_boot_policy(policy: BootPolicy, settings: &Settings, sys: &mut SystemState) {
    if policy.homing_init_lock && settings.homing_enabled() {
        warn!("bootstrap: homing enabled, locking until homed");
        sys.state = OperationalState::Alarm;
    }
    if policy.force_init_alarm {
        warn!("bootstrap: forced alarm on power-up");
        sys.state = OperationalState::Alarm;
    }
}
