//! Subsystem reset sequence.
//!
//! Runs at the top of every supervisory pass, including the first one
//! after bootstrap.  Restores every collaborator to its idle state and
//! re-synchronises the logical position held by the parser and planner
//! with the commanded position, so no move issued after the reset can be
//! planned from a stale origin.
//!
//! The operational state is deliberately left alone: an Alarm survives
//! any number of abort/reset cycles until the command engine clears it.

use log::{debug, info};

use crate::app::events::ResetReport;
use crate::app::ports::{CommChannel, MachinePorts, SpindleChannel};
use crate::config::MachineConfig;
use crate::system::{RealtimeFlags, SystemState};

/// Run one reset pass.  `pass` is the 1-based pass counter, used only for
/// reporting.
pub fn reset_subsystems(
    pass: u32,
    config: &MachineConfig,
    sys: &mut SystemState,
    rt: &RealtimeFlags,
    hw: &mut impl MachinePorts,
) -> ResetReport {
    let discarded_segments = hw.planner_queued();

    // 1. Unread input belongs to the discarded epoch
    hw.comm_reset_read_buffer(CommChannel::Primary);
    if config.comm.secondary_channel {
        hw.comm_reset_read_buffer(CommChannel::Secondary);
    }

    // 2. Parser defaults first: the planner sync below relies on them
    hw.parser_reset();

    // 3-6. Peripherals back to idle
    hw.spindle_reset(SpindleChannel::Primary);
    if config.secondary_spindle {
        hw.spindle_reset(SpindleChannel::Secondary);
    }
    hw.coolant_reset();
    hw.limits_arm();
    hw.probe_reset();

    // 7-8. Motion pipeline
    hw.planner_reset();
    hw.stepper_reset();

    // 9. Logical position := commanded position
    hw.planner_sync_position(&sys.position);
    hw.parser_sync_position(&sys.position);

    // 10. Run flags
    let (discarded_exec, discarded_alarm) = rt.clear_for_reset();
    sys.suspend = false;

    // 11. Default feed rate
    hw.parser_set_feed_rate(config.default_feed_rate);

    // 12. Reset button, re-armed every pass
    hw.arm_reset_button();
    rt.set_reset_button_armed(true);

    if discarded_exec != 0 || discarded_alarm != 0 || discarded_segments != 0 {
        debug!(
            "reset[{}]: discarded exec=0b{:08b} alarm=0b{:08b} segments={}",
            pass, discarded_exec, discarded_alarm, discarded_segments
        );
    }
    info!("reset[{}]: subsystems restored, state={:?}", pass, sys.state);

    ResetReport {
        pass,
        discarded_exec,
        discarded_alarm,
        discarded_segments,
        state: sys.state,
    }
}
