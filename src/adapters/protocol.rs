//! Reference command engine.
//!
//! Streams lines from the primary serial channel, answers each with `ok`
//! or `error:<code>`, executes queued motion, and services the realtime
//! execution requests raised by interrupt handlers.  Returns only once
//! abort has been requested.
//!
//! | Input    | Effect                                                  |
//! |----------|---------------------------------------------------------|
//! | `$`      | help                                                    |
//! | `$$`     | dump settings                                           |
//! | `$X`     | unlock Alarm                                            |
//! | `$H`     | homing cycle, sets `homing_complete`                    |
//! | `$C`     | toggle check mode (leaving it resets)                   |
//! | `$N=v`   | store setting `N` (allowed in Alarm, used from next boot) |
//! | G-code   | parsed and queued; rejected with `error:9` in Alarm     |
//!
//! The reset button and limit switches are polled once per loop turn.

use std::fmt::Write as _;
use std::time::Duration;

use log::{debug, info, warn};

use crate::adapters::machine::SimMachine;
use crate::adapters::parser::MotionMode;
use crate::adapters::planner::Segment;
use crate::adapters::serial::RxLine;
use crate::adapters::stepper::StepError;
use crate::app::ports::{DispatchContext, ProtocolEngine};
use crate::config::MachineConfig;
use crate::error::SettingsError;
use crate::settings::{Settings, SettingsFlag};
use crate::system::{AlarmFlag, AxisVector, ExecFlag, OperationalState, SystemState};

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

const STATUS_BAD_NUMBER_FORMAT: u8 = 2;
const STATUS_INVALID_STATEMENT: u8 = 3;
const STATUS_INVALID_VALUE: u8 = 4;
const STATUS_SETTING_DISABLED: u8 = 5;
const STATUS_SETTING_STORE_FAILED: u8 = 7;
const STATUS_IDLE_ERROR: u8 = 8;
const STATUS_ALARM_LOCK: u8 = 9;
const STATUS_OVERFLOW: u8 = 11;
const STATUS_TRAVEL_EXCEEDED: u8 = 15;

pub struct LineProtocol {
    home: AxisVector,
    /// Consecutive empty polls after which a reset is requested.
    idle_poll_limit: Option<u32>,
    idle_polls: u32,
    poll_interval: Duration,
}

impl LineProtocol {
    pub fn new(config: &MachineConfig) -> Self {
        Self {
            home: config.home,
            idle_poll_limit: None,
            idle_polls: 0,
            poll_interval: Duration::from_millis(1),
        }
    }

    /// Request a reset after `polls` consecutive polls find no input and
    /// no motion.  Used when the input stream is finite.
    pub fn with_idle_limit(mut self, polls: u32) -> Self {
        self.idle_poll_limit = Some(polls);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    // ── Realtime ───────────────────────────────────────────────

    /// Poll the inputs, then service realtime requests.  Returns `true`
    /// once the engine must return.
    fn service(&mut self, ctx: &mut DispatchContext<'_>, hw: &mut SimMachine<'_>) -> bool {
        hw.poll_inputs(ctx.rt, ctx.settings);
        self.execute_realtime(ctx, hw)
    }

    /// Service pending realtime requests.  Returns `true` once abort is
    /// requested and the engine must return.
    fn execute_realtime(&mut self, ctx: &mut DispatchContext<'_>, hw: &mut SimMachine<'_>) -> bool {
        if ctx.rt.abort_requested() {
            return true;
        }

        let alarm = ctx.rt.exec_alarm();
        if alarm != 0 && ctx.sys.state != OperationalState::Alarm {
            ctx.sys.transition(OperationalState::Alarm);
            for flag in AlarmFlag::ALL.into_iter().filter(|f| alarm & f.mask() != 0) {
                hw.serial.write_line(&format!("ALARM:{flag}"));
            }
        }

        let pending = ctx.rt.exec_state();
        if pending == 0 {
            return false;
        }
        // Reset is left pending so the reset pass can report it.
        if pending & ExecFlag::Reset.mask() != 0 {
            self.reset_requested(ctx, hw);
            return true;
        }
        let exec = ctx.rt.take_exec();
        if exec & ExecFlag::Reset.mask() != 0 {
            self.reset_requested(ctx, hw);
            return true;
        }

        if exec & ExecFlag::StatusReport.mask() != 0 {
            let report = status_report(ctx.sys, hw.parser.feed_rate());
            hw.serial.write_line(&report);
        }
        if exec & ExecFlag::MotionCancel.mask() != 0 {
            self.cancel_motion(ctx.sys, hw);
        }
        if exec & ExecFlag::SafetyDoor.mask() != 0 && ctx.sys.state != OperationalState::Alarm {
            ctx.sys.transition(OperationalState::SafetyDoor);
            ctx.sys.suspend = true;
        }
        if exec & ExecFlag::FeedHold.mask() != 0 && ctx.sys.state == OperationalState::Run {
            ctx.sys.transition(OperationalState::Hold);
            ctx.sys.suspend = true;
        }
        if exec & ExecFlag::CycleStart.mask() != 0 {
            self.cycle_start(ctx.sys, hw);
        }
        false
    }

    fn reset_requested(&mut self, ctx: &mut DispatchContext<'_>, hw: &mut SimMachine<'_>) {
        if matches!(
            ctx.sys.state,
            OperationalState::Run | OperationalState::Hold | OperationalState::Homing
        ) {
            // Position is lost when motion is cut mid-cycle.
            warn!("protocol: reset during motion");
            ctx.sys.transition(OperationalState::Alarm);
            hw.serial
                .write_line(&format!("ALARM:{}", AlarmFlag::AbortCycle));
        }
        info!("protocol: reset requested");
        ctx.rt.request_abort();
    }

    fn cycle_start(&mut self, sys: &mut SystemState, hw: &SimMachine<'_>) {
        match sys.state {
            OperationalState::Hold | OperationalState::SafetyDoor => {
                sys.suspend = false;
                let next = if hw.planner.queued() > 0 {
                    OperationalState::Run
                } else {
                    OperationalState::Idle
                };
                sys.transition(next);
            }
            OperationalState::Idle if hw.planner.queued() > 0 => {
                sys.transition(OperationalState::Run);
            }
            _ => {}
        }
    }

    fn cancel_motion(&mut self, sys: &mut SystemState, hw: &mut SimMachine<'_>) {
        if !matches!(sys.state, OperationalState::Run | OperationalState::Hold) {
            return;
        }
        debug!("protocol: motion cancel, dropping {} segment(s)", hw.planner.queued());
        hw.planner.reset();
        hw.planner.sync_position(&sys.position);
        hw.parser.sync_position(&sys.position);
        sys.suspend = false;
        sys.transition(OperationalState::Idle);
    }

    // ── Motion ─────────────────────────────────────────────────

    /// Execute one queued segment if the state allows it.  Returns `true`
    /// if a segment ran.
    fn step_motion(&mut self, ctx: &mut DispatchContext<'_>, hw: &mut SimMachine<'_>) -> bool {
        let ready = match ctx.sys.state {
            OperationalState::Run => true,
            OperationalState::Idle => ctx.settings.has_flag(SettingsFlag::AutoStart),
            _ => false,
        };
        if !ready {
            return false;
        }
        let Some(segment) = hw.planner.pop() else {
            if ctx.sys.state == OperationalState::Run {
                ctx.sys.transition(OperationalState::Idle);
            }
            return false;
        };

        ctx.sys.transition(OperationalState::Run);
        match hw.stepper.execute(&ctx.sys.position, &segment.target) {
            Ok(pulses) => debug!("protocol: segment done, {} pulse(s)", pulses),
            Err(StepError::TooLong) => {
                warn!("protocol: segment over the step limit, aborting cycle");
                ctx.rt.raise_alarm(AlarmFlag::AbortCycle);
                return true;
            }
            Err(StepError::Pin(e)) => match e {},
        }
        ctx.sys.position = segment.target;
        if hw.planner.queued() == 0 {
            ctx.sys.transition(OperationalState::Idle);
        }
        true
    }

    /// Count an empty poll.  Raises the reset request when the idle limit
    /// is reached.
    fn idle(&mut self, ctx: &mut DispatchContext<'_>) {
        self.idle_polls = self.idle_polls.saturating_add(1);
        if self.idle_poll_limit.is_some_and(|limit| self.idle_polls >= limit) {
            info!("protocol: input idle for {} polls, requesting reset", self.idle_polls);
            self.idle_polls = 0;
            ctx.rt.set_exec(ExecFlag::Reset);
            return;
        }
        if !self.poll_interval.is_zero() {
            std::thread::sleep(self.poll_interval);
        }
    }

    // ── Lines ──────────────────────────────────────────────────

    fn execute_line(&mut self, line: &str, ctx: &mut DispatchContext<'_>, hw: &mut SimMachine<'_>) {
        let line = line.trim();
        if let Some(cmd) = line.strip_prefix('$') {
            self.execute_system(cmd, ctx, hw);
            return;
        }
        if ctx.sys.state.is_motion_locked() {
            respond_error(hw, STATUS_ALARM_LOCK);
            return;
        }

        let before = hw.parser.clone();
        let block = match hw.parser.parse_motion(line) {
            Ok(Some(block)) => block,
            Ok(None) => {
                respond_ok(hw);
                return;
            }
            Err(e) => {
                debug!("protocol: '{}' rejected: {}", line, e);
                respond_error(hw, e.code());
                return;
            }
        };

        // Refuse the whole line, modal words included.
        if hw.stepper.block_steps(before.position(), &block.target).is_none() {
            debug!("protocol: '{}' rejected: over the step limit", line);
            hw.parser = before;
            respond_error(hw, STATUS_TRAVEL_EXCEEDED);
            return;
        }
        if ctx.settings.has_flag(SettingsFlag::SoftLimitEnable)
            && exceeds_travel(ctx.settings, &block.target)
        {
            warn!("protocol: target outside travel");
            ctx.rt.raise_alarm(AlarmFlag::SoftLimit);
            return;
        }
        if ctx.sys.state == OperationalState::CheckMode {
            respond_ok(hw);
            return;
        }

        let segment = Segment {
            target: block.target,
            feed_rate: block.feed_rate,
            rapid: block.motion == MotionMode::Rapid,
        };
        // Planner full: execute until a slot opens, like a blocking write.
        while hw.planner.is_full() {
            if self.service(ctx, hw) {
                return;
            }
            if !self.step_motion(ctx, hw) {
                self.idle(ctx);
            }
        }
        if hw.planner.push(segment).is_err() {
            warn!("protocol: planner rejected segment");
        }
        respond_ok(hw);
    }

    fn execute_system(&mut self, cmd: &str, ctx: &mut DispatchContext<'_>, hw: &mut SimMachine<'_>) {
        if let Some((id, value)) = cmd.split_once('=') {
            self.write_setting(id, value, ctx, hw);
            return;
        }
        match cmd.trim().to_ascii_uppercase().as_str() {
            "" => {
                hw.serial.write_line("[HLP:$$ $X $H $C $N=v]");
                respond_ok(hw);
            }
            "$" => {
                dump_settings(ctx.settings, hw);
                respond_ok(hw);
            }
            "X" => {
                if ctx.sys.state == OperationalState::Alarm {
                    hw.serial.write_line("[MSG:Caution: Unlocked]");
                    ctx.sys.transition(OperationalState::Idle);
                }
                respond_ok(hw);
            }
            "H" => self.home(ctx, hw),
            "C" => match ctx.sys.state {
                OperationalState::CheckMode => {
                    // Parser position ran ahead of the machine; resync by reset.
                    ctx.sys.transition(OperationalState::Idle);
                    hw.serial.write_line("[MSG:Disabled]");
                    ctx.rt.set_exec(ExecFlag::Reset);
                }
                OperationalState::Idle => {
                    ctx.sys.transition(OperationalState::CheckMode);
                    hw.serial.write_line("[MSG:Enabled]");
                    respond_ok(hw);
                }
                _ => respond_error(hw, STATUS_IDLE_ERROR),
            },
            _ => respond_error(hw, STATUS_INVALID_STATEMENT),
        }
    }

    /// `$<id>=<value>`.  The running settings are left alone; the new
    /// value is stored and takes effect from the next boot.
    fn write_setting(
        &mut self,
        id: &str,
        value: &str,
        ctx: &mut DispatchContext<'_>,
        hw: &mut SimMachine<'_>,
    ) {
        if !matches!(
            ctx.sys.state,
            OperationalState::Idle | OperationalState::Alarm | OperationalState::CheckMode
        ) {
            respond_error(hw, STATUS_IDLE_ERROR);
            return;
        }
        let Ok(id) = id.trim().parse::<u16>() else {
            respond_error(hw, STATUS_INVALID_STATEMENT);
            return;
        };
        let value = match value.trim().parse::<f32>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                respond_error(hw, STATUS_BAD_NUMBER_FORMAT);
                return;
            }
        };

        // Start from what is stored so consecutive writes accumulate.
        let mut updated = hw
            .settings_store
            .read_settings()
            .unwrap_or_else(|_| ctx.settings.clone());
        match updated.set_by_id(id, value) {
            Ok(()) => {}
            Err(SettingsError::UnknownId(_)) => {
                respond_error(hw, STATUS_INVALID_STATEMENT);
                return;
            }
            Err(e) => {
                debug!("protocol: ${}={} rejected: {}", id, value, e);
                respond_error(hw, STATUS_INVALID_VALUE);
                return;
            }
        }
        if let Err(e) = hw.settings_store.store(&updated) {
            warn!("protocol: ${} not stored: {}", id, e);
            respond_error(hw, STATUS_SETTING_STORE_FAILED);
            return;
        }
        info!("protocol: ${}={} stored", id, value);
        respond_ok(hw);
    }

    fn home(&mut self, ctx: &mut DispatchContext<'_>, hw: &mut SimMachine<'_>) {
        if !ctx.settings.homing_enabled() {
            respond_error(hw, STATUS_SETTING_DISABLED);
            return;
        }
        if !matches!(ctx.sys.state, OperationalState::Idle | OperationalState::Alarm) {
            respond_error(hw, STATUS_IDLE_ERROR);
            return;
        }

        ctx.sys.transition(OperationalState::Homing);
        info!("protocol: homing cycle");
        match hw.stepper.execute(&ctx.sys.position, &self.home) {
            Ok(_) => {}
            Err(StepError::TooLong) => {
                warn!("protocol: home out of step range");
                ctx.rt.raise_alarm(AlarmFlag::HomingFail);
                return;
            }
            Err(StepError::Pin(e)) => match e {},
        }
        ctx.sys.position = self.home;
        hw.planner.sync_position(&self.home);
        hw.parser.sync_position(&self.home);
        ctx.sys.homing_complete = true;
        ctx.sys.transition(OperationalState::Idle);
        respond_ok(hw);
    }
}

impl<'a> ProtocolEngine<SimMachine<'a>> for LineProtocol {
    fn run(&mut self, ctx: &mut DispatchContext<'_>, hw: &mut SimMachine<'a>) {
        self.idle_polls = 0;
        hw.serial.write_line(concat!(
            "motionctl ",
            env!("CARGO_PKG_VERSION"),
            " ['$' for help]"
        ));
        if ctx.sys.state == OperationalState::Alarm {
            hw.serial.write_line("[MSG:'$H'|'$X' to unlock]");
        }

        loop {
            if self.service(ctx, hw) {
                return;
            }
            match hw.serial.read_line() {
                Some(RxLine::Complete(line)) => {
                    self.idle_polls = 0;
                    self.execute_line(&line, ctx, hw);
                }
                Some(RxLine::Overflow) => {
                    self.idle_polls = 0;
                    respond_error(hw, STATUS_OVERFLOW);
                }
                None => {
                    if !self.step_motion(ctx, hw) {
                        self.idle(ctx);
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

fn respond_ok(hw: &mut SimMachine<'_>) {
    hw.serial.write_line("ok");
}

fn respond_error(hw: &mut SimMachine<'_>, code: u8) {
    hw.serial.write_line(&format!("error:{code}"));
}

/// `<State|MPos:x,y,z,a,b,c|F:feed>`
pub fn status_report(sys: &SystemState, feed_rate: f32) -> String {
    let mut out = String::with_capacity(96);
    let _ = write!(out, "<{}|MPos:", sys.state.label());
    for (i, v) in sys.position.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{v:.3}");
    }
    let _ = write!(out, "|F:{feed_rate:.0}>");
    out
}

fn dump_settings(s: &Settings, hw: &mut SimMachine<'_>) {
    let flag = |f: SettingsFlag| u8::from(s.has_flag(f));
    let scalars: [(u16, String); 14] = [
        (0, s.pulse_microseconds.to_string()),
        (1, s.stepper_idle_lock_time.to_string()),
        (2, s.step_invert_mask.to_string()),
        (3, s.dir_invert_mask.to_string()),
        (4, flag(SettingsFlag::InvertStepEnable).to_string()),
        (5, flag(SettingsFlag::InvertLimitPins).to_string()),
        (6, flag(SettingsFlag::InvertProbePin).to_string()),
        (11, format!("{:.3}", s.junction_deviation)),
        (12, format!("{:.3}", s.arc_tolerance)),
        (13, flag(SettingsFlag::ReportInches).to_string()),
        (20, flag(SettingsFlag::SoftLimitEnable).to_string()),
        (21, flag(SettingsFlag::HardLimitEnable).to_string()),
        (22, flag(SettingsFlag::HomingEnable).to_string()),
        (26, s.homing_debounce_ms.to_string()),
    ];
    for (id, value) in scalars {
        hw.serial.write_line(&format!("${id}={value}"));
    }
    hw.serial.write_line(&format!("$24={:.3}", s.homing_feed_rate));
    hw.serial.write_line(&format!("$25={:.3}", s.homing_seek_rate));
    hw.serial.write_line(&format!("$27={:.3}", s.homing_pulloff));

    let groups = [
        (100, &s.steps_per_mm),
        (110, &s.max_rate),
        (120, &s.acceleration),
        (130, &s.max_travel),
    ];
    for (base, values) in groups {
        for (i, v) in values.iter().enumerate() {
            hw.serial.write_line(&format!("${}={v:.3}", base + i));
        }
    }
}

fn exceeds_travel(settings: &Settings, target: &AxisVector) -> bool {
    target
        .iter()
        .zip(settings.max_travel.iter())
        .any(|(t, max)| t.abs() > *max)
}
