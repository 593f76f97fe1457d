//! Mock collaborators for integration tests.
//!
//! Records every port call so tests can assert on the exact bootstrap and
//! reset ordering without touching real peripherals.

use motionctl::app::events::SupervisorEvent;
use motionctl::app::ports::{
    CommChannel, CommPort, CoolantPort, DispatchContext, EventSink, InterruptPort, IoPort,
    LimitsPort, ParserPort, PlannerPort, ProbePort, ProtocolEngine, SettingsPort, SpindleChannel,
    SpindlePort, StepperPort,
};
use motionctl::settings::Settings;
use motionctl::system::{AlarmFlag, AxisVector, ExecFlag, RealtimeFlags, RealtimeSnapshot};

// ── Port call record ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CommInit(CommChannel, u32),
    CommResetReadBuffer(CommChannel),
    LoadSettings,
    StepperInit,
    StepperReset,
    IoInit,
    ArmResetButton,
    /// Carries the realtime flags observed when interrupts were enabled.
    EnableInterrupts(RealtimeSnapshot),
    ParserReset,
    ParserSync(AxisVector),
    ParserSetFeedRate(f32),
    SpindleReset(SpindleChannel),
    CoolantReset,
    LimitsArm,
    ProbeReset,
    PlannerReset,
    PlannerSync(AxisVector),
}

// ── MockMachine ───────────────────────────────────────────────

pub struct MockMachine<'a> {
    rt: &'a RealtimeFlags,
    pub calls: Vec<Call>,
    pub settings: Settings,
    pub parser_position: Option<AxisVector>,
    pub planner_position: Option<AxisVector>,
    pub feed_rate: Option<f32>,
    pub queued: usize,
}

#[allow(dead_code)]
impl<'a> MockMachine<'a> {
    pub fn new(rt: &'a RealtimeFlags) -> Self {
        Self {
            rt,
            calls: Vec::new(),
            settings: Settings::default(),
            parser_position: None,
            planner_position: None,
            feed_rate: None,
            queued: 0,
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Drain the call history.
    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    /// Position of `call` in the history, if it was made.
    pub fn index_of(&self, call: &Call) -> Option<usize> {
        self.calls.iter().position(|c| c == call)
    }
}

impl CommPort for MockMachine<'_> {
    fn comm_init(&mut self, channel: CommChannel, baud: u32) {
        self.calls.push(Call::CommInit(channel, baud));
    }
    fn comm_reset_read_buffer(&mut self, channel: CommChannel) {
        self.calls.push(Call::CommResetReadBuffer(channel));
    }
}

impl SettingsPort for MockMachine<'_> {
    fn load_settings(&mut self) -> Settings {
        self.calls.push(Call::LoadSettings);
        self.settings.clone()
    }
}

impl StepperPort for MockMachine<'_> {
    fn stepper_init(&mut self, _settings: &Settings) {
        self.calls.push(Call::StepperInit);
    }
    fn stepper_reset(&mut self) {
        self.calls.push(Call::StepperReset);
    }
}

impl IoPort for MockMachine<'_> {
    fn io_init(&mut self) {
        self.calls.push(Call::IoInit);
    }
    fn arm_reset_button(&mut self) {
        self.calls.push(Call::ArmResetButton);
    }
}

impl InterruptPort for MockMachine<'_> {
    fn enable_interrupts(&mut self) {
        self.calls.push(Call::EnableInterrupts(self.rt.snapshot()));
    }
}

impl ParserPort for MockMachine<'_> {
    fn parser_reset(&mut self) {
        self.calls.push(Call::ParserReset);
    }
    fn parser_sync_position(&mut self, position: &AxisVector) {
        self.calls.push(Call::ParserSync(*position));
        self.parser_position = Some(*position);
    }
    fn parser_set_feed_rate(&mut self, feed_rate: f32) {
        self.calls.push(Call::ParserSetFeedRate(feed_rate));
        self.feed_rate = Some(feed_rate);
    }
    fn parser_feed_rate(&self) -> f32 {
        self.feed_rate.unwrap_or(0.0)
    }
}

impl SpindlePort for MockMachine<'_> {
    fn spindle_reset(&mut self, channel: SpindleChannel) {
        self.calls.push(Call::SpindleReset(channel));
    }
}

impl CoolantPort for MockMachine<'_> {
    fn coolant_reset(&mut self) {
        self.calls.push(Call::CoolantReset);
    }
}

impl LimitsPort for MockMachine<'_> {
    fn limits_arm(&mut self) {
        self.calls.push(Call::LimitsArm);
    }
}

impl ProbePort for MockMachine<'_> {
    fn probe_reset(&mut self) {
        self.calls.push(Call::ProbeReset);
    }
}

impl PlannerPort for MockMachine<'_> {
    fn planner_reset(&mut self) {
        self.calls.push(Call::PlannerReset);
        self.queued = 0;
    }
    fn planner_sync_position(&mut self, position: &AxisVector) {
        self.calls.push(Call::PlannerSync(*position));
        self.planner_position = Some(*position);
    }
    fn planner_queued(&self) -> usize {
        self.queued
    }
}

// ── Scripted engine ───────────────────────────────────────────

/// What the engine does on one dispatch.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum Action {
    /// Queue segments, suspend, then get reset by the operator.
    QueueThenReset(usize),
    /// Report a fault from "interrupt context" and abort.
    Fault(AlarmFlag),
    /// Return without raising abort.
    ReturnSilently,
}

/// Engine that plays one [`Action`] per dispatch, then resets forever.
pub struct ScriptedEngine {
    pub script: Vec<Action>,
    pub runs: usize,
}

#[allow(dead_code)]
impl ScriptedEngine {
    pub fn new(script: Vec<Action>) -> Self {
        Self { script, runs: 0 }
    }
}

impl<'a> ProtocolEngine<MockMachine<'a>> for ScriptedEngine {
    fn run(&mut self, ctx: &mut DispatchContext<'_>, hw: &mut MockMachine<'a>) {
        let action = self
            .script
            .get(self.runs)
            .copied()
            .unwrap_or(Action::QueueThenReset(0));
        self.runs += 1;

        match action {
            Action::QueueThenReset(n) => {
                hw.queued += n;
                ctx.sys.suspend = true;
                ctx.rt.set_exec(ExecFlag::FeedHold);
                ctx.rt.set_exec(ExecFlag::Reset);
                ctx.rt.request_abort();
            }
            Action::Fault(alarm) => {
                ctx.rt.raise_alarm(alarm);
                ctx.sys.transition(motionctl::system::OperationalState::Alarm);
                ctx.rt.request_abort();
            }
            Action::ReturnSilently => {}
        }
    }
}

// ── Recording sink ────────────────────────────────────────────

#[derive(Default)]
pub struct VecSink {
    pub events: Vec<SupervisorEvent>,
}

impl EventSink for VecSink {
    fn emit(&mut self, event: &SupervisorEvent) {
        self.events.push(event.clone());
    }
}
