//! Simulated machine: every collaborator behind one value.
//!
//! [`SimMachine`] implements the full [`MachinePorts`](crate::app::ports::MachinePorts)
//! bundle so the supervisor can drive it directly.  Peripherals that exist
//! on the board (pins, interrupts) are routed through
//! [`crate::drivers::hw_init`], which is a logging no-op on the host.
//! The reset button and the limit switches are polled instead, through
//! [`SimMachine::poll_inputs`], on a simulated millisecond clock.

use log::{debug, error, info, warn};

use crate::adapters::eeprom::{EepromSettings, MemoryEeprom};
use crate::adapters::io::{Coolant, Limits, Probe, Spindle};
use crate::adapters::parser::Parser;
use crate::adapters::planner::Planner;
use crate::adapters::serial::{RxChannel, SerialPort};
use crate::adapters::stepper::{SimPin, Stepper};
use crate::app::ports::{
    CommChannel, CommPort, CoolantPort, InterruptPort, IoPort, LimitsPort, ParserPort,
    PlannerPort, ProbePort, SettingsPort, SpindleChannel, SpindlePort, StepperPort,
};
use crate::drivers::reset_button::ResetButton;
use crate::drivers::{hw_init, limits};
use crate::pins;
use crate::settings::{Settings, SettingsFlag};
use crate::system::{AxisVector, RealtimeFlags};

/// Simulated time that passes per [`SimMachine::poll_inputs`] call.
pub const INPUT_POLL_MS: u32 = 1;

pub struct SimMachine<'a> {
    pub serial: SerialPort<'a>,
    pub serial2: Option<SerialPort<'a>>,
    pub settings_store: EepromSettings<MemoryEeprom>,
    pub stepper: Stepper<SimPin>,
    pub parser: Parser,
    pub planner: Planner,
    pub spindles: [Spindle; 2],
    pub coolant: Coolant,
    pub limits: Limits,
    pub probe: Probe,
    /// Active-low; the pin idles high (released).
    pub reset_button: ResetButton<SimPin>,
    clock_ms: u32,
    reset_button_armed: bool,
    pins_ready: bool,
    interrupts_enabled: bool,
    /// Registry handed to the pin-change handlers when interrupts are
    /// enabled.  `None` keeps interrupt registration off (tests).
    isr_rt: Option<&'static RealtimeFlags>,
}

impl<'a> SimMachine<'a> {
    pub fn new(rx: &'a RxChannel) -> Self {
        Self {
            serial: SerialPort::new(rx),
            serial2: None,
            settings_store: EepromSettings::new(MemoryEeprom::new()),
            stepper: Stepper::simulated(),
            parser: Parser::new(),
            planner: Planner::new(),
            spindles: [
                Spindle::new(pins::SPINDLE_ENABLE_GPIO),
                Spindle::new(pins::SPINDLE2_ENABLE_GPIO),
            ],
            coolant: Coolant::default(),
            limits: Limits::default(),
            probe: Probe::default(),
            reset_button: ResetButton::new(SimPin::new(true), true),
            clock_ms: 0,
            reset_button_armed: false,
            pins_ready: false,
            interrupts_enabled: false,
            isr_rt: None,
        }
    }

    /// Fit a secondary serial channel.
    pub fn with_secondary(mut self, rx: &'a RxChannel) -> Self {
        self.serial2 = Some(SerialPort::new(rx));
        self
    }

    pub fn with_eeprom(mut self, eeprom: MemoryEeprom) -> Self {
        self.settings_store = EepromSettings::new(eeprom);
        self
    }

    /// Print responses on the primary channel to stdout.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.serial = self.serial.with_echo(echo);
        self
    }

    /// Register the limit and reset-button handlers against `rt` when
    /// interrupts are enabled.
    pub fn with_interrupts(mut self, rt: &'static RealtimeFlags) -> Self {
        self.isr_rt = Some(rt);
        self
    }

    pub fn reset_button_armed(&self) -> bool {
        self.reset_button_armed
    }

    pub fn pins_ready(&self) -> bool {
        self.pins_ready
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts_enabled
    }

    /// Poll the reset button and the limit switches, then advance the
    /// simulated clock by [`INPUT_POLL_MS`].  A fresh limit trip raises the
    /// hard-limit alarm when `settings` enable hard limits.
    pub fn poll_inputs(&mut self, rt: &RealtimeFlags, settings: &Settings) {
        match self.reset_button.poll(self.clock_ms, rt) {
            Ok(true) => debug!("inputs: reset button at {} ms", self.clock_ms),
            Ok(false) => {}
            Err(e) => match e {},
        }

        let fresh = self.limits.poll(settings.has_flag(SettingsFlag::InvertLimitPins));
        if fresh != 0
            && limits::on_limit_trip(rt, settings.has_flag(SettingsFlag::HardLimitEnable))
        {
            warn!("inputs: hard limit tripped, axes 0b{:06b}", fresh);
        }
        self.clock_ms = self.clock_ms.wrapping_add(INPUT_POLL_MS);
    }

    fn serial_mut(&mut self, channel: CommChannel) -> Option<&mut SerialPort<'a>> {
        match channel {
            CommChannel::Primary => Some(&mut self.serial),
            CommChannel::Secondary => self.serial2.as_mut(),
        }
    }
}

impl CommPort for SimMachine<'_> {
    fn comm_init(&mut self, channel: CommChannel, baud: u32) {
        match self.serial_mut(channel) {
            Some(port) => {
                port.open(baud);
                info!("serial({:?}): open at {} baud", channel, baud);
            }
            None => warn!("serial({:?}): channel not fitted", channel),
        }
    }

    fn comm_reset_read_buffer(&mut self, channel: CommChannel) {
        if let Some(port) = self.serial_mut(channel) {
            port.reset_read_buffer();
        }
    }
}

impl SettingsPort for SimMachine<'_> {
    fn load_settings(&mut self) -> Settings {
        let settings = self.settings_store.load_settings();
        limits::set_hard_limits_enabled(settings.has_flag(SettingsFlag::HardLimitEnable));
        settings
    }
}

impl StepperPort for SimMachine<'_> {
    fn stepper_init(&mut self, settings: &Settings) {
        match self.stepper.init(settings) {
            Ok(()) => debug!("stepper: initialised, {} us pulse", settings.pulse_microseconds),
            Err(e) => match e {},
        }
    }

    fn stepper_reset(&mut self) {
        match self.stepper.reset() {
            Ok(()) => {}
            Err(e) => match e {},
        }
    }
}

impl IoPort for SimMachine<'_> {
    fn io_init(&mut self) {
        if let Err(e) = hw_init::init_peripherals() {
            error!("io: {}", e);
            return;
        }
        self.pins_ready = true;
    }

    fn arm_reset_button(&mut self) {
        self.reset_button_armed = true;
    }
}

impl InterruptPort for SimMachine<'_> {
    fn enable_interrupts(&mut self) {
        if let Some(rt) = self.isr_rt {
            if let Err(e) = hw_init::init_isr_service(rt) {
                error!("interrupts: {}", e);
                return;
            }
        }
        self.interrupts_enabled = true;
    }
}

impl ParserPort for SimMachine<'_> {
    fn parser_reset(&mut self) {
        self.parser.reset();
    }

    fn parser_sync_position(&mut self, position: &AxisVector) {
        self.parser.sync_position(position);
    }

    fn parser_set_feed_rate(&mut self, feed_rate: f32) {
        self.parser.set_feed_rate(feed_rate);
    }

    fn parser_feed_rate(&self) -> f32 {
        self.parser.feed_rate()
    }
}

impl SpindlePort for SimMachine<'_> {
    fn spindle_reset(&mut self, channel: SpindleChannel) {
        let idx = match channel {
            SpindleChannel::Primary => 0,
            SpindleChannel::Secondary => 1,
        };
        self.spindles[idx].reset();
    }
}

impl CoolantPort for SimMachine<'_> {
    fn coolant_reset(&mut self) {
        self.coolant.reset();
    }
}

impl LimitsPort for SimMachine<'_> {
    fn limits_arm(&mut self) {
        self.limits.arm();
    }
}

impl ProbePort for SimMachine<'_> {
    fn probe_reset(&mut self) {
        self.probe.reset();
    }
}

impl PlannerPort for SimMachine<'_> {
    fn planner_reset(&mut self) {
        self.planner.reset();
    }

    fn planner_sync_position(&mut self, position: &AxisVector) {
        self.planner.sync_position(position);
    }

    fn planner_queued(&self) -> usize {
        self.planner.queued()
    }
}
