//! Port traits — the boundary between the supervisory core and its collaborators.
//!
//! ```text
//!   Collaborator adapter ──▶ Port trait ──▶ Supervisor (core)
//! ```
//!
//! Every subsystem the supervisor restarts (serial, settings storage,
//! stepper, pins, parser, spindle, coolant, limits, probe, planner) and the
//! command engine it hands control to implements one of these traits.  The
//! core consumes them via generics, so it never touches hardware directly
//! and can be driven by recording mocks in tests.
//!
//! None of these operations report failure: a collaborator that cannot do
//! its job (corrupt storage, a wedged UART) handles it internally and, if
//! the problem is severe, raises an alarm through
//! [`RealtimeFlags`](crate::system::RealtimeFlags).

use crate::settings::Settings;
use crate::system::{AxisVector, RealtimeFlags, SystemState};

// ───────────────────────────────────────────────────────────────
// Channel identifiers
// ───────────────────────────────────────────────────────────────

/// Serial channel selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommChannel {
    Primary,
    Secondary,
}

/// Spindle output selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpindleChannel {
    Primary,
    Secondary,
}

// ───────────────────────────────────────────────────────────────
// Collaborator ports
// ───────────────────────────────────────────────────────────────

/// Communication channels (UART / USB-CDC).
pub trait CommPort {
    /// Configure framing, baud rate, and receive interrupts.
    fn comm_init(&mut self, channel: CommChannel, baud: u32);

    /// Discard unread buffered input.
    fn comm_reset_read_buffer(&mut self, channel: CommChannel);
}

/// Persistent settings.
pub trait SettingsPort {
    /// Load the active settings.  Implementations substitute defaults
    /// when storage is absent or invalid.
    fn load_settings(&mut self) -> Settings;
}

/// Step-pulse generation.
pub trait StepperPort {
    /// Configure the pulse timer and step/direction outputs.  Timing
    /// depends on `settings`, so this runs after settings load.
    fn stepper_init(&mut self, settings: &Settings);

    /// Clear runtime counters and timing state.
    fn stepper_reset(&mut self);
}

/// General I/O pins.
pub trait IoPort {
    /// Configure limit, control, and probe inputs and their pin-change
    /// interrupt sources.
    fn io_init(&mut self);

    /// Arm the physical reset-button input.
    fn arm_reset_button(&mut self);
}

/// Global interrupt control.
pub trait InterruptPort {
    fn enable_interrupts(&mut self);
}

/// G-code interpreter state.
pub trait ParserPort {
    /// Restore default modal state (units, coordinate frame, feed mode).
    fn parser_reset(&mut self);

    /// Align the parser's logical position with `position`.
    fn parser_sync_position(&mut self, position: &AxisVector);

    fn parser_set_feed_rate(&mut self, feed_rate: f32);

    fn parser_feed_rate(&self) -> f32;
}

/// Spindle control.
pub trait SpindlePort {
    /// Stop the spindle and restore its idle state.
    fn spindle_reset(&mut self, channel: SpindleChannel);
}

/// Coolant control.
pub trait CoolantPort {
    fn coolant_reset(&mut self);
}

/// Limit switches.
pub trait LimitsPort {
    /// Re-arm limit-switch sensing.
    fn limits_arm(&mut self);
}

/// Touch probe.
pub trait ProbePort {
    fn probe_reset(&mut self);
}

/// Motion planner.
pub trait PlannerPort {
    /// Discard queued segments and the internal position cache.
    fn planner_reset(&mut self);

    /// Align the planner's logical position with `position`.
    fn planner_sync_position(&mut self, position: &AxisVector);

    /// Number of segments currently queued.
    fn planner_queued(&self) -> usize;
}

/// Every collaborator the bootstrap and reset sequence touch.
pub trait MachinePorts:
    CommPort
    + SettingsPort
    + StepperPort
    + IoPort
    + InterruptPort
    + ParserPort
    + SpindlePort
    + CoolantPort
    + LimitsPort
    + ProbePort
    + PlannerPort
{
}

impl<T> MachinePorts for T where
    T: CommPort
        + SettingsPort
        + StepperPort
        + IoPort
        + InterruptPort
        + ParserPort
        + SpindlePort
        + CoolantPort
        + LimitsPort
        + ProbePort
        + PlannerPort
{
}

// ───────────────────────────────────────────────────────────────
// Command engine
// ───────────────────────────────────────────────────────────────

/// Everything the command engine may read or write while dispatching.
pub struct DispatchContext<'a> {
    pub sys: &'a mut SystemState,
    pub rt: &'a RealtimeFlags,
    pub settings: &'a Settings,
}

/// The command-processing engine.
///
/// Owns streaming, parsing, and execution of incoming commands and the
/// realtime responses to exec/alarm flags.  [`run`](Self::run) blocks
/// until abort is requested; it is the sole setter of abort under fault
/// or explicit reset.
pub trait ProtocolEngine<M> {
    fn run(&mut self, ctx: &mut DispatchContext<'_>, hw: &mut M);
}

// ───────────────────────────────────────────────────────────────
// Event sink port
// ───────────────────────────────────────────────────────────────

/// The supervisor emits structured
/// [`SupervisorEvent`](super::events::SupervisorEvent)s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::SupervisorEvent);
}

// ───────────────────────────────────────────────────────────────
// Storage port (settings image backing store)
// ───────────────────────────────────────────────────────────────

/// Raw non-volatile storage for the settings image.
///
/// Writes MUST be atomic: a power loss leaves either the old or the new
/// image, never a mix.
pub trait StoragePort {
    /// Read the stored image into `buf`.  Returns the number of bytes read.
    fn read(&self, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Replace the stored image.
    fn write(&mut self, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Nothing has been stored yet.
    Empty,
    /// Image does not fit the buffer or the device.
    TooLarge,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => write!(f, "storage empty"),
            Self::TooLarge => write!(f, "image too large"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
