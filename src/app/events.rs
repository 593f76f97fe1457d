//! Outbound supervisor events.
//!
//! The [`Supervisor`](crate::supervisor::Supervisor) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log, test recorder, etc.).

use crate::system::OperationalState;

/// Structured events emitted by the supervisory loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorEvent {
    /// Bootstrap finished; carries the post-policy operational state.
    Booted { state: OperationalState },

    /// A reset pass completed.
    ResetComplete(ResetReport),

    /// Control handed to the command engine.
    Dispatching { pass: u32, state: OperationalState },

    /// The command engine returned on abort.
    Aborted(DispatchExit),
}

/// Summary of one reset pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetReport {
    /// 1-based pass counter (the boot pass is 1).
    pub pass: u32,
    /// Realtime execution bits that were pending and got discarded.
    pub discarded_exec: u8,
    /// Alarm bits that were pending and got discarded.
    pub discarded_alarm: u8,
    /// Planner segments that were queued when the pass started.
    pub discarded_segments: usize,
    /// Operational state carried through the pass (unchanged by it).
    pub state: OperationalState,
}

/// Why and how the engine returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchExit {
    /// Execution bits pending at return.
    pub exec_state: u8,
    /// Alarm bits pending at return.
    pub exec_alarm: u8,
    /// The engine returned without requesting abort; the dispatcher
    /// requested it on the engine's behalf.
    pub forced: bool,
}
