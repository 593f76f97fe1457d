//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing supervisor events to the `log`
//! facade (serial console on the board, stderr on the host).

use log::{debug, info, warn};

use crate::app::events::SupervisorEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`SupervisorEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u64,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events logged so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &SupervisorEvent) {
        self.emitted += 1;
        match event {
            SupervisorEvent::Booted { state } => {
                info!("BOOT  | state={:?}", state);
            }
            SupervisorEvent::ResetComplete(r) => {
                info!(
                    "RESET | pass={} state={:?} | discarded exec=0b{:08b} alarm=0b{:08b} segments={}",
                    r.pass, r.state, r.discarded_exec, r.discarded_alarm, r.discarded_segments,
                );
            }
            SupervisorEvent::Dispatching { pass, state } => {
                debug!("RUN   | pass={} state={:?}", pass, state);
            }
            SupervisorEvent::Aborted(exit) if exit.forced => {
                warn!(
                    "ABORT | forced, exec=0b{:08b} alarm=0b{:08b}",
                    exit.exec_state, exit.exec_alarm
                );
            }
            SupervisorEvent::Aborted(exit) => {
                info!(
                    "ABORT | exec=0b{:08b} alarm=0b{:08b}",
                    exit.exec_state, exit.exec_alarm
                );
            }
        }
    }
}
