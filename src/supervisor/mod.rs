//! Supervisory control loop.
//!
//! Bootstrap runs once; afterwards the supervisor alternates between two
//! phases for the lifetime of the process:
//!
//! ```text
//!              bootstrap
//!                  │
//!                  ▼
//!          ┌──────────────┐   sequence complete   ┌───────────────┐
//!          │  Resetting   │──────────────────────▶│  Dispatching  │
//!          │ (reset pass) │◀──────────────────────│ (cmd engine)  │
//!          └──────────────┘        abort          └───────────────┘
//! ```
//!
//! There is no terminal state.  Every abort, whatever its cause, is
//! recovered by a full reset pass before the engine runs again.

pub mod bootstrap;
pub mod dispatch;
pub mod reset;

use log::info;

use crate::app::events::SupervisorEvent;
use crate::app::ports::{DispatchContext, EventSink, MachinePorts, ProtocolEngine};
use crate::config::MachineConfig;
use crate::settings::Settings;
use crate::system::{OperationalState, RealtimeFlags, SystemState};

pub use bootstrap::{BootOutcome, apply_boot_policy, bootstrap};
pub use dispatch::dispatch;
pub use reset::reset_subsystems;

/// Macro-state of the supervisory loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Restoring every subsystem to idle.
    Resetting,
    /// Blocked inside the command engine.
    Dispatching,
}

/// Owns the registry and the collaborators and sequences
/// reset → dispatch → reset → …
pub struct Supervisor<'a, M, P> {
    config: MachineConfig,
    rt: &'a RealtimeFlags,
    sys: SystemState,
    settings: Settings,
    hw: M,
    engine: P,
    phase: Phase,
    /// Completed reset passes.
    passes: u32,
}

impl<'a, M, P> Supervisor<'a, M, P>
where
    M: MachinePorts,
    P: ProtocolEngine<M>,
{
    /// Run bootstrap and return a supervisor parked in
    /// [`Phase::Resetting`], with abort already requested.
    pub fn boot(
        config: MachineConfig,
        rt: &'a RealtimeFlags,
        mut hw: M,
        engine: P,
        sink: &mut impl EventSink,
    ) -> Self {
        let BootOutcome { sys, settings } = bootstrap(&config, rt, &mut hw);
        sink.emit(&SupervisorEvent::Booted { state: sys.state });

        Self {
            config,
            rt,
            sys,
            settings,
            hw,
            engine,
            phase: Phase::Resetting,
            passes: 0,
        }
    }

    /// Execute the current phase and move to the next one.
    pub fn step(&mut self, sink: &mut impl EventSink) -> Phase {
        self.phase = match self.phase {
            Phase::Resetting => {
                self.passes = self.passes.wrapping_add(1);
                let report =
                    reset_subsystems(self.passes, &self.config, &mut self.sys, self.rt, &mut self.hw);
                sink.emit(&SupervisorEvent::ResetComplete(report));
                Phase::Dispatching
            }
            Phase::Dispatching => {
                sink.emit(&SupervisorEvent::Dispatching {
                    pass: self.passes,
                    state: self.sys.state,
                });
                let mut ctx = DispatchContext {
                    sys: &mut self.sys,
                    rt: self.rt,
                    settings: &self.settings,
                };
                let exit = dispatch(&mut self.engine, &mut ctx, &mut self.hw);
                sink.emit(&SupervisorEvent::Aborted(exit));
                Phase::Resetting
            }
        };
        self.phase
    }

    /// Run the loop forever.
    pub fn run(mut self, sink: &mut impl EventSink) -> ! {
        info!("supervisor: entering main loop");
        loop {
            self.step(sink);
        }
    }
}

impl<M, P> Supervisor<'_, M, P> {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn state(&self) -> OperationalState {
        self.sys.state
    }

    pub fn system(&self) -> &SystemState {
        &self.sys
    }

    pub fn rt(&self) -> &RealtimeFlags {
        self.rt
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn hw(&self) -> &M {
        &self.hw
    }

    pub fn hw_mut(&mut self) -> &mut M {
        &mut self.hw
    }

    pub fn engine(&self) -> &P {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut P {
        &mut self.engine
    }
}
