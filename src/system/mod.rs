//! System state registry.
//!
//! The machine's single record of mutable state, split along the line
//! that interrupts are allowed to cross:
//!
//! ```text
//! ┌───────────────────────────────┐      ┌───────────────────────────────┐
//! │ SystemState (supervisor-owned)│      │ RealtimeFlags (ISR-shared)    │
//! │  state / state_last           │      │  abort          AtomicBool    │
//! │  suspend                      │      │  exec_state     AtomicU8      │
//! │  position [X Y Z RX RY RZ]    │      │  exec_alarm     AtomicU8      │
//! │  homing / limit counters      │      │  reset_button_armed           │
//! └───────────────────────────────┘      └───────────────────────────────┘
//! ```
//!
//! `SystemState` is owned by the [`Supervisor`](crate::supervisor::Supervisor)
//! and lent to the command engine by `&mut`.  `RealtimeFlags` is written by
//! interrupt handlers and read by the supervisory context; it never needs
//! a lock because every field is atomic and multi-field updates happen in
//! a critical section.

pub mod realtime;

use serde::{Deserialize, Serialize};

pub use realtime::{AlarmFlag, ExecFlag, RealtimeFlags, RealtimeSnapshot};

/// Value the soft-limit trigger flag takes after bootstrap.
///
/// Inherited from the controller's boot sequence; the meaning of `8` is
/// not documented anywhere upstream, so it is kept as-is.
pub const SOFT_LIMIT_TRIGGER_DEFAULT: u8 = 8;

/// Number of controlled axes (three Cartesian, three rotational).
pub const N_AXIS: usize = 6;

/// Logical axis index into an [`AxisVector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
    Rx = 3,
    Ry = 4,
    Rz = 5,
}

impl Axis {
    pub const ALL: [Axis; N_AXIS] = [Self::X, Self::Y, Self::Z, Self::Rx, Self::Ry, Self::Rz];

    /// G-code word letter for this axis (rotations use A/B/C).
    pub const fn letter(self) -> char {
        match self {
            Self::X => 'X',
            Self::Y => 'Y',
            Self::Z => 'Z',
            Self::Rx => 'A',
            Self::Ry => 'B',
            Self::Rz => 'C',
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Position or per-axis quantity in machine units (mm / degrees).
pub type AxisVector = [f32; N_AXIS];

// ---------------------------------------------------------------------------
// Operational state
// ---------------------------------------------------------------------------

/// Coarse machine mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum OperationalState {
    /// Ready for commands.  Zero value of a freshly cleared registry.
    #[default]
    Idle = 0,
    /// Safety lockout: motion is rejected until an unlock or homing cycle.
    Alarm = 1,
    /// G-code is parsed and validated but no motion is issued.
    CheckMode = 2,
    /// Homing cycle in progress.
    Homing = 3,
    /// Executing queued motion.
    Run = 4,
    /// Feed hold: motion decelerated and suspended.
    Hold = 5,
    /// Safety door opened during operation.
    SafetyDoor = 6,
}

impl OperationalState {
    /// True if motion-issuing commands must be rejected in this state.
    pub const fn is_motion_locked(self) -> bool {
        matches!(self, Self::Alarm)
    }

    /// Label used in status reports.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Alarm => "Alarm",
            Self::CheckMode => "Check",
            Self::Homing => "Home",
            Self::Run => "Run",
            Self::Hold => "Hold",
            Self::SafetyDoor => "Door",
        }
    }
}

// ---------------------------------------------------------------------------
// SystemState
// ---------------------------------------------------------------------------

/// Supervisor-owned part of the registry.
///
/// Bootstrap builds it with [`SystemState::zeroed`] exactly once; reset
/// passes only touch `suspend`.  Everything else persists across aborts.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemState {
    /// Current machine mode.
    pub state: OperationalState,
    /// Mode before the last explicit transition.
    pub state_last: OperationalState,
    /// Motion is suspended (hold / door).
    pub suspend: bool,
    /// Commanded machine position.  Parser and planner are synced to it
    /// on every reset pass.
    pub position: AxisVector,
    /// Symmetric homing cycle counter.
    pub sym_homing: u8,
    /// Homing reset counter.
    pub reset_homing: u8,
    /// Calibration step counter.
    pub calibration: u8,
    /// Soft-limit trigger flag; see [`SOFT_LIMIT_TRIGGER_DEFAULT`].
    pub soft_limit_trigger: u8,
    /// Hard-limit trigger flag.
    pub hard_limit_trigger: u8,
    /// Set by the homing routine once the machine has been referenced.
    pub homing_complete: bool,
}

impl SystemState {
    /// All-zero registry, as seen immediately after power-up.
    pub const fn zeroed() -> Self {
        Self {
            state: OperationalState::Idle,
            state_last: OperationalState::Idle,
            suspend: false,
            position: [0.0; N_AXIS],
            sym_homing: 0,
            reset_homing: 0,
            calibration: 0,
            soft_limit_trigger: 0,
            hard_limit_trigger: 0,
            homing_complete: false,
        }
    }

    /// Record an explicit mode change, keeping the previous mode.
    pub fn transition(&mut self, next: OperationalState) {
        if next != self.state {
            self.state_last = self.state;
            self.state = next;
        }
    }
}

impl Default for SystemState {
    fn default() -> Self {
        Self::zeroed()
    }
}
