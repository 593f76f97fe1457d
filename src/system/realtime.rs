//! Interrupt-visible realtime flags.
//!
//! The only channel through which interrupt handlers talk to the
//! supervisory context.  Single-field accesses are plain atomics; any
//! update that must be observed as a unit (alarm + reset request, the
//! reset-pass clear) runs inside `critical_section::with`.

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

// ---------------------------------------------------------------------------
// Execution request bits
// ---------------------------------------------------------------------------

/// Realtime execution requests set asynchronously by interrupt handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExecFlag {
    StatusReport = 0b0000_0001,
    CycleStart = 0b0000_0010,
    CycleStop = 0b0000_0100,
    FeedHold = 0b0000_1000,
    Reset = 0b0001_0000,
    SafetyDoor = 0b0010_0000,
    MotionCancel = 0b0100_0000,
}

impl ExecFlag {
    pub const ALL: [ExecFlag; 7] = [
        Self::StatusReport,
        Self::CycleStart,
        Self::CycleStop,
        Self::FeedHold,
        Self::Reset,
        Self::SafetyDoor,
        Self::MotionCancel,
    ];

    /// Return the bitmask for this request.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

// ---------------------------------------------------------------------------
// Alarm bits
// ---------------------------------------------------------------------------

/// Fault conditions reported asynchronously by interrupt handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlarmFlag {
    HardLimit = 0b0000_0001,
    SoftLimit = 0b0000_0010,
    AbortCycle = 0b0000_0100,
    ProbeFail = 0b0000_1000,
    HomingFail = 0b0001_0000,
}

impl AlarmFlag {
    pub const ALL: [AlarmFlag; 5] = [
        Self::HardLimit,
        Self::SoftLimit,
        Self::AbortCycle,
        Self::ProbeFail,
        Self::HomingFail,
    ];

    /// Return the bitmask for this alarm.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for AlarmFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HardLimit => write!(f, "hard limit"),
            Self::SoftLimit => write!(f, "soft limit"),
            Self::AbortCycle => write!(f, "abort during cycle"),
            Self::ProbeFail => write!(f, "probe fail"),
            Self::HomingFail => write!(f, "homing fail"),
        }
    }
}

// ---------------------------------------------------------------------------
// RealtimeFlags
// ---------------------------------------------------------------------------

/// Snapshot of the realtime flags, for logging and comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RealtimeSnapshot {
    pub abort: bool,
    pub exec_state: u8,
    pub exec_alarm: u8,
    pub reset_button_armed: bool,
}

/// Shared realtime flags.
///
/// `const`-constructible so firmware can place one instance in a `static`
/// for interrupt handlers; library code only ever borrows it.
pub struct RealtimeFlags {
    abort: AtomicBool,
    exec_state: AtomicU8,
    exec_alarm: AtomicU8,
    reset_button_armed: AtomicBool,
}

impl RealtimeFlags {
    pub const fn new() -> Self {
        Self {
            abort: AtomicBool::new(false),
            exec_state: AtomicU8::new(0),
            exec_alarm: AtomicU8::new(0),
            reset_button_armed: AtomicBool::new(false),
        }
    }

    // ── Supervisory side ───────────────────────────────────────

    /// Clear every flag.  Only called by bootstrap, before interrupts
    /// are enabled.
    pub fn zero(&self) {
        critical_section::with(|_| {
            self.abort.store(false, Ordering::SeqCst);
            self.exec_state.store(0, Ordering::SeqCst);
            self.exec_alarm.store(0, Ordering::SeqCst);
            self.reset_button_armed.store(false, Ordering::SeqCst);
        });
    }

    /// Clear abort and both bitmasks as one unit.  Returns the
    /// `(exec_state, exec_alarm)` values that were discarded.
    pub fn clear_for_reset(&self) -> (u8, u8) {
        critical_section::with(|_| {
            self.abort.store(false, Ordering::SeqCst);
            let exec = self.exec_state.swap(0, Ordering::SeqCst);
            let alarm = self.exec_alarm.swap(0, Ordering::SeqCst);
            (exec, alarm)
        })
    }

    /// Mark the physical reset input as armed.
    pub fn set_reset_button_armed(&self, armed: bool) {
        self.reset_button_armed.store(armed, Ordering::Release);
    }

    pub fn reset_button_armed(&self) -> bool {
        self.reset_button_armed.load(Ordering::Acquire)
    }

    /// Disarm the reset input.  Returns whether it was armed, so exactly
    /// one press is honoured per reset pass.
    pub fn disarm_reset_button(&self) -> bool {
        self.reset_button_armed.swap(false, Ordering::AcqRel)
    }

    // ── Interrupt side ─────────────────────────────────────────

    /// Ask the supervisor to discard in-flight state and re-run the
    /// reset sequence.
    pub fn request_abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    pub fn abort_requested(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    /// Set one execution request bit.
    pub fn set_exec(&self, flag: ExecFlag) {
        self.exec_state.fetch_or(flag.mask(), Ordering::AcqRel);
    }

    /// Clear one execution request bit (consumer side).
    pub fn clear_exec(&self, flag: ExecFlag) {
        self.exec_state.fetch_and(!flag.mask(), Ordering::AcqRel);
    }

    pub fn exec_state(&self) -> u8 {
        self.exec_state.load(Ordering::Acquire)
    }

    /// Take and clear the whole execution mask.
    pub fn take_exec(&self) -> u8 {
        self.exec_state.swap(0, Ordering::AcqRel)
    }

    /// Report a fault and request a reset together, so the consumer never
    /// sees the reset without its cause.
    pub fn raise_alarm(&self, alarm: AlarmFlag) {
        critical_section::with(|_| {
            self.exec_alarm.fetch_or(alarm.mask(), Ordering::SeqCst);
            self.exec_state.fetch_or(ExecFlag::Reset.mask(), Ordering::SeqCst);
        });
    }

    pub fn exec_alarm(&self) -> u8 {
        self.exec_alarm.load(Ordering::Acquire)
    }

    /// Take and clear the alarm mask.
    pub fn take_alarm(&self) -> u8 {
        self.exec_alarm.swap(0, Ordering::AcqRel)
    }

    pub fn snapshot(&self) -> RealtimeSnapshot {
        critical_section::with(|_| RealtimeSnapshot {
            abort: self.abort.load(Ordering::SeqCst),
            exec_state: self.exec_state.load(Ordering::SeqCst),
            exec_alarm: self.exec_alarm.load(Ordering::SeqCst),
            reset_button_armed: self.reset_button_armed.load(Ordering::SeqCst),
        })
    }
}

impl Default for RealtimeFlags {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RealtimeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.snapshot();
        f.debug_struct("RealtimeFlags")
            .field("abort", &s.abort)
            .field("exec_state", &format_args!("0b{:08b}", s.exec_state))
            .field("exec_alarm", &format_args!("0b{:08b}", s.exec_alarm))
            .field("reset_button_armed", &s.reset_button_armed)
            .finish()
    }
}
