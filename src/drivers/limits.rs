//! Hard-limit interrupt handler.
//!
//! Registered on every limit input's pin-change interrupt.  A trip while
//! hard limits are enabled raises [`AlarmFlag::HardLimit`], which also
//! requests a reset; the command engine then locks the machine in Alarm.
//! Boards without a pin-change interrupt on the limit inputs poll them and
//! call [`on_limit_trip`] with the current setting instead.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::system::{AlarmFlag, RealtimeFlags};

/// Mirrors the `HardLimitEnable` setting for interrupt context.
static HARD_LIMITS_ENABLED: AtomicBool = AtomicBool::new(false);

/// Call whenever settings are (re)loaded.
pub fn set_hard_limits_enabled(enabled: bool) {
    HARD_LIMITS_ENABLED.store(enabled, Ordering::Release);
}

pub fn hard_limits_enabled() -> bool {
    HARD_LIMITS_ENABLED.load(Ordering::Acquire)
}

/// ISR handler for limit pin changes.  Returns `true` if an alarm was
/// raised.
pub fn limits_isr(rt: &RealtimeFlags) -> bool {
    on_limit_trip(rt, hard_limits_enabled())
}

/// Shared by the ISR and polled inputs.  Returns `true` if an alarm was
/// raised.
pub fn on_limit_trip(rt: &RealtimeFlags, enabled: bool) -> bool {
    if !enabled {
        return false;
    }
    rt.raise_alarm(AlarmFlag::HardLimit);
    true
}
