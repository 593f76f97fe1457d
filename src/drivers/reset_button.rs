//! Physical reset button.
//!
//! ## Hardware
//!
//! Active-low momentary switch with external pull-up.  On the board the
//! falling edge fires [`reset_button_isr`]; [`ResetButton`] is the
//! polled alternative for inputs without an interrupt line, and is what
//! the simulated machine uses.
//!
//! A press is honoured only while the button is armed.  Honouring it
//! disarms the button until the next reset pass re-arms it, so one press
//! yields one reset no matter how long it is held or how much it bounces.

use embedded_hal::digital::InputPin;
use log::info;

use crate::system::{ExecFlag, RealtimeFlags};

const DEBOUNCE_MS: u32 = 20;

/// ISR handler for the reset input.  Returns `true` if the press was
/// honoured.
pub fn reset_button_isr(rt: &RealtimeFlags) -> bool {
    if !rt.disarm_reset_button() {
        return false;
    }
    rt.set_exec(ExecFlag::Reset);
    rt.request_abort();
    true
}

/// Debounced poll of a reset input.
pub struct ResetButton<P> {
    pin: P,
    active_low: bool,
    pressed_since: Option<u32>,
    /// Press already handled; wait for release.
    latched: bool,
}

impl<P: InputPin> ResetButton<P> {
    pub fn new(pin: P, active_low: bool) -> Self {
        Self {
            pin,
            active_low,
            pressed_since: None,
            latched: false,
        }
    }

    pub fn pin_mut(&mut self) -> &mut P {
        &mut self.pin
    }

    /// Call periodically with a monotonic millisecond clock.  Returns
    /// `true` when a press was honoured on this poll.
    pub fn poll(&mut self, now_ms: u32, rt: &RealtimeFlags) -> Result<bool, P::Error> {
        let pressed = self.pin.is_high()? != self.active_low;
        if !pressed {
            self.pressed_since = None;
            self.latched = false;
            return Ok(false);
        }

        let since = *self.pressed_since.get_or_insert(now_ms);
        if self.latched || now_ms.wrapping_sub(since) < DEBOUNCE_MS {
            return Ok(false);
        }
        self.latched = true;

        let honoured = reset_button_isr(rt);
        if honoured {
            info!("reset button: pressed");
        }
        Ok(honoured)
    }
}
