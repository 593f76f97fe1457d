//! Spindle, coolant, limit switch and probe state.
//!
//! These hold the logical state the engine drives; the ESP-IDF build maps
//! them onto the GPIOs in [`crate::pins`] through [`crate::drivers::hw_init`].

use crate::drivers::hw_init;
use crate::pins;
use crate::system::{Axis, N_AXIS};

// ---------------------------------------------------------------------------
// Spindle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpindleDirection {
    #[default]
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Spindle {
    enable_gpio: i32,
    pub running: bool,
    pub direction: SpindleDirection,
    pub rpm: f32,
}

impl Spindle {
    pub fn new(enable_gpio: i32) -> Self {
        Self {
            enable_gpio,
            ..Self::default()
        }
    }

    pub fn start(&mut self, direction: SpindleDirection, rpm: f32) {
        self.running = true;
        self.direction = direction;
        self.rpm = rpm;
        hw_init::gpio_write(self.enable_gpio, true);
        hw_init::gpio_write(
            pins::SPINDLE_DIR_GPIO,
            direction == SpindleDirection::CounterClockwise,
        );
    }

    /// Stop and return to the power-up state.
    pub fn reset(&mut self) {
        self.running = false;
        self.direction = SpindleDirection::Clockwise;
        self.rpm = 0.0;
        hw_init::gpio_write(self.enable_gpio, false);
    }
}

// ---------------------------------------------------------------------------
// Coolant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Coolant {
    pub flood: bool,
    pub mist: bool,
}

impl Coolant {
    pub fn set(&mut self, flood: bool, mist: bool) {
        self.flood = flood;
        self.mist = mist;
        hw_init::gpio_write(pins::COOLANT_FLOOD_GPIO, flood);
        hw_init::gpio_write(pins::COOLANT_MIST_GPIO, mist);
    }

    pub fn reset(&mut self) {
        self.set(false, false);
    }
}

// ---------------------------------------------------------------------------
// Limit switches
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Limits {
    armed: bool,
    /// Bit per axis, set while a switch reads as tripped.
    tripped: u8,
    /// Trips already returned by [`Limits::poll`].
    reported: u8,
}

impl Limits {
    /// Re-arm sensing and clear latched trips.
    pub fn arm(&mut self) {
        self.armed = true;
        self.tripped = 0;
        self.reported = 0;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Latch a trip on `axis`.  Returns `true` if sensing was armed, i.e.
    /// the trip must be reported.
    pub fn trip(&mut self, axis: Axis) -> bool {
        self.tripped |= 1 << axis.index();
        self.armed
    }

    pub fn tripped_mask(&self) -> u8 {
        self.tripped
    }

    /// Poll the switch inputs, latching any that read as tripped.  Returns
    /// the axes tripped since the previous poll; always 0 while disarmed.
    pub fn poll(&mut self, invert: bool) -> u8 {
        for axis in Axis::ALL {
            // Normally-closed switches with pull-ups read high when open.
            let open = hw_init::gpio_read(pins::LIMIT_GPIO[axis.index()]) != invert;
            if !open {
                self.tripped |= 1 << axis.index();
            }
        }
        let fresh = self.tripped & !self.reported & ((1 << N_AXIS) - 1);
        self.reported = self.tripped;
        if self.armed { fresh } else { 0 }
    }
}

// ---------------------------------------------------------------------------
// Probe
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Probe {
    pub triggered: bool,
    pub cycle_active: bool,
}

impl Probe {
    pub fn reset(&mut self) {
        self.triggered = false;
        self.cycle_active = false;
    }
}
