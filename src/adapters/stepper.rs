//! Step / direction pulse generator over `embedded-hal` outputs.
//!
//! Each axis owns a step pin and a direction pin.  Idle levels follow the
//! invert masks from settings: a set bit in `step_invert_mask` means the
//! step line idles high and pulses low.
//!
//! A single block may ask at most [`MAX_BLOCK_STEPS`] of any axis; longer
//! moves are refused before a pulse is emitted.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};

use crate::settings::Settings;
use crate::system::{AxisVector, N_AXIS};

/// Per-axis step count one block may not exceed.
pub const MAX_BLOCK_STEPS: u64 = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepError<E> {
    /// An output pin failed.
    Pin(E),
    /// The move needs more than [`MAX_BLOCK_STEPS`] on some axis.
    TooLong,
}

pub struct Stepper<P> {
    step: [P; N_AXIS],
    dir: [P; N_AXIS],
    step_invert: u8,
    dir_invert: u8,
    steps_per_mm: AxisVector,
    /// Net steps per axis since the last reset.
    counts: [i64; N_AXIS],
    /// Total pulses since the last reset.
    pulses: u64,
    ready: bool,
}

impl<P: OutputPin> Stepper<P> {
    pub fn new(step: [P; N_AXIS], dir: [P; N_AXIS]) -> Self {
        Self {
            step,
            dir,
            step_invert: 0,
            dir_invert: 0,
            steps_per_mm: [0.0; N_AXIS],
            counts: [0; N_AXIS],
            pulses: 0,
            ready: false,
        }
    }

    /// Apply timing and polarity settings and park every output at idle.
    pub fn init(&mut self, settings: &Settings) -> Result<(), P::Error> {
        self.step_invert = settings.step_invert_mask;
        self.dir_invert = settings.dir_invert_mask;
        self.steps_per_mm = settings.steps_per_mm;
        self.ready = true;
        self.reset()
    }

    /// Clear runtime counters and park every output at idle.
    pub fn reset(&mut self) -> Result<(), P::Error> {
        self.counts = [0; N_AXIS];
        self.pulses = 0;
        for axis in 0..N_AXIS {
            let idle = self.step_idle(axis);
            self.step[axis].set_state(idle)?;
            self.dir[axis].set_state(self.dir_level(axis, false))?;
        }
        Ok(())
    }

    /// Signed step count per axis for a move from `from` to `to`, or
    /// `None` if any axis would exceed [`MAX_BLOCK_STEPS`].
    pub fn block_steps(&self, from: &AxisVector, to: &AxisVector) -> Option<[i64; N_AXIS]> {
        let mut steps = [0; N_AXIS];
        for axis in 0..N_AXIS {
            let delta = ((to[axis] - from[axis]) * self.steps_per_mm[axis]).round();
            if !delta.is_finite() || delta.abs() > MAX_BLOCK_STEPS as f32 {
                return None;
            }
            steps[axis] = delta as i64;
        }
        Some(steps)
    }

    /// Emit the pulses for a straight move from `from` to `to`.  Returns
    /// the number of pulses emitted.
    pub fn execute(
        &mut self,
        from: &AxisVector,
        to: &AxisVector,
    ) -> Result<u64, StepError<P::Error>> {
        let steps = self.block_steps(from, to).ok_or(StepError::TooLong)?;
        let mut emitted = 0;
        for (axis, &delta) in steps.iter().enumerate() {
            if delta == 0 {
                continue;
            }
            self.dir[axis]
                .set_state(self.dir_level(axis, delta < 0))
                .map_err(StepError::Pin)?;

            let idle = self.step_idle(axis);
            let active = !idle;
            for _ in 0..delta.unsigned_abs() {
                self.step[axis].set_state(active).map_err(StepError::Pin)?;
                self.step[axis].set_state(idle).map_err(StepError::Pin)?;
            }
            self.counts[axis] += delta;
            emitted += delta.unsigned_abs();
        }
        self.pulses += emitted;
        Ok(emitted)
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn counts(&self) -> &[i64; N_AXIS] {
        &self.counts
    }

    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    pub fn step_pins(&self) -> &[P; N_AXIS] {
        &self.step
    }

    pub fn dir_pins(&self) -> &[P; N_AXIS] {
        &self.dir
    }

    fn step_idle(&self, axis: usize) -> PinState {
        PinState::from(self.step_invert & (1 << axis) != 0)
    }

    fn dir_level(&self, axis: usize, negative: bool) -> PinState {
        PinState::from(negative ^ (self.dir_invert & (1 << axis) != 0))
    }
}

// ---------------------------------------------------------------------------
// Simulated pin
// ---------------------------------------------------------------------------

/// Pin that records its level and counts rising edges.  Reads back the
/// last level driven, so tests can also use it as an input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimPin {
    high: bool,
    rising_edges: u32,
}

impl SimPin {
    pub const fn new(high: bool) -> Self {
        Self {
            high,
            rising_edges: 0,
        }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn rising_edges(&self) -> u32 {
        self.rising_edges
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if !self.high {
            self.rising_edges += 1;
        }
        self.high = true;
        Ok(())
    }
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

impl Stepper<SimPin> {
    pub fn simulated() -> Self {
        Self::new([SimPin::default(); N_AXIS], [SimPin::default(); N_AXIS])
    }
}
