//! Persistent machine settings.
//!
//! The `$`-settings block stored in non-volatile memory.  The image
//! layout is:
//!
//! ```text
//! ┌─────────┬──────────────────────────────┬──────────┐
//! │ version │ postcard-encoded `Settings`  │ checksum │
//! │  1 byte │        variable              │  1 byte  │
//! └─────────┴──────────────────────────────┴──────────┘
//! ```
//!
//! The checksum covers the body only and is the rotate-and-add sum the
//! controller has always used for its EEPROM blocks.

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::system::{AxisVector, N_AXIS};

/// Layout version of the stored image.  Bump when `Settings` changes.
pub const SETTINGS_VERSION: u8 = 10;

/// Boolean settings packed into [`Settings::flags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SettingsFlag {
    ReportInches = 0b0000_0001,
    AutoStart = 0b0000_0010,
    InvertStepEnable = 0b0000_0100,
    HardLimitEnable = 0b0000_1000,
    HomingEnable = 0b0001_0000,
    SoftLimitEnable = 0b0010_0000,
    InvertLimitPins = 0b0100_0000,
    InvertProbePin = 0b1000_0000,
}

impl SettingsFlag {
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

/// Global persistent settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    // --- Axes ---
    pub steps_per_mm: AxisVector,
    /// mm/min
    pub max_rate: AxisVector,
    /// mm/min²
    pub acceleration: AxisVector,
    /// mm, stored positive
    pub max_travel: AxisVector,

    // --- Stepper ---
    pub pulse_microseconds: u8,
    pub step_invert_mask: u8,
    pub dir_invert_mask: u8,
    /// ms; 255 keeps the drivers enabled.
    pub stepper_idle_lock_time: u8,

    // --- Planner ---
    pub junction_deviation: f32,
    pub arc_tolerance: f32,

    // --- Homing ---
    pub homing_feed_rate: f32,
    pub homing_seek_rate: f32,
    pub homing_debounce_ms: u16,
    pub homing_pulloff: f32,

    /// See [`SettingsFlag`].
    pub flags: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            steps_per_mm: [250.0; N_AXIS],
            max_rate: [500.0; N_AXIS],
            acceleration: [10.0 * 60.0 * 60.0; N_AXIS],
            // Linear axes in mm, rotary in degrees.
            max_travel: [300.0, 300.0, 300.0, 360.0, 360.0, 360.0],

            pulse_microseconds: 10,
            step_invert_mask: 0,
            dir_invert_mask: 0,
            stepper_idle_lock_time: 25,

            junction_deviation: 0.01,
            arc_tolerance: 0.002,

            homing_feed_rate: 25.0,
            homing_seek_rate: 500.0,
            homing_debounce_ms: 250,
            homing_pulloff: 1.0,

            flags: SettingsFlag::AutoStart.mask(),
        }
    }
}

impl Settings {
    pub fn has_flag(&self, flag: SettingsFlag) -> bool {
        self.flags & flag.mask() != 0
    }

    pub fn set_flag(&mut self, flag: SettingsFlag, on: bool) {
        if on {
            self.flags |= flag.mask();
        } else {
            self.flags &= !flag.mask();
        }
    }

    /// Homing cycle enabled (`$22`).
    pub fn homing_enabled(&self) -> bool {
        self.has_flag(SettingsFlag::HomingEnable)
    }

    /// Write setting `$<id>`, numbered as in the `$$` dump.  Fails without
    /// changing anything on an unknown id or an out-of-range value.
    pub fn set_by_id(&mut self, id: u16, value: f32) -> Result<(), SettingsError> {
        let invalid = SettingsError::InvalidValue { id };
        if !value.is_finite() {
            return Err(invalid);
        }

        if let Some(flag) = flag_for_id(id) {
            let on = match value {
                v if v == 0.0 => false,
                v if v == 1.0 => true,
                _ => return Err(invalid),
            };
            self.set_flag(flag, on);
            return Ok(());
        }

        let byte = |max: u8| whole(value, max.into()).and_then(|v| u8::try_from(v).ok());
        let positive = || if value > 0.0 { Ok(value) } else { Err(invalid) };
        match id {
            0 => self.pulse_microseconds = byte(u8::MAX).filter(|v| *v > 0).ok_or(invalid)?,
            1 => self.stepper_idle_lock_time = byte(u8::MAX).ok_or(invalid)?,
            2 => self.step_invert_mask = byte(AXIS_MASK).ok_or(invalid)?,
            3 => self.dir_invert_mask = byte(AXIS_MASK).ok_or(invalid)?,
            11 => self.junction_deviation = positive()?,
            12 => self.arc_tolerance = positive()?,
            24 => self.homing_feed_rate = positive()?,
            25 => self.homing_seek_rate = positive()?,
            26 => self.homing_debounce_ms = whole(value, u16::MAX).ok_or(invalid)?,
            27 => {
                if value < 0.0 {
                    return Err(invalid);
                }
                self.homing_pulloff = value;
            }
            _ => {
                let values = match id / 10 {
                    10 => &mut self.steps_per_mm,
                    11 => &mut self.max_rate,
                    12 => &mut self.acceleration,
                    13 => &mut self.max_travel,
                    _ => return Err(SettingsError::UnknownId(id)),
                };
                let slot = values
                    .get_mut(usize::from(id % 10))
                    .ok_or(SettingsError::UnknownId(id))?;
                *slot = positive()?;
            }
        }
        Ok(())
    }

    /// Encode into a versioned, checksummed image.
    pub fn to_image(&self) -> Result<Vec<u8>, SettingsError> {
        let body = postcard::to_allocvec(self).map_err(|_| SettingsError::Encode)?;
        let mut image = Vec::with_capacity(body.len() + 2);
        image.push(SETTINGS_VERSION);
        image.extend_from_slice(&body);
        image.push(checksum(&body));
        Ok(image)
    }

    /// Decode an image produced by [`Settings::to_image`].
    pub fn from_image(image: &[u8]) -> Result<Self, SettingsError> {
        let [version, body @ .., sum] = image else {
            return Err(SettingsError::Truncated);
        };
        if *version != SETTINGS_VERSION {
            return Err(SettingsError::VersionMismatch { found: *version });
        }
        if checksum(body) != *sum {
            return Err(SettingsError::ChecksumMismatch);
        }
        postcard::from_bytes(body).map_err(|_| SettingsError::Decode)
    }
}

const AXIS_MASK: u8 = (1 << N_AXIS) - 1;

fn flag_for_id(id: u16) -> Option<SettingsFlag> {
    let flag = match id {
        4 => SettingsFlag::InvertStepEnable,
        5 => SettingsFlag::InvertLimitPins,
        6 => SettingsFlag::InvertProbePin,
        13 => SettingsFlag::ReportInches,
        20 => SettingsFlag::SoftLimitEnable,
        21 => SettingsFlag::HardLimitEnable,
        22 => SettingsFlag::HomingEnable,
        _ => return None,
    };
    Some(flag)
}

/// `value` as a whole number in `0..=max`.
fn whole(value: f32, max: u16) -> Option<u16> {
    (value.fract() == 0.0 && (0.0..=f32::from(max)).contains(&value)).then_some(value as u16)
}

/// Rotate-left-and-add checksum over `data`.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter()
        .fold(0u8, |acc, &b| acc.rotate_left(1).wrapping_add(b))
}
