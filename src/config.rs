//! Machine configuration
//!
//! Build-time options of the controller (boot policy, secondary serial
//! channel, secondary spindle, home coordinates) resolved once at
//! startup.  Values can be overridden from a JSON file on host builds.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::system::AxisVector;

/// Power-up safety policy.  Both checks are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootPolicy {
    /// Enter Alarm at boot when the stored settings enable homing, so a
    /// homing cycle (or explicit unlock) is required before motion.
    pub homing_init_lock: bool,
    /// Enter Alarm at every boot or hard reset, unconditionally.
    pub force_init_alarm: bool,
}

/// Communication channel options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommConfig {
    /// Baud rate for every serial channel.
    pub baud: u32,
    /// A second serial channel is fitted and must be initialised / flushed.
    pub secondary_channel: bool,
}

impl Default for CommConfig {
    fn default() -> Self {
        Self {
            baud: 115_200,
            secondary_channel: false,
        }
    }
}

/// Core machine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    // --- Communication ---
    pub comm: CommConfig,

    // --- Boot ---
    pub boot: BootPolicy,

    // --- Kinematics ---
    /// Commanded position seeded at bootstrap (X Y Z mm, RX RY RZ deg).
    pub home: AxisVector,

    // --- Parser defaults ---
    /// Feed rate restored into the parser on every reset pass (mm/min).
    pub default_feed_rate: f32,

    // --- Spindle ---
    /// A second variable spindle output is fitted.
    pub secondary_spindle: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            comm: CommConfig::default(),
            boot: BootPolicy::default(),
            // Arm rest pose: reach 160 mm, height 208 mm, no rotation.
            home: [160.0, 0.0, 208.0, 0.0, 0.0, 0.0],
            default_feed_rate: 200.0,
            secondary_spindle: false,
        }
    }
}

impl MachineConfig {
    /// Range-check every field.  Rejects rather than clamps.
    pub fn validate(&self) -> Result<()> {
        if self.comm.baud == 0 {
            return Err(Error::Config("comm.baud must be non-zero"));
        }
        if !self.home.iter().all(|v| v.is_finite()) {
            return Err(Error::Config("home coordinates must be finite"));
        }
        if !(self.default_feed_rate.is_finite() && self.default_feed_rate > 0.0) {
            return Err(Error::Config("default_feed_rate must be positive"));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration document.  Missing fields
    /// take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: Self =
            serde_json::from_str(text).map_err(|_| Error::Config("malformed JSON configuration"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
