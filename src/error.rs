//! Unified error types for the controller.
//!
//! The supervisory loop itself never fails: faults travel through the
//! realtime flags and the operational state.  These types cover the
//! fallible edges around it (settings image decode, storage, hardware
//! init, configuration).  All variants are `Copy` so collaborators can
//! pass them around without allocation.

use core::fmt;

use crate::app::ports::StorageError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation outside the supervisory loop funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The persistent store could not be read or written.
    Storage(StorageError),
    /// A stored settings image is unusable.
    Settings(SettingsError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be parsed.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Settings(e) => write!(f, "settings: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Settings image errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsError {
    /// Image is shorter than header + checksum.
    Truncated,
    /// Version byte does not match the firmware's layout.
    VersionMismatch { found: u8 },
    /// Trailing checksum does not match the body.
    ChecksumMismatch,
    /// Body failed to deserialize.
    Decode,
    /// Settings could not be serialized.
    Encode,
    /// No setting has this `$` number.
    UnknownId(u16),
    /// Value out of range for the `$` setting.
    InvalidValue { id: u16 },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "image truncated"),
            Self::VersionMismatch { found } => write!(f, "unexpected version {found}"),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
            Self::Decode => write!(f, "decode failed"),
            Self::Encode => write!(f, "encode failed"),
            Self::UnknownId(id) => write!(f, "no setting ${id}"),
            Self::InvalidValue { id } => write!(f, "value out of range for ${id}"),
        }
    }
}

impl From<SettingsError> for Error {
    fn from(e: SettingsError) -> Self {
        Self::Settings(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
