//! Settings persistence.
//!
//! [`EepromSettings`] implements [`SettingsPort`] on top of any
//! [`StoragePort`]: it decodes the stored image and, when the image is
//! missing or unusable, falls back to defaults and writes them back so
//! the next boot finds a valid block.
//!
//! [`MemoryEeprom`] is the in-memory backing store used by the host build
//! and tests.

use log::{info, warn};

use crate::app::ports::{SettingsPort, StorageError, StoragePort};
use crate::error::Error;
use crate::settings::Settings;

/// Largest image the emulated EEPROM accepts.
pub const EEPROM_SIZE: usize = 1024;

// ---------------------------------------------------------------------------
// In-memory backing store
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct MemoryEeprom {
    image: Option<Vec<u8>>,
    writes: u32,
}

impl MemoryEeprom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load raw bytes, bypassing the size check.
    pub fn with_image(image: Vec<u8>) -> Self {
        Self {
            image: Some(image),
            writes: 0,
        }
    }

    pub fn image(&self) -> Option<&[u8]> {
        self.image.as_deref()
    }

    /// Successful writes since construction.
    pub fn writes(&self) -> u32 {
        self.writes
    }
}

impl StoragePort for MemoryEeprom {
    fn read(&self, buf: &mut [u8]) -> Result<usize, StorageError> {
        let image = self.image.as_ref().ok_or(StorageError::Empty)?;
        let dst = buf.get_mut(..image.len()).ok_or(StorageError::TooLarge)?;
        dst.copy_from_slice(image);
        Ok(image.len())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > EEPROM_SIZE {
            return Err(StorageError::TooLarge);
        }
        self.image = Some(data.to_vec());
        self.writes += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SettingsPort over storage
// ---------------------------------------------------------------------------

pub struct EepromSettings<S> {
    storage: S,
}

impl<S: StoragePort> EepromSettings<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Read and decode the stored image.
    pub fn read_settings(&self) -> Result<Settings, Error> {
        let mut buf = [0u8; EEPROM_SIZE];
        let len = self.storage.read(&mut buf)?;
        Ok(Settings::from_image(&buf[..len])?)
    }

    /// Encode and store `settings`.
    pub fn store(&mut self, settings: &Settings) -> Result<(), Error> {
        let image = settings.to_image()?;
        self.storage.write(&image)?;
        Ok(())
    }
}

impl<S: StoragePort> SettingsPort for EepromSettings<S> {
    fn load_settings(&mut self) -> Settings {
        match self.read_settings() {
            Ok(settings) => {
                info!("settings: loaded from storage");
                settings
            }
            Err(e) => {
                warn!("settings: {}, restoring defaults", e);
                let defaults = Settings::default();
                if let Err(e) = self.store(&defaults) {
                    warn!("settings: could not write defaults: {}", e);
                }
                defaults
            }
        }
    }
}
