//! Shared value types

use crate::error::{HistorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage a local clip is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStore {
    /// Removable SD card
    Sd,
    /// On-board flash filesystem (holds the beep clip)
    Internal,
}

impl FileStore {
    /// Mount point the store is exposed under
    pub fn mount_point(&self) -> &'static str {
        match self {
            FileStore::Sd => "/sdcard",
            FileStore::Internal => "/spiffs",
        }
    }
}

impl fmt::Display for FileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStore::Sd => write!(f, "sd"),
            FileStore::Internal => write!(f, "internal"),
        }
    }
}

/// Decoder volume level
///
/// The decoder accepts 22 discrete steps, 0 (silent) through 21 (full).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Volume(u8);

impl Volume {
    /// Silent
    pub const MIN: u8 = 0;

    /// Full volume
    pub const MAX: u8 = 21;

    /// Create a volume, rejecting levels above `Volume::MAX`
    pub fn new(level: u8) -> Result<Self> {
        if level > Self::MAX {
            return Err(HistorError::invalid_input(format!(
                "volume {} out of range {}..={}",
                level,
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(level))
    }

    /// Create a volume, saturating at `Volume::MAX`
    pub fn clamped(level: u32) -> Self {
        Self(level.min(u32::from(Self::MAX)) as u8)
    }

    /// Raw level
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}
