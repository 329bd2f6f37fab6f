//! Engine configuration
//!
//! Render context shared by the live bus and the offline renderer. Every
//! field has a default, so a JSON file only needs the keys it changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::buffer::DEFAULT_SAMPLE_RATE;
use crate::error::{MixError, Result};

/// Largest block the bus will render in one go
pub const MAX_BLOCK_SIZE: usize = 8192;

/// Render context for an engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Output channel count
    pub channels: usize,
    /// Frames per render block; parameters are read once per block
    pub block_size: usize,
    /// Time constant of live parameter ramps in milliseconds
    pub smoothing_ms: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 2,
            block_size: 128,
            smoothing_ms: 15.0,
        }
    }
}

impl EngineConfig {
    /// Check every field is usable
    pub fn validate(&self) -> Result<()> {
        if !(8000..=192_000).contains(&self.sample_rate) {
            return Err(MixError::InvalidConfig {
                reason: format!("sample rate {} Hz outside 8000..=192000", self.sample_rate),
            });
        }
        if self.channels == 0 || self.channels > 8 {
            return Err(MixError::InvalidConfig {
                reason: format!("channel count {} outside 1..=8", self.channels),
            });
        }
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(MixError::InvalidConfig {
                reason: format!("block size {} outside 1..={}", self.block_size, MAX_BLOCK_SIZE),
            });
        }
        if !self.smoothing_ms.is_finite() || self.smoothing_ms < 0.0 || self.smoothing_ms > 1000.0 {
            return Err(MixError::InvalidConfig {
                reason: format!("smoothing time {} ms outside 0..=1000", self.smoothing_ms),
            });
        }
        Ok(())
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Ramp time constant in seconds
    pub fn smoothing_secs(&self) -> f32 {
        self.smoothing_ms / 1000.0
    }
}
