//! Host configuration, read from TOML.
//!
//! ```toml
//! sample_rate = 48000
//! block_size = 32
//! command_capacity = 64
//! log_filter = "bb_engine=debug,info"
//! ```
//!
//! Every key is optional.

use serde::Deserialize;
use std::path::Path;

use crate::error::{HostError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Samples per second the slopes advance at.
    pub sample_rate: u32,
    /// Samples per audio-context step.
    pub block_size: usize,
    /// Commands that can be in flight to the audio context.
    pub command_capacity: usize,
    /// `tracing-subscriber` env-filter directive, applied by `Controller::spawn`.
    pub log_filter: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 32,
            command_capacity: 64,
            log_filter: "info".into(),
        }
    }
}

impl HostConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: HostConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(HostError::InvalidConfig("sample_rate must be positive"));
        }
        if self.block_size == 0 {
            return Err(HostError::InvalidConfig("block_size must be positive"));
        }
        if self.command_capacity == 0 {
            return Err(HostError::InvalidConfig("command_capacity must be positive"));
        }
        Ok(())
    }

    /// Wall-clock length of one block.
    pub fn block_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.block_size as f64 / self.sample_rate as f64)
    }
}
