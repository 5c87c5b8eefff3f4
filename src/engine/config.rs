//! Engine configuration.
//!
//! Loaded from JSON the same way checkpoints store their metadata.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Run parameters for [`Engine`](super::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of epochs `run` performs when no explicit count is given.
    pub max_epochs: usize,
    /// Iterations per epoch; `None` means the whole dataset.
    pub epoch_length: Option<usize>,
    /// Emit a progress trace every `log_every` iterations.
    pub log_every: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_epochs: 1,
            epoch_length: None,
            log_every: 100,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_epochs == 0 {
            return Err(EngineError::Config("max_epochs must be at least 1".to_string()));
        }
        if self.log_every == 0 {
            return Err(EngineError::Config("log_every must be at least 1".to_string()));
        }
        if self.epoch_length == Some(0) {
            return Err(EngineError::Config("epoch_length must be positive".to_string()));
        }
        Ok(())
    }
}
