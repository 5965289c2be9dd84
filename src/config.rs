//! TOML configuration for the engine
//!
//! A config file can pre-seed the template search directories, name
//! aliases, global params and the default-slot promotion policy. All
//! tables are optional.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::engine::DefaultSlotPromotion;
use crate::value::{Params, Value};

/// Errors that can occur when loading or parsing a config file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Engine configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Template search directories, probed in order
    #[serde(default)]
    pub directories: Vec<PathBuf>,
    /// Alias name -> target name
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    /// Global params merged into every component call
    #[serde(default)]
    pub params: HashMap<String, Value>,
    /// When a component's call-site content becomes its default slot
    #[serde(default)]
    pub default_slot_promotion: DefaultSlotPromotion,
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Global params as an ordered map
    pub fn params(&self) -> Params {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            aliases: HashMap::new(),
            params: HashMap::new(),
            default_slot_promotion: DefaultSlotPromotion::default(),
        }
    }
}
