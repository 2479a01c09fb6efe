//! Engine settings
//!
//! Settings live in a TOML file next to the permissions document:
//!
//! ```toml
//! version = 1
//! debug = false
//! default_group = "default"
//! membership_order = "later-overrides"
//! permissions_file = "permissions.toml"
//! ```
//!
//! Missing keys fall back to their defaults. A missing file is generated on
//! first load.

mod loader;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use loader::{permissions_path, settings_path, SETTINGS_FILE};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Which entry of a subject's group list wins on conflicting nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MembershipOrder {
    /// Groups listed later override groups listed earlier
    #[default]
    LaterOverrides,
    /// Groups listed earlier override groups listed later
    EarlierOverrides,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Enable debug logging
    pub debug: bool,

    /// Group that subjects without an entry belong to
    pub default_group: String,

    /// Precedence of a subject's group list
    pub membership_order: MembershipOrder,

    /// Permissions document, relative to the settings directory
    pub permissions_file: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: 1,
            debug: false,
            default_group: "default".to_string(),
            membership_order: MembershipOrder::default(),
            permissions_file: "permissions.toml".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load config from file, creating default if missing.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::debug!("Loaded engine config from {:?}", path);
            Ok(config)
        } else {
            let default = Self::default();
            default.save(path)?;
            tracing::info!("Created default engine config at {:?}", path);
            Ok(default)
        }
    }

    /// Save config to file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved engine config to {:?}", path);
        Ok(())
    }

    /// Reload config from file.
    pub fn reload(&mut self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        *self = toml::from_str(&content)?;
        tracing::debug!("Reloaded engine config from {:?}", path);
        Ok(())
    }
}
