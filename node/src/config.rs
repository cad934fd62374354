//! Node configuration file (`config.toml` in the home directory).
//!
//! ```toml
//! address_prefix = "cosmos"
//! log_level = "info"
//! log_format = "pretty"
//! ```
//!
//! Every key is optional. A missing file means all defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tollroad_protocol::config::{Params, DEFAULT_ADDRESS_PREFIX, MODULE_ACCOUNT};

use crate::logging::LogFormat;

/// File name of the configuration inside the home directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Directory of the sled database inside the home directory.
pub const DATA_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Bech32 prefix every account address must carry.
    pub address_prefix: String,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            address_prefix: DEFAULT_ADDRESS_PREFIX.to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl NodeConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("invalid TOML in config file {}", path.display()))
    }

    /// Write the defaults to `path` unless a file already exists there.
    /// Returns whether a file was written.
    pub fn write_default(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        let content = toml::to_string_pretty(&Self::default())
            .context("failed to serialize default config")?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config file {}", path.display()))?;
        Ok(true)
    }

    /// Module parameters implied by this configuration.
    pub fn params(&self) -> Params {
        Params {
            address_prefix: self.address_prefix.clone(),
            module_account: MODULE_ACCOUNT.to_string(),
        }
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
