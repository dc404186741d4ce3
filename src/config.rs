//! Configuration loading and validation.
//!
//! The allow list is fixed at config time: once a [`Registry`](crate::registry::Registry)
//! is built from it, nothing can widen it.
//!
//! Precedence: `$EXPERIMENTS_CONFIG_PATH` > `~/.experiments/config.toml` > defaults.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::registry::{TokenPolicy, CORE_MODULES};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "EXPERIMENTS_CONFIG_PATH";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry settings (`[registry]`).
    pub registry: RegistryConfig,

    /// Logging settings (`[logging]`).
    pub logging: LoggingConfig,

    /// Audit trail settings (`[audit]`).
    pub audit: AuditConfig,
}

/// Registry settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Module identifiers allowed to register. Defaults to the core modules.
    #[serde(default = "default_allow_list")]
    pub allow_list: Vec<String>,

    /// Token check applied on reads.
    #[serde(default)]
    pub token_policy: TokenPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            allow_list: default_allow_list(),
            token_policy: TokenPolicy::default(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rotated JSON logs. Console only when unset.
    #[serde(default)]
    pub logs_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            logs_dir: None,
        }
    }
}

/// Audit trail settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Append-only JSON-lines file. No audit trail when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// A configuration that parsed but cannot be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No module could ever register.
    #[error("registry.allow_list is empty")]
    EmptyAllowList,
    /// An allow-list entry is empty or whitespace.
    #[error("registry.allow_list[{index}] is blank")]
    BlankModule {
        /// Position of the blank entry.
        index: usize,
    },
    /// The same identifier appears twice.
    #[error("registry.allow_list lists {module} more than once")]
    DuplicateModule {
        /// Repeated identifier.
        module: String,
    },
}

impl Config {
    /// Reject allow lists that are empty, blank, or repetitive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.allow_list.is_empty() {
            return Err(ConfigError::EmptyAllowList);
        }
        let mut seen = BTreeSet::new();
        for (index, module) in self.registry.allow_list.iter().enumerate() {
            let trimmed = module.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::BlankModule { index });
            }
            if !seen.insert(trimmed) {
                return Err(ConfigError::DuplicateModule {
                    module: trimmed.to_owned(),
                });
            }
        }
        Ok(())
    }
}

// Default value functions for serde

fn default_allow_list() -> Vec<String> {
    CORE_MODULES.iter().map(|m| (*m).to_owned()).collect()
}
fn default_log_level() -> String {
    "info".to_owned()
}

/// Load and validate a config from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or validated.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid config at {}: {e}", path.display()))?;
    Ok(config)
}

/// Resolve the default config directory (`~/.experiments/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".experiments"))
}

/// Load the config named by `$EXPERIMENTS_CONFIG_PATH`, else
/// `~/.experiments/config.toml` if it exists, else the defaults.
///
/// # Errors
///
/// Returns an error if a config file exists but cannot be loaded.
pub fn load_default_config() -> anyhow::Result<Config> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return load_config(Path::new(&path));
    }
    let path = config_dir()?.join("config.toml");
    if path.exists() {
        load_config(&path)
    } else {
        Ok(Config::default())
    }
}
