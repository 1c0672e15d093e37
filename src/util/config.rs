//! Configuration file support for cfnboot.
//!
//! cfnboot supports two configuration file locations:
//! - Global: `~/.cfnboot/config.toml` - User-wide defaults
//! - Project: `.cfnboot/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::account::DEFAULT_MAX_ENTRIES;
use crate::ops::bootstrap::{DEFAULT_QUALIFIER, DEFAULT_TOOLKIT_STACK_NAME};
use crate::ops::validate::SSM_PERMISSION_BOOTSTRAP_VERSION;

/// cfnboot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bootstrap settings
    pub bootstrap: BootstrapConfig,

    /// Identity cache settings
    pub cache: CacheConfig,
}

/// Bootstrap-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Name of the bootstrap stack
    pub toolkit_stack_name: Option<String>,

    /// Qualifier namespacing bootstrap resources
    pub qualifier: Option<String>,

    /// Lowest bootstrap version whose roles may read the version parameter
    pub ssm_permission_version: Option<u32>,
}

/// Identity cache configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Override for the identity cache file location
    pub account_cache_file: Option<PathBuf>,

    /// Entries kept before the cache is reset
    pub max_entries: Option<usize>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.bootstrap.toolkit_stack_name.is_some() {
            self.bootstrap.toolkit_stack_name = other.bootstrap.toolkit_stack_name;
        }
        if other.bootstrap.qualifier.is_some() {
            self.bootstrap.qualifier = other.bootstrap.qualifier;
        }
        if other.bootstrap.ssm_permission_version.is_some() {
            self.bootstrap.ssm_permission_version = other.bootstrap.ssm_permission_version;
        }

        if other.cache.account_cache_file.is_some() {
            self.cache.account_cache_file = other.cache.account_cache_file;
        }
        if other.cache.max_entries.is_some() {
            self.cache.max_entries = other.cache.max_entries;
        }
    }

    pub fn toolkit_stack_name(&self) -> &str {
        self.bootstrap
            .toolkit_stack_name
            .as_deref()
            .unwrap_or(DEFAULT_TOOLKIT_STACK_NAME)
    }

    pub fn qualifier(&self) -> &str {
        self.bootstrap.qualifier.as_deref().unwrap_or(DEFAULT_QUALIFIER)
    }

    /// Name of the parameter holding the deployed bootstrap version.
    pub fn version_parameter_name(&self) -> String {
        format!("/cdk-bootstrap/{}/version", self.qualifier())
    }

    pub fn ssm_permission_version(&self) -> u32 {
        self.bootstrap
            .ssm_permission_version
            .unwrap_or(SSM_PERMISSION_BOOTSTRAP_VERSION)
    }

    pub fn max_cache_entries(&self) -> usize {
        self.cache.max_entries.unwrap_or(DEFAULT_MAX_ENTRIES)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.cfnboot/config.toml)
/// 2. Global config (~/.cfnboot/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the project config path (.cfnboot/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".cfnboot").join("config.toml")
}
