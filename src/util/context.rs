//! Global context for cfnboot operations.
//!
//! Provides centralized access to configuration, paths, and environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::BaseDirs;

use crate::cache::account::{AccountIdentityCache, CACHE_FILE_NAME};
use crate::util::config::{load_config, project_config_path, Config};

/// Environment variable overriding the cfnboot home directory.
pub const HOME_ENV: &str = "CFNBOOT_HOME";

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global cfnboot data (~/.cfnboot/)
    home: PathBuf,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let home = match std::env::var_os(HOME_ENV) {
            Some(home) if !home.is_empty() => PathBuf::from(home),
            _ => BaseDirs::new()
                .map(|b| b.home_dir().join(".cfnboot"))
                .unwrap_or_else(|| PathBuf::from(".cfnboot")),
        };

        Ok(GlobalContext { cwd, home })
    }

    /// Create a GlobalContext rooted at explicit directories.
    pub fn with_paths(cwd: PathBuf, home: PathBuf) -> Self {
        GlobalContext { cwd, home }
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the cfnboot home directory (~/.cfnboot/).
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the global cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.home.join("cache")
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Get the project configuration file path.
    pub fn project_config_path(&self) -> PathBuf {
        project_config_path(&self.cwd)
    }

    /// Load the merged global and project configuration.
    pub fn config(&self) -> Config {
        load_config(&self.config_path(), &self.project_config_path())
    }

    /// Location of the account identity cache file.
    pub fn account_cache_path(&self, config: &Config) -> PathBuf {
        match &config.cache.account_cache_file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.cwd.join(path),
            None => self.cache_dir().join(CACHE_FILE_NAME),
        }
    }

    /// Open the account identity cache configured for this context.
    pub fn account_cache(&self, config: &Config) -> AccountIdentityCache {
        AccountIdentityCache::new(self.account_cache_path(config))
            .with_max_entries(config.max_cache_entries())
    }
}
