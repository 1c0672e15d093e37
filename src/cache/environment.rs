//! Per-environment cache of bootstrap stack lookups and parameter values.
//!
//! An [`EnvironmentRegistry`] owns one cache record per [`Environment`] and
//! bootstrap stack name for as long as the registry lives.
//! [`EnvironmentResources`] handles are cheap views over a record plus the
//! remote collaborators; every handle created for the same environment and
//! stack name from the same registry shares the record, so a value is
//! fetched remotely at most once.
//!
//! Two concurrent first lookups may both hit the remote; the later write
//! wins, which is harmless because both fetched the same data.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use crate::core::{BootstrapStackInfo, Environment};
use crate::ops::bootstrap::DEFAULT_TOOLKIT_STACK_NAME;
use crate::remote::{ParameterStore, RemoteError, ToolkitLookup};
use crate::util::config::Config;

/// Failure to read a bootstrap version.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("parameter `{name}` not found")]
    ParameterNotFound { name: String },

    #[error("access denied reading parameter `{name}`: {message}")]
    AccessDenied { name: String, message: String },

    #[error("parameter `{name}` does not hold a bootstrap version: `{value}`")]
    InvalidVersion { name: String, value: String },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[derive(Debug, Default)]
struct EnvironmentCacheEntry {
    bootstrap_info: Option<BootstrapStackInfo>,
    parameter_versions: HashMap<String, u32>,
}

type SharedEntry = Arc<Mutex<EnvironmentCacheEntry>>;

/// Records are keyed by environment and the bootstrap stack name.
type EntryMap = HashMap<(Environment, String), SharedEntry>;

/// Owns the cache records of every environment seen so far.
#[derive(Debug, Default)]
pub struct EnvironmentRegistry {
    entries: Arc<Mutex<EntryMap>>,
    toolkit_stack_name: Option<String>,
}

impl EnvironmentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        EnvironmentRegistry::default()
    }

    /// Create an empty registry using the configured bootstrap stack name.
    pub fn from_config(config: &Config) -> Self {
        EnvironmentRegistry {
            entries: Arc::default(),
            toolkit_stack_name: config.bootstrap.toolkit_stack_name.clone(),
        }
    }

    /// Hand out handles that look the bootstrap stack up under `name`.
    pub fn with_toolkit_stack_name(mut self, name: impl Into<String>) -> Self {
        self.toolkit_stack_name = Some(name.into());
        self
    }

    /// Get a handle on the cache record of `environment`, creating it lazily.
    pub fn for_environment(
        &self,
        environment: &Environment,
        toolkit: Arc<dyn ToolkitLookup>,
        parameters: Arc<dyn ParameterStore>,
    ) -> EnvironmentResources {
        let entry = entry_for(&self.entries, environment, self.toolkit_stack_name.as_deref());

        EnvironmentResources {
            environment: environment.clone(),
            entries: Arc::clone(&self.entries),
            entry,
            toolkit,
            parameters,
            toolkit_stack_name: self.toolkit_stack_name.clone(),
        }
    }

    /// Number of cache records.
    pub fn len(&self) -> usize {
        lock(&*self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn entry_for(
    entries: &Mutex<EntryMap>,
    environment: &Environment,
    stack_name: Option<&str>,
) -> SharedEntry {
    let key = (
        environment.clone(),
        stack_name.unwrap_or(DEFAULT_TOOLKIT_STACK_NAME).to_string(),
    );
    Arc::clone(lock(entries).entry(key).or_default())
}

/// Cached view of one environment's bootstrap resources.
#[derive(Clone)]
pub struct EnvironmentResources {
    environment: Environment,
    entries: Arc<Mutex<EntryMap>>,
    entry: SharedEntry,
    toolkit: Arc<dyn ToolkitLookup>,
    parameters: Arc<dyn ParameterStore>,
    toolkit_stack_name: Option<String>,
}

impl EnvironmentResources {
    /// Switch to the cache record of the bootstrap stack called `name`.
    pub fn with_toolkit_stack_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.entry = entry_for(&self.entries, &self.environment, Some(&name));
        self.toolkit_stack_name = Some(name);
        self
    }

    /// Name of the bootstrap stack this handle describes.
    pub fn toolkit_stack_name(&self) -> &str {
        self.toolkit_stack_name
            .as_deref()
            .unwrap_or(DEFAULT_TOOLKIT_STACK_NAME)
    }

    /// The environment this handle serves.
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Describe the bootstrap stack, fetching it on first use only.
    pub async fn lookup_toolkit(&self) -> Result<BootstrapStackInfo, LookupError> {
        if let Some(info) = lock(&self.entry).bootstrap_info.clone() {
            return Ok(info);
        }

        tracing::debug!(
            "looking up bootstrap stack {} in {}",
            self.toolkit_stack_name(),
            self.environment
        );
        let info = self
            .toolkit
            .lookup(&self.environment, self.toolkit_stack_name.as_deref())
            .await?;

        lock(&self.entry).bootstrap_info = Some(info.clone());
        Ok(info)
    }

    /// Read a bootstrap version from the parameter store, fetching each
    /// parameter on first use only.
    pub async fn version_from_parameter_store(&self, name: &str) -> Result<u32, LookupError> {
        if let Some(version) = lock(&self.entry).parameter_versions.get(name).copied() {
            return Ok(version);
        }

        tracing::debug!("reading parameter {} in {}", name, self.environment);
        let parameter = self
            .parameters
            .get_parameter(&self.environment, name)
            .await
            .map_err(|e| match e {
                RemoteError::NotFound { .. } => LookupError::ParameterNotFound {
                    name: name.to_string(),
                },
                RemoteError::AccessDenied { message } => LookupError::AccessDenied {
                    name: name.to_string(),
                    message,
                },
                other => LookupError::Remote(other),
            })?;

        let version =
            parameter
                .value
                .trim()
                .parse::<u32>()
                .map_err(|_| LookupError::InvalidVersion {
                    name: name.to_string(),
                    value: parameter.value.clone(),
                })?;

        lock(&self.entry)
            .parameter_versions
            .insert(name.to_string(), version);
        Ok(version)
    }
}

// A poisoned cache only means another flow panicked mid-update; the data is
// still a plain value, so keep using it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
