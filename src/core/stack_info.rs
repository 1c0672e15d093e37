//! Last-known state of a deployed bootstrap stack.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Variant assumed when a template or stack does not declare one.
pub const DEFAULT_BOOTSTRAP_VARIANT: &str = "AWS CDK: Default Resources";

/// What the toolkit stack lookup reported about an environment's bootstrap stack.
///
/// `found == false` means no bootstrap stack exists yet; every other field
/// then holds its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapStackInfo {
    pub found: bool,
    pub version: u32,
    pub variant: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub stack_id: String,
    #[serde(default)]
    pub termination_protection: bool,
}

impl BootstrapStackInfo {
    /// Info for an environment that has never been bootstrapped.
    pub fn not_found() -> Self {
        BootstrapStackInfo {
            found: false,
            version: 0,
            variant: DEFAULT_BOOTSTRAP_VARIANT.to_string(),
            parameters: BTreeMap::new(),
            stack_id: String::new(),
            termination_protection: false,
        }
    }

    /// Info for an existing stack.
    pub fn found(stack_id: impl Into<String>, version: u32, variant: impl Into<String>) -> Self {
        BootstrapStackInfo {
            found: true,
            version,
            variant: variant.into(),
            parameters: BTreeMap::new(),
            stack_id: stack_id.into(),
            termination_protection: false,
        }
    }

    /// Add a deployed parameter value.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Set the termination protection flag.
    pub fn with_termination_protection(mut self, enabled: bool) -> Self {
        self.termination_protection = enabled;
        self
    }

    /// A deployed parameter value, if the stack has one.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// A deployed comma-separated list parameter.
    ///
    /// A missing or empty parameter yields an empty list.
    pub fn list_parameter(&self, name: &str) -> Vec<String> {
        split_cfn_array(self.parameter(name))
    }
}

/// Split a CloudFormation `CommaDelimitedList` value.
pub fn split_cfn_array(value: Option<&str>) -> Vec<String> {
    match value {
        None | Some("") => Vec::new(),
        Some(value) => value.split(',').map(|s| s.trim().to_string()).collect(),
    }
}
