//! Interfaces to the remote collaborators this crate consumes.
//!
//! Everything here is implemented outside the crate (by an SDK-backed
//! transport, a static file, or a test fake). Failures are reported through
//! the closed [`RemoteError`] taxonomy so callers can branch on
//! [`RemoteError::NotFound`] and [`RemoteError::AccessDenied`] explicitly.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::{BootstrapStackInfo, BootstrapTemplate, Environment};

/// Failure of a remote call.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The named entity does not exist.
    #[error("`{name}` not found")]
    NotFound { name: String },

    /// The caller lacks permission for the call.
    #[error("access denied: {message}")]
    AccessDenied { message: String },

    /// Anything else, propagated unchanged.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RemoteError {
    pub fn not_found(name: impl Into<String>) -> Self {
        RemoteError::NotFound { name: name.into() }
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        RemoteError::AccessDenied {
            message: message.into(),
        }
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Describes the bootstrap stack of an environment.
#[async_trait]
pub trait ToolkitLookup: Send + Sync {
    /// Look up the bootstrap stack, optionally under a non-default stack name.
    async fn lookup(
        &self,
        environment: &Environment,
        stack_name: Option<&str>,
    ) -> RemoteResult<BootstrapStackInfo>;
}

/// A value read from the parameter store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub value: String,
}

/// Reads single values from the remote key/value parameter store.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Fails with `NotFound` for a missing parameter and `AccessDenied` when
    /// the caller may not read it.
    async fn get_parameter(&self, environment: &Environment, name: &str) -> RemoteResult<Parameter>;
}

/// A value exported by a deployed stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    pub value: Option<String>,
}

impl Export {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Export {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// One page of the export listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportPage {
    pub exports: Vec<Export>,
    pub next_token: Option<String>,
}

/// Paginated listing of cross-stack exports.
#[async_trait]
pub trait ExportLister: Send + Sync {
    async fn list_exports(&self, next_token: Option<&str>) -> RemoteResult<ExportPage>;
}

/// Reads and creates managed IAM policies.
#[async_trait]
pub trait IamPolicies: Send + Sync {
    /// Returns the policy ARN, or `NotFound` when there is no such policy.
    async fn get_policy(&self, environment: &Environment, arn: &str) -> RemoteResult<String>;

    /// Creates a policy and returns its ARN.
    async fn create_policy(
        &self,
        environment: &Environment,
        name: &str,
        document: &str,
    ) -> RemoteResult<String>;
}

/// Stack parameters handed to the executor.
///
/// `None` asks the executor to keep the value already deployed.
pub type StackParameters = BTreeMap<String, Option<String>>;

/// Options for a bootstrap stack deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOptions {
    pub stack_name: String,
    pub termination_protection: bool,
    pub force: bool,
    pub use_previous_parameters: bool,
}

/// How a deployment ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployOutcome {
    Deployed,
    NoOp,
}

/// Result of a bootstrap stack deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployResult {
    pub outcome: DeployOutcome,
    pub outputs: BTreeMap<String, String>,
    pub stack_id: String,
}

impl DeployResult {
    /// A deployment that was skipped, leaving `stack_id` untouched.
    pub fn no_op(stack_id: impl Into<String>) -> Self {
        DeployResult {
            outcome: DeployOutcome::NoOp,
            outputs: BTreeMap::new(),
            stack_id: stack_id.into(),
        }
    }

    pub fn is_no_op(&self) -> bool {
        self.outcome == DeployOutcome::NoOp
    }
}

/// Deploys a template as a stack.
#[async_trait]
pub trait DeploymentExecutor: Send + Sync {
    async fn deploy(
        &self,
        environment: &Environment,
        template: &BootstrapTemplate,
        parameters: &StackParameters,
        options: &DeployOptions,
    ) -> RemoteResult<DeployResult>;
}

/// Advisory registry told which bootstrap versions were seen where.
pub trait NoticesRegistry: Send + Sync {
    fn record_bootstrapped_environment(&self, environment: &Environment, version: u32);
}
