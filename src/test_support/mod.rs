//! Test utilities and fakes for cfnboot unit tests.
//!
//! Every remote collaborator has an in-memory fake here that records how
//! often it was called, so tests can assert on caching behaviour.
//!
//! # Example
//!
//! ```rust,ignore
//! use cfnboot::test_support::{FakeToolkitLookup, FakeParameterStore};
//!
//! let toolkit = Arc::new(FakeToolkitLookup::new(BootstrapStackInfo::not_found()));
//! let params = Arc::new(FakeParameterStore::new().with_value("/cdk-bootstrap/x/version", "21"));
//! // hand them to an EnvironmentRegistry, then assert on toolkit.calls()
//! ```

pub mod fixtures;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::{BootstrapStackInfo, BootstrapTemplate, Environment};
use crate::remote::{
    DeployOptions, DeployOutcome, DeployResult, DeploymentExecutor, ExportLister, ExportPage,
    IamPolicies, NoticesRegistry, Parameter, ParameterStore, RemoteError, RemoteResult,
    StackParameters, ToolkitLookup,
};
use crate::util::reporter::Reporter;

// Re-export fixtures for convenience
pub use fixtures::*;

/// Toolkit lookup returning a fixed stack description.
#[derive(Debug)]
pub struct FakeToolkitLookup {
    info: Result<BootstrapStackInfo, String>,
    named: HashMap<String, BootstrapStackInfo>,
    calls: AtomicUsize,
    stack_names: Mutex<Vec<Option<String>>>,
}

impl FakeToolkitLookup {
    /// Always report `info`.
    pub fn new(info: BootstrapStackInfo) -> Self {
        FakeToolkitLookup {
            info: Ok(info),
            named: HashMap::new(),
            calls: AtomicUsize::new(0),
            stack_names: Mutex::new(Vec::new()),
        }
    }

    /// Always fail with an unclassified remote error.
    pub fn failing(message: impl Into<String>) -> Self {
        FakeToolkitLookup {
            info: Err(message.into()),
            named: HashMap::new(),
            calls: AtomicUsize::new(0),
            stack_names: Mutex::new(Vec::new()),
        }
    }

    /// Report `info` for lookups under the stack name `name`.
    pub fn with_stack(mut self, name: &str, info: BootstrapStackInfo) -> Self {
        self.named.insert(name.to_string(), info);
        self
    }

    /// Number of remote lookups performed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Stack name overrides passed to each lookup.
    pub fn stack_names(&self) -> Vec<Option<String>> {
        self.stack_names.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolkitLookup for FakeToolkitLookup {
    async fn lookup(
        &self,
        _environment: &Environment,
        stack_name: Option<&str>,
    ) -> RemoteResult<BootstrapStackInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.stack_names
            .lock()
            .unwrap()
            .push(stack_name.map(str::to_string));
        if let Some(info) = stack_name.and_then(|name| self.named.get(name)) {
            return Ok(info.clone());
        }
        match &self.info {
            Ok(info) => Ok(info.clone()),
            Err(message) => Err(RemoteError::Other(anyhow::anyhow!("{}", message))),
        }
    }
}

#[derive(Debug, Clone)]
enum ParameterOutcome {
    Value(String),
    AccessDenied,
    Error(String),
}

/// Parameter store backed by a map. Unknown names are `NotFound`.
#[derive(Debug, Default)]
pub struct FakeParameterStore {
    parameters: HashMap<String, ParameterOutcome>,
    calls: AtomicUsize,
}

impl FakeParameterStore {
    pub fn new() -> Self {
        FakeParameterStore::default()
    }

    /// Serve `value` for `name`.
    pub fn with_value(mut self, name: &str, value: &str) -> Self {
        self.parameters
            .insert(name.to_string(), ParameterOutcome::Value(value.to_string()));
        self
    }

    /// Deny access to `name`.
    pub fn with_access_denied(mut self, name: &str) -> Self {
        self.parameters
            .insert(name.to_string(), ParameterOutcome::AccessDenied);
        self
    }

    /// Fail reads of `name` with an unclassified error.
    pub fn with_error(mut self, name: &str, message: &str) -> Self {
        self.parameters
            .insert(name.to_string(), ParameterOutcome::Error(message.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParameterStore for FakeParameterStore {
    async fn get_parameter(&self, _environment: &Environment, name: &str) -> RemoteResult<Parameter> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.parameters.get(name) {
            Some(ParameterOutcome::Value(value)) => Ok(Parameter {
                value: value.clone(),
            }),
            Some(ParameterOutcome::AccessDenied) => Err(RemoteError::access_denied(format!(
                "not authorized to perform ssm:GetParameter on {}",
                name
            ))),
            Some(ParameterOutcome::Error(message)) => {
                Err(RemoteError::Other(anyhow::anyhow!("{}", message)))
            }
            None => Err(RemoteError::not_found(name)),
        }
    }
}

/// Export listing served from pre-built pages.
///
/// Page `n` is requested with token `page-n`; the first page has no token.
#[derive(Debug, Default)]
pub struct FakeExportLister {
    pages: Vec<ExportPage>,
    calls: AtomicUsize,
}

impl FakeExportLister {
    /// Build pages from export groups, chaining continuation tokens.
    pub fn paged(groups: Vec<Vec<crate::remote::Export>>) -> Self {
        let count = groups.len();
        let pages = groups
            .into_iter()
            .enumerate()
            .map(|(i, exports)| ExportPage {
                exports,
                next_token: (i + 1 < count).then(|| format!("page-{}", i + 1)),
            })
            .collect();

        FakeExportLister {
            pages,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExportLister for FakeExportLister {
    async fn list_exports(&self, next_token: Option<&str>) -> RemoteResult<ExportPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let index = match next_token {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| RemoteError::Other(anyhow::anyhow!("bad token {}", token)))?,
        };

        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }
}

/// IAM policy store remembering which policies exist.
#[derive(Debug, Default)]
pub struct FakeIamPolicies {
    existing: Mutex<HashSet<String>>,
    created: Mutex<Vec<(String, String)>>,
    get_calls: AtomicUsize,
}

impl FakeIamPolicies {
    pub fn new() -> Self {
        FakeIamPolicies::default()
    }

    /// Pretend a policy with this ARN already exists.
    pub fn with_existing(self, arn: &str) -> Self {
        self.existing.lock().unwrap().insert(arn.to_string());
        self
    }

    /// `(name, document)` of every created policy.
    pub fn created(&self) -> Vec<(String, String)> {
        self.created.lock().unwrap().clone()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IamPolicies for FakeIamPolicies {
    async fn get_policy(&self, _environment: &Environment, arn: &str) -> RemoteResult<String> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.existing.lock().unwrap().contains(arn) {
            Ok(arn.to_string())
        } else {
            Err(RemoteError::not_found(arn))
        }
    }

    async fn create_policy(
        &self,
        environment: &Environment,
        name: &str,
        document: &str,
    ) -> RemoteResult<String> {
        let arn = format!("arn:aws:iam::{}:policy/{}", environment.account(), name);
        self.created
            .lock()
            .unwrap()
            .push((name.to_string(), document.to_string()));
        self.existing.lock().unwrap().insert(arn.clone());
        Ok(arn)
    }
}

/// One recorded call to [`FakeDeploymentExecutor`].
#[derive(Debug, Clone)]
pub struct RecordedDeploy {
    pub environment: Environment,
    pub template: BootstrapTemplate,
    pub parameters: StackParameters,
    pub options: DeployOptions,
}

/// Deployment executor that records requests and always succeeds.
#[derive(Debug, Default)]
pub struct FakeDeploymentExecutor {
    deploys: Mutex<Vec<RecordedDeploy>>,
}

impl FakeDeploymentExecutor {
    pub fn new() -> Self {
        FakeDeploymentExecutor::default()
    }

    pub fn deploys(&self) -> Vec<RecordedDeploy> {
        self.deploys.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.deploys.lock().unwrap().len()
    }

    /// Parameters of the most recent deployment.
    pub fn last_parameters(&self) -> StackParameters {
        self.deploys
            .lock()
            .unwrap()
            .last()
            .map(|d| d.parameters.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DeploymentExecutor for FakeDeploymentExecutor {
    async fn deploy(
        &self,
        environment: &Environment,
        template: &BootstrapTemplate,
        parameters: &StackParameters,
        options: &DeployOptions,
    ) -> RemoteResult<DeployResult> {
        self.deploys.lock().unwrap().push(RecordedDeploy {
            environment: environment.clone(),
            template: template.clone(),
            parameters: parameters.clone(),
            options: options.clone(),
        });

        Ok(DeployResult {
            outcome: DeployOutcome::Deployed,
            outputs: BTreeMap::new(),
            stack_id: format!(
                "arn:aws:cloudformation:{}:{}:stack/{}/new",
                environment.region(),
                environment.account(),
                options.stack_name
            ),
        })
    }
}

/// Notices registry recording every reported environment.
#[derive(Debug, Default)]
pub struct RecordingNotices {
    recorded: Mutex<Vec<(Environment, u32)>>,
}

impl RecordingNotices {
    pub fn new() -> Self {
        RecordingNotices::default()
    }

    pub fn recorded(&self) -> Vec<(Environment, u32)> {
        self.recorded.lock().unwrap().clone()
    }
}

impl NoticesRegistry for RecordingNotices {
    fn record_bootstrapped_environment(&self, environment: &Environment, version: u32) {
        self.recorded
            .lock()
            .unwrap()
            .push((environment.clone(), version));
    }
}

/// Reporter that keeps every message for later assertions.
#[derive(Debug, Default)]
pub struct CapturingReporter {
    warnings: Mutex<Vec<String>>,
    infos: Mutex<Vec<String>>,
    debugs: Mutex<Vec<String>>,
}

impl CapturingReporter {
    pub fn new() -> Self {
        CapturingReporter::default()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().unwrap().clone()
    }

    /// True if any warning contains `needle`.
    pub fn warned(&self, needle: &str) -> bool {
        self.warnings().iter().any(|w| w.contains(needle))
    }
}

impl Reporter for CapturingReporter {
    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn debug(&self, message: &str) {
        self.debugs.lock().unwrap().push(message.to_string());
    }
}
