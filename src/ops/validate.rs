//! Bootstrap version validation.
//!
//! A deployment may declare the minimum bootstrap stack version it needs and
//! the parameter-store path holding the deployed version. The version is
//! read from the parameter store when a path is given, else from the stack
//! lookup.
//!
//! Bootstrap stacks older than [`SSM_PERMISSION_BOOTSTRAP_VERSION`] do not
//! grant the deploy role permission to read that parameter. For those stacks
//! only, an access-denied read falls back to the version the stack lookup
//! reports.

use std::sync::Arc;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::cache::environment::{EnvironmentResources, LookupError};
use crate::core::Environment;
use crate::remote::NoticesRegistry;
use crate::util::config::Config;
use crate::util::diagnostic::Diagnostic;
use crate::util::reporter::Reporter;

/// First bootstrap version whose roles may read the version parameter.
pub const SSM_PERMISSION_BOOTSTRAP_VERSION: u32 = 5;

/// Why a bootstrap version requirement is not met.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ValidationError {
    #[error(
        "this deployment requires bootstrap stack version '{required}', found '{found}' in {environment}"
    )]
    #[diagnostic(
        code(cfnboot::validate::version_too_low),
        help("Run `cdk bootstrap {environment}` to upgrade the bootstrap stack")
    )]
    VersionTooLow {
        environment: Environment,
        required: u32,
        found: u32,
    },

    #[error("no bootstrap stack found in {environment}")]
    #[diagnostic(
        code(cfnboot::validate::not_bootstrapped),
        help("Run `cdk bootstrap {environment}` before deploying")
    )]
    BootstrapStackNotFound { environment: Environment },

    #[error(
        "bootstrap stack version '{required}' is required, but the version could not be read from `{parameter}`"
    )]
    #[diagnostic(
        code(cfnboot::validate::parameter_unreadable),
        help("Check that the deploying role may call ssm:GetParameter on `{parameter}`")
    )]
    ParameterUnreadable {
        parameter: String,
        required: u32,
        stack_version: Option<u32>,
        #[source]
        source: LookupError,
    },

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl ValidationError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ValidationError::VersionTooLow {
                environment,
                required,
                found,
            } => Diagnostic::error(format!(
                "bootstrap stack in {} is too old for this deployment",
                environment
            ))
            .with_context(format!("required version: {}", required))
            .with_context(format!("found version: {}", found))
            .with_suggestion(format!("Run `cdk bootstrap {}`", environment)),

            ValidationError::BootstrapStackNotFound { environment } => {
                Diagnostic::error(format!("{} has not been bootstrapped", environment))
                    .with_suggestion(format!("Run `cdk bootstrap {}`", environment))
            }

            ValidationError::ParameterUnreadable {
                parameter,
                required,
                stack_version,
                source,
            } => {
                let mut diag =
                    Diagnostic::error(format!("could not read bootstrap version from `{}`", parameter))
                        .with_context(format!("required version: {}", required))
                        .with_context(source.to_string());
                if let Some(version) = stack_version {
                    diag = diag.with_context(format!(
                        "the bootstrap stack reports version {}, which should grant read access",
                        version
                    ));
                }
                diag.with_suggestion("Check the permissions of the deploying role".to_string())
            }

            ValidationError::Lookup(LookupError::ParameterNotFound { name }) => {
                Diagnostic::error(format!("parameter `{}` not found", name))
                    .with_context("has the environment been bootstrapped?")
                    .with_suggestion("Run `cdk bootstrap`".to_string())
            }

            ValidationError::Lookup(other) => Diagnostic::error(other.to_string()),
        }
    }
}

/// Checks bootstrap version requirements for one environment.
pub struct VersionValidator {
    resources: EnvironmentResources,
    reporter: Arc<dyn Reporter>,
    notices: Option<Arc<dyn NoticesRegistry>>,
    ssm_permission_version: u32,
}

impl VersionValidator {
    /// Create a validator over cached environment resources.
    pub fn new(resources: EnvironmentResources, reporter: Arc<dyn Reporter>) -> Self {
        VersionValidator {
            resources,
            reporter,
            notices: None,
            ssm_permission_version: SSM_PERMISSION_BOOTSTRAP_VERSION,
        }
    }

    /// Create a validator using the configured permission threshold.
    pub fn from_config(
        resources: EnvironmentResources,
        reporter: Arc<dyn Reporter>,
        config: &Config,
    ) -> Self {
        VersionValidator::new(resources, reporter)
            .with_ssm_permission_version(config.ssm_permission_version())
    }

    /// Report discovered versions to an advisory registry.
    pub fn with_notices(mut self, notices: Arc<dyn NoticesRegistry>) -> Self {
        self.notices = Some(notices);
        self
    }

    /// Override the version that introduced parameter read permission.
    pub fn with_ssm_permission_version(mut self, version: u32) -> Self {
        self.ssm_permission_version = version;
        self
    }

    fn environment(&self) -> &Environment {
        self.resources.environment()
    }

    /// Fail unless the deployed bootstrap version is at least `expected`.
    pub async fn validate_version(
        &self,
        expected: Option<u32>,
        parameter_name: Option<&str>,
    ) -> Result<(), ValidationError> {
        let Some(required) = expected else {
            return Ok(());
        };

        let Some(parameter) = parameter_name else {
            let version = self.stack_version().await?;
            return self.check(required, version);
        };

        match self.resources.version_from_parameter_store(parameter).await {
            Ok(version) => self.check(required, version),
            Err(e @ LookupError::AccessDenied { .. }) => {
                let info = self.resources.lookup_toolkit().await?;
                if info.found && info.version < self.ssm_permission_version {
                    self.reporter.warn(&format!(
                        "Could not read SSM parameter {}: {}",
                        parameter, e
                    ));
                    return self.check(required, info.version);
                }

                Err(ValidationError::ParameterUnreadable {
                    parameter: parameter.to_string(),
                    required,
                    stack_version: info.found.then_some(info.version),
                    source: e,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn stack_version(&self) -> Result<u32, ValidationError> {
        let info = self.resources.lookup_toolkit().await?;
        if !info.found {
            return Err(ValidationError::BootstrapStackNotFound {
                environment: self.environment().clone(),
            });
        }
        Ok(info.version)
    }

    fn check(&self, required: u32, found: u32) -> Result<(), ValidationError> {
        self.reporter.debug(&format!(
            "bootstrap version {} found in {}",
            found,
            self.environment()
        ));

        if let Some(notices) = &self.notices {
            notices.record_bootstrapped_environment(self.environment(), found);
        }

        if required > found {
            return Err(ValidationError::VersionTooLow {
                environment: self.environment().clone(),
                required,
                found,
            });
        }
        Ok(())
    }
}
