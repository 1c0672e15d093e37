//! Bootstrap error types and diagnostics.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::cache::environment::LookupError;
use crate::remote::RemoteError;
use crate::util::diagnostic::Diagnostic;

/// Error while bootstrapping an environment.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum BootstrapError {
    #[error("{flag} can only be passed for the modern bootstrap experience")]
    #[diagnostic(
        code(cfnboot::bootstrap::modern_only),
        help("Remove {flag}, or bootstrap with the default (modern) template")
    )]
    ModernOnlyOption { flag: &'static str },

    #[error("accounts cannot be both trusted and untrusted: {}", accounts.join(", "))]
    #[diagnostic(code(cfnboot::bootstrap::trust_conflict))]
    TrustedAndUntrusted { accounts: Vec<String> },

    #[error(
        "execution policies are required when trusting other accounts; try a managed policy of the form 'arn:{partition}:iam::aws:policy/<PolicyName>'"
    )]
    #[diagnostic(
        code(cfnboot::bootstrap::missing_execution_policies),
        help("Pass --cloudformation-execution-policies together with --trust")
    )]
    MissingExecutionPolicies { partition: String },

    #[error("a KMS key id and the create-customer-key flag cannot be used together")]
    #[diagnostic(
        code(cfnboot::bootstrap::kms_conflict),
        help("Pass either --bootstrap-kms-key-id or --bootstrap-customer-key, not both")
    )]
    ConflictingKmsOptions,

    #[error("the permissions boundary name `{name}` does not match the IAM naming conventions")]
    #[diagnostic(
        code(cfnboot::bootstrap::invalid_boundary),
        help("Policy names may only contain letters, digits and +=,.@_-/")
    )]
    InvalidPermissionsBoundary { name: String },

    #[error("could not retrieve the example permissions boundary `{arn}`")]
    #[diagnostic(code(cfnboot::bootstrap::boundary_unavailable))]
    ExampleBoundaryUnavailable { arn: String },

    #[error("failed to load the bootstrap template")]
    #[diagnostic(code(cfnboot::bootstrap::template))]
    Template(#[source] anyhow::Error),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl BootstrapError {
    /// True for errors caused by the caller's flags rather than the remote side.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            BootstrapError::ModernOnlyOption { .. }
                | BootstrapError::TrustedAndUntrusted { .. }
                | BootstrapError::MissingExecutionPolicies { .. }
                | BootstrapError::ConflictingKmsOptions
                | BootstrapError::InvalidPermissionsBoundary { .. }
        )
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            BootstrapError::ModernOnlyOption { flag } => Diagnostic::error(self.to_string())
                .with_context("the legacy bootstrap template has no such setting")
                .with_suggestion(format!("Remove `{}`", flag))
                .with_suggestion("Use the default bootstrap template".to_string()),

            BootstrapError::TrustedAndUntrusted { accounts } => {
                let mut diag = Diagnostic::error("accounts cannot be both trusted and untrusted");
                for account in accounts {
                    diag = diag.with_context(format!("`{}` is in both lists", account));
                }
                diag.with_suggestion("Remove each account from one of the two lists".to_string())
            }

            BootstrapError::MissingExecutionPolicies { partition } => Diagnostic::error(
                "trusting other accounts requires explicit execution policies",
            )
            .with_suggestion(format!(
                "Pass `--cloudformation-execution-policies arn:{}:iam::aws:policy/<PolicyName>`",
                partition
            )),

            BootstrapError::ConflictingKmsOptions => Diagnostic::error(self.to_string())
                .with_suggestion("Pass `--bootstrap-kms-key-id` to use an existing key".to_string())
                .with_suggestion("Pass `--bootstrap-customer-key` to create a new key".to_string()),

            BootstrapError::InvalidPermissionsBoundary { name } => Diagnostic::error(self.to_string())
                .with_context(format!("offending name: {}", name))
                .with_suggestion("Use a name matching [\\w+=,.@/-]+".to_string()),

            other => Diagnostic::error(other.to_string()),
        }
    }
}
