//! Evaluation errors.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::remote::RemoteError;
use crate::util::diagnostic::Diagnostic;

/// Error while evaluating a template expression.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum EvaluationError {
    #[error("cannot resolve export `{name}`: no stack exports it")]
    #[diagnostic(
        code(cfnboot::eval::unresolved_export),
        help("Deploy the stack that exports `{name}` first")
    )]
    UnresolvedExport { name: String },

    #[error("export `{name}` exists but has no value")]
    #[diagnostic(code(cfnboot::eval::export_without_value))]
    ExportWithoutValue { name: String },

    #[error("{function}: index {index} is out of range for a list of {len}")]
    #[diagnostic(code(cfnboot::eval::select_out_of_range))]
    SelectOutOfRange {
        function: &'static str,
        index: i64,
        len: usize,
    },

    #[error("{function}: {message}")]
    #[diagnostic(code(cfnboot::eval::invalid_arguments))]
    InvalidArguments {
        function: &'static str,
        message: String,
    },

    #[error("Fn::Sub: cannot substitute `${{{token}}}`")]
    #[diagnostic(
        code(cfnboot::eval::unresolved_substitution),
        help("Pass a value for `{token}` in the substitution map")
    )]
    UnresolvedSubstitution { token: String },

    #[error("Ref: `{name}` is not a pseudo parameter, template parameter or known resource")]
    #[diagnostic(code(cfnboot::eval::unresolved_ref))]
    UnresolvedRef { name: String },

    #[error("failed to list exports")]
    #[diagnostic(code(cfnboot::eval::remote))]
    Remote(#[from] RemoteError),
}

impl EvaluationError {
    pub(crate) fn invalid(function: &'static str, message: impl Into<String>) -> Self {
        EvaluationError::InvalidArguments {
            function,
            message: message.into(),
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            EvaluationError::UnresolvedExport { name } => Diagnostic::error(self.to_string())
                .with_suggestion(format!("Check the spelling of `{}`", name))
                .with_suggestion("Pass an exports file with `--exports`".to_string()),

            EvaluationError::UnresolvedSubstitution { token } => {
                Diagnostic::error(self.to_string()).with_suggestion(format!(
                    "Write `${{!{}}}` to keep the token literally",
                    token
                ))
            }

            EvaluationError::Remote(source) => {
                Diagnostic::error(self.to_string()).with_context(source.to_string())
            }

            other => Diagnostic::error(other.to_string()),
        }
    }
}
