//! Updating an existing (or missing) bootstrap stack.
//!
//! Before an existing stack is replaced, the new template must be of the
//! same variant and must not lower the version. Both checks are skipped
//! when the caller forces the update. A failed check is not an error: the
//! update is skipped and the existing stack is reported back unchanged.

use std::sync::Arc;

use crate::core::{BootstrapStackInfo, BootstrapTemplate, Environment};
use crate::ops::bootstrap::errors::BootstrapError;
use crate::remote::{DeployOptions, DeployResult, DeploymentExecutor, StackParameters};
use crate::util::reporter::Reporter;

/// The bootstrap stack of one environment, as last looked up.
pub struct BootstrapStack {
    environment: Environment,
    current: BootstrapStackInfo,
    executor: Arc<dyn DeploymentExecutor>,
    reporter: Arc<dyn Reporter>,
}

impl BootstrapStack {
    pub fn new(
        environment: Environment,
        current: BootstrapStackInfo,
        executor: Arc<dyn DeploymentExecutor>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        BootstrapStack {
            environment,
            current,
            executor,
            reporter,
        }
    }

    /// What the lookup reported about the deployed stack.
    pub fn current(&self) -> &BootstrapStackInfo {
        &self.current
    }

    /// Check whether `template` may replace the deployed stack.
    ///
    /// Returns the no-op result to hand back when it may not.
    pub fn safety_check(&self, template: &BootstrapTemplate, force: bool) -> Option<DeployResult> {
        if !self.current.found || force {
            return None;
        }

        let abort = || Some(DeployResult::no_op(self.current.stack_id.clone()));

        let current_variant = &self.current.variant;
        let new_variant = template.variant();
        if *current_variant != new_variant {
            self.reporter.warn(&format!(
                "Bootstrap stack already exists, containing '{}'. Not overwriting it with a template containing '{}' (use --force if you intend to overwrite)",
                current_variant, new_variant
            ));
            return abort();
        }

        let current_version = self.current.version;
        let new_version = template.version();
        if new_version < current_version {
            self.reporter.warn(&format!(
                "Bootstrap stack already at version {}. Not downgrading it to version {} (use --force if you intend to downgrade)",
                current_version, new_version
            ));
            if new_version == 0 {
                // An old-style template over a new-style stack usually means
                // the new synthesis feature flag was forgotten.
                self.reporter.warn(
                    "(Did you set the '@aws-cdk/core:newStyleStackSynthesis' feature flag in cdk.json?)",
                );
            }
            return abort();
        }

        None
    }

    /// Hand the template and parameters to the deployment executor.
    pub async fn deploy(
        &self,
        template: &BootstrapTemplate,
        parameters: &StackParameters,
        options: &DeployOptions,
    ) -> Result<DeployResult, BootstrapError> {
        self.reporter.info(&format!(
            "Deploying bootstrap stack {} (version {}) to {}",
            options.stack_name,
            template.version(),
            self.environment
        ));

        let result = self
            .executor
            .deploy(&self.environment, template, parameters, options)
            .await?;
        Ok(result)
    }
}
