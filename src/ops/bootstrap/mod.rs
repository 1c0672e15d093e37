//! Bootstrapping an environment.
//!
//! Three template sources exist:
//! - `Legacy`: the original template, which knows about a bucket and a key only
//! - `Default`: the modern template, with trust relationships, execution
//!   policies and a permissions boundary
//! - `Custom`: a template file; version 0 is treated as legacy, anything
//!   newer as modern
//!
//! For the modern flavor the steps are strictly ordered:
//! 1. check the caller's flags (no remote calls)
//! 2. look up the deployed stack under the requested name and derive the
//!    parameter set
//! 3. run the variant/downgrade safety check
//! 4. resolve the permissions boundary, which may create an IAM policy
//! 5. deploy
//!
//! A safety abort at step 3 therefore never leaves a half-applied
//! permission change behind.

pub mod boundary;
pub mod errors;
pub mod params;
pub mod stack;

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::environment::EnvironmentResources;
use crate::core::BootstrapTemplate;
use crate::core::DEFAULT_PARTITION;
use crate::remote::{DeployOptions, DeployResult, DeploymentExecutor, IamPolicies};
use crate::util::config::Config;
use crate::util::reporter::{default_reporter, Reporter};

pub use boundary::DEFAULT_QUALIFIER;
pub use errors::BootstrapError;
pub use params::{BootstrapInput, BootstrapParameters, KmsKeyDirective, PermissionsBoundaryInput};
pub use stack::BootstrapStack;

/// Default name of the bootstrap stack.
pub const DEFAULT_TOOLKIT_STACK_NAME: &str = "CDKToolkit";

/// Where the bootstrap template comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapSource {
    Legacy,
    Default,
    Custom(PathBuf),
}

/// Template family, decided from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapFlavor {
    Legacy,
    Modern,
}

/// Supplies the built-in bootstrap templates.
pub trait TemplateProvider: Send + Sync {
    fn legacy_template(&self) -> anyhow::Result<BootstrapTemplate>;
    fn default_template(&self) -> anyhow::Result<BootstrapTemplate>;
}

/// Options for one bootstrap run.
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub toolkit_stack_name: String,
    pub partition: String,
    pub force: bool,
    /// `None` keeps the deployed stack's setting.
    pub termination_protection: Option<bool>,
    pub use_previous_parameters: bool,
    pub parameters: BootstrapInput,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        BootstrapOptions {
            toolkit_stack_name: DEFAULT_TOOLKIT_STACK_NAME.to_string(),
            partition: DEFAULT_PARTITION.to_string(),
            force: false,
            termination_protection: None,
            use_previous_parameters: true,
            parameters: BootstrapInput::default(),
        }
    }
}

impl BootstrapOptions {
    /// Options taking the stack name and qualifier from `config`.
    ///
    /// The qualifier is only set when configured, so legacy bootstraps keep
    /// working under a default config.
    pub fn from_config(config: &Config) -> Self {
        BootstrapOptions {
            toolkit_stack_name: config.toolkit_stack_name().to_string(),
            parameters: BootstrapInput {
                qualifier: config.bootstrap.qualifier.clone(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Deploys or upgrades the bootstrap stack of an environment.
pub struct Bootstrapper {
    source: BootstrapSource,
    templates: Arc<dyn TemplateProvider>,
    executor: Arc<dyn DeploymentExecutor>,
    iam: Arc<dyn IamPolicies>,
    reporter: Arc<dyn Reporter>,
}

impl Bootstrapper {
    pub fn new(
        source: BootstrapSource,
        templates: Arc<dyn TemplateProvider>,
        executor: Arc<dyn DeploymentExecutor>,
        iam: Arc<dyn IamPolicies>,
    ) -> Self {
        Bootstrapper {
            source,
            templates,
            executor,
            iam,
            reporter: default_reporter(),
        }
    }

    /// Send warnings and progress to `reporter`.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Load the template and decide its flavor.
    pub fn load_template(&self) -> Result<(BootstrapFlavor, BootstrapTemplate), BootstrapError> {
        match &self.source {
            BootstrapSource::Legacy => Ok((
                BootstrapFlavor::Legacy,
                self.templates
                    .legacy_template()
                    .map_err(BootstrapError::Template)?,
            )),
            BootstrapSource::Default => Ok((
                BootstrapFlavor::Modern,
                self.templates
                    .default_template()
                    .map_err(BootstrapError::Template)?,
            )),
            BootstrapSource::Custom(path) => {
                let template = BootstrapTemplate::load(path).map_err(BootstrapError::Template)?;
                let flavor = if template.version() == 0 {
                    BootstrapFlavor::Legacy
                } else {
                    BootstrapFlavor::Modern
                };
                Ok((flavor, template))
            }
        }
    }

    /// Render the template that would be deployed, without deploying it.
    pub fn show_template(&self) -> Result<String, BootstrapError> {
        let (_, template) = self.load_template()?;
        template.to_pretty_json().map_err(BootstrapError::Template)
    }

    /// Bootstrap the environment served by `resources`.
    pub async fn bootstrap_environment(
        &self,
        resources: &EnvironmentResources,
        options: &BootstrapOptions,
    ) -> Result<DeployResult, BootstrapError> {
        let (flavor, template) = self.load_template()?;
        match flavor {
            BootstrapFlavor::Legacy => self.legacy_bootstrap(resources, template, options).await,
            BootstrapFlavor::Modern => self.modern_bootstrap(resources, template, options).await,
        }
    }

    async fn legacy_bootstrap(
        &self,
        resources: &EnvironmentResources,
        template: BootstrapTemplate,
        options: &BootstrapOptions,
    ) -> Result<DeployResult, BootstrapError> {
        let input = &options.parameters;
        input.check_legacy()?;

        let stack = self.current_stack(resources, options).await?;
        if let Some(abort) = stack.safety_check(&template, options.force) {
            return Ok(abort);
        }

        let parameters = params::legacy_stack_parameters(input);
        stack
            .deploy(&template, &parameters, &self.deploy_options(&stack, options))
            .await
    }

    async fn modern_bootstrap(
        &self,
        resources: &EnvironmentResources,
        template: BootstrapTemplate,
        options: &BootstrapOptions,
    ) -> Result<DeployResult, BootstrapError> {
        let input = &options.parameters;
        input.check_modern()?;

        let stack = self.current_stack(resources, options).await?;
        let mut parameters = BootstrapParameters::derive(
            input,
            stack.current(),
            &options.partition,
            self.reporter.as_ref(),
        )?;

        if let Some(abort) = stack.safety_check(&template, options.force) {
            return Ok(abort);
        }

        if let Some(requested) = &input.permissions_boundary {
            let name = boundary::resolve_boundary(
                self.iam.as_ref(),
                resources.environment(),
                &options.partition,
                input.qualifier.as_deref(),
                requested,
            )
            .await?;
            parameters.permissions_boundary = Some(name);
        }

        // The deployed parameter reads as empty when no boundary is set
        let current_boundary = stack
            .current()
            .parameter(params::PARAM_PERMISSIONS_BOUNDARY)
            .filter(|b| !b.is_empty());
        if let Some(change) =
            boundary::describe_change(current_boundary, parameters.permissions_boundary.as_deref())
        {
            self.reporter.warn(&change);
        }

        stack
            .deploy(
                &template,
                &parameters.to_stack_parameters(),
                &self.deploy_options(&stack, options),
            )
            .await
    }

    /// Describe the stack that the deploy will update.
    async fn current_stack(
        &self,
        resources: &EnvironmentResources,
        options: &BootstrapOptions,
    ) -> Result<BootstrapStack, BootstrapError> {
        let current = resources
            .clone()
            .with_toolkit_stack_name(options.toolkit_stack_name.as_str())
            .lookup_toolkit()
            .await?;
        Ok(BootstrapStack::new(
            resources.environment().clone(),
            current,
            Arc::clone(&self.executor),
            Arc::clone(&self.reporter),
        ))
    }

    fn deploy_options(&self, stack: &BootstrapStack, options: &BootstrapOptions) -> DeployOptions {
        DeployOptions {
            stack_name: options.toolkit_stack_name.clone(),
            termination_protection: options
                .termination_protection
                .unwrap_or(stack.current().termination_protection),
            force: options.force,
            use_previous_parameters: options.use_previous_parameters,
        }
    }
}
