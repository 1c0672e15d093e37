//! Bootstrap parameters: what the caller asked for, and what gets deployed.
//!
//! [`BootstrapInput`] holds the caller's flags. [`BootstrapParameters`] is
//! derived from it and the parameters of the stack already deployed, so
//! re-bootstrapping without a flag keeps the previous setting.

use std::collections::BTreeSet;

use crate::core::BootstrapStackInfo;
use crate::ops::bootstrap::errors::BootstrapError;
use crate::remote::StackParameters;
use crate::util::reporter::Reporter;

/// KMS key value telling the template to use the AWS managed key.
pub const USE_AWS_MANAGED_KEY: &str = "AWS_MANAGED_KEY";

/// KMS key value telling the template to create a customer managed key.
pub const CREATE_NEW_KEY: &str = "";

pub const PARAM_BUCKET_NAME: &str = "FileAssetsBucketName";
pub const PARAM_KMS_KEY_ID: &str = "FileAssetsBucketKmsKeyId";
pub const PARAM_TRUSTED_ACCOUNTS: &str = "TrustedAccounts";
pub const PARAM_TRUSTED_ACCOUNTS_FOR_LOOKUP: &str = "TrustedAccountsForLookup";
pub const PARAM_EXECUTION_POLICIES: &str = "CloudFormationExecutionPolicies";
pub const PARAM_QUALIFIER: &str = "Qualifier";
pub const PARAM_PUBLIC_ACCESS_BLOCK: &str = "PublicAccessBlockConfiguration";
pub const PARAM_PERMISSIONS_BOUNDARY: &str = "InputPermissionsBoundary";

/// Which permissions boundary the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionsBoundaryInput {
    /// The example policy shipped with the tool, created on demand.
    Example,
    /// A policy the caller manages, by name.
    Custom(String),
}

/// Bootstrap flags as given by the caller. `None` means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapInput {
    pub bucket_name: Option<String>,
    pub kms_key_id: Option<String>,
    pub create_customer_master_key: Option<bool>,
    pub public_access_block_configuration: Option<bool>,
    pub qualifier: Option<String>,
    pub trusted_accounts: Option<Vec<String>>,
    pub trusted_accounts_for_lookup: Option<Vec<String>>,
    pub untrusted_accounts: Vec<String>,
    pub execution_policies: Option<Vec<String>>,
    pub permissions_boundary: Option<PermissionsBoundaryInput>,
}

impl BootstrapInput {
    /// Reject flags the legacy template does not understand.
    pub fn check_legacy(&self) -> Result<(), BootstrapError> {
        let modern_only: [(&'static str, bool); 7] = [
            ("--trust", non_empty(&self.trusted_accounts)),
            ("--trust-for-lookup", non_empty(&self.trusted_accounts_for_lookup)),
            ("--untrust", !self.untrusted_accounts.is_empty()),
            (
                "--cloudformation-execution-policies",
                non_empty(&self.execution_policies),
            ),
            (
                "--bootstrap-customer-key",
                self.create_customer_master_key.is_some(),
            ),
            ("--qualifier", self.qualifier.is_some()),
            (
                "--custom-permissions-boundary",
                self.permissions_boundary.is_some(),
            ),
        ];

        match modern_only.iter().find(|(_, given)| *given) {
            Some((flag, _)) => Err(BootstrapError::ModernOnlyOption { flag: *flag }),
            None => Ok(()),
        }
    }

    /// Reject contradictory flags. Needs no remote state.
    pub fn check_modern(&self) -> Result<(), BootstrapError> {
        if self.kms_key_id.is_some() && self.create_customer_master_key.is_some() {
            return Err(BootstrapError::ConflictingKmsOptions);
        }

        let untrusted: BTreeSet<&str> = self.untrusted_accounts.iter().map(String::as_str).collect();
        let overlap: BTreeSet<String> = self
            .trusted_accounts
            .iter()
            .chain(self.trusted_accounts_for_lookup.iter())
            .flatten()
            .filter(|account| untrusted.contains(account.as_str()))
            .cloned()
            .collect();

        if !overlap.is_empty() {
            return Err(BootstrapError::TrustedAndUntrusted {
                accounts: overlap.into_iter().collect(),
            });
        }

        if let Some(PermissionsBoundaryInput::Custom(name)) = &self.permissions_boundary {
            crate::ops::bootstrap::boundary::validate_policy_name(name)?;
        }

        Ok(())
    }
}

fn non_empty(list: &Option<Vec<String>>) -> bool {
    list.as_ref().is_some_and(|l| !l.is_empty())
}

/// What to do with the bucket encryption key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KmsKeyDirective {
    UseDefault,
    CreateNew,
    Explicit(String),
    /// Keep whatever the deployed stack has.
    KeepExisting,
}

impl KmsKeyDirective {
    /// Decide from the caller's flags and the deployed key parameter.
    pub fn resolve(
        kms_key_id: Option<&str>,
        create_customer_master_key: Option<bool>,
        current_key_id: Option<&str>,
    ) -> Self {
        if let Some(id) = kms_key_id {
            return KmsKeyDirective::Explicit(id.to_string());
        }
        match (create_customer_master_key, current_key_id) {
            (Some(true), _) => KmsKeyDirective::CreateNew,
            (Some(false), _) | (None, None) => KmsKeyDirective::UseDefault,
            (None, Some(_)) => KmsKeyDirective::KeepExisting,
        }
    }

    /// Stack parameter value; `None` keeps the deployed value.
    pub fn parameter_value(&self) -> Option<String> {
        match self {
            KmsKeyDirective::UseDefault => Some(USE_AWS_MANAGED_KEY.to_string()),
            KmsKeyDirective::CreateNew => Some(CREATE_NEW_KEY.to_string()),
            KmsKeyDirective::Explicit(id) => Some(id.clone()),
            KmsKeyDirective::KeepExisting => None,
        }
    }
}

/// The resolved parameter set for a modern bootstrap stack update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapParameters {
    pub bucket_name: Option<String>,
    pub trusted_accounts: Vec<String>,
    pub trusted_accounts_for_lookup: Vec<String>,
    pub untrusted_accounts: Vec<String>,
    pub execution_policies: Vec<String>,
    /// Policy the template applies when `execution_policies` is empty.
    /// Advertised to the user, never passed as a parameter.
    pub implicit_execution_policy: Option<String>,
    pub kms_key: KmsKeyDirective,
    pub permissions_boundary: Option<String>,
    pub qualifier: Option<String>,
    pub public_access_block: bool,
}

impl BootstrapParameters {
    /// Derive the parameter set for a modern bootstrap.
    ///
    /// Everything here is local; the permissions boundary is resolved later
    /// because it may need remote calls.
    pub fn derive(
        input: &BootstrapInput,
        current: &BootstrapStackInfo,
        partition: &str,
        reporter: &dyn Reporter,
    ) -> Result<Self, BootstrapError> {
        input.check_modern()?;

        let remove_untrusted = |accounts: Vec<String>| -> Vec<String> {
            accounts
                .into_iter()
                .filter(|a| !input.untrusted_accounts.contains(a))
                .collect()
        };

        let trusted_accounts = remove_untrusted(
            input
                .trusted_accounts
                .clone()
                .unwrap_or_else(|| current.list_parameter(PARAM_TRUSTED_ACCOUNTS)),
        );
        reporter.info(&format!(
            "Trusted accounts for deployment: {}",
            display_list(&trusted_accounts)
        ));

        let trusted_accounts_for_lookup = remove_untrusted(
            input
                .trusted_accounts_for_lookup
                .clone()
                .unwrap_or_else(|| current.list_parameter(PARAM_TRUSTED_ACCOUNTS_FOR_LOOKUP)),
        );
        reporter.info(&format!(
            "Trusted accounts for lookup: {}",
            display_list(&trusted_accounts_for_lookup)
        ));

        let execution_policies = input
            .execution_policies
            .clone()
            .unwrap_or_else(|| current.list_parameter(PARAM_EXECUTION_POLICIES));

        let mut implicit_execution_policy = None;
        if trusted_accounts.is_empty() && execution_policies.is_empty() {
            let policy = format!("arn:{}:iam::aws:policy/AdministratorAccess", partition);
            reporter.warn(&format!(
                "Using default execution policy of '{}'. Pass '--cloudformation-execution-policies' to customize.",
                policy
            ));
            implicit_execution_policy = Some(policy);
        } else if execution_policies.is_empty() {
            return Err(BootstrapError::MissingExecutionPolicies {
                partition: partition.to_string(),
            });
        } else {
            reporter.info(&format!(
                "Execution policies: {}",
                execution_policies.join(", ")
            ));
        }

        let kms_key = KmsKeyDirective::resolve(
            input.kms_key_id.as_deref(),
            input.create_customer_master_key,
            current.parameter(PARAM_KMS_KEY_ID),
        );

        Ok(BootstrapParameters {
            bucket_name: input.bucket_name.clone(),
            trusted_accounts,
            trusted_accounts_for_lookup,
            untrusted_accounts: input.untrusted_accounts.clone(),
            execution_policies,
            implicit_execution_policy,
            kms_key,
            permissions_boundary: None,
            qualifier: input.qualifier.clone(),
            public_access_block: input.public_access_block_configuration.unwrap_or(true),
        })
    }

    /// Stack parameters for the modern template.
    pub fn to_stack_parameters(&self) -> StackParameters {
        let mut params = StackParameters::new();
        params.insert(PARAM_BUCKET_NAME.to_string(), self.bucket_name.clone());
        params.insert(PARAM_KMS_KEY_ID.to_string(), self.kms_key.parameter_value());
        params.insert(
            PARAM_TRUSTED_ACCOUNTS.to_string(),
            Some(self.trusted_accounts.join(",")),
        );
        params.insert(
            PARAM_TRUSTED_ACCOUNTS_FOR_LOOKUP.to_string(),
            Some(self.trusted_accounts_for_lookup.join(",")),
        );
        params.insert(
            PARAM_EXECUTION_POLICIES.to_string(),
            Some(self.execution_policies.join(",")),
        );
        params.insert(PARAM_QUALIFIER.to_string(), self.qualifier.clone());
        params.insert(
            PARAM_PUBLIC_ACCESS_BLOCK.to_string(),
            Some(self.public_access_block.to_string()),
        );
        params.insert(
            PARAM_PERMISSIONS_BOUNDARY.to_string(),
            Some(self.permissions_boundary.clone().unwrap_or_default()),
        );
        params
    }
}

/// Stack parameters for the legacy template.
pub fn legacy_stack_parameters(input: &BootstrapInput) -> StackParameters {
    let mut params = StackParameters::new();
    params.insert(PARAM_BUCKET_NAME.to_string(), input.bucket_name.clone());
    params.insert(PARAM_KMS_KEY_ID.to_string(), input.kms_key_id.clone());
    params.insert(
        PARAM_PUBLIC_ACCESS_BLOCK.to_string(),
        Some(input.public_access_block_configuration.unwrap_or(true).to_string()),
    );
    params
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
