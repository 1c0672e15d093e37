//! Permissions boundary for roles created by the bootstrap stack.
//!
//! The boundary is either a policy the caller manages, referenced by name,
//! or the example policy, which is created in the account on first use.
//! The example policy is namespaced by the bootstrap qualifier.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use crate::core::Environment;
use crate::ops::bootstrap::errors::BootstrapError;
use crate::ops::bootstrap::params::PermissionsBoundaryInput;
use crate::remote::{IamPolicies, RemoteError};

/// Qualifier used when the caller does not pass one.
pub const DEFAULT_QUALIFIER: &str = "hnb659fds";

/// IAM policy names, optionally with a path.
static POLICY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w+/=,.@-]+$").expect("valid policy name regex"));

/// Check a custom boundary name against the IAM naming rules.
pub fn validate_policy_name(name: &str) -> Result<(), BootstrapError> {
    if POLICY_NAME.is_match(name) {
        Ok(())
    } else {
        Err(BootstrapError::InvalidPermissionsBoundary {
            name: name.to_string(),
        })
    }
}

/// Name of the example boundary policy for a qualifier.
pub fn example_policy_name(qualifier: &str) -> String {
    format!("cdk-{}-permissions-boundary", qualifier)
}

/// ARN of the example boundary policy.
pub fn example_policy_arn(partition: &str, account: &str, qualifier: &str) -> String {
    format!(
        "arn:{}:iam::{}:policy/{}",
        partition,
        account,
        example_policy_name(qualifier)
    )
}

/// Policy document of the example boundary.
///
/// Allows everything except creating users or roles without this boundary,
/// editing the boundary policy, and detaching boundaries.
pub fn example_policy_document(partition: &str, account: &str, qualifier: &str) -> serde_json::Value {
    let arn = example_policy_arn(partition, account, qualifier);
    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Sid": "ExplicitAllowAll",
                "Effect": "Allow",
                "Action": ["*"],
                "Resource": "*"
            },
            {
                "Sid": "DenyAccessIfRequiredPermBoundaryIsNotBeingApplied",
                "Effect": "Deny",
                "Action": ["iam:CreateUser", "iam:CreateRole"],
                "Resource": format!("arn:{}:iam::{}:*", partition, account),
                "Condition": {
                    "StringNotEquals": { "iam:PermissionsBoundary": arn }
                }
            },
            {
                "Sid": "DenyPermBoundaryIAMPolicyAlteration",
                "Effect": "Deny",
                "Action": [
                    "iam:CreatePolicyVersion",
                    "iam:DeletePolicy",
                    "iam:DeletePolicyVersion",
                    "iam:SetDefaultPolicyVersion"
                ],
                "Resource": arn
            },
            {
                "Sid": "DenyRemovalOfPermBoundaryFromAnyUserOrRole",
                "Effect": "Deny",
                "Action": [
                    "iam:DeleteUserPermissionsBoundary",
                    "iam:DeleteRolePermissionsBoundary"
                ],
                "Resource": "*"
            }
        ]
    })
}

/// Resolve the requested boundary to a policy name, creating the example
/// policy if it does not exist yet.
pub async fn resolve_boundary(
    iam: &dyn IamPolicies,
    environment: &Environment,
    partition: &str,
    qualifier: Option<&str>,
    input: &PermissionsBoundaryInput,
) -> Result<String, BootstrapError> {
    if let PermissionsBoundaryInput::Custom(name) = input {
        validate_policy_name(name)?;
        return Ok(name.clone());
    }

    let qualifier = qualifier.unwrap_or(DEFAULT_QUALIFIER);
    let arn = example_policy_arn(partition, environment.account(), qualifier);

    let arn = match iam.get_policy(environment, &arn).await {
        Ok(existing) => existing,
        Err(RemoteError::NotFound { .. }) => {
            tracing::debug!("creating example permissions boundary {}", arn);
            let document =
                example_policy_document(partition, environment.account(), qualifier).to_string();
            iam.create_policy(environment, &example_policy_name(qualifier), &document)
                .await?
        }
        Err(e) => return Err(e.into()),
    };

    match arn.rsplit('/').next() {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(BootstrapError::ExampleBoundaryUnavailable { arn }),
    }
}

/// Describe how the boundary changes, if it does.
pub fn describe_change(current: Option<&str>, new: Option<&str>) -> Option<String> {
    match (current, new) {
        (current, new) if current == new => None,
        (None, Some(new)) => Some(format!("Adding new permissions boundary {}", new)),
        (Some(current), None) => Some(format!(
            "Removing existing permissions boundary {}",
            current
        )),
        (Some(current), Some(new)) => Some(format!(
            "Changing permissions boundary from {} to {}",
            current, new
        )),
        (None, None) => None,
    }
}
