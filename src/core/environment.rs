//! Deployment environments and resolved account identities.
//!
//! An [`Environment`] is the `(account, region)` pair every cache in this
//! crate is keyed on.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Partition used when nothing better is known.
pub const DEFAULT_PARTITION: &str = "aws";

/// The target of a deployment: one account in one region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Environment {
    account: String,
    region: String,
}

impl Environment {
    /// Create a new environment.
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Environment {
            account: account.into(),
            region: region.into(),
        }
    }

    /// Account id of this environment.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Region of this environment.
    pub fn region(&self) -> &str {
        &self.region
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aws://{}/{}", self.account, self.region)
    }
}

/// The account a set of credentials resolves to.
///
/// This is what the account identity cache stores per credential
/// fingerprint. Field names are camelCase on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountIdentity {
    pub account_id: String,
    pub partition: String,
}

impl AccountIdentity {
    pub fn new(account_id: impl Into<String>, partition: impl Into<String>) -> Self {
        AccountIdentity {
            account_id: account_id.into(),
            partition: partition.into(),
        }
    }
}
