//! cfnboot - bootstrap trust infrastructure for CloudFormation deployments
//!
//! This crate provides the core library functionality for cfnboot:
//! caching account identities and bootstrap stack lookups, validating
//! bootstrap versions, deploying the bootstrap stack, and evaluating
//! CloudFormation intrinsic functions.
//!
//! Remote services are reached through the traits in [`remote`]; this crate
//! ships no network client of its own.

pub mod cache;
pub mod cfn;
pub mod core;
pub mod ops;
pub mod remote;
pub mod util;

/// Test utilities and fakes for cfnboot unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides in-memory implementations of every remote
/// collaborator.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{AccountIdentity, BootstrapStackInfo, BootstrapTemplate, Environment};
pub use cache::{AccountIdentityCache, EnvironmentRegistry, EnvironmentResources};
pub use cfn::{CfnEvaluator, EvaluationContext};
pub use ops::{Bootstrapper, VersionValidator};
pub use util::context::GlobalContext;
