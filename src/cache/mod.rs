//! Caches in front of remote lookups.
//!
//! - [`account`]: credential fingerprint to account identity, persisted to disk
//! - [`environment`]: per-environment bootstrap stack and version lookups

pub mod account;
pub mod environment;

pub use account::AccountIdentityCache;
pub use environment::{EnvironmentRegistry, EnvironmentResources, LookupError};
