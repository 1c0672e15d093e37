//! High-level operations.
//!
//! This module contains bootstrap version validation and the bootstrap
//! orchestration itself.

pub mod bootstrap;
pub mod validate;

pub use bootstrap::{
    BootstrapError, BootstrapFlavor, BootstrapOptions, BootstrapSource, Bootstrapper,
    TemplateProvider,
};
pub use validate::{ValidationError, VersionValidator};
