//! Core data structures for cfnboot.
//!
//! This module contains the value types shared by every component:
//! - Deployment environments and resolved account identities
//! - Descriptions of deployed bootstrap stacks
//! - Bootstrap templates

pub mod environment;
pub mod stack_info;
pub mod template;

pub use environment::{AccountIdentity, Environment, DEFAULT_PARTITION};
pub use stack_info::{split_cfn_array, BootstrapStackInfo, DEFAULT_BOOTSTRAP_VARIANT};
pub use template::BootstrapTemplate;
