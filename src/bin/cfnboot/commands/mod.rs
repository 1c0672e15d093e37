//! Command implementations

pub mod cache;
pub mod eval;
pub mod template;
