//! CloudFormation template expressions.

pub mod errors;
pub mod evaluate;

pub use errors::EvaluationError;
pub use evaluate::{CfnEvaluator, EvaluationContext};
