//! Side channel for user-facing warnings and progress.
//!
//! Components take an `Arc<dyn Reporter>` instead of logging directly, so
//! tests can capture what was reported. Reporting never fails the caller.

use std::sync::Arc;

/// Receives warning, info and debug messages.
pub trait Reporter: Send + Sync {
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Reporter that forwards to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{}", message);
    }
}

/// The reporter used when a caller does not supply one.
pub fn default_reporter() -> Arc<dyn Reporter> {
    Arc::new(TracingReporter)
}
