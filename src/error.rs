//! Error types for the communication pipeline.

use thiserror::Error;

/// Errors a pipeline step can raise or report.
///
/// Returned as `Err` from [`PipelineStep::execute`](crate::pipeline::PipelineStep::execute)
/// for unexpected faults, or attached to a failed
/// [`PipelineResult`](crate::pipeline::PipelineResult) as its cause.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step rejected the request without a more specific cause.
    #[error("{0}")]
    Rejected(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid configuration for step '{step}': {message}")]
    InvalidConfiguration { step: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Build the generic error used when a failed result carries no cause.
    pub fn rejected(message: impl Into<String>) -> Self {
        PipelineError::Rejected(message.into())
    }
}
