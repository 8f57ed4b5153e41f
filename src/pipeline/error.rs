use thiserror::Error;

use crate::database::StoreError;

/// Fatal pipeline errors.
///
/// These describe a misconfigured process or an infrastructure fault, never
/// a rejected request; business failures travel inside an `Outcome`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No handler registered for request type {request}")]
    HandlerNotFound { request: &'static str },

    #[error("More than one handler registered for request type {request}")]
    DuplicateHandler { request: &'static str },

    #[error("Request type {request} does not declare an authorization policy")]
    MissingAuthorizationMetadata { request: &'static str },

    #[error("Request was cancelled before completion")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// True for errors that indicate broken startup wiring
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PipelineError::HandlerNotFound { .. }
                | PipelineError::DuplicateHandler { .. }
                | PipelineError::MissingAuthorizationMetadata { .. }
        )
    }
}
