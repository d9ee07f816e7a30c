//! Error types for the workflow engine
//!
//! Store failures are classified at the engine boundary:
//! - missing rows become [`WorkflowError::NotFound`]
//! - lost compare-and-swap races become [`WorkflowError::Conflict`]
//! - everything else is wrapped in [`WorkflowError::StoreFailure`]

use ach_model::{AchievementStatus, ModelError, TransitionError};
use ach_store::StoreError;

/// Result alias for engine operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Reference, document or profile does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Actor lacks the permission or the ownership/advisor scope
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Requested edge is not in the state machine
    #[error("invalid transition {from} -> {to}")]
    InvalidTransition {
        from: AchievementStatus,
        to: AchievementStatus,
    },

    /// Input rejected before any write
    #[error("validation failed: {0}")]
    Validation(String),

    /// Status changed between load and conditional update
    #[error("conflict: {0}")]
    Conflict(String),

    /// A primary store write or read failed
    #[error("store failure")]
    StoreFailure(#[source] StoreError),
}

impl WorkflowError {
    /// Check if retrying the operation may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::StoreFailure(_))
    }

    #[inline]
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    #[inline]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Conflict(why) => Self::Conflict(why),
            other => Self::StoreFailure(other),
        }
    }
}

impl From<TransitionError> for WorkflowError {
    fn from(err: TransitionError) -> Self {
        Self::InvalidTransition {
            from: err.from,
            to: err.to,
        }
    }
}

impl From<ModelError> for WorkflowError {
    fn from(err: ModelError) -> Self {
        Self::Validation(err.to_string())
    }
}
