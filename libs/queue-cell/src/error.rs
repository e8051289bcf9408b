use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Queue is stopped for the day")]
    QueueStopped,

    #[error("Queue is paused")]
    QueuePaused,

    #[error("Patient number {0} is already being served")]
    PatientAlreadyInProgress(u32),

    #[error("No patients waiting")]
    NoPatientsWaiting,

    #[error("Invalid reorder: {0}")]
    InvalidReorder(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Validation(msg) => AppError::ValidationError(msg),
            QueueError::NotFound(msg) => AppError::NotFound(msg),
            QueueError::InvalidStateTransition { .. }
            | QueueError::QueueStopped
            | QueueError::QueuePaused
            | QueueError::PatientAlreadyInProgress(_)
            | QueueError::InvalidReorder(_) => AppError::Conflict(err.to_string()),
            // Empty waiting set is an expected outcome, not a server fault.
            QueueError::NoPatientsWaiting => AppError::NotFound(err.to_string()),
            QueueError::StorageUnavailable(msg) => AppError::ExternalService(msg),
        }
    }
}
