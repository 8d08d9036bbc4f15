use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] eyre::Report),

    #[error("Internal error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl PlannerError {
    pub(crate) fn schedule_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("Schedule with ID {} not found", id))
    }

    pub(crate) fn timeslot_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("Timeslot with ID {} not found", id))
    }
}

pub type PlannerResult<T> = Result<T, PlannerError>;
