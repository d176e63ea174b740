//! Error types for the Cohort storage layer.

use thiserror::Error;

use crate::models::role::UnknownRole;

#[derive(Debug, Error)]
pub enum CohortError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    /// A compare-and-swap lost the race: the record exists but no longer
    /// matches the expected state.
    #[error("Conflicting update on {entity} with id {id}")]
    Conflict { entity: String, id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A stored role outside the hierarchy.
    #[error(transparent)]
    UnknownRole(#[from] UnknownRole),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CohortResult<T> = Result<T, CohortError>;
