//! Database-specific error types and conversions.

use cohort_core::error::CohortError;
use cohort_core::models::role::UnknownRole;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint violated on {entity}")]
    Duplicate { entity: String },

    #[error("Write conflict on {entity} with id {id}")]
    Conflict { entity: String, id: String },

    /// A stored row could not be turned back into a domain value.
    #[error("Corrupt row: {0}")]
    Decode(String),

    #[error(transparent)]
    UnknownRole(#[from] UnknownRole),
}

impl From<DbError> for CohortError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CohortError::NotFound { entity, id },
            DbError::Duplicate { entity } => CohortError::AlreadyExists { entity },
            DbError::Conflict { entity, id } => CohortError::Conflict { entity, id },
            DbError::UnknownRole(role) => CohortError::UnknownRole(role),
            DbError::Decode(msg) => CohortError::Internal(msg),
            other => CohortError::Database(other.to_string()),
        }
    }
}

/// Classify a failed statement: unique-index violations and transaction
/// conflicts become typed errors, everything else stays a database error.
pub(crate) fn classify(err: surrealdb::Error, entity: &str, id: &str) -> DbError {
    let message = err.to_string();
    if message.contains("already contains") {
        DbError::Duplicate {
            entity: entity.into(),
        }
    } else if message.contains("conflict") {
        DbError::Conflict {
            entity: entity.into(),
            id: id.into(),
        }
    } else {
        DbError::Surreal(err)
    }
}

/// Parse a UUID stored as a string.
pub(crate) fn parse_uuid(value: &str, field: &str) -> Result<uuid::Uuid, DbError> {
    uuid::Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {field} UUID: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_variants_keep_their_meaning() {
        let err: CohortError = DbError::Duplicate {
            entity: "verification_request".into(),
        }
        .into();
        assert!(matches!(err, CohortError::AlreadyExists { .. }));

        let err: CohortError = DbError::Conflict {
            entity: "verification_request".into(),
            id: "x".into(),
        }
        .into();
        assert!(matches!(err, CohortError::Conflict { .. }));

        let err: CohortError = DbError::UnknownRole(UnknownRole("owner".into())).into();
        assert!(matches!(err, CohortError::UnknownRole(_)));
    }

    #[test]
    fn bad_uuid_is_a_decode_error() {
        assert!(matches!(
            parse_uuid("not-a-uuid", "user"),
            Err(DbError::Decode(_))
        ));
    }
}
