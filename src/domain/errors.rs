use thiserror::Error;

/// Why two tickets cannot be merged. These are caller-correctable, not system faults.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeRejection {
    #[error("a ticket cannot be merged into itself")]
    SameTicket,
    #[error("these tickets cannot be merged - different offices")]
    DifferentOffices,
    #[error("ticket #{0} has already been merged")]
    AlreadyMerged(i64),
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Merge rejected: {0}")]
    MergeRejected(#[from] MergeRejection),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DomainError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message();
                if message.contains("UNIQUE") || message.contains("unique") {
                    DomainError::Conflict(message.to_string())
                } else {
                    DomainError::Internal(format!("Database error: {}", message))
                }
            }
            other => DomainError::Internal(format!("Database error: {}", other)),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DomainError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DomainError::Internal(format!("Migration error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_rejection_messages_are_actionable() {
        let err: DomainError = MergeRejection::DifferentOffices.into();
        assert_eq!(
            err.to_string(),
            "Merge rejected: these tickets cannot be merged - different offices"
        );
        assert_eq!(
            MergeRejection::AlreadyMerged(42).to_string(),
            "ticket #42 has already been merged"
        );
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: DomainError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
