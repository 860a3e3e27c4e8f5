//! # Database Error Types
//!
//! Error types for database operations and engine calls.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  ValidationError / CoreError (bistro-core)     sqlx::Error              │
//! │           │                                        │                    │
//! │           ▼                                        ▼                    │
//! │  DbError::Domain(CoreError)          DbError::{UniqueViolation, ...}    │
//! │           │                                        │                    │
//! │           └──────────────┬─────────────────────────┘                    │
//! │                          ▼                                              │
//! │                  DbError::kind() → ErrorKind                            │
//! │                          │                                              │
//! │                          ▼                                              │
//! │           API layer maps kind → status code / message                  │
//! │                                                                         │
//! │  Any error returned while a UnitOfWork is open drops it, which rolls   │
//! │  the transaction back.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bistro_core::{CoreError, ErrorKind, ValidationError};
use thiserror::Error;

/// Database and engine errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A domain rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - ID doesn't exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate customer phone or employee email
    /// - A second open bill for the same table
    /// - A second import receipt for the same purchase order
    #[error("Duplicate {field}: already exists")]
    UniqueViolation { field: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Referencing a non-existent drink, unit or supplier
    /// - Deleting a row that is still referenced
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (e.g. stock driven below zero).
    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed to begin or commit.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Returns the kind callers branch on.
    ///
    /// ## Mapping
    /// ```text
    /// Domain(e)            → e.kind()
    /// NotFound             → ItemNotFound
    /// ForeignKeyViolation  → ItemNotFound
    /// UniqueViolation      → Conflict
    /// everything else      → Internal
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Domain(err) => err.kind(),
            DbError::NotFound { .. } | DbError::ForeignKeyViolation { .. } => {
                ErrorKind::ItemNotFound
            }
            DbError::UniqueViolation { .. } => ErrorKind::Conflict,
            _ => ErrorKind::Internal,
        }
    }

    /// Returns the domain error, if this is one.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            DbError::Domain(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                // "CHECK constraint failed: <expr>"
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::ConstraintViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let domain: DbError = CoreError::RoundNotFound("r".into()).into();
        assert_eq!(domain.kind(), ErrorKind::RoundNotFound);

        assert_eq!(DbError::not_found("Drink", "d").kind(), ErrorKind::ItemNotFound);
        assert_eq!(
            DbError::UniqueViolation {
                field: "customers.phone".into()
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(DbError::PoolExhausted.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_validation_error_is_invalid_input() {
        let err: DbError = ValidationError::Required {
            field: "name".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.as_domain().is_some());
    }
}
