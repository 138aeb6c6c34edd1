//! Error types shared by every component of the food diary
//!
//! `DatabaseError` describes datastore failures. `CoreError` is the single
//! taxonomy that components report to their callers; each externally
//! observable failure class has exactly one variant so callers cannot tell
//! which internal check rejected a request.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Error kinds reported by the credential, session, social and diary layers
#[derive(Error, Debug)]
pub enum CoreError {
    /// Missing, malformed, unknown or expired bearer token
    #[error("Unauthorized")]
    Unauthorized,

    /// Login or registration credentials did not match
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Already friends")]
    AlreadyFriends,

    /// Authenticated, but not allowed to see the requested data
    #[error("Not friends")]
    Forbidden,

    /// Malformed input
    #[error("{0}")]
    Validation(String),

    #[error("Not found")]
    NotFound,

    /// Failure inside the service that is not the caller's fault
    #[error("Internal error: {0}")]
    Internal(String),

    /// Transient datastore failure; the caller decides whether to retry
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl CoreError {
    /// Build a validation error from any displayable message
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }
}

impl From<SqlxError> for CoreError {
    fn from(err: SqlxError) -> Self {
        CoreError::Database(DatabaseError::Query(err))
    }
}

/// Type alias for Result with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

/// True when the datastore rejected a write because of a unique or primary key
pub fn is_unique_violation(err: &SqlxError) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

/// True when the datastore rejected a write because a referenced row is missing
pub fn is_foreign_key_violation(err: &SqlxError) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_foreign_key_violation())
}
