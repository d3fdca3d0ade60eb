use thiserror::Error;

/// Centralized error types for the application
///
/// All errors are converted to this enum for consistent handling. The first
/// four variants are the business taxonomy surfaced to callers; the rest are
/// infrastructure failures that must never leak internal detail past the
/// HTTP boundary.
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller-supplied input violates a documented precondition.
    /// Always caller-fixable, never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced entity does not exist or is not visible under the
    /// current policy.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity exists and is active, but the caller's access tier is
    /// insufficient. Kept distinct from `NotFound` internally even where
    /// the public surface deliberately merges the two.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A uniqueness or structural invariant would be violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing or invalid admin credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
