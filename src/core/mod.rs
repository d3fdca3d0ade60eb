//! Core utilities: configuration, errors, access policy, validation

pub mod access;
pub mod config;
pub mod error;
pub mod validation;

// Re-exports for convenience
pub use self::error::{AppError, AppResult};
