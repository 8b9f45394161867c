//! Convenience result type alias for H-Cloud.

use crate::error::AppError;

/// A specialized `Result` type for H-Cloud operations.
pub type AppResult<T> = Result<T, AppError>;
