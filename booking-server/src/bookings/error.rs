//! Lifecycle manager errors

use crate::db::repository::RepoError;
use crate::utils::AppError;
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Slot not found: {0}")]
    SlotNotFound(String),

    #[error("Slot is not available: {0}")]
    SlotUnavailable(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Resource is not bookable: {0}")]
    ResourceInactive(String),

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Conflicting update: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Repo(#[from] RepoError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// 存储层错误按内容归类。RocksDB 乐观事务的提交冲突对调用方来说
/// 就是「再试一次」，归为 Conflict 而不是数据库故障。
pub fn classify_repo_error(err: RepoError) -> BookingError {
    if let RepoError::Database(msg) = &err {
        let lower = msg.to_lowercase();
        if lower.contains("read or write conflict")
            || lower.contains("resource busy")
            || lower.contains("can be retried")
        {
            return BookingError::Conflict("Concurrent update, try again".to_string());
        }
    }
    BookingError::Repo(err)
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::SlotNotFound(msg)
            | BookingError::ResourceNotFound(msg)
            | BookingError::BookingNotFound(msg) => AppError::not_found(msg),
            BookingError::SlotUnavailable(msg) => AppError::conflict(msg),
            BookingError::ResourceInactive(msg) => AppError::validation(msg),
            BookingError::Forbidden(msg) => AppError::forbidden(msg),
            BookingError::InvalidTransition { .. } => AppError::conflict(err.to_string()),
            BookingError::Conflict(msg) => AppError::conflict(msg),
            BookingError::Validation(msg) => AppError::validation(msg),
            BookingError::Repo(repo) => AppError::from(repo),
            BookingError::Internal(msg) => AppError::internal(msg),
        }
    }
}

/// Result type for manager operations
pub type BookingResult<T> = Result<T, BookingError>;
