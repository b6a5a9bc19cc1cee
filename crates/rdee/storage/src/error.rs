use rdee_types::{RdeeError, TraceId};

/// Errors from trace archives.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("trace already archived: {0}")]
    AlreadyExists(TraceId),
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("trace encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("corrupt archive line {line}: {reason}")]
    Corrupt { line: usize, reason: String },
    #[error("archive lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Convenience type alias for archive results.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for RdeeError {
    fn from(e: StorageError) -> Self {
        RdeeError::Archive(e.to_string())
    }
}
