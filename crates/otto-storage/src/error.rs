use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("not found")]
    NotFound,
    #[error("dedupe key already exists")]
    Duplicate,
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for otto_core::OttoError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => otto_core::OttoError::NotFound,
            other => otto_core::OttoError::Internal(other.to_string()),
        }
    }
}
