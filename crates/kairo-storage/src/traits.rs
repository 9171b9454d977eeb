//! Storage abstraction trait
//!
//! This module defines the Storage trait that all object storage backends must implement.

use async_trait::async_trait;
use bytes::Bytes;
use kairo_core::AppError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(path) => AppError::NotFound(format!("Object not found: {}", path)),
            StorageError::AlreadyExists(path) => {
                AppError::Conflict(format!("The resource already exists: {}", path))
            }
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Storage abstraction trait
///
/// Backends address binaries by path inside a single bucket chosen at construction.
/// Uploads never overwrite: writing to an occupied path fails with
/// [`StorageError::AlreadyExists`].
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write a binary at `path`.
    async fn upload(&self, path: &str, content_type: &str, data: Bytes) -> StorageResult<()>;

    /// Read the binary stored at `path`.
    async fn download(&self, path: &str) -> StorageResult<Bytes>;

    /// Remove the binaries at `paths`. Missing paths are not an error.
    async fn remove(&self, paths: &[String]) -> StorageResult<()>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
