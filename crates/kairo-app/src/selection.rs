//! Local file selection for the upload view.

use bytes::Bytes;
use kairo_core::constants::FALLBACK_CONTENT_TYPE;
use kairo_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
enum Source {
    Path(PathBuf),
    Memory(Bytes),
}

/// A file chosen for upload. Only its metadata is read until the upload starts.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    name: String,
    content_type: String,
    size: u64,
    source: Source,
}

/// MIME type for a file name, from its extension.
pub fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}

impl SelectedFile {
    /// Select a file on disk. Fails if it is missing, not a regular file, or unnamed.
    pub async fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            AppError::InvalidInput(format!("Cannot read {}: {}", path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(AppError::InvalidInput(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                AppError::InvalidInput(format!("{} has no usable file name", path.display()))
            })?
            .to_string();

        Ok(Self {
            content_type: guess_content_type(&name),
            name,
            size: metadata.len(),
            source: Source::Path(path.to_path_buf()),
        })
    }

    /// Select in-memory content, e.g. from a drag-and-drop payload.
    pub fn from_bytes(name: impl Into<String>, content_type: Option<&str>, data: Bytes) -> Self {
        let name = name.into();
        let content_type = content_type
            .filter(|ct| !ct.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| guess_content_type(&name));
        Self {
            name,
            content_type,
            size: data.len() as u64,
            source: Source::Memory(data),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Load the content for upload.
    pub async fn read(&self) -> AppResult<Bytes> {
        match &self.source {
            Source::Memory(data) => Ok(data.clone()),
            Source::Path(path) => {
                let data = tokio::fs::read(path).await.map_err(|e| {
                    AppError::Internal(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Ok(Bytes::from(data))
            }
        }
    }
}
