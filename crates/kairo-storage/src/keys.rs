//! Shared path generation for storage backends.
//!
//! Path format: `{owner_id}/{file_name}`. Re-uploading the same name for the same owner
//! targets the same path.

use crate::traits::{StorageError, StorageResult};
use uuid::Uuid;

/// Generate the storage path for a file owned by `owner`.
///
/// The file name must be a single path segment.
pub fn object_path(owner: Uuid, file_name: &str) -> StorageResult<String> {
    if file_name.is_empty()
        || file_name == "."
        || file_name == ".."
        || file_name.contains('/')
        || file_name.contains('\\')
    {
        tracing::debug!(%owner, file_name, "Rejected file name for storage path");
        return Err(StorageError::InvalidKey(format!(
            "File name is not a single path segment: {:?}",
            file_name
        )));
    }
    Ok(format!("{}/{}", owner, file_name))
}

/// Reject paths that could escape the bucket or address its root.
pub fn validate_path(path: &str) -> StorageResult<()> {
    if path.is_empty() || path.starts_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "Storage path must be relative: {:?}",
            path
        )));
    }
    if path.split('/').any(|segment| segment.is_empty() || segment == "..") {
        tracing::warn!(path, "Rejected storage path with invalid segments");
        return Err(StorageError::InvalidKey(format!(
            "Storage path contains invalid segments: {:?}",
            path
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_path_is_owner_scoped() {
        let owner = Uuid::new_v4();
        let path = object_path(owner, "report.pdf").unwrap();
        assert_eq!(path, format!("{}/report.pdf", owner));
        assert!(validate_path(&path).is_ok());
    }

    #[test]
    fn test_object_path_rejects_nested_names() {
        let owner = Uuid::new_v4();
        for name in ["", ".", "..", "a/b.txt", "..\\evil"] {
            assert!(
                matches!(object_path(owner, name), Err(StorageError::InvalidKey(_))),
                "{:?} should be rejected",
                name
            );
        }
        assert!(object_path(owner, "v1..2.tar.gz").is_ok());
    }

    #[test]
    fn test_validate_path_rejects_traversal() {
        assert!(validate_path("../etc/passwd").is_err());
        assert!(validate_path("/etc/passwd").is_err());
        assert!(validate_path("owner//file").is_err());
        assert!(validate_path("").is_err());
        assert!(validate_path("owner/file.txt").is_ok());
    }
}
