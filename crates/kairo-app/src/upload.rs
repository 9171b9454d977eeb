//! Upload workflow for the home view.
//!
//! An upload is two phases with a typed hand-off: [`store_binary`] writes the object and
//! yields a [`StoredBinary`], and only a `StoredBinary` can be committed as a metadata
//! record. A record therefore never exists for a binary that failed to write.

use crate::backend::Backend;
use crate::notify::Notifier;
use crate::selection::SelectedFile;
use kairo_core::{
    format_bytes, AppError, FileRecord, FileTable, NewFileRecord, Session, Visibility,
};
use kairo_storage::{object_path, Storage};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

pub const UPLOAD_SUCCEEDED: &str = "File uploaded successfully!";
pub const UPLOAD_FAILED: &str = "Upload Failed! Check the logs for more details.";
pub const NOTHING_SELECTED: &str = "Please select a file first!";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file selected")]
    NoSelection,

    #[error("An upload is already in progress")]
    Busy,

    /// The binary was not written, so no record was attempted.
    #[error("Upload failed before anything was stored: {0}")]
    NothingStored(#[source] AppError),

    /// The binary was written but its record was not; the object at `path` is orphaned.
    #[error("Stored {path} but could not record it: {source}")]
    Orphaned {
        path: String,
        #[source]
        source: AppError,
    },
}

/// A binary that is known to be in object storage and not yet recorded.
#[derive(Debug)]
#[must_use = "a stored binary should be committed or it is orphaned"]
pub struct StoredBinary {
    path: String,
    file_name: String,
    content_type: String,
    size: u64,
    owner: Uuid,
}

impl StoredBinary {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Insert the metadata record for this binary.
    pub async fn commit(
        self,
        table: &dyn FileTable,
        visibility: Visibility,
    ) -> Result<FileRecord, UploadError> {
        let record = NewFileRecord {
            file_name: self.file_name,
            file_path: self.path.clone(),
            file_type: self.content_type,
            file_size: i64::try_from(self.size).unwrap_or(i64::MAX),
            is_public: visibility.is_public(),
            user_id: self.owner,
        };

        table
            .insert(&record)
            .await
            .map_err(|source| UploadError::Orphaned {
                path: self.path,
                source,
            })
    }
}

/// Write the selected file to `<owner>/<file name>`.
pub async fn store_binary(
    storage: &dyn Storage,
    owner: Uuid,
    file: &SelectedFile,
) -> Result<StoredBinary, AppError> {
    let path = object_path(owner, file.name())?;
    let data = file.read().await?;
    // The file may have changed since it was selected; record what was stored.
    let size = data.len() as u64;
    storage.upload(&path, file.content_type(), data).await?;

    Ok(StoredBinary {
        path,
        file_name: file.name().to_string(),
        content_type: file.content_type().to_string(),
        size,
        owner,
    })
}

#[derive(Debug, Default)]
struct UploadState {
    selection: Option<SelectedFile>,
    busy: bool,
}

/// Resets the view once an attempt ends, whatever its outcome.
struct AttemptGuard<'a> {
    state: &'a Mutex<UploadState>,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.busy = false;
        state.selection = None;
    }
}

pub struct UploadWorkflow {
    storage: Arc<dyn Storage>,
    table: Arc<dyn FileTable>,
    notifier: Arc<dyn Notifier>,
    max_upload_bytes: u64,
    state: Mutex<UploadState>,
}

impl UploadWorkflow {
    pub fn new(backend: &Backend, notifier: Arc<dyn Notifier>, max_upload_bytes: u64) -> Self {
        Self {
            storage: backend.storage.clone(),
            table: backend.table.clone(),
            notifier,
            max_upload_bytes,
            state: Mutex::new(UploadState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, UploadState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    pub fn selection(&self) -> Option<SelectedFile> {
        self.lock().selection.clone()
    }

    /// Choose the file for the next upload. Oversize files are rejected with an alert and
    /// leave nothing selected.
    pub fn select(&self, file: SelectedFile) -> Result<(), AppError> {
        let mut state = self.lock();
        if state.busy {
            return Err(AppError::InvalidInput(
                "Cannot change the selection while an upload is in progress".to_string(),
            ));
        }

        if file.size() > self.max_upload_bytes {
            state.selection = None;
            drop(state);
            let limit = format_bytes(self.max_upload_bytes, 2).replace(' ', "");
            let message = format!("File is too large! Maximum size is {}.", limit);
            self.notifier.alert(&message);
            return Err(AppError::PayloadTooLarge(message));
        }

        tracing::debug!(
            file_name = %file.name(),
            size_bytes = file.size(),
            content_type = %file.content_type(),
            "File selected"
        );
        state.selection = Some(file);
        Ok(())
    }

    pub fn clear_selection(&self) {
        let mut state = self.lock();
        if !state.busy {
            state.selection = None;
        }
    }

    /// Upload the selected file for the session's user.
    pub async fn upload(
        &self,
        session: &Session,
        visibility: Visibility,
    ) -> Result<FileRecord, UploadError> {
        let file = {
            let mut state = self.lock();
            if state.busy {
                return Err(UploadError::Busy);
            }
            match state.selection.clone() {
                Some(file) => {
                    state.busy = true;
                    file
                }
                None => {
                    drop(state);
                    self.notifier.alert(NOTHING_SELECTED);
                    return Err(UploadError::NoSelection);
                }
            }
        };
        let _attempt = AttemptGuard { state: &self.state };

        let start = Instant::now();
        let result = match store_binary(self.storage.as_ref(), session.user_id(), &file).await {
            Ok(stored) => stored.commit(self.table.as_ref(), visibility).await,
            Err(e) => Err(UploadError::NothingStored(e)),
        };

        match &result {
            Ok(record) => {
                tracing::info!(
                    record_id = %record.id,
                    path = %record.file_path,
                    size_bytes = record.file_size,
                    visibility = %visibility,
                    duration_ms = start.elapsed().as_millis(),
                    "File uploaded"
                );
                self.notifier.alert(UPLOAD_SUCCEEDED);
            }
            Err(UploadError::Orphaned { path, source }) => {
                tracing::error!(path = %path, error = %source, "Binary stored without a record");
                self.notifier.alert(UPLOAD_FAILED);
            }
            Err(e) => {
                tracing::error!(file_name = %file.name(), error = %e, "Upload failed");
                self.notifier.alert(UPLOAD_FAILED);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{session_for, TestBackend};
    use bytes::Bytes;

    fn workflow(env: &TestBackend, max: u64) -> UploadWorkflow {
        UploadWorkflow::new(&env.backend(), env.notifier(), max)
    }

    fn pdf(name: &str, size: usize) -> SelectedFile {
        SelectedFile::from_bytes(name, None, Bytes::from(vec![7u8; size]))
    }

    #[tokio::test]
    async fn test_upload_private_file() {
        let env = TestBackend::new();
        let upload = workflow(&env, 2 * 1024 * 1024);
        let session = session_for("ana@example.com");

        upload.select(pdf("report.pdf", 1024 * 1024)).unwrap();
        let record = upload.upload(&session, Visibility::Private).await.unwrap();

        let expected_path = format!("{}/report.pdf", session.user_id());
        assert_eq!(record.file_path, expected_path);
        assert_eq!(record.file_name, "report.pdf");
        assert_eq!(record.file_type, "application/pdf");
        assert_eq!(record.file_size, 1024 * 1024);
        assert!(!record.is_public);
        assert_eq!(record.user_id, session.user_id());
        assert!(env.storage.contains(&expected_path));
        assert_eq!(env.table.rows().len(), 1);
        assert_eq!(env.notifier.alerts(), vec![UPLOAD_SUCCEEDED.to_string()]);
        assert!(upload.selection().is_none());
        assert!(!upload.is_busy());
    }

    #[tokio::test]
    async fn test_oversize_selection_never_reaches_backend() {
        let env = TestBackend::new();
        let upload = workflow(&env, 1024);

        upload.select(pdf("small.pdf", 10)).unwrap();
        let err = upload.select(pdf("huge.pdf", 1025)).unwrap_err();

        assert!(matches!(err, AppError::PayloadTooLarge(_)));
        assert_eq!(
            env.notifier.alerts(),
            vec!["File is too large! Maximum size is 1KB.".to_string()]
        );
        assert!(upload.selection().is_none());
        assert_eq!(env.storage.call_count(), 0);
        assert_eq!(env.table.call_count(), 0);
    }

    #[tokio::test]
    async fn test_file_of_exactly_the_limit_is_accepted() {
        let env = TestBackend::new();
        let upload = workflow(&env, 1024);

        upload.select(pdf("edge.pdf", 1024)).unwrap();
        assert_eq!(upload.selection().map(|f| f.size()), Some(1024));
        assert!(env.notifier.alerts().is_empty());

        let record = upload
            .upload(&session_for("ana@example.com"), Visibility::Private)
            .await
            .unwrap();
        assert_eq!(record.file_size, 1024);
    }

    #[tokio::test]
    async fn test_record_size_matches_uploaded_bytes() {
        let env = TestBackend::new();
        let upload = workflow(&env, 1024);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("draft.txt");
        tokio::fs::write(&path, b"short").await.unwrap();

        upload.select(SelectedFile::from_path(&path).await.unwrap()).unwrap();
        tokio::fs::write(&path, b"a longer draft").await.unwrap();

        let record = upload
            .upload(&session_for("ana@example.com"), Visibility::Private)
            .await
            .unwrap();
        assert_eq!(record.file_size, 14);
    }

    #[test]
    fn test_default_limit_renders_as_2gb() {
        let limit = format_bytes(kairo_core::constants::MAX_UPLOAD_BYTES, 2).replace(' ', "");
        assert_eq!(limit, "2GB");
    }

    #[tokio::test]
    async fn test_upload_without_selection_alerts() {
        let env = TestBackend::new();
        let upload = workflow(&env, 1024);

        let err = upload
            .upload(&session_for("ana@example.com"), Visibility::Public)
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::NoSelection));
        assert_eq!(env.notifier.alerts(), vec![NOTHING_SELECTED.to_string()]);
        assert_eq!(env.storage.call_count(), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_writes_no_record() {
        let env = TestBackend::new();
        env.storage.fail_uploads(true);
        let upload = workflow(&env, 1024);

        upload.select(pdf("notes.txt", 12)).unwrap();
        let err = upload
            .upload(&session_for("ana@example.com"), Visibility::Public)
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::NothingStored(_)));
        assert_eq!(env.table.call_count(), 0);
        assert!(env.table.rows().is_empty());
        assert_eq!(env.notifier.alerts(), vec![UPLOAD_FAILED.to_string()]);
        assert!(upload.selection().is_none());
        assert!(!upload.is_busy());
    }

    #[tokio::test]
    async fn test_insert_failure_leaves_orphaned_binary() {
        let env = TestBackend::new();
        env.table.fail_insert(true);
        let upload = workflow(&env, 1024);
        let session = session_for("ana@example.com");

        upload.select(pdf("notes.txt", 12)).unwrap();
        let err = upload.upload(&session, Visibility::Public).await.unwrap_err();

        let expected_path = format!("{}/notes.txt", session.user_id());
        match err {
            UploadError::Orphaned { path, source } => {
                assert_eq!(path, expected_path);
                assert!(matches!(source, AppError::Database(_)));
            }
            other => panic!("expected orphaned binary, got {:?}", other),
        }
        assert!(env.storage.contains(&expected_path));
        assert!(env.table.rows().is_empty());
        assert!(upload.selection().is_none());
    }

    #[tokio::test]
    async fn test_same_name_reupload_is_rejected() {
        let env = TestBackend::new();
        let upload = workflow(&env, 1024);
        let session = session_for("ana@example.com");

        upload.select(pdf("notes.txt", 12)).unwrap();
        upload.upload(&session, Visibility::Private).await.unwrap();

        upload.select(pdf("notes.txt", 20)).unwrap();
        let err = upload.upload(&session, Visibility::Private).await.unwrap_err();

        assert!(matches!(
            err,
            UploadError::NothingStored(AppError::Conflict(_))
        ));
        assert_eq!(env.table.rows().len(), 1);
        assert_eq!(env.table.rows()[0].file_size, 12);
    }

    #[tokio::test]
    async fn test_different_owners_may_share_a_name() {
        let env = TestBackend::new();
        let upload = workflow(&env, 1024);

        for email in ["ana@example.com", "ben@example.com"] {
            upload.select(pdf("notes.txt", 12)).unwrap();
            upload
                .upload(&session_for(email), Visibility::Public)
                .await
                .unwrap();
        }

        assert_eq!(env.storage.len(), 2);
        assert_eq!(env.table.rows().len(), 2);
    }
}
