//! Public and private file listings.
//!
//! Both views share [`Listing`]; the marker type decides which records are fetched and
//! which row action exists. Download is only implemented for [`PublicFiles`], delete only
//! for [`PrivateFiles`].

use crate::backend::Backend;
use crate::notify::Notifier;
use chrono::Local;
use kairo_core::{
    format_bytes, AppError, AppResult, ErrorMetadata, FileRecord, FileTable, RecordFilter,
    Session, Visibility,
};
use kairo_storage::Storage;
use serde::Serialize;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

pub const DELETE_PROMPT: &str =
    "Are you sure you want to delete this file? This action cannot be undone.";
pub const DELETE_SUCCEEDED: &str = "File deleted successfully!";

/// Which records a listing shows and how it labels them.
pub trait ListingKind: Send + Sync + 'static {
    const VISIBILITY: Visibility;
    const TITLE: &'static str;
    const EMPTY_MESSAGE: &'static str;
    const ACTION: &'static str;

    fn filter(session: &Session) -> RecordFilter;
}

pub struct PublicFiles;

pub struct PrivateFiles;

impl ListingKind for PublicFiles {
    const VISIBILITY: Visibility = Visibility::Public;
    const TITLE: &'static str = "Public Uploads";
    const EMPTY_MESSAGE: &'static str = "No public files have been uploaded yet.";
    const ACTION: &'static str = "Download";

    fn filter(_session: &Session) -> RecordFilter {
        RecordFilter::public()
    }
}

impl ListingKind for PrivateFiles {
    const VISIBILITY: Visibility = Visibility::Private;
    const TITLE: &'static str = "My Private Uploads";
    const EMPTY_MESSAGE: &'static str = "You haven't uploaded any private files yet.";
    const ACTION: &'static str = "Delete";

    fn filter(session: &Session) -> RecordFilter {
        RecordFilter::private_to(session.user_id())
    }
}

/// Keep only records whose name contains `term`, ignoring case.
pub fn filter_records<'a>(records: &'a [FileRecord], term: &str) -> Vec<&'a FileRecord> {
    records.iter().filter(|r| r.matches_search(term)).collect()
}

/// One rendered table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub id: Uuid,
    pub name: String,
    pub file_type: String,
    pub size: String,
    pub uploaded_on: String,
    pub action: &'static str,
}

#[derive(Debug, Default)]
struct ListingState {
    records: Vec<FileRecord>,
    search_term: String,
    loaded: bool,
    downloading: Option<Uuid>,
}

pub struct Listing<K: ListingKind> {
    table: Arc<dyn FileTable>,
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<ListingState>,
    kind: PhantomData<fn() -> K>,
}

impl<K: ListingKind> Listing<K> {
    pub fn new(backend: &Backend, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            table: backend.table.clone(),
            storage: backend.storage.clone(),
            notifier,
            state: Mutex::new(ListingState::default()),
            kind: PhantomData,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListingState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn title(&self) -> &'static str {
        K::TITLE
    }

    pub fn visibility(&self) -> Visibility {
        K::VISIBILITY
    }

    /// False until the first fetch has finished, successfully or not.
    pub fn is_loaded(&self) -> bool {
        self.lock().loaded
    }

    /// Fetch the records for this view, newest first. A failed fetch is alerted and
    /// leaves the table empty.
    pub async fn mount(&self, session: &Session) -> AppResult<()> {
        let filter = K::filter(session);
        let result = self.table.select(&filter).await;

        let mut state = self.lock();
        state.loaded = true;
        match result {
            Ok(mut records) => {
                records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                tracing::debug!(
                    visibility = %K::VISIBILITY,
                    count = records.len(),
                    "Listing loaded"
                );
                state.records = records;
                Ok(())
            }
            Err(e) => {
                state.records.clear();
                drop(state);
                tracing::error!(visibility = %K::VISIBILITY, error = %e, "Failed to fetch files");
                self.notifier.alert(&e.client_message());
                Err(e)
            }
        }
    }

    pub fn set_search_term(&self, term: impl Into<String>) {
        self.lock().search_term = term.into();
    }

    pub fn search_term(&self) -> String {
        self.lock().search_term.clone()
    }

    /// Every fetched record, regardless of the search term.
    pub fn records(&self) -> Vec<FileRecord> {
        self.lock().records.clone()
    }

    /// Records matching the current search term, in fetch order.
    pub fn visible(&self) -> Vec<FileRecord> {
        let state = self.lock();
        filter_records(&state.records, &state.search_term)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn rows(&self) -> Vec<RowView> {
        let downloading = self.lock().downloading;
        self.visible()
            .into_iter()
            .map(|record| {
                let action = if K::VISIBILITY.is_public() && downloading == Some(record.id) {
                    "Downloading..."
                } else {
                    K::ACTION
                };
                RowView {
                    id: record.id,
                    size: format_bytes(u64::try_from(record.file_size).unwrap_or(0), 2),
                    uploaded_on: record
                        .created_at
                        .with_timezone(&Local)
                        .format("%Y-%m-%d")
                        .to_string(),
                    name: record.file_name,
                    file_type: record.file_type,
                    action,
                }
            })
            .collect()
    }

    /// Text shown in place of the table when no row is visible.
    pub fn empty_message(&self) -> String {
        let term = self.search_term();
        if term.is_empty() {
            K::EMPTY_MESSAGE.to_string()
        } else {
            format!("No files found for \"{}\"", term)
        }
    }

    fn find(&self, id: Uuid) -> Option<FileRecord> {
        self.lock().records.iter().find(|r| r.id == id).cloned()
    }
}

/// Clears the download indicator unless another download has taken it over.
struct DownloadGuard<'a> {
    state: &'a Mutex<ListingState>,
    id: Uuid,
}

impl Drop for DownloadGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.downloading == Some(self.id) {
            state.downloading = None;
        }
    }
}

impl Listing<PublicFiles> {
    pub fn downloading(&self) -> Option<Uuid> {
        self.lock().downloading
    }

    /// Save a listed file into `dest_dir` under its original name and return the path
    /// written. An existing file is never overwritten; a numbered name is chosen instead.
    pub async fn download(&self, id: Uuid, dest_dir: &Path) -> AppResult<PathBuf> {
        let result = self.download_inner(id, dest_dir).await;
        if let Err(e) = &result {
            tracing::error!(record_id = %id, error = %e, "Download failed");
            self.notifier
                .alert(&format!("Error downloading file: {}", e.client_message()));
        }
        result
    }

    async fn download_inner(&self, id: Uuid, dest_dir: &Path) -> AppResult<PathBuf> {
        let record = self
            .find(id)
            .ok_or_else(|| AppError::NotFound(format!("No public file with id {}", id)))?;

        let _indicator = {
            let mut state = self.lock();
            if state.downloading == Some(id) {
                return Err(AppError::InvalidInput(format!(
                    "{} is already downloading",
                    record.file_name
                )));
            }
            state.downloading = Some(id);
            DownloadGuard {
                state: &self.state,
                id,
            }
        };

        let data = self.storage.download(&record.file_path).await?;
        let dir = dest_dir.to_path_buf();
        let file_name = record.file_name.clone();
        let saved = tokio::task::spawn_blocking(move || save_unique(&dir, &file_name, &data))
            .await
            .map_err(|e| AppError::Internal(format!("Download task failed: {}", e)))??;

        tracing::info!(record_id = %id, path = %saved.display(), "File downloaded");
        Ok(saved)
    }
}

/// Write `data` to a temporary file in `dir`, then move it to the first free name among
/// `name`, `stem (1).ext`, `stem (2).ext`, ...
fn save_unique(dir: &Path, name: &str, data: &[u8]) -> std::io::Result<PathBuf> {
    let name = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("download");

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.flush()?;

    let mut attempt = 0;
    loop {
        let candidate = dir.join(numbered_name(name, attempt));
        match tmp.persist_noclobber(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists && attempt < 1000 => {
                tmp = e.file;
                attempt += 1;
            }
            Err(e) => return Err(e.error),
        }
    }
}

fn numbered_name(name: &str, n: usize) -> String {
    if n == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, n, ext),
        _ => format!("{} ({})", name, n),
    }
}

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("No private file with id {0}")]
    UnknownRecord(Uuid),

    /// Removing the binary failed; the record was left untouched.
    #[error("Could not remove the stored file: {0}")]
    BinaryKept(#[source] AppError),

    /// The binary is gone but the record still references `path`.
    #[error("Removed {path} but could not delete its record: {source}")]
    RecordKept {
        path: String,
        #[source]
        source: AppError,
    },
}

impl DeleteError {
    fn client_message(&self) -> String {
        match self {
            DeleteError::UnknownRecord(_) => self.to_string(),
            DeleteError::BinaryKept(source) | DeleteError::RecordKept { source, .. } => {
                source.client_message()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Cancelled,
    Deleted(FileRecord),
}

/// A record whose binary has already been removed from object storage.
#[derive(Debug)]
#[must_use = "the record still references a removed binary"]
pub struct BinaryRemoved {
    record: FileRecord,
}

/// Remove the record's binary. The record itself is untouched.
pub async fn remove_binary(
    storage: &dyn Storage,
    record: FileRecord,
) -> Result<BinaryRemoved, AppError> {
    storage
        .remove(std::slice::from_ref(&record.file_path))
        .await?;
    Ok(BinaryRemoved { record })
}

impl BinaryRemoved {
    pub async fn delete_record(self, table: &dyn FileTable) -> Result<FileRecord, DeleteError> {
        match table.delete(self.record.id).await {
            Ok(()) => Ok(self.record),
            Err(source) => Err(DeleteError::RecordKept {
                path: self.record.file_path,
                source,
            }),
        }
    }
}

impl Listing<PrivateFiles> {
    /// Delete a listed file after confirmation: binary first, then its record, then the row.
    pub async fn delete(&self, id: Uuid) -> Result<DeleteOutcome, DeleteError> {
        let record = match self.find(id) {
            Some(record) => record,
            None => {
                let err = DeleteError::UnknownRecord(id);
                self.notifier
                    .alert(&format!("Error deleting file: {}", err.client_message()));
                return Err(err);
            }
        };

        if !self.notifier.confirm(DELETE_PROMPT) {
            tracing::debug!(record_id = %id, "Delete cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }

        let result = match remove_binary(self.storage.as_ref(), record).await {
            Ok(removed) => removed.delete_record(self.table.as_ref()).await,
            Err(e) => Err(DeleteError::BinaryKept(e)),
        };

        match result {
            Ok(record) => {
                self.lock().records.retain(|r| r.id != id);
                tracing::info!(record_id = %id, path = %record.file_path, "File deleted");
                self.notifier.alert(DELETE_SUCCEEDED);
                Ok(DeleteOutcome::Deleted(record))
            }
            Err(e) => {
                tracing::error!(record_id = %id, error = %e, "Delete failed");
                self.notifier
                    .alert(&format!("Error deleting file: {}", e.client_message()));
                Err(e)
            }
        }
    }
}
