use crate::keys::validate_path;
use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// In-memory object storage.
///
/// Every call is counted, and each operation can be switched to fail so workflows can be
/// exercised against partial backend outages.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
    calls: AtomicUsize,
    fail_uploads: AtomicBool,
    fail_downloads: AtomicBool,
    fail_removes: AtomicBool,
}

#[derive(Debug, Clone)]
struct StoredObject {
    content_type: String,
    data: Bytes,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_downloads(&self, fail: bool) {
        self.fail_downloads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    /// Number of trait calls made so far, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects().contains_key(path)
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        self.objects().get(path).map(|o| o.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }

    fn objects(&self) -> MutexGuard<'_, HashMap<String, StoredObject>> {
        // A poisoned map only means another test thread panicked mid-insert.
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload(&self, path: &str, content_type: &str, data: Bytes) -> StorageResult<()> {
        self.record_call();
        validate_path(path)?;
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed(format!(
                "Simulated upload failure for {}",
                path
            )));
        }

        let mut objects = self.objects();
        if objects.contains_key(path) {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        let size = data.len();
        objects.insert(
            path.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                data,
            },
        );

        tracing::debug!(key = %path, size_bytes = size, "Memory storage upload successful");
        Ok(())
    }

    async fn download(&self, path: &str) -> StorageResult<Bytes> {
        self.record_call();
        validate_path(path)?;
        if self.fail_downloads.load(Ordering::SeqCst) {
            return Err(StorageError::DownloadFailed(format!(
                "Simulated download failure for {}",
                path
            )));
        }

        self.objects()
            .get(path)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn remove(&self, paths: &[String]) -> StorageResult<()> {
        self.record_call();
        for path in paths {
            validate_path(path)?;
        }
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed(format!(
                "Simulated delete failure for {} object(s)",
                paths.len()
            )));
        }

        let mut objects = self.objects();
        for path in paths {
            objects.remove(path);
        }

        tracing::debug!(count = paths.len(), "Memory storage remove successful");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
