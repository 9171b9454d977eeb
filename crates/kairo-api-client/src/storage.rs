//! Object storage served at `/storage/v1/object/{bucket}`.

use async_trait::async_trait;
use bytes::Bytes;
use kairo_storage::{validate_path, Storage, StorageError, StorageResult};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Method;
use std::time::Instant;

use crate::error::HttpFailure;
use crate::ApiClient;

/// Characters left unescaped inside a path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode each segment of a storage path, keeping the separators.
pub(crate) fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Bucket on the hosted object store.
#[derive(Clone)]
pub struct RemoteStorage {
    client: ApiClient,
    bucket: String,
}

impl RemoteStorage {
    pub fn new(client: ApiClient, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    fn object_url_path(&self, path: &str) -> String {
        format!(
            "/storage/v1/object/{}/{}",
            encode_path(&self.bucket),
            encode_path(path)
        )
    }

    fn map_failure(
        path: &str,
        failure: HttpFailure,
        fallback: fn(String) -> StorageError,
    ) -> StorageError {
        match failure.effective_status() {
            Some(404) => StorageError::NotFound(path.to_string()),
            Some(409) => StorageError::AlreadyExists(path.to_string()),
            Some(_) => fallback(failure.message),
            None => StorageError::BackendError(failure.message),
        }
    }
}

#[async_trait]
impl Storage for RemoteStorage {
    async fn upload(&self, path: &str, content_type: &str, data: Bytes) -> StorageResult<()> {
        validate_path(path)?;
        let size = data.len();
        let start = Instant::now();

        let request = self
            .client
            .request(Method::POST, &self.object_url_path(path))
            .header("Content-Type", content_type)
            .header("Cache-Control", "max-age=3600")
            .header("x-upsert", "false")
            .body(data);

        match self.client.send(request).await {
            Ok(_) => {
                tracing::info!(
                    bucket = %self.bucket,
                    key = %path,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Remote storage upload successful"
                );
                Ok(())
            }
            Err(failure) => {
                tracing::error!(
                    bucket = %self.bucket,
                    key = %path,
                    error = %failure,
                    "Remote storage upload failed"
                );
                Err(Self::map_failure(path, failure, StorageError::UploadFailed))
            }
        }
    }

    async fn download(&self, path: &str) -> StorageResult<Bytes> {
        validate_path(path)?;
        let start = Instant::now();

        let request = self
            .client
            .request(Method::GET, &self.object_url_path(path));
        let response = self
            .client
            .send(request)
            .await
            .map_err(|failure| Self::map_failure(path, failure, StorageError::DownloadFailed))?;

        let data = response
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(format!("Failed to read body: {}", e)))?;

        tracing::info!(
            bucket = %self.bucket,
            key = %path,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Remote storage download successful"
        );
        Ok(data)
    }

    async fn remove(&self, paths: &[String]) -> StorageResult<()> {
        for path in paths {
            validate_path(path)?;
        }

        let request = self
            .client
            .request(
                Method::DELETE,
                &format!("/storage/v1/object/{}", encode_path(&self.bucket)),
            )
            .json(&serde_json::json!({ "prefixes": paths }));

        self.client.send(request).await.map_err(|failure| {
            tracing::error!(bucket = %self.bucket, error = %failure, "Remote storage remove failed");
            match failure.effective_status() {
                Some(_) => StorageError::DeleteFailed(failure.message),
                None => StorageError::BackendError(failure.message),
            }
        })?;

        tracing::info!(bucket = %self.bucket, count = paths.len(), "Remote storage remove successful");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "remote"
    }
}
