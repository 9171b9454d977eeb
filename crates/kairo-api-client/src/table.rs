//! The `files` metadata table, served by the REST gateway at `/rest/v1`.

use async_trait::async_trait;
use kairo_core::{AppError, AppResult, FileRecord, FileTable, NewFileRecord, RecordFilter};
use reqwest::Method;
use std::time::Instant;
use uuid::Uuid;

use crate::error::HttpFailure;
use crate::ApiClient;

fn database_error(failure: HttpFailure) -> AppError {
    AppError::Database(failure.message)
}

/// Build the query string for a filtered, newest-first select.
pub(crate) fn select_query(filter: &RecordFilter) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("select", "*".to_string()),
        ("is_public", format!("eq.{}", filter.is_public)),
    ];
    if let Some(owner) = filter.owner {
        query.push(("user_id", format!("eq.{}", owner)));
    }
    query.push(("order", "created_at.desc".to_string()));
    query
}

/// Metadata table backed by the hosted REST gateway.
#[derive(Clone)]
pub struct FilesTable {
    client: ApiClient,
    table: String,
}

impl FilesTable {
    pub fn new(client: ApiClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    fn path(&self) -> String {
        format!("/rest/v1/{}", self.table)
    }
}

#[async_trait]
impl FileTable for FilesTable {
    async fn select(&self, filter: &RecordFilter) -> AppResult<Vec<FileRecord>> {
        let start = Instant::now();
        let request = self
            .client
            .request(Method::GET, &self.path())
            .query(&select_query(filter));

        let response = self.client.send(request).await.map_err(database_error)?;
        let status = response.status();
        let records: Vec<FileRecord> = response
            .json()
            .await
            .map_err(|e| database_error(HttpFailure::decode(status, e)))?;

        tracing::info!(
            table = %self.table,
            is_public = filter.is_public,
            count = records.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Selected file records"
        );
        Ok(records)
    }

    async fn insert(&self, record: &NewFileRecord) -> AppResult<FileRecord> {
        let request = self
            .client
            .request(Method::POST, &self.path())
            .header("Prefer", "return=representation")
            .json(record);

        let response = self.client.send(request).await.map_err(database_error)?;
        let status = response.status();
        let mut inserted: Vec<FileRecord> = response
            .json()
            .await
            .map_err(|e| database_error(HttpFailure::decode(status, e)))?;

        let stored = inserted.pop().ok_or_else(|| {
            AppError::Database("Insert returned no row".to_string())
        })?;

        tracing::info!(
            table = %self.table,
            record_id = %stored.id,
            path = %stored.file_path,
            "Inserted file record"
        );
        Ok(stored)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let request = self
            .client
            .request(Method::DELETE, &self.path())
            .query(&[("id", format!("eq.{}", id))]);

        self.client.send(request).await.map_err(database_error)?;

        tracing::info!(table = %self.table, record_id = %id, "Deleted file record");
        Ok(())
    }
}
