//! Backend wiring: the three collaborators every workflow is built from.

use kairo_api_client::{ApiClient, FilesTable, RemoteStorage};
use kairo_core::{AuthProvider, Config, FileTable};
use kairo_storage::Storage;
use std::sync::Arc;

/// Auth provider, metadata table and object storage, shared by all views.
#[derive(Clone)]
pub struct Backend {
    pub auth: Arc<dyn AuthProvider>,
    pub table: Arc<dyn FileTable>,
    pub storage: Arc<dyn Storage>,
}

impl Backend {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        table: Arc<dyn FileTable>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            auth,
            table,
            storage,
        }
    }

    /// Connect to the hosted backend described by `config`. All three collaborators share
    /// one client, so a sign-in authorizes table and storage calls too.
    pub fn remote(config: &Config) -> anyhow::Result<Self> {
        let client = ApiClient::new(config)?;
        let table = FilesTable::new(client.clone(), config.table.clone());
        let storage = RemoteStorage::new(client.clone(), config.bucket.clone());

        tracing::debug!(
            backend_url = %config.backend_url,
            bucket = %config.bucket,
            table = %config.table,
            "Backend configured"
        );

        Ok(Self::new(Arc::new(client), Arc::new(table), Arc::new(storage)))
    }
}
