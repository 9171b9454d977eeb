//! HTTP client for the hosted Kairo backend.
//!
//! The backend exposes three REST surfaces that share one base URL and API key:
//! authentication (`/auth/v1`), the `files` metadata table (`/rest/v1`) and object
//! storage (`/storage/v1`). [`ApiClient`] carries the key and the current session;
//! [`FilesTable`] and [`RemoteStorage`] adapt it to the `FileTable` and `Storage` traits.

pub mod auth;
pub mod error;
pub mod session_file;
pub mod storage;
pub mod table;

use anyhow::{Context, Result};
use kairo_core::{Config, Session};
use reqwest::{Client, Method, RequestBuilder, Response};
use std::sync::Arc;
use tokio::sync::watch;

pub use error::HttpFailure;
pub use session_file::SessionFile;
pub use storage::RemoteStorage;
pub use table::FilesTable;

/// HTTP client for the hosted backend.
///
/// Cloning is cheap; clones share the session channel, so a sign-in through one clone
/// authorizes requests made through every other.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    client: Client,
    base_url: String,
    anon_key: String,
    session_file: SessionFile,
    session_tx: watch::Sender<Option<Session>>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.http_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        let (session_tx, _) = watch::channel(None);

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                base_url: config.backend_url.trim_end_matches('/').to_string(),
                anon_key: config.anon_key.clone(),
                session_file: SessionFile::new(config.session_file.clone()),
                session_tx,
            }),
        })
    }

    /// Create client from environment (see `Config::from_env`).
    pub fn from_env() -> Result<Self> {
        let config = Config::from_env()?;
        Self::new(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    /// Session currently authorizing requests.
    pub fn current_session(&self) -> Option<Session> {
        self.inner.session_tx.borrow().clone()
    }

    pub(crate) fn session_file(&self) -> &SessionFile {
        &self.inner.session_file
    }

    /// Replace the held session and notify subscribers.
    pub(crate) fn publish_session(&self, session: Option<Session>) {
        self.inner.session_tx.send_replace(session);
    }

    pub(crate) fn subscribe_sessions(&self) -> watch::Receiver<Option<Session>> {
        self.inner.session_tx.subscribe()
    }

    /// Start a request with the API key and the best available bearer token.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let bearer = self
            .current_session()
            .map(|s| s.access_token)
            .unwrap_or_else(|| self.inner.anon_key.clone());
        self.request_with_token(method, path, &bearer)
    }

    pub(crate) fn request_with_token(
        &self,
        method: Method,
        path: &str,
        token: &str,
    ) -> RequestBuilder {
        self.inner
            .client
            .request(method, self.build_url(path))
            .header("apikey", self.inner.anon_key.as_str())
            .header("Authorization", format!("Bearer {}", token))
    }

    /// Send a request and turn non-2xx responses into an [`HttpFailure`].
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, HttpFailure> {
        let response = request.send().await.map_err(HttpFailure::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpFailure::from_response(status, &body));
        }

        Ok(response)
    }
}
