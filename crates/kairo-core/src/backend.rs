//! Backend collaborator traits.
//!
//! The hosted platform provides authentication and a relational metadata table; these
//! traits are the only surface the workflows see, so tests and alternative backends can
//! be injected without touching the workflows. Object storage lives in `kairo-storage`.

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    Credentials, FileRecord, NewFileRecord, RecordFilter, Session, SignUpOutcome,
};

/// Authentication provider.
///
/// Successful sign-in, sign-up and sign-out are reported through the channel returned
/// by [`AuthProvider::subscribe`]; callers must not treat the return values as the
/// source of truth for the current session.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current session, if any. Implementations may refresh an expired session.
    async fn get_session(&self) -> AppResult<Option<Session>>;

    /// Stream of session replacements. Each value replaces the previous one wholesale.
    fn subscribe(&self) -> watch::Receiver<Option<Session>>;

    async fn sign_in(&self, credentials: &Credentials) -> AppResult<Session>;

    async fn sign_up(&self, credentials: &Credentials) -> AppResult<SignUpOutcome>;

    async fn sign_out(&self) -> AppResult<()>;
}

/// The `files` metadata table.
#[async_trait]
pub trait FileTable: Send + Sync {
    /// Records matching `filter`, newest `created_at` first.
    async fn select(&self, filter: &RecordFilter) -> AppResult<Vec<FileRecord>>;

    /// Insert one record and return it as stored.
    async fn insert(&self, record: &NewFileRecord) -> AppResult<FileRecord>;

    /// Delete the record with the given id.
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}
