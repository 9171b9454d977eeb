//! In-memory collaborators for workflow tests.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use kairo_core::{
    AppError, AppResult, AuthProvider, Credentials, FileRecord, FileTable, NewFileRecord,
    RecordFilter, Session, SessionUser, SignUpOutcome,
};
use kairo_storage::MemoryStorage;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use uuid::Uuid;

use crate::backend::Backend;
use crate::notify::Notifier;

pub fn session_for(email: &str) -> Session {
    Session {
        access_token: format!("token-{}", email),
        refresh_token: None,
        expires_at: None,
        user: SessionUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
        },
    }
}

/// Auth provider that accepts a single password.
pub struct FakeAuth {
    tx: watch::Sender<Option<Session>>,
    fail_get_session: AtomicBool,
    registered: Mutex<Vec<String>>,
    confirm_sign_ups: AtomicBool,
}

impl FakeAuth {
    pub const PASSWORD: &'static str = "correct-horse";

    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx,
            fail_get_session: AtomicBool::new(false),
            registered: Mutex::new(Vec::new()),
            confirm_sign_ups: AtomicBool::new(false),
        }
    }

    /// Set the session without notifying, as if it were loaded at startup.
    pub fn set_session(&self, session: Option<Session>) {
        self.tx.send_replace(session);
    }

    pub fn fail_get_session(&self, fail: bool) {
        self.fail_get_session.store(fail, Ordering::SeqCst);
    }

    pub fn require_confirmation(&self, required: bool) {
        self.confirm_sign_ups.store(required, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn get_session(&self) -> AppResult<Option<Session>> {
        if self.fail_get_session.load(Ordering::SeqCst) {
            return Err(AppError::Http("Simulated network failure".to_string()));
        }
        Ok(self.tx.borrow().clone())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    async fn sign_in(&self, credentials: &Credentials) -> AppResult<Session> {
        tokio::task::yield_now().await;
        if credentials.password != Self::PASSWORD {
            return Err(AppError::Auth("Invalid login credentials".to_string()));
        }
        let session = session_for(&credentials.email);
        self.tx.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, credentials: &Credentials) -> AppResult<SignUpOutcome> {
        tokio::task::yield_now().await;
        {
            let mut registered = self.registered.lock().unwrap();
            if registered.contains(&credentials.email) {
                return Err(AppError::Auth("User already registered".to_string()));
            }
            registered.push(credentials.email.clone());
        }
        if self.confirm_sign_ups.load(Ordering::SeqCst) {
            return Ok(SignUpOutcome::ConfirmationRequired {
                email: credentials.email.clone(),
            });
        }
        let session = session_for(&credentials.email);
        self.tx.send_replace(Some(session.clone()));
        Ok(SignUpOutcome::SignedIn(session))
    }

    async fn sign_out(&self) -> AppResult<()> {
        self.tx.send_replace(None);
        Ok(())
    }
}

/// Metadata table kept in a vector. Inserted rows get strictly increasing timestamps.
#[derive(Default)]
pub struct MemoryTable {
    rows: Mutex<Vec<FileRecord>>,
    calls: AtomicUsize,
    fail_select: AtomicBool,
    fail_insert: AtomicBool,
    fail_delete: AtomicBool,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_select(&self, fail: bool) {
        self.fail_select.store(fail, Ordering::SeqCst);
    }

    pub fn fail_insert(&self, fail: bool) {
        self.fail_insert.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn rows(&self) -> Vec<FileRecord> {
        self.rows.lock().unwrap().clone()
    }

    pub fn seed(&self, record: FileRecord) {
        self.rows.lock().unwrap().push(record);
    }
}

#[async_trait]
impl FileTable for MemoryTable {
    async fn select(&self, filter: &RecordFilter) -> AppResult<Vec<FileRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_select.load(Ordering::SeqCst) {
            return Err(AppError::Database("permission denied for table files".to_string()));
        }
        let mut rows: Vec<FileRecord> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert(&self, record: &NewFileRecord) -> AppResult<FileRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(AppError::Database("insert violates row-level security".to_string()));
        }
        let mut rows = self.rows.lock().unwrap();
        let created_at = rows
            .iter()
            .map(|r| r.created_at)
            .max()
            .map(|latest| latest + Duration::milliseconds(1))
            .unwrap_or_else(Utc::now);
        let stored = FileRecord {
            id: Uuid::new_v4(),
            file_name: record.file_name.clone(),
            file_path: record.file_path.clone(),
            file_type: record.file_type.clone(),
            file_size: record.file_size,
            is_public: record.is_public,
            user_id: record.user_id,
            created_at,
        };
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AppError::Database("delete failed".to_string()));
        }
        self.rows.lock().unwrap().retain(|r| r.id != id);
        Ok(())
    }
}

/// Notifier that records alerts and answers confirmations with a fixed reply.
pub struct RecordingNotifier {
    alerts: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
    answer: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            answer: AtomicBool::new(true),
        }
    }

    pub fn answer(&self, yes: bool) {
        self.answer.store(yes, Ordering::SeqCst);
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answer.load(Ordering::SeqCst)
    }
}

/// Fully in-memory backend with handles to each fake.
pub struct TestBackend {
    pub auth: Arc<FakeAuth>,
    pub table: Arc<MemoryTable>,
    pub storage: Arc<MemoryStorage>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self {
            auth: Arc::new(FakeAuth::new()),
            table: Arc::new(MemoryTable::new()),
            storage: Arc::new(MemoryStorage::new()),
            notifier: Arc::new(RecordingNotifier::new()),
        }
    }

    pub fn backend(&self) -> Backend {
        Backend::new(self.auth.clone(), self.table.clone(), self.storage.clone())
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.notifier.clone()
    }
}
