//! Authentication workflow for the login view.

use kairo_core::{AppError, AppResult, AuthProvider, Credentials, ErrorMetadata, SignUpOutcome};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct AuthState {
    busy: bool,
    error: Option<String>,
}

/// Sign-in and sign-up share one busy flag and one error slot.
///
/// A successful call does not touch any session store; the provider announces the new
/// session on its notification channel.
pub struct AuthWorkflow {
    auth: Arc<dyn AuthProvider>,
    state: Mutex<AuthState>,
}

/// Clears the busy flag when the request finishes or is abandoned.
struct BusyGuard<'a> {
    state: &'a Mutex<AuthState>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).busy = false;
    }
}

impl AuthWorkflow {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            auth,
            state: Mutex::new(AuthState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    /// Message from the most recent failed attempt, cleared when a new attempt starts.
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    fn begin(&self) -> AppResult<BusyGuard<'_>> {
        let mut state = self.lock();
        if state.busy {
            return Err(AppError::InvalidInput(
                "An authentication request is already in progress".to_string(),
            ));
        }
        state.busy = true;
        state.error = None;
        Ok(BusyGuard { state: &self.state })
    }

    fn record_failure(&self, err: &AppError) {
        tracing::warn!(error = %err, "Authentication failed");
        self.lock().error = Some(err.client_message());
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> AppResult<()> {
        let _busy = self.begin()?;
        match self.auth.sign_in(credentials).await {
            Ok(_) => Ok(()),
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    pub async fn sign_up(&self, credentials: &Credentials) -> AppResult<SignUpOutcome> {
        let _busy = self.begin()?;
        match self.auth.sign_up(credentials).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Sign out from the authenticated layout.
    pub async fn sign_out(&self) -> AppResult<()> {
        let _busy = self.begin()?;
        self.auth.sign_out().await.inspect_err(|e| self.record_failure(e))
    }
}
