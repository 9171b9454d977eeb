//! Session Store.
//!
//! Holds the current session for the lifetime of the process. The store fetches the
//! initial session once and afterwards only learns about changes through the auth
//! provider's notification channel.

use kairo_core::{AuthProvider, Session};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// What the store currently knows about the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The initial fetch has not finished; no route renders yet.
    Pending,
    Resolved(Option<Session>),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Resolved(session) => session.as_ref(),
            SessionState::Pending => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, SessionState::Resolved(_))
    }
}

/// Process-wide owner of the session.
pub struct SessionStore {
    state: Arc<watch::Sender<SessionState>>,
    listener: Option<JoinHandle<()>>,
}

impl SessionStore {
    /// Subscribe to `auth`, fetch the current session and keep following changes until
    /// [`SessionStore::shutdown`] or drop. A failed fetch counts as "no session".
    pub async fn start(auth: Arc<dyn AuthProvider>) -> Self {
        let (state, _) = watch::channel(SessionState::Pending);
        let state = Arc::new(state);

        // Subscribe before fetching so a change racing the fetch is not lost.
        let mut changes = auth.subscribe();

        let initial = match auth.get_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch current session; continuing signed out");
                None
            }
        };
        // A notification published during the fetch is newer than the fetched value.
        let initial = if changes.has_changed().unwrap_or(false) {
            changes.borrow_and_update().clone()
        } else {
            changes.borrow_and_update();
            initial
        };
        state.send_replace(SessionState::Resolved(initial));

        let listener_state = Arc::clone(&state);
        let listener = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let session = changes.borrow_and_update().clone();
                tracing::debug!(
                    authenticated = session.is_some(),
                    "Session replaced by auth notification"
                );
                listener_state.send_replace(SessionState::Resolved(session));
            }
        });

        Self {
            state,
            listener: Some(listener),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    /// Receiver for views that need to react to session replacement.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Stop following auth notifications. The last known state stays readable.
    pub fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listener.as_ref().is_some_and(|l| !l.is_finished())
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{session_for, FakeAuth};
    use kairo_core::{AuthProvider, Credentials};
    use std::time::Duration;

    async fn next_state(rx: &mut watch::Receiver<SessionState>) -> SessionState {
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("session change not observed")
            .expect("store dropped");
        rx.borrow_and_update().clone()
    }

    #[tokio::test]
    async fn test_start_resolves_absent_session() {
        let auth = Arc::new(FakeAuth::new());
        let store = SessionStore::start(auth).await;
        assert_eq!(store.state(), SessionState::Resolved(None));
        assert!(store.current().is_none());
        assert!(store.is_listening());
    }

    #[tokio::test]
    async fn test_start_resolves_existing_session() {
        let auth = Arc::new(FakeAuth::new());
        let session = session_for("ada@example.com");
        auth.set_session(Some(session.clone()));

        let store = SessionStore::start(auth).await;
        assert_eq!(store.current(), Some(session));
    }

    #[tokio::test]
    async fn test_fetch_failure_means_no_session() {
        let auth = Arc::new(FakeAuth::new());
        auth.set_session(Some(session_for("ada@example.com")));
        auth.fail_get_session(true);

        let store = SessionStore::start(auth).await;
        assert_eq!(store.state(), SessionState::Resolved(None));
    }

    #[tokio::test]
    async fn test_follows_sign_in_and_sign_out_notifications() {
        let auth = Arc::new(FakeAuth::new());
        let store = SessionStore::start(auth.clone()).await;
        let mut rx = store.subscribe();

        auth.sign_in(&Credentials::new("ada@example.com", FakeAuth::PASSWORD))
            .await
            .unwrap();
        let state = next_state(&mut rx).await;
        assert_eq!(state.session().unwrap().email(), "ada@example.com");

        auth.sign_out().await.unwrap();
        let state = next_state(&mut rx).await;
        assert_eq!(state, SessionState::Resolved(None));
    }

    #[tokio::test]
    async fn test_shutdown_stops_following() {
        let auth = Arc::new(FakeAuth::new());
        let mut store = SessionStore::start(auth.clone()).await;
        store.shutdown();
        tokio::task::yield_now().await;

        auth.sign_in(&Credentials::new("ada@example.com", FakeAuth::PASSWORD))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(store.current().is_none());
        assert!(!store.is_listening());
    }

    /// Returns the stored session, then signs out before the fetch completes.
    struct SignOutDuringFetch {
        tx: watch::Sender<Option<Session>>,
    }

    #[async_trait::async_trait]
    impl AuthProvider for SignOutDuringFetch {
        async fn get_session(&self) -> kairo_core::AppResult<Option<Session>> {
            let current = self.tx.borrow().clone();
            tokio::task::yield_now().await;
            self.tx.send_replace(None);
            Ok(current)
        }

        fn subscribe(&self) -> watch::Receiver<Option<Session>> {
            self.tx.subscribe()
        }

        async fn sign_in(&self, _: &Credentials) -> kairo_core::AppResult<Session> {
            unreachable!()
        }

        async fn sign_up(
            &self,
            _: &Credentials,
        ) -> kairo_core::AppResult<kairo_core::SignUpOutcome> {
            unreachable!()
        }

        async fn sign_out(&self) -> kairo_core::AppResult<()> {
            self.tx.send_replace(None);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_change_during_initial_fetch_wins() {
        let (tx, _) = watch::channel(Some(session_for("ada@example.com")));
        let auth = Arc::new(SignOutDuringFetch { tx });

        let store = SessionStore::start(auth).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(store.current(), None);
        assert_eq!(store.state(), SessionState::Resolved(None));
    }
}
