//! Password authentication against `/auth/v1`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kairo_core::{
    AppError, AppResult, AuthProvider, Credentials, Session, SessionUser, SignUpOutcome,
};
use reqwest::Method;
use serde::Deserialize;
use tokio::sync::watch;

use crate::error::HttpFailure;
use crate::ApiClient;

/// Token grant response from the auth service.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: SessionUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .or_else(|| {
                // Whole seconds, matching how the session file stores expiry.
                self.expires_in
                    .and_then(|secs| DateTime::from_timestamp(now.timestamp() + secs, 0))
            });

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Sign-up returns either a token grant or, when confirmation is required, the bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(SessionUser),
}

fn auth_error(failure: HttpFailure) -> AppError {
    AppError::Auth(failure.message)
}

impl ApiClient {
    async fn token_grant(
        &self,
        grant_type: &str,
        body: &serde_json::Value,
    ) -> AppResult<Session> {
        let request = self
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", grant_type)])
            .json(body);
        let response = self.send(request).await.map_err(auth_error)?;
        let status = response.status();
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| auth_error(HttpFailure::decode(status, e)))?;
        Ok(token.into_session(Utc::now()))
    }

    /// Persist and announce a new session. Persistence failures only cost the next run
    /// its session, so they are logged rather than returned.
    async fn adopt_session(&self, session: Session) -> Session {
        if let Err(e) = self.session_file().save(&session).await {
            tracing::warn!(error = %e, "Failed to persist session");
        }
        self.publish_session(Some(session.clone()));
        session
    }

    async fn drop_session(&self) {
        if let Err(e) = self.session_file().clear().await {
            tracing::warn!(error = %e, "Failed to remove persisted session");
        }
        self.publish_session(None);
    }

    /// Exchange a refresh token for a new session.
    pub async fn refresh_session(&self, refresh_token: &str) -> AppResult<Session> {
        let session = self
            .token_grant(
                "refresh_token",
                &serde_json::json!({ "refresh_token": refresh_token }),
            )
            .await?;
        tracing::info!(user_id = %session.user_id(), "Session refreshed");
        Ok(self.adopt_session(session).await)
    }
}

#[async_trait]
impl AuthProvider for ApiClient {
    async fn get_session(&self) -> AppResult<Option<Session>> {
        let now = Utc::now();

        let session = match self.current_session() {
            Some(session) => Some(session),
            None => self.session_file().load().await?,
        };

        let Some(session) = session else {
            return Ok(None);
        };

        if !session.is_expired(now) {
            if self.current_session().as_ref() != Some(&session) {
                self.publish_session(Some(session.clone()));
            }
            return Ok(Some(session));
        }

        match session.refresh_token.as_deref() {
            Some(refresh_token) => match self.refresh_session(refresh_token).await {
                Ok(refreshed) => Ok(Some(refreshed)),
                Err(e) => {
                    self.drop_session().await;
                    Err(e)
                }
            },
            None => {
                self.drop_session().await;
                Ok(None)
            }
        }
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.subscribe_sessions()
    }

    async fn sign_in(&self, credentials: &Credentials) -> AppResult<Session> {
        let body = serde_json::json!({
            "email": credentials.email,
            "password": credentials.password,
        });
        let session = self.token_grant("password", &body).await?;
        tracing::info!(user_id = %session.user_id(), "Signed in");
        Ok(self.adopt_session(session).await)
    }

    async fn sign_up(&self, credentials: &Credentials) -> AppResult<SignUpOutcome> {
        let body = serde_json::json!({
            "email": credentials.email,
            "password": credentials.password,
        });
        let request = self.request(Method::POST, "/auth/v1/signup").json(&body);
        let response = self.send(request).await.map_err(auth_error)?;
        let status = response.status();
        let parsed: SignUpResponse = response
            .json()
            .await
            .map_err(|e| auth_error(HttpFailure::decode(status, e)))?;

        match parsed {
            SignUpResponse::Session(token) => {
                let session = token.into_session(Utc::now());
                tracing::info!(user_id = %session.user_id(), "Signed up");
                Ok(SignUpOutcome::SignedIn(self.adopt_session(session).await))
            }
            SignUpResponse::User(user) => {
                tracing::info!(user_id = %user.id, "Signed up; confirmation required");
                let email = if user.email.is_empty() {
                    credentials.email.clone()
                } else {
                    user.email
                };
                Ok(SignUpOutcome::ConfirmationRequired { email })
            }
        }
    }

    async fn sign_out(&self) -> AppResult<()> {
        if let Some(session) = self.current_session() {
            let request =
                self.request_with_token(Method::POST, "/auth/v1/logout", &session.access_token);
            if let Err(failure) = self.send(request).await {
                // The local session is discarded either way; the token simply expires.
                tracing::warn!(error = %failure, "Remote sign-out failed");
            }
        }
        self.drop_session().await;
        tracing::info!("Signed out");
        Ok(())
    }
}
