//! Decoding of backend error responses.
//!
//! The three backend surfaces report errors with different shapes; the auth service
//! uses `error_description` or `msg`, the table service `message`, and object storage
//! `statusCode`/`error`/`message`. [`HttpFailure`] normalizes them.

use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<serde_json::Value>,
    #[serde(rename = "statusCode")]
    status_code: Option<serde_json::Value>,
}

/// A failed backend request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    /// HTTP status, or `None` when the request never got a response.
    pub status: Option<StatusCode>,
    /// Status embedded in the body, which object storage uses instead of the real one.
    pub body_status: Option<u16>,
    pub message: String,
}

impl HttpFailure {
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        Self {
            status: err.status(),
            body_status: None,
            message: format!("Failed to send request: {}", err),
        }
    }

    pub(crate) fn decode(status: StatusCode, err: impl std::fmt::Display) -> Self {
        Self {
            status: Some(status),
            body_status: None,
            message: format!("Failed to parse response: {}", err),
        }
    }

    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

        let error_text = parsed.error.as_ref().and_then(|value| match value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        });

        let message = parsed
            .error_description
            .or(parsed.msg)
            .or(parsed.message)
            .or(error_text)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    format!("Request failed with status {}", status)
                } else {
                    format!("Request failed with status {}: {}", status, trimmed)
                }
            });

        let body_status = parsed.status_code.and_then(|value| match value {
            serde_json::Value::String(s) => s.parse().ok(),
            serde_json::Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            _ => None,
        });

        Self {
            status: Some(status),
            body_status,
            message,
        }
    }

    /// Effective status, preferring the one embedded in the body.
    pub fn effective_status(&self) -> Option<u16> {
        self.body_status.or(self.status.map(|s| s.as_u16()))
    }
}

impl std::fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpFailure {}
