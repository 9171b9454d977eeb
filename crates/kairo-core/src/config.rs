//! Configuration module
//!
//! Backend endpoint and key provisioning plus the few client-side knobs Kairo has.
//! Values come from the process environment (after loading `.env`).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEFAULT_BUCKET, DEFAULT_TABLE, MAX_UPLOAD_BYTES};

/// Client configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the hosted backend, without trailing slash.
    pub backend_url: String,
    /// Public (anonymous) API key sent with every request.
    pub anon_key: String,
    pub bucket: String,
    pub table: String,
    /// Where the signed-in session is persisted between runs.
    pub session_file: PathBuf,
    pub max_upload_bytes: u64,
    /// Request timeout; `None` leaves the HTTP client's default in place.
    pub http_timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = lookup("KAIRO_BACKEND_URL")
            .or_else(|| lookup("SUPABASE_URL"))
            .ok_or_else(|| {
                anyhow::anyhow!("Missing backend URL. Set KAIRO_BACKEND_URL or SUPABASE_URL")
            })?
            .trim()
            .trim_end_matches('/')
            .to_string();

        let anon_key = lookup("KAIRO_ANON_KEY")
            .or_else(|| lookup("SUPABASE_ANON_KEY"))
            .ok_or_else(|| {
                anyhow::anyhow!("Missing API key. Set KAIRO_ANON_KEY or SUPABASE_ANON_KEY")
            })?
            .trim()
            .to_string();

        let bucket = lookup("KAIRO_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string());
        let table = lookup("KAIRO_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string());

        let session_file = match lookup("KAIRO_SESSION_FILE") {
            Some(path) => PathBuf::from(path),
            None => default_session_file(lookup("HOME"), lookup("XDG_CONFIG_HOME")),
        };

        let max_upload_bytes = match lookup("KAIRO_MAX_UPLOAD_BYTES") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                anyhow::anyhow!("KAIRO_MAX_UPLOAD_BYTES must be a byte count: {}", e)
            })?,
            None => MAX_UPLOAD_BYTES,
        };

        let http_timeout = match lookup("KAIRO_HTTP_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(raw.trim().parse::<u64>().map_err(
                |e| anyhow::anyhow!("KAIRO_HTTP_TIMEOUT_SECS must be whole seconds: {}", e),
            )?)),
            None => None,
        };

        let config = Config {
            backend_url,
            anon_key,
            bucket,
            table,
            session_file,
            max_upload_bytes,
            http_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.backend_url.is_empty() {
            return Err(anyhow::anyhow!("Backend URL cannot be empty"));
        }
        if !self.backend_url.starts_with("http://") && !self.backend_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "Backend URL must start with http:// or https://, got {}",
                self.backend_url
            ));
        }
        if self.anon_key.is_empty() {
            return Err(anyhow::anyhow!("API key cannot be empty"));
        }
        if self.bucket.is_empty() || self.table.is_empty() {
            return Err(anyhow::anyhow!("Bucket and table names cannot be empty"));
        }
        if self.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("KAIRO_MAX_UPLOAD_BYTES must be greater than 0"));
        }
        Ok(())
    }
}

fn default_session_file(home: Option<String>, xdg_config_home: Option<String>) -> PathBuf {
    let config_dir = match (xdg_config_home, home) {
        (Some(xdg), _) if !xdg.is_empty() => PathBuf::from(xdg),
        (_, Some(home)) => PathBuf::from(home).join(".config"),
        _ => PathBuf::from("."),
    };
    config_dir.join("kairo").join("session.json")
}
