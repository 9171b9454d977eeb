//! Kairo application layer.
//!
//! Session-gated views over the hosted backend: a [`session::SessionStore`] tracks the
//! signed-in user, the [`router`] decides which view is reachable, and the workflows in
//! [`auth`], [`upload`] and [`listing`] drive the backend. Everything a view needs is
//! passed in explicitly; there is no global session.

pub mod auth;
pub mod backend;
pub mod listing;
pub mod notify;
pub mod router;
pub mod selection;
pub mod session;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::Backend;
pub use notify::{ConsoleNotifier, Notifier};

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays clean for output.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}
