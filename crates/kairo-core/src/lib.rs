//! Kairo Core Library
//!
//! This crate provides the domain models, error types, configuration and backend
//! collaborator traits shared by every Kairo component.

pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod format;
pub mod models;

// Re-export commonly used types
pub use backend::{AuthProvider, FileTable};
pub use config::Config;
pub use error::{AppError, AppResult, ErrorMetadata, LogLevel};
pub use format::format_bytes;
pub use models::{
    Credentials, FileRecord, NewFileRecord, RecordFilter, Session, SessionUser, SignUpOutcome,
    Visibility,
};
