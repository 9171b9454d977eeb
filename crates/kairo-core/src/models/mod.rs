//! Domain models

pub mod file;
pub mod session;

pub use file::{FileRecord, NewFileRecord, RecordFilter, Visibility};
pub use session::{Credentials, Session, SessionUser, SignUpOutcome};
