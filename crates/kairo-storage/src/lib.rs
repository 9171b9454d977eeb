//! Kairo Storage Library
//!
//! This crate provides the object storage abstraction used by the upload and listing
//! workflows. The hosted backend implementation lives in `kairo-api-client`; an
//! in-memory backend is available behind the `storage-memory` feature.
//!
//! # Storage path format
//!
//! Binaries are owner-scoped: `{owner_id}/{file_name}`. Paths must not contain `..`
//! segments or a leading `/`. Path generation is centralized in the `keys` module so
//! every backend and workflow agrees on the layout.

pub mod keys;
#[cfg(any(test, feature = "storage-memory"))]
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use keys::{object_path, validate_path};
#[cfg(any(test, feature = "storage-memory"))]
pub use memory::MemoryStorage;
pub use traits::{Storage, StorageError, StorageResult};
