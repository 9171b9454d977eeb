//! Shared constants.

/// Object storage bucket holding uploaded binaries.
pub const DEFAULT_BUCKET: &str = "files";

/// Metadata table holding one row per uploaded file.
pub const DEFAULT_TABLE: &str = "files";

/// Largest file a user may select for upload (2 GiB).
pub const MAX_UPLOAD_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Content type used when nothing better can be inferred from the file name.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";
