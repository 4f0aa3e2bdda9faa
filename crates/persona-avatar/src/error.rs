//! Error types for avatar storage.

use thiserror::Error;

/// Failures of the underlying storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("db connection failed: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Read-path failures that are not "this avatar does not exist".
#[derive(Debug, Error)]
pub enum AvatarError {
    /// The backing store could not be reached or failed mid-read.
    #[error("avatar store unavailable: {0}")]
    Unavailable(#[from] StoreError),

    /// A chunk read or the whole reassembly exceeded its time budget.
    #[error("avatar fetch timed out: {0}")]
    Timeout(String),
}

/// Errors raised while ingesting a new avatar.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("asset id must not be blank")]
    InvalidId,

    #[error("no image data provided")]
    Empty,

    #[error("file too large: {len} bytes (max {limit})")]
    TooLarge { len: usize, limit: usize },

    /// The image would need more chunks than a manifest can address.
    #[error("image needs {chunks} chunks of {chunk_size} bytes (max {limit})")]
    TooManyChunks {
        chunks: usize,
        chunk_size: usize,
        limit: usize,
    },

    #[error("unsupported image format")]
    UnsupportedFormat,

    /// Avatars are write-once; a new image needs a new asset id.
    #[error("avatar already exists: {0}")]
    AlreadyExists(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
