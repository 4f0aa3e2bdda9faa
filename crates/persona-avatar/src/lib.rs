//! Chunked avatar storage for the persona platform.
//!
//! An avatar is persisted as a manifest (content type, chunk count, content
//! hash) plus an ordered set of binary chunks. This crate owns both sides:
//!
//! - [`AvatarAssetStore::get_avatar`] resolves the manifest, short-circuits
//!   on a matching entity tag, fans out the chunk reads concurrently and
//!   reassembles them in index order. An avatar is atomic: a missing chunk
//!   yields `NotFound`, never a partial body.
//! - [`ingest::store_avatar`] validates an uploaded image, strips its
//!   metadata, hashes it and writes manifest and chunks in one transaction.
//!
//! Storage is reached through the [`AvatarBackend`] trait so the reassembly
//! logic can be exercised without a database. [`SqliteAvatarBackend`] is the
//! production implementation over the shared `persona-db` pool.
//!
//! Failure of the storage layer is never reported as `NotFound`; it surfaces
//! as [`AvatarError`] so callers can tell an outage from a missing asset.

pub mod assets;
pub mod backend;
pub mod error;
pub mod ingest;

pub use assets::{AvatarAssetStore, AvatarResponse, AvatarTimeouts, AVATAR_CACHE_CONTROL};
pub use backend::{AvatarBackend, SqliteAvatarBackend};
pub use error::{AvatarError, IngestError, StoreError};
pub use ingest::{store_avatar, IngestSettings, StoredAvatar};
