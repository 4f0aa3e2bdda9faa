//! Storage backends for avatar manifests and chunks.

use crate::error::StoreError;
use crate::ingest::PreparedAvatar;
use persona_db::DbPool;
use persona_types::{chunk_key, AvatarManifest};
use rusqlite::types::ValueRef;
use rusqlite::{params, OptionalExtension};
use std::future::Future;

/// Read access to avatar manifests and their chunks.
///
/// Implementations are constructed once by the hosting process and shared by
/// reference; they hold no per-request state.
pub trait AvatarBackend: Send + Sync {
    /// Fetches the manifest for `asset_id`, `None` when absent.
    fn manifest(
        &self,
        asset_id: &str,
    ) -> impl Future<Output = Result<Option<AvatarManifest>, StoreError>> + Send;

    /// Fetches one chunk payload.
    ///
    /// `None` covers both a missing chunk record and a record whose payload
    /// is not readable as bytes.
    fn chunk(
        &self,
        asset_id: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;
}

/// [`AvatarBackend`] over the SQLite `avatar_manifests` / `avatar_chunks`
/// tables.
#[derive(Debug, Clone)]
pub struct SqliteAvatarBackend {
    pool: DbPool,
}

impl SqliteAvatarBackend {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Writes a manifest and all of its chunks in one transaction.
    ///
    /// Returns `false` without touching anything when a manifest already
    /// exists for `asset_id`.
    pub async fn insert(&self, asset_id: &str, avatar: PreparedAvatar) -> Result<bool, StoreError> {
        let pool = self.pool.clone();
        let asset_id = asset_id.to_string();

        tokio::task::spawn_blocking(move || -> Result<bool, StoreError> {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO avatar_manifests (asset_id, content_type, chunk_count, sha256, size_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    asset_id,
                    avatar.content_type,
                    avatar.chunks.len() as i64,
                    avatar.sha256,
                    avatar.size as i64,
                ],
            )?;
            if inserted == 0 {
                return Ok(false);
            }

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO avatar_chunks (asset_id, chunk_key, payload) VALUES (?1, ?2, ?3)",
                )?;
                for (index, payload) in avatar.chunks.iter().enumerate() {
                    stmt.execute(params![asset_id, chunk_key(index), payload])?;
                }
            }

            tx.commit()?;
            Ok(true)
        })
        .await?
    }
}

impl AvatarBackend for SqliteAvatarBackend {
    async fn manifest(&self, asset_id: &str) -> Result<Option<AvatarManifest>, StoreError> {
        let pool = self.pool.clone();
        let asset_id = asset_id.to_string();

        tokio::task::spawn_blocking(move || -> Result<Option<AvatarManifest>, StoreError> {
            let conn = pool.get()?;
            let manifest = conn
                .query_row(
                    "SELECT content_type, chunk_count, sha256 FROM avatar_manifests WHERE asset_id = ?1",
                    [&asset_id],
                    |row| {
                        Ok(AvatarManifest {
                            content_type: row.get(0)?,
                            chunk_count: row.get(1)?,
                            sha256: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(manifest)
        })
        .await?
    }

    async fn chunk(&self, asset_id: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let pool = self.pool.clone();
        let asset_id = asset_id.to_string();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>, StoreError> {
            let conn = pool.get()?;
            let payload = conn
                .query_row(
                    "SELECT payload FROM avatar_chunks WHERE asset_id = ?1 AND chunk_key = ?2",
                    params![asset_id, key],
                    |row| match row.get_ref(0)? {
                        ValueRef::Blob(bytes) => Ok(Some(bytes.to_vec())),
                        _ => Ok(None),
                    },
                )
                .optional()?;
            Ok(payload.flatten())
        })
        .await?
    }
}
