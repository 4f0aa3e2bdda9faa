//! Avatar read path: manifest lookup, conditional short-circuit and chunk
//! reassembly.

use crate::backend::AvatarBackend;
use crate::error::AvatarError;
use futures_util::future::try_join_all;
use persona_types::chunk_key;
use std::time::Duration;

/// `Cache-Control` sent with both 200 and 304 avatar responses.
///
/// Content at a given asset id is write-once, so caches may keep it forever.
pub const AVATAR_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Outcome of an avatar lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarResponse {
    NotFound,
    NotModified {
        etag: String,
    },
    Found {
        bytes: Vec<u8>,
        content_type: String,
        /// Absent when the manifest carries no hash.
        etag: Option<String>,
    },
}

/// Time budgets for chunk reassembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvatarTimeouts {
    /// Bound on a single chunk read.
    pub per_chunk: Duration,
    /// Bound on the whole fan-out, from first read to join.
    pub total: Duration,
}

impl Default for AvatarTimeouts {
    fn default() -> Self {
        Self {
            per_chunk: Duration::from_secs(5),
            total: Duration::from_secs(15),
        }
    }
}

/// Serves chunked avatars from an injected backend.
#[derive(Debug, Clone)]
pub struct AvatarAssetStore<B> {
    backend: B,
    timeouts: AvatarTimeouts,
}

impl<B: AvatarBackend> AvatarAssetStore<B> {
    pub fn new(backend: B, timeouts: AvatarTimeouts) -> Self {
        Self { backend, timeouts }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Looks up and reassembles the avatar stored under `asset_id`.
    ///
    /// `client_etag` is the raw `If-None-Match` value; it must equal the
    /// quoted manifest hash exactly for a `NotModified` answer, in which case
    /// no chunk is read.
    ///
    /// # Errors
    ///
    /// Returns `AvatarError::Unavailable` when the backend fails and
    /// `AvatarError::Timeout` when a chunk read or the whole reassembly runs
    /// past its budget. Missing data is never an error: it is `NotFound`.
    pub async fn get_avatar(
        &self,
        asset_id: &str,
        client_etag: Option<&str>,
    ) -> Result<AvatarResponse, AvatarError> {
        let asset_id = asset_id.trim();
        if asset_id.is_empty() {
            return Ok(AvatarResponse::NotFound);
        }

        let manifest = match self.backend.manifest(asset_id).await? {
            Some(manifest) if manifest.is_servable() => manifest,
            Some(manifest) => {
                tracing::debug!(
                    asset_id,
                    chunk_count = manifest.chunk_count,
                    "avatar manifest has an unusable chunk count"
                );
                return Ok(AvatarResponse::NotFound);
            }
            None => return Ok(AvatarResponse::NotFound),
        };

        // Derived from the manifest read above, never from an earlier read.
        let etag = manifest.etag();
        if let Some(etag) = &etag {
            if client_etag == Some(etag.as_str()) {
                return Ok(AvatarResponse::NotModified { etag: etag.clone() });
            }
        }

        let count = manifest.chunk_count as usize;
        let fetches = (0..count).map(|index| self.fetch_chunk(asset_id, index));
        let chunks = tokio::time::timeout(self.timeouts.total, try_join_all(fetches))
            .await
            .map_err(|_| {
                AvatarError::Timeout(format!(
                    "reassembly of {} chunks for {} exceeded {:?}",
                    count, asset_id, self.timeouts.total
                ))
            })??;

        let Some(chunks) = chunks.into_iter().collect::<Option<Vec<_>>>() else {
            tracing::warn!(asset_id, chunk_count = count, "avatar has missing or unreadable chunks");
            return Ok(AvatarResponse::NotFound);
        };

        let bytes = chunks.concat();
        tracing::debug!(asset_id, chunk_count = count, size_bytes = bytes.len(), "avatar reassembled");

        Ok(AvatarResponse::Found {
            bytes,
            content_type: manifest.effective_content_type().to_string(),
            etag,
        })
    }

    async fn fetch_chunk(
        &self,
        asset_id: &str,
        index: usize,
    ) -> Result<Option<Vec<u8>>, AvatarError> {
        let key = chunk_key(index);
        match tokio::time::timeout(self.timeouts.per_chunk, self.backend.chunk(asset_id, &key)).await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(AvatarError::Timeout(format!(
                "{} of {} exceeded {:?}",
                key, asset_id, self.timeouts.per_chunk
            ))),
        }
    }
}
