//! Avatar manifest definitions.
//!
//! An avatar is stored as a manifest plus `chunk_count` ordered binary chunks
//! addressed by [`chunk_key`]. The manifest is written once at ingestion and
//! is read-only afterwards.

use serde::{Deserialize, Serialize};

/// Content type served when the manifest does not carry one.
pub const DEFAULT_AVATAR_CONTENT_TYPE: &str = "image/png";

/// Largest chunk count a manifest may claim. [`chunk_key`] pads indexes to
/// four digits, so keys stop at `chunk_9999`.
pub const MAX_AVATAR_CHUNKS: usize = 10_000;

/// Metadata describing a chunked avatar asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarManifest {
    pub content_type: Option<String>,
    pub chunk_count: i64,
    pub sha256: Option<String>,
}

impl AvatarManifest {
    /// A manifest can be served when it claims between one and
    /// [`MAX_AVATAR_CHUNKS`] chunks.
    pub fn is_servable(&self) -> bool {
        self.chunk_count > 0 && self.chunk_count <= MAX_AVATAR_CHUNKS as i64
    }

    /// The MIME type to serve, defaulting blank values to `image/png`.
    pub fn effective_content_type(&self) -> &str {
        match self.content_type.as_deref().map(str::trim) {
            Some(ct) if !ct.is_empty() => ct,
            _ => DEFAULT_AVATAR_CONTENT_TYPE,
        }
    }

    /// Quoted entity tag derived from the content hash.
    ///
    /// `None` when the manifest has no hash, in which case conditional
    /// requests are not honoured.
    pub fn etag(&self) -> Option<String> {
        match self.sha256.as_deref().map(str::trim) {
            Some(hash) if !hash.is_empty() => Some(format!("\"{}\"", hash)),
            _ => None,
        }
    }
}

/// Key of the chunk at `index`: `chunk_0000`, `chunk_0001`, ...
pub fn chunk_key(index: usize) -> String {
    format!("chunk_{:04}", index)
}
