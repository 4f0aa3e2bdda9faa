//! Avatar ingestion: format sniffing, metadata stripping, hashing and
//! chunked persistence.
//!
//! The stored bytes are the *stripped* image, and the manifest hash covers
//! exactly those bytes, so the entity tag served later matches the body.

use crate::backend::SqliteAvatarBackend;
use crate::error::IngestError;
use persona_types::MAX_AVATAR_CHUNKS;
use sha2::{Digest, Sha256};

/// Size limits applied to uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    /// Bytes per stored chunk.
    pub chunk_size: usize,
    /// Largest accepted upload.
    pub max_bytes: usize,
}

impl IngestSettings {
    /// Number of chunks an image of `len` bytes is split into.
    pub fn chunks_for(&self, len: usize) -> usize {
        len.div_ceil(self.chunk_size.max(1))
    }

    /// Whether every accepted upload fits in an addressable manifest.
    pub fn is_consistent(&self) -> bool {
        self.chunk_size > 0 && self.chunks_for(self.max_bytes) <= MAX_AVATAR_CHUNKS
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            chunk_size: 512 * 1024,
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// An image ready to be written: cleaned, hashed and split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedAvatar {
    pub content_type: String,
    pub sha256: String,
    pub size: usize,
    pub chunks: Vec<Vec<u8>>,
}

/// Summary of a stored avatar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAvatar {
    pub asset_id: String,
    pub content_type: String,
    pub chunk_count: usize,
    pub sha256: String,
    pub size: usize,
    /// Bytes removed by metadata stripping.
    pub stripped_bytes: usize,
}

/// Detects content type from the first bytes of a file.
pub fn detect_content_type(data: &[u8]) -> Option<&'static str> {
    const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

    if data.starts_with(&[0xFF, 0xD8]) {
        Some("image/jpeg")
    } else if data.starts_with(&PNG_SIGNATURE) {
        Some("image/png")
    } else if data.starts_with(b"GIF8") {
        Some("image/gif")
    } else if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// Drops JPEG segments that carry metadata (APP1 EXIF/XMP, APP12, APP13
/// IPTC, COM) without re-encoding. Everything from SOS onward is copied
/// verbatim.
fn strip_jpeg_metadata(data: &[u8]) -> Vec<u8> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return data.to_vec();
    }

    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&data[..2]);
    let mut pos = 2;

    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            out.extend_from_slice(&data[pos..]);
            return out;
        }
        let marker = data[pos + 1];

        if marker == 0xDA {
            out.extend_from_slice(&data[pos..]);
            return out;
        }

        // Standalone markers: SOI, EOI, RST0-RST7.
        if matches!(marker, 0xD8 | 0xD9 | 0xD0..=0xD7) {
            out.extend_from_slice(&data[pos..pos + 2]);
            pos += 2;
            continue;
        }

        if pos + 3 >= data.len() {
            break;
        }
        let segment_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize + 2;
        let Some(segment) = data.get(pos..pos + segment_len) else {
            out.extend_from_slice(&data[pos..]);
            return out;
        };

        if !matches!(marker, 0xE1 | 0xEC | 0xED | 0xFE) {
            out.extend_from_slice(segment);
        }
        pos += segment_len;
    }

    out
}

/// Drops PNG text and EXIF chunks (tEXt, iTXt, zTXt, eXIf) without
/// re-encoding.
fn strip_png_metadata(data: &[u8]) -> Vec<u8> {
    const SIGNATURE_LEN: usize = 8;
    if detect_content_type(data) != Some("image/png") {
        return data.to_vec();
    }

    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&data[..SIGNATURE_LEN]);
    let mut pos = SIGNATURE_LEN;

    while pos + 12 <= data.len() {
        let len = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        // length + type + payload + crc
        let total = 12 + len;
        let Some(chunk) = data.get(pos..pos + total) else {
            break;
        };
        let kind = &chunk[4..8];
        if !matches!(kind, b"tEXt" | b"iTXt" | b"zTXt" | b"eXIf") {
            out.extend_from_slice(chunk);
        }
        pos += total;
    }

    out.extend_from_slice(&data[pos..]);
    out
}

/// Strips metadata from an image based on its content type. GIF and WebP
/// pass through unchanged.
fn strip_metadata(data: &[u8], content_type: &str) -> Vec<u8> {
    match content_type {
        "image/jpeg" => strip_jpeg_metadata(data),
        "image/png" => strip_png_metadata(data),
        _ => data.to_vec(),
    }
}

/// Validates, cleans, hashes and splits an upload.
///
/// # Errors
///
/// Returns `IngestError` for empty, oversized or unrecognized input, and for
/// images that would split into more chunks than a manifest can address.
pub fn prepare(data: &[u8], settings: IngestSettings) -> Result<PreparedAvatar, IngestError> {
    if data.is_empty() {
        return Err(IngestError::Empty);
    }
    if data.len() > settings.max_bytes {
        return Err(IngestError::TooLarge {
            len: data.len(),
            limit: settings.max_bytes,
        });
    }
    let content_type = detect_content_type(data).ok_or(IngestError::UnsupportedFormat)?;

    let cleaned = strip_metadata(data, content_type);
    let chunk_count = settings.chunks_for(cleaned.len());
    if chunk_count > MAX_AVATAR_CHUNKS {
        return Err(IngestError::TooManyChunks {
            chunks: chunk_count,
            chunk_size: settings.chunk_size,
            limit: MAX_AVATAR_CHUNKS,
        });
    }
    let sha256 = hex::encode(Sha256::digest(&cleaned));
    let chunks = cleaned
        .chunks(settings.chunk_size.max(1))
        .map(<[u8]>::to_vec)
        .collect();

    Ok(PreparedAvatar {
        content_type: content_type.to_string(),
        sha256,
        size: cleaned.len(),
        chunks,
    })
}

/// Prepares `data` and writes it under `asset_id`.
///
/// # Errors
///
/// Returns `IngestError::AlreadyExists` when the asset id is taken; avatars
/// are immutable once written.
pub async fn store_avatar(
    backend: &SqliteAvatarBackend,
    asset_id: &str,
    data: &[u8],
    settings: IngestSettings,
) -> Result<StoredAvatar, IngestError> {
    let asset_id = asset_id.trim();
    if asset_id.is_empty() {
        return Err(IngestError::InvalidId);
    }

    let prepared = prepare(data, settings)?;
    let stored = StoredAvatar {
        asset_id: asset_id.to_string(),
        content_type: prepared.content_type.clone(),
        chunk_count: prepared.chunks.len(),
        sha256: prepared.sha256.clone(),
        size: prepared.size,
        stripped_bytes: data.len() - prepared.size,
    };

    if !backend.insert(asset_id, prepared).await? {
        return Err(IngestError::AlreadyExists(asset_id.to_string()));
    }

    tracing::info!(
        asset_id,
        content_type = %stored.content_type,
        chunk_count = stored.chunk_count,
        size_bytes = stored.size,
        metadata_stripped_bytes = stored.stripped_bytes,
        "avatar stored"
    );

    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIG: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

    fn png_chunk(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut chunk = (payload.len() as u32).to_be_bytes().to_vec();
        chunk.extend_from_slice(kind);
        chunk.extend_from_slice(payload);
        chunk.extend_from_slice(&[0, 0, 0, 0]);
        chunk
    }

    fn tiny_png(with_text: bool) -> Vec<u8> {
        let mut png = PNG_SIG.to_vec();
        png.extend(png_chunk(b"IHDR", &[0u8; 13]));
        if with_text {
            png.extend(png_chunk(b"tEXt", b"Author\0someone"));
        }
        png.extend(png_chunk(b"IDAT", &[1, 2, 3, 4]));
        png.extend(png_chunk(b"IEND", &[]));
        png
    }

    #[test]
    fn detects_supported_formats() {
        assert_eq!(detect_content_type(&[0xFF, 0xD8, 0xFF]), Some("image/jpeg"));
        assert_eq!(detect_content_type(&PNG_SIG), Some("image/png"));
        assert_eq!(detect_content_type(b"GIF89a"), Some("image/gif"));
        assert_eq!(detect_content_type(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(detect_content_type(&[0, 0, 0, 0]), None);
    }

    #[test]
    fn jpeg_exif_segment_is_removed() {
        let mut jpeg = vec![0xFF, 0xD8];
        jpeg.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00]);
        jpeg.extend_from_slice(&[0xFF, 0xE1, 0x00, 0x06, 0x45, 0x78, 0x69, 0x66]);
        jpeg.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 0x01, 0x02, 0x03]);

        let stripped = strip_jpeg_metadata(&jpeg);

        assert!(stripped.starts_with(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!stripped.windows(2).any(|w| w == [0xFF, 0xE1]));
        assert!(stripped.ends_with(&[0xFF, 0xDA, 0x00, 0x02, 0x01, 0x02, 0x03]));
        assert_eq!(stripped.len(), jpeg.len() - 8);
    }

    #[test]
    fn png_text_chunk_is_removed() {
        let stripped = strip_png_metadata(&tiny_png(true));
        assert_eq!(stripped, tiny_png(false));
    }

    #[test]
    fn prepare_hashes_the_stripped_bytes() {
        let prepared = prepare(&tiny_png(true), IngestSettings::default()).unwrap();
        let clean = tiny_png(false);
        assert_eq!(prepared.size, clean.len());
        assert_eq!(prepared.sha256, hex::encode(Sha256::digest(&clean)));
        assert_eq!(prepared.sha256.len(), 64);
        assert_eq!(prepared.chunks, vec![clean]);
    }

    #[test]
    fn prepare_splits_into_fixed_size_chunks() {
        let settings = IngestSettings {
            chunk_size: 10,
            max_bytes: 1024,
        };
        let png = tiny_png(false);
        let prepared = prepare(&png, settings).unwrap();

        assert_eq!(prepared.chunks.len(), png.len().div_ceil(10));
        assert!(prepared.chunks[..prepared.chunks.len() - 1]
            .iter()
            .all(|c| c.len() == 10));
        assert_eq!(prepared.chunks.concat(), png);
    }

    #[test]
    fn prepare_refuses_more_chunks_than_keys() {
        let settings = IngestSettings {
            chunk_size: 2,
            max_bytes: 64 * 1024,
        };
        let mut png = PNG_SIG.to_vec();
        png.resize(2 * MAX_AVATAR_CHUNKS + 16, 0xAB);

        match prepare(&png, settings) {
            Err(IngestError::TooManyChunks { chunks, limit, .. }) => {
                assert_eq!(chunks, MAX_AVATAR_CHUNKS + 8);
                assert_eq!(limit, MAX_AVATAR_CHUNKS);
            }
            other => panic!("expected TooManyChunks, got {other:?}"),
        }

        png.truncate(2 * MAX_AVATAR_CHUNKS);
        let prepared = prepare(&png, settings).unwrap();
        assert_eq!(prepared.chunks.len(), MAX_AVATAR_CHUNKS);
    }

    #[test]
    fn settings_consistency_covers_the_largest_upload() {
        assert!(IngestSettings::default().is_consistent());
        assert!(!IngestSettings {
            chunk_size: 0,
            max_bytes: 10,
        }
        .is_consistent());
        assert!(!IngestSettings {
            chunk_size: 1,
            max_bytes: MAX_AVATAR_CHUNKS + 1,
        }
        .is_consistent());
        assert!(IngestSettings {
            chunk_size: 1,
            max_bytes: MAX_AVATAR_CHUNKS,
        }
        .is_consistent());
    }

    #[test]
    fn prepare_rejects_bad_input() {
        let settings = IngestSettings {
            chunk_size: 4,
            max_bytes: 16,
        };
        assert!(matches!(prepare(&[], settings), Err(IngestError::Empty)));
        assert!(matches!(
            prepare(&[0u8; 17], settings),
            Err(IngestError::TooLarge { len: 17, limit: 16 })
        ));
        assert!(matches!(
            prepare(b"plain text", settings),
            Err(IngestError::UnsupportedFormat)
        ));
    }
}
