//! Avatar handlers: conditional GET over chunked storage and write-once
//! upload.

use crate::{api::ApiError, AppState};
use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, Extension, Path},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use persona_avatar::{store_avatar, AvatarError, AvatarResponse, IngestError, AVATAR_CACHE_CONTROL};
use std::sync::Arc;

/// Handler for `GET /api/avatars/{personaId}`.
///
/// Honors `If-None-Match` against the manifest hash. Both 200 and 304 are
/// marked immutable for a year.
pub async fn get_avatar_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(persona_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let client_etag = headers
        .get(IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok());

    let outcome = state
        .avatars
        .get_avatar(&persona_id, client_etag)
        .await
        .map_err(|e| match e {
            AvatarError::Unavailable(_) => ApiError::ServiceUnavailable(e.to_string()),
            AvatarError::Timeout(_) => ApiError::GatewayTimeout(e.to_string()),
        })?;

    match outcome {
        AvatarResponse::NotFound => Err(ApiError::NotFound("avatar not found".to_string())),
        AvatarResponse::NotModified { etag } => Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .header(ETAG, etag)
            .header(CACHE_CONTROL, AVATAR_CACHE_CONTROL)
            .body(Body::empty())
            .map_err(|e| ApiError::InternalServerError(format!("failed to build response: {}", e))),
        AvatarResponse::Found {
            bytes,
            content_type,
            etag,
        } => {
            let mut builder = Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, content_type)
                .header(CACHE_CONTROL, AVATAR_CACHE_CONTROL);
            if let Some(etag) = etag {
                builder = builder.header(ETAG, etag);
            }
            builder
                .body(Body::from(bytes))
                .map_err(|e| ApiError::InternalServerError(format!("failed to build response: {}", e)))
        }
    }
}

/// Handler for `PUT /api/avatars/{personaId}`.
///
/// Accepts a raw image body. Metadata is stripped before hashing and the
/// asset is written once; a second upload to the same id is a conflict.
/// Bodies over the upload limit are cut off while buffering and answered
/// with 413.
pub async fn put_avatar_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(persona_id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(format!(
                "avatar exceeds {} bytes",
                state.ingest.max_bytes
            ))
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    })?;

    let stored = store_avatar(state.avatars.backend(), &persona_id, &body, state.ingest)
        .await
        .map_err(|e| match e {
            IngestError::TooLarge { .. } | IngestError::TooManyChunks { .. } => {
                ApiError::PayloadTooLarge(e.to_string())
            }
            IngestError::InvalidId | IngestError::Empty | IngestError::UnsupportedFormat => {
                ApiError::BadRequest(e.to_string())
            }
            IngestError::AlreadyExists(_) => ApiError::Conflict(e.to_string()),
            IngestError::Store(_) => ApiError::ServiceUnavailable(e.to_string()),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "assetId": stored.asset_id,
            "contentType": stored.content_type,
            "chunkCount": stored.chunk_count,
            "sha256": stored.sha256,
            "size": stored.size,
            "metadataStrippedBytes": stored.stripped_bytes,
        })),
    )
        .into_response())
}
