//! Speech synthesis handler.

use crate::{api::with_conn, api::ApiError, AppState};
use axum::{
    extract::{Extension, Json},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        HeaderName, StatusCode,
    },
    response::{IntoResponse, Response},
};
use persona_voice::{explain, VoiceError};
use serde::Deserialize;
use std::sync::Arc;

/// Response header naming the voice that was used.
pub const VOICE_HEADER: HeaderName = HeaderName::from_static("x-voice");

/// Request body for `POST /api/tts`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsRequest {
    /// Text to speak. Required and non-blank.
    pub text: Option<String>,
    /// Explicit voice override; ignored unless it names a known voice.
    pub voice: Option<String>,
    /// Persona whose attributes drive voice selection.
    pub persona_id: Option<String>,
}

/// Handler for `POST /api/tts`.
///
/// Resolves the voice from the explicit override, the persona and the
/// configured default, then streams back the provider's MP3 bytes.
pub async fn tts_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<TtsRequest>,
) -> Result<Response, ApiError> {
    let text = payload
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("text is required".to_string()))?
        .to_string();

    let persona = match payload.persona_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => {
            let id = id.to_string();
            let record = with_conn(&state, move |conn| {
                persona_db::get_persona(conn, &id)
                    .map_err(|e| ApiError::InternalServerError(e.to_string()))
            })
            .await?;
            if record.is_none() {
                tracing::debug!(persona_id = ?payload.persona_id, "unknown persona, selecting voice without it");
            }
            record.map(|r| r.descriptor())
        }
        _ => None,
    };

    let decision = explain(
        payload.voice.as_deref(),
        persona.as_ref(),
        state.tts.default_voice(),
    );

    tracing::info!(
        voice = %decision.voice,
        source = ?decision.source,
        persona_id = ?payload.persona_id,
        chars = text.chars().count(),
        "synthesizing speech"
    );

    let audio = state
        .tts
        .synthesize(&text, decision.voice)
        .await
        .map_err(|e| match e {
            VoiceError::InputTooLarge { .. } => ApiError::BadRequest(e.to_string()),
            VoiceError::MissingCredential => {
                ApiError::BadGateway("TTS provider is not configured".to_string())
            }
            VoiceError::Upstream { message, .. } => ApiError::BadGateway(message),
            VoiceError::Http(_) => ApiError::BadGateway(e.to_string()),
        })?;

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "audio/mpeg"),
            (CACHE_CONTROL, "no-store"),
            (VOICE_HEADER, decision.voice.as_str()),
        ],
        audio,
    )
        .into_response())
}
