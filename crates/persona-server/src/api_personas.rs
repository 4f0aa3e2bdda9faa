//! Persona CRUD handlers and the voice-selection preview.

use crate::{api::with_conn, api::ApiError, AppState};
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use persona_db::{PersonaDbError, PersonaUpsert};
use persona_types::{PersonaRecord, VoiceId};
use persona_voice::{explain, VoiceSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Request body for creating or replacing a persona.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaPayload {
    pub name: String,
    pub gender: Option<String>,
    pub mentality: Option<String>,
    pub speaking_style: Option<String>,
    pub speaking_rhythm: Option<String>,
    pub voice: Option<String>,
}

/// Response body for the voice preview.
#[derive(Debug, Serialize)]
pub struct VoicePreview {
    pub voice: VoiceId,
    pub source: VoiceSource,
    pub scores: BTreeMap<String, u32>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl PersonaPayload {
    /// Validates the payload; a stored voice must name a known voice and is
    /// kept in its canonical lowercase form.
    fn into_upsert(self) -> Result<PersonaUpsert, ApiError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::BadRequest("name is required".to_string()));
        }
        let voice = match blank_to_none(self.voice) {
            Some(raw) => Some(
                VoiceId::parse(&raw)
                    .ok_or_else(|| ApiError::BadRequest(format!("unknown voice: {}", raw)))?
                    .as_str()
                    .to_string(),
            ),
            None => None,
        };
        Ok(PersonaUpsert {
            name,
            gender: blank_to_none(self.gender),
            mentality: blank_to_none(self.mentality),
            speaking_style: blank_to_none(self.speaking_style),
            speaking_rhythm: blank_to_none(self.speaking_rhythm),
            voice,
        })
    }
}

fn db_error(e: PersonaDbError) -> ApiError {
    match e {
        PersonaDbError::NotFound(id) => ApiError::NotFound(format!("persona not found: {}", id)),
        PersonaDbError::Database(_) => ApiError::InternalServerError(e.to_string()),
    }
}

async fn load_persona(state: &Arc<AppState>, id: String) -> Result<PersonaRecord, ApiError> {
    with_conn(state, move |conn| {
        persona_db::get_persona(conn, &id)
            .map_err(db_error)?
            .ok_or_else(|| ApiError::NotFound(format!("persona not found: {}", id)))
    })
    .await
}

/// Handler for `GET /api/personas`.
pub async fn list_personas_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<PersonaRecord>>, ApiError> {
    let personas =
        with_conn(&state, |conn| persona_db::list_personas(conn).map_err(db_error)).await?;
    Ok(Json(personas))
}

/// Handler for `POST /api/personas`. Assigns a fresh id.
pub async fn create_persona_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<PersonaPayload>,
) -> Result<Response, ApiError> {
    let upsert = payload.into_upsert()?;
    let id = Uuid::new_v4().to_string();

    let record = with_conn(&state, move |conn| {
        persona_db::upsert_persona(conn, &id, &upsert).map_err(db_error)
    })
    .await?;

    tracing::info!(persona_id = %record.id, name = %record.name, "persona created");
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

/// Handler for `GET /api/personas/{personaId}`.
pub async fn get_persona_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(persona_id): Path<String>,
) -> Result<Json<PersonaRecord>, ApiError> {
    Ok(Json(load_persona(&state, persona_id).await?))
}

/// Handler for `PUT /api/personas/{personaId}`. Creates or replaces.
pub async fn put_persona_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(persona_id): Path<String>,
    Json(payload): Json<PersonaPayload>,
) -> Result<Json<PersonaRecord>, ApiError> {
    let persona_id = persona_id.trim().to_string();
    if persona_id.is_empty() {
        return Err(ApiError::BadRequest("persona id is required".to_string()));
    }
    let upsert = payload.into_upsert()?;

    let record = with_conn(&state, move |conn| {
        persona_db::upsert_persona(conn, &persona_id, &upsert).map_err(db_error)
    })
    .await?;

    tracing::info!(persona_id = %record.id, "persona saved");
    Ok(Json(record))
}

/// Handler for `DELETE /api/personas/{personaId}`.
pub async fn delete_persona_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(persona_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state, move |conn| {
        persona_db::delete_persona(conn, &persona_id).map_err(db_error)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for `GET /api/personas/{personaId}/voice`.
///
/// Explains which voice a synthesis request without override would use.
pub async fn voice_preview_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(persona_id): Path<String>,
) -> Result<Json<VoicePreview>, ApiError> {
    let record = load_persona(&state, persona_id).await?;
    let decision = explain(None, Some(&record.descriptor()), state.tts.default_voice());

    Ok(Json(VoicePreview {
        voice: decision.voice,
        source: decision.source,
        scores: decision
            .scores
            .iter()
            .map(|(voice, score)| (voice.as_str().to_string(), score))
            .collect(),
    }))
}
