//! Persona server library logic.

pub mod api;
pub mod api_avatar;
pub mod api_personas;
pub mod api_tts;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use config::Config;
use persona_avatar::{AvatarAssetStore, IngestSettings, SqliteAvatarBackend};
use persona_db::DbPool;
use persona_voice::{TtsService, VoiceError};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
///
/// Built once at startup; handlers receive it by `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Chunked avatar read path.
    pub avatars: Arc<AvatarAssetStore<SqliteAvatarBackend>>,
    /// Limits applied to avatar uploads.
    pub ingest: IngestSettings,
    /// Text-to-speech provider client.
    pub tts: Arc<TtsService>,
}

impl AppState {
    /// Wires every component to the shared pool and configuration.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError` if the TTS HTTP client cannot be built.
    pub fn from_config(pool: DbPool, config: &Config) -> Result<Self, VoiceError> {
        let avatars = AvatarAssetStore::new(
            SqliteAvatarBackend::new(pool.clone()),
            config.avatar.timeouts(),
        );
        Ok(Self {
            pool,
            avatars: Arc::new(avatars),
            ingest: config.avatar.ingest_settings(),
            tts: Arc::new(TtsService::new(config.tts.clone())?),
        })
    }
}

/// Maximum request body size for JSON routes (2 MiB).
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    // Avatar uploads carry raw image bytes; the ingest limit is checked again
    // in the handler.
    let upload_routes = Router::new()
        .route(
            "/api/avatars/{personaId}",
            get(api_avatar::get_avatar_handler).put(api_avatar::put_avatar_handler),
        )
        .layer(DefaultBodyLimit::max(state.ingest.max_bytes));

    let json_routes = Router::new()
        .route("/health", get(health))
        .route("/api/tts", post(api_tts::tts_handler))
        .route(
            "/api/personas",
            get(api_personas::list_personas_handler).post(api_personas::create_persona_handler),
        )
        .route(
            "/api/personas/{personaId}",
            get(api_personas::get_persona_handler)
                .put(api_personas::put_persona_handler)
                .delete(api_personas::delete_persona_handler),
        )
        .route(
            "/api/personas/{personaId}/voice",
            get(api_personas::voice_preview_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES));

    Router::new()
        .merge(json_routes)
        .merge(upload_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any)
                        .expose_headers(Any),
                )
                .layer(Extension(Arc::new(state))),
        )
}
