use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use persona_db::{create_pool, run_migrations, DbRuntimeSettings};
use persona_server::{app, config::Config, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup() -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("personas.db");
    let pool = create_pool(path.to_str().unwrap(), DbRuntimeSettings::default()).unwrap();
    run_migrations(&pool.get().unwrap()).unwrap();
    let state = AppState::from_config(pool, &Config::default()).unwrap();
    (dir, app(state))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn health_check_returns_ok() {
    let (_dir, app) = setup();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn put_then_get_persona() {
    let (_dir, app) = setup();

    let (status, saved) = send(
        &app,
        "PUT",
        "/api/personas/lea",
        Some(json!({
            "name": "Léa",
            "gender": "Femme",
            "mentality": "Romantique",
            "speakingStyle": "  ",
            "voice": " Shimmer "
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["id"], "lea");
    assert_eq!(saved["voice"], "shimmer");
    assert_eq!(saved["speakingStyle"], Value::Null);

    let (status, fetched) = send(&app, "GET", "/api/personas/lea", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Léa");
    assert_eq!(fetched["mentality"], "Romantique");
}

#[tokio::test]
async fn create_assigns_an_id_and_lists() {
    let (_dir, app) = setup();

    let (status, created) = send(
        &app,
        "POST",
        "/api/personas",
        Some(json!({"name": "Bruno", "gender": "Homme"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 36);

    send(&app, "PUT", "/api/personas/a", Some(json!({"name": "Alice"}))).await;

    let (status, list) = send(&app, "GET", "/api/personas", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Alice", "Bruno"]);
}

#[tokio::test]
async fn invalid_payloads_are_rejected() {
    let (_dir, app) = setup();

    let (status, body) = send(&app, "PUT", "/api/personas/x", Some(json!({"name": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("name"));

    let (status, body) = send(
        &app,
        "PUT",
        "/api/personas/x",
        Some(json!({"name": "X", "voice": "tenor"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("tenor"));
}

#[tokio::test]
async fn missing_persona_is_not_found() {
    let (_dir, app) = setup();

    let (status, body) = send(&app, "GET", "/api/personas/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, "GET", "/api/personas/ghost/voice", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/api/personas/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_persona() {
    let (_dir, app) = setup();
    send(&app, "PUT", "/api/personas/tmp", Some(json!({"name": "Tmp"}))).await;

    let (status, _) = send(&app, "DELETE", "/api/personas/tmp", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", "/api/personas/tmp", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn voice_preview_explains_scored_choice() {
    let (_dir, app) = setup();
    send(
        &app,
        "PUT",
        "/api/personas/lea",
        Some(json!({"name": "Léa", "gender": "Femme"})),
    )
    .await;

    let (status, preview) = send(&app, "GET", "/api/personas/lea/voice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["voice"], "nova");
    assert_eq!(preview["source"], "scored");
    assert_eq!(preview["scores"]["nova"], 3);
    assert_eq!(preview["scores"]["shimmer"], 3);
    assert_eq!(preview["scores"]["onyx"], 0);
}

#[tokio::test]
async fn voice_preview_prefers_stored_voice() {
    let (_dir, app) = setup();
    send(
        &app,
        "PUT",
        "/api/personas/bob",
        Some(json!({"name": "Bob", "gender": "Femme", "voice": "onyx"})),
    )
    .await;

    let (_, preview) = send(&app, "GET", "/api/personas/bob/voice", None).await;
    assert_eq!(preview["voice"], "onyx");
    assert_eq!(preview["source"], "stored");
}

#[tokio::test]
async fn voice_preview_falls_back_without_signal() {
    let (_dir, app) = setup();
    send(
        &app,
        "PUT",
        "/api/personas/anon",
        Some(json!({"name": "Anon", "gender": "inconnu"})),
    )
    .await;

    let (_, preview) = send(&app, "GET", "/api/personas/anon/voice", None).await;
    assert_eq!(preview["voice"], "alloy");
    assert_eq!(preview["source"], "fallback");
}
