use persona_db::{
    create_pool, delete_persona, get_persona, list_personas, run_migrations, upsert_persona,
    DbRuntimeSettings, PersonaDbError, PersonaUpsert,
};

fn setup() -> (tempfile::TempDir, persona_db::DbPool) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("personas.db");
    let pool = create_pool(path.to_str().unwrap(), DbRuntimeSettings::default())
        .expect("failed to create pool");
    let conn = pool.get().expect("failed to get connection");
    run_migrations(&conn).expect("failed to run migrations");
    (dir, pool)
}

fn camille() -> PersonaUpsert {
    PersonaUpsert {
        name: "Camille".to_string(),
        gender: Some("Femme".to_string()),
        mentality: Some("Coach motivante".to_string()),
        speaking_style: None,
        speaking_rhythm: Some("Rapide".to_string()),
        voice: None,
    }
}

#[test]
fn upsert_then_get_round_trips_fields() {
    let (_dir, pool) = setup();
    let conn = pool.get().unwrap();

    let stored = upsert_persona(&conn, "p-1", &camille()).expect("insert should succeed");
    assert_eq!(stored.id, "p-1");
    assert_eq!(stored.gender.as_deref(), Some("Femme"));
    assert!(!stored.created_at.is_empty());

    let fetched = get_persona(&conn, "p-1").unwrap().expect("persona should exist");
    assert_eq!(fetched, stored);
}

#[test]
fn upsert_replaces_attributes_and_keeps_created_at() {
    let (_dir, pool) = setup();
    let conn = pool.get().unwrap();

    let first = upsert_persona(&conn, "p-1", &camille()).unwrap();
    let mut changed = camille();
    changed.voice = Some("onyx".to_string());
    changed.gender = None;
    let second = upsert_persona(&conn, "p-1", &changed).unwrap();

    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.voice.as_deref(), Some("onyx"));
    assert_eq!(second.gender, None);
    assert_eq!(list_personas(&conn).unwrap().len(), 1);
}

#[test]
fn missing_persona_reads_as_none() {
    let (_dir, pool) = setup();
    let conn = pool.get().unwrap();
    assert!(get_persona(&conn, "ghost").unwrap().is_none());
}

#[test]
fn list_is_ordered_by_name() {
    let (_dir, pool) = setup();
    let conn = pool.get().unwrap();

    let mut zoe = camille();
    zoe.name = "Zoé".to_string();
    upsert_persona(&conn, "z", &zoe).unwrap();
    upsert_persona(&conn, "c", &camille()).unwrap();

    let names: Vec<String> = list_personas(&conn)
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["Camille".to_string(), "Zoé".to_string()]);
}

#[test]
fn delete_reports_missing_rows() {
    let (_dir, pool) = setup();
    let conn = pool.get().unwrap();

    upsert_persona(&conn, "p-1", &camille()).unwrap();
    delete_persona(&conn, "p-1").expect("delete should succeed");
    assert!(get_persona(&conn, "p-1").unwrap().is_none());

    match delete_persona(&conn, "p-1") {
        Err(PersonaDbError::NotFound(id)) => assert_eq!(id, "p-1"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}
