//! Persona record persistence.

use persona_types::PersonaRecord;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

/// Errors that can occur during persona operations.
#[derive(Debug, Error)]
pub enum PersonaDbError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("persona not found: {0}")]
    NotFound(String),
}

/// Fields written by [`upsert_persona`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonaUpsert {
    pub name: String,
    pub gender: Option<String>,
    pub mentality: Option<String>,
    pub speaking_style: Option<String>,
    pub speaking_rhythm: Option<String>,
    pub voice: Option<String>,
}

const PERSONA_COLUMNS: &str = "id, name, gender, mentality, speaking_style, speaking_rhythm, voice, created_at, updated_at";

/// Inserts a persona or replaces the attributes of an existing one.
///
/// `created_at` is preserved on update.
pub fn upsert_persona(
    conn: &Connection,
    id: &str,
    params: &PersonaUpsert,
) -> Result<PersonaRecord, PersonaDbError> {
    conn.execute(
        "INSERT INTO personas (id, name, gender, mentality, speaking_style, speaking_rhythm, voice)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            gender = excluded.gender,
            mentality = excluded.mentality,
            speaking_style = excluded.speaking_style,
            speaking_rhythm = excluded.speaking_rhythm,
            voice = excluded.voice,
            updated_at = datetime('now')",
        params![
            id,
            params.name,
            params.gender,
            params.mentality,
            params.speaking_style,
            params.speaking_rhythm,
            params.voice,
        ],
    )?;

    get_persona(conn, id)?.ok_or_else(|| PersonaDbError::NotFound(id.to_string()))
}

/// Retrieves a persona by id, `None` when absent.
pub fn get_persona(conn: &Connection, id: &str) -> Result<Option<PersonaRecord>, PersonaDbError> {
    let persona = conn
        .query_row(
            &format!("SELECT {PERSONA_COLUMNS} FROM personas WHERE id = ?1"),
            [id],
            map_row_to_persona,
        )
        .optional()?;
    Ok(persona)
}

/// Lists every persona ordered by name.
pub fn list_personas(conn: &Connection) -> Result<Vec<PersonaRecord>, PersonaDbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PERSONA_COLUMNS} FROM personas ORDER BY name ASC, id ASC"
    ))?;
    let rows = stmt.query_map([], map_row_to_persona)?;
    let mut personas = Vec::new();
    for row in rows {
        personas.push(row?);
    }
    Ok(personas)
}

/// Deletes a persona. Returns `NotFound` when nothing was removed.
pub fn delete_persona(conn: &Connection, id: &str) -> Result<(), PersonaDbError> {
    let removed = conn.execute("DELETE FROM personas WHERE id = ?1", [id])?;
    if removed == 0 {
        return Err(PersonaDbError::NotFound(id.to_string()));
    }
    Ok(())
}

fn map_row_to_persona(row: &Row<'_>) -> rusqlite::Result<PersonaRecord> {
    Ok(PersonaRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        gender: row.get(2)?,
        mentality: row.get(3)?,
        speaking_style: row.get(4)?,
        speaking_rhythm: row.get(5)?,
        voice: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}
