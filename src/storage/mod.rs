mod migrator;
mod note_store;

pub use migrator::{SchemaMigrator, DEFAULT_DATABASE_NAME, SCHEMA_VERSION};
pub use note_store::NoteStore;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};

use crate::entity::{format_timestamp, Note};

/// Name of the table that holds the note collection.
pub const NOTES_COLLECTION: &str = "notes";

const UPSERT_NOTE: &str = "INSERT OR REPLACE INTO notes (id, date, note) VALUES (?1, ?2, ?3)";

/// Whether the note collection exists in this database.
pub(crate) fn collection_exists(conn: &Connection) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [NOTES_COLLECTION],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub(crate) fn upsert_note(conn: &Connection, note: &Note) -> rusqlite::Result<()> {
    conn.execute(
        UPSERT_NOTE,
        rusqlite::params![note.id, format_timestamp(&note.timestamp), note.body],
    )?;
    Ok(())
}

pub(crate) fn parse_stored_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    let id: i64 = row.get(0)?;
    let raw_date: String = row.get(1)?;
    let body: String = row.get(2)?;
    let timestamp = parse_stored_date(&raw_date).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unparseable date '{}' on note {}", raw_date, id).into(),
        )
    })?;
    Ok(Note::with_timestamp(id, timestamp, body))
}

pub(crate) fn read_all_notes(conn: &Connection) -> rusqlite::Result<Vec<Note>> {
    let mut stmt = conn.prepare("SELECT id, date, note FROM notes ORDER BY id")?;
    let notes = stmt
        .query_map([], note_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(notes)
}
