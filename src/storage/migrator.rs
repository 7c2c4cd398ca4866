use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use super::{collection_exists, parse_stored_date, upsert_note};
use crate::cache::NoteCache;
use crate::entity::{now_millis, Note};
use crate::error::{MageNoteError, Result};

pub const DEFAULT_DATABASE_NAME: &str = "MageNote";
pub const SCHEMA_VERSION: u32 = 1;

const CREATE_COLLECTION: &str = "
CREATE TABLE notes (
  id INTEGER PRIMARY KEY,
  date TEXT NOT NULL,
  note TEXT NOT NULL
);

CREATE UNIQUE INDEX idx_notes_id ON notes(id);
";

/// Opens versioned note databases and upgrades them in place.
///
/// Each named database is one SQLite file under `data_dir`; its schema
/// version lives in `PRAGMA user_version` (0 for a database that was never
/// set up).
#[derive(Debug, Clone)]
pub struct SchemaMigrator {
    data_dir: PathBuf,
}

impl SchemaMigrator {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn database_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.db", name))
    }

    /// Open `name` at `version`, creating or upgrading the collection when
    /// the stored version is behind.
    ///
    /// On upgrade every record that can still be read from the old collection
    /// is carried over, then `seed` (the in-memory mirror) is written on top,
    /// so nothing held in either place is lost. Failures are reported as
    /// `StoreOpen` and never retried.
    pub fn open(&self, name: &str, version: u32, seed: &NoteCache) -> Result<Connection> {
        if version == 0 {
            return Err(MageNoteError::StoreOpen(
                "version must be a positive integer".to_string(),
            ));
        }

        fs::create_dir_all(&self.data_dir).map_err(|e| {
            MageNoteError::StoreOpen(format!("{}: {}", self.data_dir.display(), e))
        })?;

        let path = self.database_path(name);
        let mut conn = Connection::open(&path)
            .map_err(|e| MageNoteError::StoreOpen(format!("{}: {}", path.display(), e)))?;

        let stored = stored_version(&conn)
            .map_err(|e| MageNoteError::StoreOpen(format!("{}: {}", path.display(), e)))?;
        debug!(database = name, stored, requested = version, "opening note database");

        if stored > version {
            return Err(MageNoteError::StoreOpen(format!(
                "requested version {} is older than the stored version {}",
                version, stored
            )));
        }

        if stored < version {
            let carried = upgrade(&mut conn, version, seed)
                .map_err(|e| MageNoteError::StoreOpen(format!("upgrade failed: {}", e)))?;
            if stored == 0 {
                info!(database = name, version, carried, "created note collection");
            } else {
                info!(database = name, from = stored, to = version, carried, "upgraded note collection");
            }
        }

        Ok(conn)
    }

    /// Remove the database file and any journal side files. Deleting a
    /// database that does not exist succeeds.
    pub fn delete_database(&self, name: &str) -> Result<()> {
        let path = self.database_path(name);
        for suffix in ["", "-journal", "-wal", "-shm"] {
            let target = PathBuf::from(format!("{}{}", path.display(), suffix));
            match fs::remove_file(&target) {
                Ok(()) => debug!(path = %target.display(), "removed database file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        info!(database = name, "deleted note database");
        Ok(())
    }
}

pub(crate) fn stored_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

/// Rebuild the collection at `version` inside one transaction and return the
/// number of records written back.
fn upgrade(conn: &mut Connection, version: u32, seed: &NoteCache) -> rusqlite::Result<usize> {
    let tx = conn.transaction()?;

    let mut records: BTreeMap<i64, Note> = if collection_exists(&tx)? {
        read_for_migration(&tx)?
    } else {
        BTreeMap::new()
    };
    for note in seed.notes() {
        records.insert(note.id, note.clone());
    }

    tx.execute_batch("DROP TABLE IF EXISTS notes;")?;
    tx.execute_batch(CREATE_COLLECTION)?;
    for note in records.values() {
        upsert_note(&tx, note)?;
    }
    tx.pragma_update(None, "user_version", version)?;
    tx.commit()?;

    Ok(records.len())
}

// Old rows are read column by column so a record with a damaged date still
// survives the upgrade.
fn read_for_migration(conn: &Connection) -> rusqlite::Result<BTreeMap<i64, Note>> {
    let mut stmt = conn.prepare("SELECT id, date, note FROM notes")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut records = BTreeMap::new();
    for (id, raw_date, body) in rows {
        let timestamp = parse_stored_date(&raw_date).unwrap_or_else(|| {
            warn!(id, raw_date = %raw_date, "unparseable date during migration, restamping");
            now_millis()
        });
        records.insert(id, Note::with_timestamp(id, timestamp, body));
    }
    Ok(records)
}
