use rusqlite::Connection;
use tracing::{debug, info, warn};

use super::{collection_exists, read_all_notes, upsert_note, SchemaMigrator, NOTES_COLLECTION};
use crate::cache::NoteCache;
use crate::entity::{Note, NoteDraft};
use crate::error::{MageNoteError, Result};

/// CRUD access to the note collection.
///
/// Owns the open database handle together with the in-memory mirror. Every
/// mutating call commits its transaction and then re-reads the whole
/// collection, so once a call returns `Ok` the mirror matches durable state.
pub struct NoteStore {
    conn: Connection,
    cache: NoteCache,
    name: String,
    version: u32,
}

impl NoteStore {
    /// Open (creating or upgrading as needed) without loading the mirror.
    pub fn open(migrator: &SchemaMigrator, name: &str, version: u32) -> Result<Self> {
        let cache = NoteCache::new();
        let conn = migrator.open(name, version, &cache)?;
        Ok(Self {
            conn,
            cache,
            name: name.to_string(),
            version,
        })
    }

    /// Reopen at a newer schema version, seeding the migration with the
    /// current mirror, then reload.
    pub fn upgrade(self, migrator: &SchemaMigrator, version: u32) -> Result<Self> {
        let NoteStore {
            conn, cache, name, ..
        } = self;
        drop(conn);

        let conn = migrator.open(&name, version, &cache)?;
        let mut store = Self {
            conn,
            cache,
            name,
            version,
        };
        store.get_all()?;
        Ok(store)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// The mirror as of the last refresh, whether or not one has happened.
    pub fn cache(&self) -> &NoteCache {
        &self.cache
    }

    /// The mirror, refusing to hand it out before the first refresh.
    pub fn mirror(&self) -> Result<&NoteCache> {
        if self.cache.is_loaded() {
            Ok(&self.cache)
        } else {
            Err(MageNoteError::NotLoaded)
        }
    }

    /// Read the whole collection and replace the mirror with it.
    pub fn get_all(&mut self) -> Result<Vec<Note>> {
        if !collection_exists(&self.conn)? {
            return Err(MageNoteError::CorruptStore(format!(
                "'{}' is not a known object store name",
                NOTES_COLLECTION
            )));
        }

        let notes = read_all_notes(&self.conn)?;
        debug!(count = notes.len(), "refreshed note mirror");
        self.cache.replace(notes.clone());
        Ok(notes)
    }

    /// Upsert one record by id.
    pub fn put(&mut self, note: &Note) -> Result<()> {
        check_id(note.id)?;

        let tx = self.conn.transaction()?;
        upsert_note(&tx, note)?;
        tx.commit()?;
        debug!(id = note.id, "put note");

        self.get_all()?;
        Ok(())
    }

    /// Remove one record by id. Removing an absent id is not an error.
    pub fn delete(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM notes WHERE id = ?1", [id])?;
        tx.commit()?;
        info!(id, removed, "deleted note");

        self.get_all()?;
        Ok(())
    }

    /// Upsert a batch in a single transaction.
    ///
    /// Ids are validated before anything is written. Atomicity beyond that
    /// is whatever the engine's transaction gives.
    pub fn put_all(&mut self, notes: &[Note]) -> Result<()> {
        for note in notes {
            check_id(note.id)?;
        }

        let tx = self.conn.transaction()?;
        for note in notes {
            upsert_note(&tx, note)?;
        }
        tx.commit()?;
        info!(count = notes.len(), "put note batch");

        self.get_all()?;
        Ok(())
    }

    /// `max(existing ids) + 1`, or 1 for an empty collection.
    pub fn next_id(&self) -> i64 {
        self.cache.max_id().map_or(1, |max| max + 1)
    }

    /// Save editor input: keep an explicit id, otherwise assign the next one,
    /// stamp the current time and upsert.
    pub fn save(&mut self, draft: NoteDraft) -> Result<Note> {
        let id = match draft.id {
            Some(id) => id,
            None => self.next_id(),
        };
        let note = Note::new(id, draft.body);
        self.put(&note)?;
        Ok(note)
    }

    /// Overwrite the mirror without touching durable state. Import does
    /// this right before persisting the same records with `put_all`.
    pub fn replace_mirror(&mut self, notes: Vec<Note>) {
        self.cache.replace(notes);
    }

    /// Bring the mirror back in line with durable state after a failed
    /// mutation. If the re-read fails too, the mirror is invalidated so it
    /// cannot be read until a later refresh succeeds.
    pub fn resync_mirror(&mut self) -> Result<()> {
        match self.get_all() {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(error = %e, "mirror resync failed, invalidating");
                self.cache.invalidate();
                Err(e)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn check_id(id: i64) -> Result<()> {
    if id < 1 {
        return Err(MageNoteError::InvalidId(id));
    }
    Ok(())
}
