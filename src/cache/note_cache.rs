use std::collections::BTreeMap;

use crate::entity::Note;

/// In-memory mirror of the note collection.
///
/// The mirror is replaced wholesale on every refresh and is only trusted
/// right after one: there is no incremental patching.
#[derive(Debug, Default, Clone)]
pub struct NoteCache {
    notes: BTreeMap<i64, Note>,
    loaded: bool,
}

impl NoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the mirror with a freshly read collection.
    pub fn replace(&mut self, notes: Vec<Note>) {
        self.notes = notes.into_iter().map(|n| (n.id, n)).collect();
        self.loaded = true;
    }

    /// Drop the contents and mark the mirror untrusted until the next refresh.
    pub fn invalidate(&mut self) {
        self.notes.clear();
        self.loaded = false;
    }

    /// True once at least one refresh has completed.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn find(&self, id: i64) -> Option<&Note> {
        self.notes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn max_id(&self) -> Option<i64> {
        self.notes.keys().next_back().copied()
    }

    /// All notes, ascending by id.
    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }

    /// Display order: newest first. Ties fall back to the higher id first.
    pub fn sorted_descending_by_timestamp(&self) -> Vec<Note> {
        let mut sorted: Vec<Note> = self.notes.values().cloned().collect();
        sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        sorted
    }
}
