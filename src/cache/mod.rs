mod note_cache;

pub use note_cache::NoteCache;
