pub mod ambient;
pub mod backup;
pub mod cache;
pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod recovery;
pub mod service;
pub mod storage;
pub mod warnings;

pub use cache::NoteCache;
pub use config::Config;
pub use entity::{Note, NoteDraft};
pub use error::{MageNoteError, Result, StoreErrorKind};
pub use service::{NoteService, Renderer};
pub use storage::{NoteStore, SchemaMigrator};
