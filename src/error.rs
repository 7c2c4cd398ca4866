use thiserror::Error;

#[derive(Error, Debug)]
pub enum MageNoteError {
    #[error("There was an error initializing the database: {0}")]
    StoreOpen(String),

    #[error("Your notes are corrupted: {0}")]
    CorruptStore(String),

    #[error("Transaction failed ({code}): {message}")]
    Transaction { code: i32, message: String },

    #[error("Import failed: {0}")]
    ImportFormat(String),

    #[error("Note ids must be positive integers, got {0}")]
    InvalidId(i64),

    #[error("Note not found: {0}")]
    NoteNotFound(i64),

    #[error("Notes have not been loaded yet")]
    NotLoaded,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MageNoteError>;

/// Failure kinds reported to the rendering side through
/// `Renderer::on_fatal_store_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    StoreOpen,
    CorruptStore,
    Transaction,
    ImportFormat,
    Other,
}

impl std::fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreErrorKind::StoreOpen => write!(f, "store_open"),
            StoreErrorKind::CorruptStore => write!(f, "corrupt_store"),
            StoreErrorKind::Transaction => write!(f, "transaction"),
            StoreErrorKind::ImportFormat => write!(f, "import_format"),
            StoreErrorKind::Other => write!(f, "other"),
        }
    }
}

impl MageNoteError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            MageNoteError::StoreOpen(_) => StoreErrorKind::StoreOpen,
            MageNoteError::CorruptStore(_) => StoreErrorKind::CorruptStore,
            MageNoteError::Transaction { .. } => StoreErrorKind::Transaction,
            MageNoteError::ImportFormat(_) => StoreErrorKind::ImportFormat,
            _ => StoreErrorKind::Other,
        }
    }
}

// Anything the engine reports outside of open and the missing-collection
// check is a failed transaction carrying the engine's own code.
impl From<rusqlite::Error> for MageNoteError {
    fn from(e: rusqlite::Error) -> Self {
        let code = match &e {
            rusqlite::Error::SqliteFailure(err, _) => err.extended_code,
            _ => -1,
        };
        MageNoteError::Transaction {
            code,
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_projection() {
        assert_eq!(
            MageNoteError::CorruptStore("x".into()).kind(),
            StoreErrorKind::CorruptStore
        );
        assert_eq!(
            MageNoteError::ImportFormat("x".into()).kind(),
            StoreErrorKind::ImportFormat
        );
        assert_eq!(MageNoteError::NotLoaded.kind(), StoreErrorKind::Other);
    }

    #[test]
    fn test_sqlite_error_keeps_engine_code() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_READONLY),
            Some("attempt to write a readonly database".to_string()),
        );
        match MageNoteError::from(err) {
            MageNoteError::Transaction { code, message } => {
                assert_eq!(code, rusqlite::ffi::SQLITE_READONLY);
                assert!(message.contains("readonly"));
            }
            other => panic!("Expected Transaction, got {:?}", other),
        }
    }
}
