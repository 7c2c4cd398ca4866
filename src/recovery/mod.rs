//! Recovery from unusable stores and the confirm-before-destroy flow.

use tracing::{error, warn};

use crate::entity::Note;
use crate::error::MageNoteError;
use crate::storage::NoteStore;

pub const CORRUPT_STORE_NOTICE: &str = "Your notes are corrupted. If this is your first time using MageNote, \
initialize the database, otherwise import your backup.";

/// How a failed load should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The database exists but the collection is missing: offer a reset.
    CorruptStore,
    /// Anything else: report it and leave it alone.
    Opaque,
}

pub fn classify(err: &MageNoteError) -> FailureClass {
    match err {
        MageNoteError::CorruptStore(_) => FailureClass::CorruptStore,
        _ => FailureClass::Opaque,
    }
}

/// Something the user can do about a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Delete the database and load a fresh one.
    InitializeDatabase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub action: Option<RecoveryAction>,
}

impl Notice {
    pub fn for_error(err: &MageNoteError) -> Self {
        match classify(err) {
            FailureClass::CorruptStore => Self {
                message: CORRUPT_STORE_NOTICE.to_string(),
                action: Some(RecoveryAction::InitializeDatabase),
            },
            FailureClass::Opaque => Self {
                message: err.to_string(),
                action: None,
            },
        }
    }
}

/// Result of a guarded load.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Vec<Note>),
    Failed {
        class: FailureClass,
        notice: Notice,
        error: MageNoteError,
    },
}

/// Wraps every full read of the collection and sorts failures into the
/// recoverable and the opaque.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecoveryPolicy;

impl RecoveryPolicy {
    pub fn load(&self, store: &mut NoteStore) -> LoadOutcome {
        match store.get_all() {
            Ok(notes) => LoadOutcome::Loaded(notes),
            Err(err) => {
                let class = classify(&err);
                match class {
                    FailureClass::CorruptStore => warn!(error = %err, "note store is corrupt"),
                    FailureClass::Opaque => error!(error = %err, "loading notes failed"),
                }
                LoadOutcome::Failed {
                    class,
                    notice: Notice::for_error(&err),
                    error: err,
                }
            }
        }
    }
}

/// What a destructive action would remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    Note(i64),
    Database,
}

/// Two-step confirmation for destructive actions.
///
/// `Idle -> PendingConfirm -> Completed` on confirm, `PendingConfirm -> Idle`
/// on cancel. A new request from any state starts over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteFlow {
    #[default]
    Idle,
    PendingConfirm(DeleteTarget),
    Completed(DeleteTarget),
}

impl DeleteFlow {
    pub fn request(&mut self, target: DeleteTarget) {
        *self = DeleteFlow::PendingConfirm(target);
    }

    /// Confirm the pending action, returning what to delete. Confirming
    /// with nothing pending does nothing.
    pub fn confirm(&mut self) -> Option<DeleteTarget> {
        match *self {
            DeleteFlow::PendingConfirm(target) => {
                *self = DeleteFlow::Completed(target);
                Some(target)
            }
            _ => None,
        }
    }

    /// Back out of a pending action. Returns false when nothing was pending.
    pub fn cancel(&mut self) -> bool {
        match self {
            DeleteFlow::PendingConfirm(_) => {
                *self = DeleteFlow::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn pending(&self) -> Option<DeleteTarget> {
        match self {
            DeleteFlow::PendingConfirm(target) => Some(*target),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SchemaMigrator;
    use tempfile::TempDir;

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(&MageNoteError::CorruptStore("gone".into())),
            FailureClass::CorruptStore
        );
        assert_eq!(
            classify(&MageNoteError::Transaction {
                code: 8,
                message: "readonly".into()
            }),
            FailureClass::Opaque
        );
        assert_eq!(
            classify(&MageNoteError::StoreOpen("x".into())),
            FailureClass::Opaque
        );
    }

    #[test]
    fn test_corrupt_notice_offers_initialize() {
        let notice = Notice::for_error(&MageNoteError::CorruptStore("gone".into()));
        assert_eq!(notice.action, Some(RecoveryAction::InitializeDatabase));
        assert!(notice.message.contains("initialize"));
    }

    #[test]
    fn test_opaque_notice_is_error_text() {
        let err = MageNoteError::Transaction {
            code: 8,
            message: "readonly".into(),
        };
        let notice = Notice::for_error(&err);
        assert_eq!(notice.action, None);
        assert_eq!(notice.message, err.to_string());
    }

    #[test]
    fn test_load_detects_missing_collection() {
        let tmp = TempDir::new().unwrap();
        let migrator = SchemaMigrator::new(tmp.path());
        let mut store = NoteStore::open(&migrator, "MageNote", 1).unwrap();
        store.connection().execute_batch("DROP TABLE notes;").unwrap();

        match RecoveryPolicy.load(&mut store) {
            LoadOutcome::Failed { class, notice, .. } => {
                assert_eq!(class, FailureClass::CorruptStore);
                assert_eq!(notice.action, Some(RecoveryAction::InitializeDatabase));
            }
            LoadOutcome::Loaded(_) => panic!("Expected corrupt store"),
        }
    }

    #[test]
    fn test_load_success() {
        let tmp = TempDir::new().unwrap();
        let migrator = SchemaMigrator::new(tmp.path());
        let mut store = NoteStore::open(&migrator, "MageNote", 1).unwrap();

        assert!(matches!(RecoveryPolicy.load(&mut store), LoadOutcome::Loaded(notes) if notes.is_empty()));
        assert!(store.cache().is_loaded());
    }

    #[test]
    fn test_flow_confirm() {
        let mut flow = DeleteFlow::default();
        assert_eq!(flow, DeleteFlow::Idle);

        flow.request(DeleteTarget::Database);
        assert_eq!(flow.pending(), Some(DeleteTarget::Database));

        assert_eq!(flow.confirm(), Some(DeleteTarget::Database));
        assert_eq!(flow, DeleteFlow::Completed(DeleteTarget::Database));
        assert_eq!(flow.confirm(), None);
    }

    #[test]
    fn test_flow_cancel() {
        let mut flow = DeleteFlow::default();
        flow.request(DeleteTarget::Note(3));
        assert!(flow.cancel());
        assert_eq!(flow, DeleteFlow::Idle);
        assert!(!flow.cancel());
        assert_eq!(flow.confirm(), None);
    }

    #[test]
    fn test_flow_new_request_replaces_pending() {
        let mut flow = DeleteFlow::default();
        flow.request(DeleteTarget::Note(1));
        flow.request(DeleteTarget::Note(2));
        assert_eq!(flow.confirm(), Some(DeleteTarget::Note(2)));
    }
}
