//! The persistence core as seen from a front end.
//!
//! A front end implements [`Renderer`] to receive refreshed collections and
//! notices, and drives [`NoteService`] through its `request_*` methods. All
//! access to the store goes through one async mutex, so mutations are applied
//! one at a time and each finishes with a refresh before the next starts.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::ambient::{AmbientStore, DraftAutosave, Language};
use crate::backup::{self, Export};
use crate::config::Config;
use crate::entity::{now_millis, Note, NoteDraft};
use crate::error::{MageNoteError, Result, StoreErrorKind};
use crate::recovery::{DeleteFlow, DeleteTarget, FailureClass, LoadOutcome, Notice, RecoveryPolicy};
use crate::storage::{NoteStore, SchemaMigrator};
use crate::warnings::{check_backup, format_warning};

pub const UPDATED_NOTICE: &str = "Your notes have been updated.";
pub const OPEN_FAILED_NOTICE: &str = "There was an error initializing the database.";
pub const RESET_CONFIRM_NOTICE: &str =
    "Are you sure you want to delete your database and all of the notes? This action cannot be undone.";

/// Callbacks from the core to whatever displays the notes.
pub trait Renderer: Send + Sync {
    /// The collection was re-read; `notes` is newest first.
    fn on_collection_refreshed(&self, notes: &[Note]);
    fn on_notice(&self, message: &str);
    fn on_fatal_store_error(&self, kind: StoreErrorKind, detail: &str);
}

struct SessionState {
    store: Option<NoteStore>,
    flow: DeleteFlow,
    failure: Option<MageNoteError>,
}

pub struct NoteService<R: Renderer> {
    config: Config,
    migrator: SchemaMigrator,
    policy: RecoveryPolicy,
    state: Mutex<SessionState>,
    ambient: Arc<Mutex<AmbientStore>>,
    autosave: DraftAutosave,
    renderer: Arc<R>,
}

impl<R: Renderer> NoteService<R> {
    /// Open the configured database and load the collection.
    ///
    /// Open failures and corrupt stores are reported to the renderer, not
    /// returned: the service still comes up so the database can be reset.
    /// Only a failure to read the ambient settings is returned.
    pub async fn start(config: Config, renderer: Arc<R>) -> Result<Self> {
        let migrator = SchemaMigrator::new(&config.data_dir);
        let ambient = Arc::new(Mutex::new(AmbientStore::open(&config.data_dir)?));
        let autosave = DraftAutosave::new(Arc::clone(&ambient), config.draft_debounce());

        let service = Self {
            config,
            migrator,
            policy: RecoveryPolicy,
            state: Mutex::new(SessionState {
                store: None,
                flow: DeleteFlow::Idle,
                failure: None,
            }),
            ambient,
            autosave,
            renderer,
        };

        {
            let mut state = service.state.lock().await;
            service.open_and_load(&mut state).await;
        }
        Ok(service)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fails with the error that kept the store from loading, if any.
    pub async fn ensure_ready(&self) -> Result<()> {
        let state = self.state.lock().await;
        match (&state.failure, &state.store) {
            (Some(failure), _) => Err(replay_failure(failure)),
            (None, Some(store)) if store.cache().is_loaded() => Ok(()),
            (None, _) => Err(MageNoteError::NotLoaded),
        }
    }

    /// The mirror, newest first.
    pub async fn notes(&self) -> Result<Vec<Note>> {
        let state = self.state.lock().await;
        Ok(loaded_store(&state)?.mirror()?.sorted_descending_by_timestamp())
    }

    /// Resolve an id to its record. Unknown ids yield `None`.
    pub async fn find(&self, id: i64) -> Result<Option<Note>> {
        let state = self.state.lock().await;
        Ok(loaded_store(&state)?.mirror()?.find(id).cloned())
    }

    /// Create (no id) or overwrite (with id) a note.
    pub async fn request_save(&self, draft: NoteDraft) -> Result<Note> {
        let mut state = self.state.lock().await;
        self.mutate(&mut state, move |store| store.save(draft)).await
    }

    /// First step of deleting a note: remember it and ask for confirmation.
    pub async fn request_delete(&self, id: i64) -> Result<()> {
        let mut state = self.state.lock().await;
        let note = loaded_store(&state)?
            .mirror()?
            .find(id)
            .cloned()
            .ok_or(MageNoteError::NoteNotFound(id))?;

        state.flow.request(DeleteTarget::Note(id));
        self.renderer.on_notice(&format!(
            "Delete note {}? This action cannot be undone.",
            note.header()
        ));
        Ok(())
    }

    /// First step of deleting the whole database.
    pub async fn request_database_reset(&self) {
        let mut state = self.state.lock().await;
        state.flow.request(DeleteTarget::Database);
        self.renderer.on_notice(RESET_CONFIRM_NOTICE);
    }

    /// Carry out whatever destructive action is pending. Returns what was
    /// removed, or `None` when nothing was pending.
    pub async fn confirm(&self) -> Result<Option<DeleteTarget>> {
        let mut state = self.state.lock().await;
        let target = match state.flow.confirm() {
            Some(target) => target,
            None => return Ok(None),
        };

        match target {
            DeleteTarget::Note(id) => {
                self.mutate(&mut state, move |store| store.delete(id)).await?;
            }
            DeleteTarget::Database => {
                self.reset(&mut state).await?;
            }
        }
        Ok(Some(target))
    }

    /// Back out of a pending destructive action.
    pub async fn cancel(&self) -> bool {
        self.state.lock().await.flow.cancel()
    }

    pub async fn pending(&self) -> Option<DeleteTarget> {
        self.state.lock().await.flow.pending()
    }

    /// The "initialize" action offered with the corrupt-store notice. The
    /// notice itself is the first step, so this deletes straight away.
    pub async fn initialize_database(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.reset(&mut state).await
    }

    /// Replace the collection with the contents of a backup document.
    ///
    /// The whole document is validated first; a bad record aborts with
    /// nothing written. Records are upserted by id and never merged.
    pub async fn request_import(&self, document: &str) -> Result<usize> {
        let notes = match backup::deserialize(document) {
            Ok(notes) => notes,
            Err(e) => {
                self.report(&e);
                return Err(e);
            }
        };

        let mut state = self.state.lock().await;
        let count = notes.len();
        self.mutate(&mut state, move |store| {
            store.replace_mirror(notes.clone());
            store.put_all(&notes)
        })
        .await?;
        info!(count, "imported notes");
        Ok(count)
    }

    /// Serialize the mirror and record the backup time.
    pub async fn request_export(&self) -> Result<Export> {
        let state = self.state.lock().await;
        let notes = loaded_store(&state)?.mirror()?.sorted_descending_by_timestamp();

        let mut ambient = self.ambient.lock().await;
        backup::export_collection(&notes, &mut ambient, now_millis())
    }

    /// Reopen at a newer schema version, carrying the mirror across.
    pub async fn upgrade(&self, version: u32) -> Result<()> {
        let mut state = self.state.lock().await;
        let store = state.store.take().ok_or(MageNoteError::NotLoaded)?;

        match store.upgrade(&self.migrator, version) {
            Ok(store) => {
                self.publish(&store);
                state.store = Some(store);
                Ok(())
            }
            Err(e) => {
                self.report(&e);
                state.failure = Some(replay_failure(&e));
                Err(e)
            }
        }
    }

    // ========== Draft & dictation ==========

    /// Handle for debounced draft writes. Every handle shares one pending
    /// slot, so saving or discarding the draft cancels writes scheduled
    /// through any of them.
    pub fn draft_autosave(&self) -> DraftAutosave {
        self.autosave.clone()
    }

    pub async fn draft(&self) -> Option<String> {
        self.ambient.lock().await.draft().map(str::to_string)
    }

    /// Append a finished transcript to the draft and store it.
    pub async fn dictate(&self, transcript: &str) -> Result<String> {
        self.autosave.dictate(transcript).await
    }

    /// Save the draft as a new note and clear it. `None` when the draft is
    /// empty.
    pub async fn save_draft(&self) -> Result<Option<Note>> {
        let body = match self.draft().await {
            Some(body) if !body.trim().is_empty() => body,
            _ => return Ok(None),
        };
        let note = self.request_save(NoteDraft::create(body)).await?;
        self.autosave.discard().await?;
        Ok(Some(note))
    }

    pub async fn language(&self) -> Language {
        self.ambient.lock().await.language()
    }

    pub async fn set_language(&self, language: Language) -> Result<()> {
        self.ambient.lock().await.set_language(language)
    }

    // ========== Internals ==========

    async fn open_and_load(&self, state: &mut SessionState) {
        state.failure = None;
        let mut store = match NoteStore::open(
            &self.migrator,
            &self.config.database_name,
            self.config.schema_version,
        ) {
            Ok(store) => store,
            Err(e) => {
                error!(error = %e, "opening note database failed");
                self.renderer.on_notice(OPEN_FAILED_NOTICE);
                self.renderer.on_fatal_store_error(e.kind(), &e.to_string());
                state.failure = Some(e);
                state.store = None;
                return;
            }
        };

        match self.policy.load(&mut store) {
            LoadOutcome::Loaded(_) => {
                self.publish(&store);
                self.remind_backup(store.cache().len()).await;
            }
            LoadOutcome::Failed {
                class,
                notice,
                error,
            } => {
                self.renderer.on_notice(&notice.message);
                if class == FailureClass::CorruptStore {
                    self.renderer
                        .on_fatal_store_error(StoreErrorKind::CorruptStore, &error.to_string());
                }
                state.failure = Some(error);
            }
        }
        state.store = Some(store);
    }

    async fn reset(&self, state: &mut SessionState) -> Result<()> {
        // The handle has to be closed before the file goes away.
        drop(state.store.take());
        if let Err(e) = self.migrator.delete_database(&self.config.database_name) {
            self.report(&e);
            return Err(e);
        }
        warn!(database = %self.config.database_name, "database deleted, reloading");
        self.open_and_load(state).await;
        Ok(())
    }

    /// Run one mutation on the blocking pool. A failed mutation resyncs the
    /// mirror before the error is reported.
    async fn mutate<T, F>(&self, state: &mut SessionState, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut NoteStore) -> Result<T> + Send + 'static,
    {
        let mut store = match state.store.take() {
            Some(store) if store.cache().is_loaded() => store,
            other => {
                state.store = other;
                let e = MageNoteError::NotLoaded;
                self.report(&e);
                return Err(e);
            }
        };

        let joined = tokio::task::spawn_blocking(move || {
            let outcome = op(&mut store);
            if outcome.is_err() {
                // A resync failure is logged and invalidates the mirror.
                let _ = store.resync_mirror();
            }
            (store, outcome)
        })
        .await;

        let (store, outcome) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                let err = MageNoteError::Transaction {
                    code: -1,
                    message: format!("storage task failed: {}", e),
                };
                error!(error = %err, "note store lost");
                self.report(&err);
                return Err(err);
            }
        };

        let outcome = match outcome {
            Ok(value) => {
                self.publish(&store);
                self.renderer.on_notice(UPDATED_NOTICE);
                Ok(value)
            }
            Err(e) => {
                if store.cache().is_loaded() {
                    self.publish(&store);
                }
                self.report(&e);
                Err(e)
            }
        };
        state.store = Some(store);
        outcome
    }

    fn publish(&self, store: &NoteStore) {
        let sorted = store.cache().sorted_descending_by_timestamp();
        self.renderer.on_collection_refreshed(&sorted);
    }

    fn report(&self, err: &MageNoteError) {
        let notice = Notice::for_error(err);
        self.renderer.on_notice(&notice.message);
        if matches!(
            err.kind(),
            StoreErrorKind::CorruptStore | StoreErrorKind::StoreOpen
        ) {
            self.renderer.on_fatal_store_error(err.kind(), &err.to_string());
        }
    }

    async fn remind_backup(&self, note_count: usize) {
        let last_backup = self.ambient.lock().await.last_backup();
        if let Some(warning) = check_backup(
            note_count,
            last_backup,
            now_millis(),
            self.config.backup_reminder_days,
        ) {
            self.renderer.on_notice(&format_warning(&warning));
        }
    }
}

// The stored failure is kept for later `ensure_ready` calls, so it is
// rebuilt with its kind intact rather than moved out.
fn replay_failure(err: &MageNoteError) -> MageNoteError {
    match err {
        MageNoteError::StoreOpen(detail) => MageNoteError::StoreOpen(detail.clone()),
        MageNoteError::CorruptStore(detail) => MageNoteError::CorruptStore(detail.clone()),
        MageNoteError::Transaction { code, message } => MageNoteError::Transaction {
            code: *code,
            message: message.clone(),
        },
        MageNoteError::ImportFormat(detail) => MageNoteError::ImportFormat(detail.clone()),
        MageNoteError::InvalidId(id) => MageNoteError::InvalidId(*id),
        MageNoteError::NoteNotFound(id) => MageNoteError::NoteNotFound(*id),
        MageNoteError::NotLoaded => MageNoteError::NotLoaded,
        MageNoteError::Config(detail) => MageNoteError::Config(detail.clone()),
        other => MageNoteError::StoreOpen(other.to_string()),
    }
}

fn loaded_store(state: &SessionState) -> Result<&NoteStore> {
    state.store.as_ref().ok_or(MageNoteError::NotLoaded)
}
