use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::AmbientStore;
use crate::error::Result;

const PARAGRAPH_BREAK: &str = "\r\n\n";

/// Append a finished dictation transcript to the draft as a sentence.
///
/// The transcript is trimmed, its first letter capitalised and a full stop
/// added unless it already ends a sentence. Drafts longer than one character
/// get a paragraph break first.
pub fn append_transcript(draft: &str, transcript: &str) -> String {
    let trimmed = transcript.trim();
    let mut chars = trimmed.chars();
    let mut sentence: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => return draft.to_string(),
    };
    if !sentence.ends_with(['.', '!', '?']) {
        sentence.push('.');
    }

    let separator = if draft.chars().count() > 1 {
        PARAGRAPH_BREAK
    } else {
        ""
    };
    format!("{}{}{}", draft, separator, sentence)
}

/// Debounced draft writer: only the last update in a burst reaches disk,
/// once `delay` has passed without a newer one.
#[derive(Clone)]
pub struct DraftAutosave {
    ambient: Arc<Mutex<AmbientStore>>,
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl DraftAutosave {
    pub fn new(ambient: Arc<Mutex<AmbientStore>>, delay: Duration) -> Self {
        Self {
            ambient,
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Schedule `text` to be written, superseding any pending write.
    pub fn update(&self, text: String) -> JoinHandle<()> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let ambient = Arc::clone(&self.ambient);
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Checked under the lock: flush and discard bump the generation
            // while holding it.
            let mut ambient = ambient.lock().await;
            if generation.load(Ordering::SeqCst) != ticket {
                return;
            }
            match ambient.set_draft(&text) {
                Ok(()) => debug!(chars = text.chars().count(), "autosaved draft"),
                Err(e) => warn!(error = %e, "draft autosave failed"),
            }
        })
    }

    /// Write `text` now and drop whatever is pending.
    pub async fn flush(&self, text: &str) -> Result<()> {
        let mut ambient = self.ambient.lock().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        ambient.set_draft(text)
    }

    /// Append a finished transcript to the stored draft and write it now,
    /// dropping whatever is pending. Returns the new draft.
    pub async fn dictate(&self, transcript: &str) -> Result<String> {
        let mut ambient = self.ambient.lock().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        let updated = append_transcript(ambient.draft().unwrap_or_default(), transcript);
        ambient.set_draft(&updated)?;
        Ok(updated)
    }

    /// Forget the draft and anything pending, e.g. after it was saved as a note.
    pub async fn discard(&self) -> Result<()> {
        let mut ambient = self.ambient.lock().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        ambient.clear_draft()
    }
}
