// src/entity/note.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::now_millis;

/// A single stored note. `id` is the primary key of the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub body: String,
}

impl Note {
    /// Create a note stamped with the current time.
    pub fn new(id: i64, body: String) -> Self {
        Self {
            id,
            timestamp: now_millis(),
            body,
        }
    }

    pub fn with_timestamp(id: i64, timestamp: DateTime<Utc>, body: String) -> Self {
        Self {
            id,
            timestamp,
            body,
        }
    }

    /// Display header used by list views, e.g. `#3: Tue Jan 02 2024 14:05:09`.
    pub fn header(&self) -> String {
        format!(
            "#{}: {}",
            self.id,
            self.timestamp
                .with_timezone(&chrono::Local)
                .format("%a %b %d %Y %H:%M:%S")
        )
    }
}

/// What the editor hands over on save: no id means "create".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDraft {
    pub id: Option<i64>,
    pub body: String,
}

impl NoteDraft {
    pub fn create(body: impl Into<String>) -> Self {
        Self {
            id: None,
            body: body.into(),
        }
    }

    pub fn edit(id: i64, body: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            body: body.into(),
        }
    }
}
