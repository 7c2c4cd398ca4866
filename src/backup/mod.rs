//! Backup export and import.
//!
//! A backup is a pretty-printed JSON array of `{id, date, note}` objects.
//! Import parses and validates the whole document before anything is handed
//! to storage, so a bad record aborts the import with nothing written.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::ambient::AmbientStore;
use crate::entity::{format_timestamp, truncate_millis, Note};
use crate::error::{MageNoteError, Result};

const FILE_PREFIX: &str = "MageNote-";

/// One note as it appears in a backup document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: i64,
    pub date: String,
    pub note: String,
}

impl From<&Note> for BackupRecord {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id,
            date: format_timestamp(&note.timestamp),
            note: note.body.clone(),
        }
    }
}

/// A finished export: where it should be saved and what goes in it.
#[derive(Debug, Clone)]
pub struct Export {
    pub file_name: String,
    pub contents: String,
}

/// Render the collection as a backup document.
pub fn serialize(notes: &[Note]) -> Result<String> {
    let records: Vec<BackupRecord> = notes.iter().map(BackupRecord::from).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Parse a backup document into notes.
///
/// Fails with `ImportFormat` when the document is not a JSON array, or when
/// any record lacks a positive integer `id`, a string `note`, or a `date`
/// that can be read as a point in time.
pub fn deserialize(document: &str) -> Result<Vec<Note>> {
    let value: Value = serde_json::from_str(document)
        .map_err(|e| MageNoteError::ImportFormat(format!("not valid JSON: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(MageNoteError::ImportFormat(format!(
                "expected a list of notes, found {}",
                json_kind(&other)
            )))
        }
    };

    let notes = items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_record(index, item))
        .collect::<Result<Vec<_>>>()?;

    debug!(count = notes.len(), "parsed backup document");
    Ok(notes)
}

/// Serialize the collection and remember when the backup was taken.
pub fn export_collection(notes: &[Note], ambient: &mut AmbientStore, now: DateTime<Utc>) -> Result<Export> {
    let contents = serialize(notes)?;
    ambient.set_last_backup(now)?;
    info!(count = notes.len(), "exported notes");
    Ok(Export {
        file_name: backup_file_name(now),
        contents,
    })
}

/// `MageNote-<timestamp>.json` with every character outside `[A-Za-z0-9-]`
/// in the timestamp replaced by `_`.
pub fn backup_file_name(now: DateTime<Utc>) -> String {
    let stamp: String = format_timestamp(&now)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{}{}.json", FILE_PREFIX, stamp)
}

/// Whether to nag about backups: only when there is something to lose and
/// the last backup is unknown or more than `max_days` whole days old.
pub fn backup_reminder_due(
    note_count: usize,
    last_backup: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    max_days: i64,
) -> bool {
    if note_count == 0 {
        return false;
    }
    match last_backup {
        None => true,
        Some(last) => (now - last).num_days() > max_days,
    }
}

fn parse_record(index: usize, item: &Value) -> Result<Note> {
    let fail = |reason: String| MageNoteError::ImportFormat(format!("record {}: {}", index, reason));

    let fields = item
        .as_object()
        .ok_or_else(|| fail(format!("expected an object, found {}", json_kind(item))))?;

    let id = fields
        .get("id")
        .and_then(Value::as_i64)
        .filter(|id| *id > 0)
        .ok_or_else(|| fail("id must be a positive integer".to_string()))?;

    let body = fields
        .get("note")
        .and_then(Value::as_str)
        .ok_or_else(|| fail("note text is missing".to_string()))?;

    let raw_date = fields.get("date").unwrap_or(&Value::Null);
    let timestamp = parse_date(raw_date)
        .ok_or_else(|| fail(format!("unparseable date {}", raw_date)))?;

    Ok(Note::with_timestamp(id, timestamp, body.to_string()))
}

/// Read an "ISO-ish" date: RFC 3339, naive date-times and bare dates (taken
/// as UTC), or a number of epoch milliseconds.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
        Value::String(s) => parse_date_str(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    };
    parsed.map(truncate_millis)
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
