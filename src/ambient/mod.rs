//! Small persisted key-value space kept outside the note database.
//!
//! It holds the last backup time, the selected language and the draft being
//! edited. It lives in its own JSON file so deleting the database leaves it
//! alone.

mod draft;
mod language;

pub use draft::{append_transcript, DraftAutosave};
pub use language::Language;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::entity::format_timestamp;
use crate::error::Result;
use crate::storage::parse_stored_date;

const AMBIENT_FILE: &str = "ambient.json";

pub const KEY_BACKUP_DATE: &str = "MageNoteBackupDate";
pub const KEY_LANGUAGE: &str = "MageNoteLanguage";
pub const KEY_DRAFT: &str = "MageNoteDraft";

#[derive(Debug)]
pub struct AmbientStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl AmbientStore {
    /// Load the ambient file from `dir`, starting empty if it is missing or
    /// unreadable.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(AMBIENT_FILE);

        let values = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            match serde_json::from_str(&raw) {
                Ok(values) => values,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring unreadable ambient settings");
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self { path, values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.persist()
    }

    pub fn remove(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    pub fn last_backup(&self) -> Option<DateTime<Utc>> {
        self.get(KEY_BACKUP_DATE).and_then(parse_stored_date)
    }

    pub fn set_last_backup(&mut self, when: DateTime<Utc>) -> Result<()> {
        self.set(KEY_BACKUP_DATE, &format_timestamp(&when))
    }

    /// Selected language, English when unset or unrecognised.
    pub fn language(&self) -> Language {
        self.get(KEY_LANGUAGE)
            .and_then(|name| name.parse().ok())
            .unwrap_or_default()
    }

    pub fn set_language(&mut self, language: Language) -> Result<()> {
        self.set(KEY_LANGUAGE, language.name())
    }

    pub fn draft(&self) -> Option<&str> {
        self.get(KEY_DRAFT)
    }

    pub fn set_draft(&mut self, text: &str) -> Result<()> {
        self.set(KEY_DRAFT, text)
    }

    pub fn clear_draft(&mut self) -> Result<()> {
        self.remove(KEY_DRAFT)
    }

    fn persist(&self) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&self.values)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(keys = self.values.len(), "saved ambient settings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_values_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let mut ambient = AmbientStore::open(tmp.path()).unwrap();
            ambient.set_draft("half a thought").unwrap();
            ambient.set("custom", "value").unwrap();
        }

        let ambient = AmbientStore::open(tmp.path()).unwrap();
        assert_eq!(ambient.draft(), Some("half a thought"));
        assert_eq!(ambient.get("custom"), Some("value"));
    }

    #[test]
    fn test_last_backup_round_trip() {
        let tmp = TempDir::new().unwrap();
        let mut ambient = AmbientStore::open(tmp.path()).unwrap();
        assert!(ambient.last_backup().is_none());

        let when = Utc.with_ymd_and_hms(2024, 4, 1, 8, 30, 0).unwrap();
        ambient.set_last_backup(when).unwrap();
        assert_eq!(ambient.get(KEY_BACKUP_DATE), Some("2024-04-01T08:30:00.000Z"));
        assert_eq!(ambient.last_backup(), Some(when));
    }

    #[test]
    fn test_language_defaults_to_english() {
        let tmp = TempDir::new().unwrap();
        let mut ambient = AmbientStore::open(tmp.path()).unwrap();
        assert_eq!(ambient.language(), Language::English);

        ambient.set(KEY_LANGUAGE, "klingon").unwrap();
        assert_eq!(ambient.language(), Language::English);

        ambient.set_language(Language::English).unwrap();
        assert_eq!(ambient.get(KEY_LANGUAGE), Some("english"));
    }

    #[test]
    fn test_clear_draft() {
        let tmp = TempDir::new().unwrap();
        let mut ambient = AmbientStore::open(tmp.path()).unwrap();
        ambient.set_draft("x").unwrap();
        ambient.clear_draft().unwrap();
        assert!(ambient.draft().is_none());

        // Clearing twice is fine.
        ambient.clear_draft().unwrap();
    }

    #[test]
    fn test_unreadable_file_starts_empty() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(AMBIENT_FILE), "{ not json").unwrap();

        let ambient = AmbientStore::open(tmp.path()).unwrap();
        assert!(ambient.draft().is_none());
    }
}
