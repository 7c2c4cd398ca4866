use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MageNoteError, Result};
use crate::storage::{DEFAULT_DATABASE_NAME, SCHEMA_VERSION};

const CONFIG_FILE: &str = "config.json";

/// Runtime settings. Everything except `data_dir` can be overridden from
/// `<data_dir>/config.json`; missing keys keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Name of the note database inside `data_dir`.
    pub database_name: String,
    /// Schema version requested on open; raising it triggers a migration.
    pub schema_version: u32,
    /// Days without a backup before the reminder shows up.
    pub backup_reminder_days: i64,
    /// Quiet period before a draft edit is written out.
    pub draft_debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            schema_version: SCHEMA_VERSION,
            backup_reminder_days: 5,
            draft_debounce_ms: 250,
        }
    }
}

impl Config {
    /// `<platform data dir>/magenote`, falling back to `./magenote`.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("magenote")
    }

    /// Defaults rooted at `data_dir`.
    pub fn for_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load `config.json` from `data_dir` if there is one.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let mut config = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str::<Config>(&raw)
                .map_err(|e| MageNoteError::Config(format!("{}: {}", path.display(), e)))?
        } else {
            Config::default()
        };
        config.data_dir = data_dir.to_path_buf();
        config.validate()?;
        debug!(data_dir = %config.data_dir.display(), "loaded configuration");
        Ok(config)
    }

    pub fn draft_debounce(&self) -> Duration {
        Duration::from_millis(self.draft_debounce_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.schema_version == 0 {
            return Err(MageNoteError::Config(
                "schema_version must be at least 1".to_string(),
            ));
        }
        if self.database_name.trim().is_empty()
            || self.database_name.contains(['/', '\\'])
            || self.database_name.starts_with('.')
        {
            return Err(MageNoteError::Config(format!(
                "invalid database name '{}'",
                self.database_name
            )));
        }
        if self.backup_reminder_days < 0 {
            return Err(MageNoteError::Config(
                "backup_reminder_days cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}
