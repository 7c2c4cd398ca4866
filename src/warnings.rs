//! Backup reminder warnings.
//!
//! Local storage can be pruned or wiped by the host, so users are nudged to
//! export a backup when they have notes and have not done so recently.

use chrono::{DateTime, Utc};

use crate::backup::backup_reminder_due;

/// A warning about the safety of the stored notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// There are notes but no backup was ever taken.
    NeverBackedUp,
    /// The last backup is older than the threshold.
    BackupOverdue { days: i64, threshold: i64 },
}

/// Check whether a backup reminder is due.
///
/// # Arguments
/// * `note_count` - Number of notes currently stored
/// * `last_backup` - When the last export happened, if ever
/// * `now` - Current time
/// * `threshold_days` - Whole days allowed between backups
pub fn check_backup(
    note_count: usize,
    last_backup: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    threshold_days: i64,
) -> Option<Warning> {
    if !backup_reminder_due(note_count, last_backup, now, threshold_days) {
        return None;
    }
    Some(match last_backup {
        None => Warning::NeverBackedUp,
        Some(last) => Warning::BackupOverdue {
            days: (now - last).num_days(),
            threshold: threshold_days,
        },
    })
}

/// Format a warning for display.
pub fn format_warning(warning: &Warning) -> String {
    match warning {
        Warning::NeverBackedUp => {
            "You haven't backed up lately. Please consider backing up soon!".to_string()
        }
        Warning::BackupOverdue { days, threshold } => format!(
            "You haven't backed up lately ({} days, recommended every {}). Please consider backing up soon!",
            days, threshold
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_no_warning_without_notes() {
        assert_eq!(check_backup(0, None, Utc::now(), 5), None);
    }

    #[test]
    fn test_never_backed_up() {
        assert_eq!(check_backup(2, None, Utc::now(), 5), Some(Warning::NeverBackedUp));
    }

    #[test]
    fn test_recent_backup_is_fine() {
        let now = Utc::now();
        assert_eq!(check_backup(2, Some(now - Duration::days(2)), now, 5), None);
    }

    #[test]
    fn test_overdue_backup() {
        let now = Utc::now();
        match check_backup(2, Some(now - Duration::days(9)), now, 5) {
            Some(Warning::BackupOverdue { days, threshold }) => {
                assert_eq!(days, 9);
                assert_eq!(threshold, 5);
            }
            other => panic!("Expected BackupOverdue warning, got {:?}", other),
        }
    }

    #[test]
    fn test_format_overdue() {
        let msg = format_warning(&Warning::BackupOverdue {
            days: 9,
            threshold: 5,
        });
        assert!(msg.contains("9 days"));
        assert!(msg.contains("backing up soon"));
    }
}
