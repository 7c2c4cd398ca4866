mod note;

pub use note::{Note, NoteDraft};

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Current time truncated to whole milliseconds, the precision the
/// collection stores.
pub fn now_millis() -> DateTime<Utc> {
    truncate_millis(Utc::now())
}

pub fn truncate_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts.timestamp_millis())
        .single()
        .unwrap_or(ts)
}

/// `YYYY-MM-DDTHH:MM:SS.sssZ`, the form used both on disk and in backups.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp_uses_millis_and_z() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-02T03:04:05.000Z");
    }

    #[test]
    fn test_truncate_millis_drops_sub_millisecond_part() {
        let ts = Utc.timestamp_nanos(1_700_000_000_123_456_789);
        let truncated = truncate_millis(ts);
        assert_eq!(truncated.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(truncated.timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn test_draft_constructors() {
        assert_eq!(NoteDraft::create("a").id, None);
        assert_eq!(NoteDraft::edit(4, "b").id, Some(4));
    }
}
