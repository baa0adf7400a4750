use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Local};

use crate::{
    db::{read_value, write_value, Database},
    models::PauseLogEntry,
};

pub const PAUSE_LOGS_KEY: &str = "pauseLogs";

/// Pause events grouped by calendar day.
pub type PauseLogs = BTreeMap<String, Vec<PauseLogEntry>>;

/// Day bucket for a log entry, e.g. `Mon Oct 19 2026`.
pub fn day_key(at: DateTime<Local>) -> String {
    at.format("%a %b %d %Y").to_string()
}

impl Database {
    pub async fn pause_logs(&self) -> Result<PauseLogs> {
        Ok(self
            .get_value::<PauseLogs>(PAUSE_LOGS_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn pause_logs_for_day(&self, day: &str) -> Result<Vec<PauseLogEntry>> {
        let mut logs = self.pause_logs().await?;
        Ok(logs.remove(day).unwrap_or_default())
    }

    /// Read-merge-write of the day's log. Appends only; existing entries are
    /// never rewritten.
    pub async fn append_pause_event(&self, day: String, entry: PauseLogEntry) -> Result<()> {
        self.execute(move |conn| {
            let mut logs: PauseLogs = read_value(conn, PAUSE_LOGS_KEY)?.unwrap_or_default();
            logs.entry(day).or_default().push(entry);
            write_value(conn, PAUSE_LOGS_KEY, &logs)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PauseAction;
    use chrono::TimeZone;

    #[test]
    fn day_key_matches_date_string_format() {
        let at = Local.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap();
        assert_eq!(day_key(at), "Mon Oct 19 2026");
    }

    #[tokio::test]
    async fn events_append_under_their_day() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("logs.sqlite3")).unwrap();

        db.append_pause_event("Mon Oct 19 2026".into(), PauseLogEntry::initiated(1, "example.com", 7))
            .await
            .unwrap();
        db.append_pause_event("Mon Oct 19 2026".into(), PauseLogEntry::skipped(2, "example.com", "proceed"))
            .await
            .unwrap();
        db.append_pause_event("Tue Oct 20 2026".into(), PauseLogEntry::completed(3, "example.com"))
            .await
            .unwrap();

        let monday = db.pause_logs_for_day("Mon Oct 19 2026").await.unwrap();
        assert_eq!(monday.len(), 2);
        assert_eq!(monday[0].action, PauseAction::Initiated);
        assert_eq!(monday[0].duration, Some(7));
        assert_eq!(monday[1].reason.as_deref(), Some("proceed"));

        let all = db.pause_logs().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(db.pause_logs_for_day("Wed Oct 21 2026").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stored_shape_uses_wire_names() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("logs.sqlite3")).unwrap();
        db.append_pause_event("Mon Oct 19 2026".into(), PauseLogEntry::skipped(5, "example.com", "proceed"))
            .await
            .unwrap();

        let raw: serde_json::Value = db.get_value(PAUSE_LOGS_KEY).await.unwrap().unwrap();
        let entry = &raw["Mon Oct 19 2026"][0];
        assert_eq!(entry["action"], "skipped");
        assert_eq!(entry["reason"], "proceed");
        assert_eq!(entry["timestamp"], 5);
        assert!(entry.get("duration").is_none());
    }
}
