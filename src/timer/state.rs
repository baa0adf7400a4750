use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::{Duration, Instant};

/// Longest focus session accepted: one week.
pub const MAX_FOCUS_SECS: u64 = 7 * 24 * 60 * 60;

/// The single process-wide focus session. `ends_at` is the only field the
/// countdown depends on; everyone derives remaining time from it.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSession {
    #[serde(skip)]
    pub ends_at: Option<Instant>,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_secs: u64,
}

impl FocusSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leaves the session untouched if the end time can't be represented.
    pub fn begin(&mut self, duration_secs: u64, now: Instant) -> Result<()> {
        let ends_at = now
            .checked_add(Duration::from_secs(duration_secs))
            .ok_or_else(|| anyhow!("focus duration {duration_secs}s is out of range"))?;
        *self = Self {
            ends_at: Some(ends_at),
            started_at: Some(Utc::now()),
            duration_secs,
        };
        Ok(())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_active(&self) -> bool {
        self.ends_at.is_some()
    }

    /// Whole seconds left, rounded down, never negative. Zero when idle.
    pub fn remaining_secs(&self, now: Instant) -> u64 {
        self.ends_at
            .map(|end| end.saturating_duration_since(now).as_secs())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_rounds_down_and_saturates() {
        let now = Instant::now();
        let mut session = FocusSession::new();
        assert_eq!(session.remaining_secs(now), 0);
        assert!(!session.is_active());

        session.begin(90, now).unwrap();
        assert!(session.is_active());
        assert_eq!(session.remaining_secs(now), 90);
        assert_eq!(session.remaining_secs(now + Duration::from_millis(500)), 89);
        assert_eq!(session.remaining_secs(now + Duration::from_secs(90)), 0);
        assert_eq!(session.remaining_secs(now + Duration::from_secs(600)), 0);

        session.clear();
        assert!(!session.is_active());
        assert_eq!(session.duration_secs, 0);
    }

    #[test]
    fn unrepresentable_end_is_refused() {
        let now = Instant::now();
        let mut session = FocusSession::new();
        assert!(session.begin(u64::MAX, now).is_err());
        assert!(!session.is_active());
    }
}
