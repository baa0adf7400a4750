use serde::{Deserialize, Serialize};

/// Visit history for one distracting host. Timestamps are epoch milliseconds,
/// oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SiteHistory {
    #[serde(default)]
    pub visit_timestamps: Vec<i64>,
}

impl SiteHistory {
    pub fn visits_since(&self, since_ms: i64) -> usize {
        self.visit_timestamps
            .iter()
            .filter(|ts| **ts > since_ms)
            .count()
    }

    pub fn last_visit(&self) -> Option<i64> {
        self.visit_timestamps.last().copied()
    }
}
