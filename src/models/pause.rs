use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PauseAction {
    Initiated,
    Completed,
    Skipped,
}

impl PauseAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PauseAction::Initiated => "initiated",
            PauseAction::Completed => "completed",
            PauseAction::Skipped => "skipped",
        }
    }
}

/// One entry of the per-day pause log. `timestamp` is epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PauseLogEntry {
    pub timestamp: i64,
    pub action: PauseAction,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl PauseLogEntry {
    pub fn initiated(timestamp: i64, domain: &str, duration: u64) -> Self {
        Self {
            timestamp,
            action: PauseAction::Initiated,
            domain: domain.to_string(),
            reason: None,
            duration: Some(duration),
        }
    }

    pub fn completed(timestamp: i64, domain: &str) -> Self {
        Self {
            timestamp,
            action: PauseAction::Completed,
            domain: domain.to_string(),
            reason: None,
            duration: None,
        }
    }

    pub fn skipped(timestamp: i64, domain: &str, reason: &str) -> Self {
        Self {
            timestamp,
            action: PauseAction::Skipped,
            domain: domain.to_string(),
            reason: Some(reason.to_string()),
            duration: None,
        }
    }
}
