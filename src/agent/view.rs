use serde::Serialize;

use crate::{
    breathing::{BreathingMachine, BreathingPhase, DecisionKind, PauseState},
    models::SiteHistory,
};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

pub const BREATHE_MESSAGE: &str = "It's time to take a deep breath.";
pub const PAUSED_MESSAGE: &str = "Paused";
pub const EVASION_REMINDER: &str =
    "Stay with the pause for a moment. The page will be here when you're done.";

/// Stats shown once the pause completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitStats {
    /// Visits in the last 24 hours, counting this one.
    pub visits_last_24h: usize,
    pub last_visit: String,
}

impl VisitStats {
    /// `previous` is the history before this visit was recorded.
    pub fn from_history(previous: &SiteHistory, now_ms: i64) -> Self {
        Self {
            visits_last_24h: previous.visits_since(now_ms - DAY_MS) + 1,
            last_visit: previous
                .last_visit()
                .map(|ts| format_time_ago(now_ms - ts))
                .unwrap_or_else(Self::first_visit_label),
        }
    }

    pub fn first_visit() -> Self {
        Self {
            visits_last_24h: 1,
            last_visit: Self::first_visit_label(),
        }
    }

    fn first_visit_label() -> String {
        "this is your first visit".to_string()
    }
}

pub fn format_time_ago(elapsed_ms: i64) -> String {
    let seconds = elapsed_ms.max(0) / 1000;
    if seconds < 60 {
        return "just now".to_string();
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes} {} ago", plural(minutes, "minute"));
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours} {} ago", plural(hours, "hour"));
    }

    let days = hours / 24;
    format!("{days} {} ago", plural(days, "day"))
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        unit.to_string()
    } else {
        format!("{unit}s")
    }
}

/// Everything the overlay needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayView {
    pub site: String,
    pub state: PauseState,
    pub message: String,
    pub reminder: Option<String>,
    /// Only present once the pause is complete.
    pub stats: Option<VisitStats>,
    #[serde(skip)]
    pub decisions: Vec<DecisionKind>,
}

impl OverlayView {
    pub fn new(site: &str, machine: &BreathingMachine, stats: &VisitStats) -> Self {
        let state = machine.state();
        let complete = state.phase == BreathingPhase::Complete;

        Self {
            site: site.to_string(),
            message: main_message(&state).to_string(),
            reminder: state
                .evasion_flagged
                .then(|| EVASION_REMINDER.to_string()),
            stats: complete.then(|| stats.clone()),
            decisions: machine.available_decisions().to_vec(),
            state,
        }
    }
}

fn main_message(state: &PauseState) -> &'static str {
    if state.is_paused {
        return PAUSED_MESSAGE;
    }
    match state.phase {
        BreathingPhase::Ready | BreathingPhase::Inhale => BREATHE_MESSAGE,
        BreathingPhase::Hold => "Hold it gently.",
        BreathingPhase::Exhale => "Now breathe out slowly.",
        BreathingPhase::Rest => "Rest.",
        BreathingPhase::Complete => "",
    }
}
