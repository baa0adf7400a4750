use serde::{Deserialize, Serialize};

use super::{EvasionShortcut, KeyCombo};

/// Unpaused seconds spent in `Ready` before the first breath.
pub const READY_DELAY_SECS: u64 = 1;
/// How long the reminder stays up after a trapped shortcut.
pub const EVASION_WINDOW_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BreathingPhase {
    Ready,
    Inhale,
    Hold,
    Exhale,
    Rest,
    Complete,
}

impl BreathingPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreathingPhase::Ready => "ready",
            BreathingPhase::Inhale => "inhale",
            BreathingPhase::Hold => "hold",
            BreathingPhase::Exhale => "exhale",
            BreathingPhase::Rest => "rest",
            BreathingPhase::Complete => "complete",
        }
    }
}

/// Seconds per breathing phase. Zero-length phases are skipped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BreathingPattern {
    pub inhale_secs: u64,
    pub hold_secs: u64,
    pub exhale_secs: u64,
    pub rest_secs: u64,
}

impl Default for BreathingPattern {
    /// A single long inhale held until the countdown ends.
    fn default() -> Self {
        Self {
            inhale_secs: 4,
            hold_secs: 0,
            exhale_secs: 0,
            rest_secs: 0,
        }
    }
}

impl BreathingPattern {
    pub fn box_breathing() -> Self {
        Self {
            inhale_secs: 4,
            hold_secs: 4,
            exhale_secs: 4,
            rest_secs: 4,
        }
    }

    fn cycle(&self) -> Vec<(BreathingPhase, u64)> {
        [
            (BreathingPhase::Inhale, self.inhale_secs),
            (BreathingPhase::Hold, self.hold_secs),
            (BreathingPhase::Exhale, self.exhale_secs),
            (BreathingPhase::Rest, self.rest_secs),
        ]
        .into_iter()
        .filter(|(_, secs)| *secs > 0)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseState {
    pub phase: BreathingPhase,
    pub remaining_seconds: u64,
    pub is_paused: bool,
    pub evasion_flagged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionKind {
    /// Keep waiting; the page is abandoned.
    Honor,
    /// Continue to the site anyway.
    Bypass,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PauseDecision {
    Honored,
    Bypassed { reason: String },
}

#[derive(Debug, Clone)]
pub struct BreathingMachine {
    cycle: Vec<(BreathingPhase, u64)>,
    cycle_index: usize,
    phase: BreathingPhase,
    phase_elapsed: u64,
    remaining_secs: u64,
    hidden: bool,
    blurred: bool,
    evasion_secs_left: u64,
    decided: bool,
}

impl BreathingMachine {
    pub fn new(duration_secs: u64, pattern: BreathingPattern) -> Self {
        let phase = if duration_secs == 0 {
            BreathingPhase::Complete
        } else {
            BreathingPhase::Ready
        };

        Self {
            cycle: pattern.cycle(),
            cycle_index: 0,
            phase,
            phase_elapsed: 0,
            remaining_secs: duration_secs,
            hidden: false,
            blurred: false,
            evasion_secs_left: 0,
            decided: false,
        }
    }

    pub fn state(&self) -> PauseState {
        PauseState {
            phase: self.phase,
            remaining_seconds: self.remaining_secs,
            is_paused: self.is_paused(),
            evasion_flagged: self.evasion_flagged(),
        }
    }

    pub fn phase(&self) -> BreathingPhase {
        self.phase
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_complete(&self) -> bool {
        self.phase == BreathingPhase::Complete
    }

    pub fn is_paused(&self) -> bool {
        self.hidden || self.blurred || self.evasion_flagged()
    }

    pub fn evasion_flagged(&self) -> bool {
        self.evasion_secs_left > 0
    }

    /// Advance by one second of wall time.
    ///
    /// The evasion window always runs down. The countdown and phase clock
    /// only move while not paused, so time away from the page is not counted.
    pub fn tick(&mut self) {
        let paused = self.is_paused();
        self.evasion_secs_left = self.evasion_secs_left.saturating_sub(1);

        if paused || self.is_complete() {
            return;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.phase = BreathingPhase::Complete;
            return;
        }

        self.phase_elapsed += 1;
        self.advance_phase();
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub fn set_window_focused(&mut self, focused: bool) {
        self.blurred = !focused;
    }

    /// Trap `combo` if it is an evasion shortcut. Returns what was trapped so
    /// the host knows to suppress the default action.
    pub fn intercept_key(&mut self, combo: &KeyCombo) -> Option<EvasionShortcut> {
        let shortcut = combo.evasion()?;
        self.evasion_secs_left = EVASION_WINDOW_SECS;
        Some(shortcut)
    }

    pub fn available_decisions(&self) -> &'static [DecisionKind] {
        if self.is_complete() && !self.decided {
            &[DecisionKind::Honor, DecisionKind::Bypass]
        } else {
            &[]
        }
    }

    /// Accept the pause. Only possible once, and only when complete.
    pub fn honor(&mut self) -> Option<PauseDecision> {
        self.decide(PauseDecision::Honored)
    }

    /// Continue to the site. Only possible once, and only when complete.
    pub fn bypass(&mut self, reason: &str) -> Option<PauseDecision> {
        self.decide(PauseDecision::Bypassed {
            reason: reason.to_string(),
        })
    }

    fn decide(&mut self, decision: PauseDecision) -> Option<PauseDecision> {
        if self.available_decisions().is_empty() {
            return None;
        }
        self.decided = true;
        Some(decision)
    }

    fn advance_phase(&mut self) {
        match self.phase {
            BreathingPhase::Ready => {
                if self.phase_elapsed >= READY_DELAY_SECS {
                    self.enter_cycle_phase(0);
                }
            }
            BreathingPhase::Complete => {}
            _ => {
                let Some(&(_, secs)) = self.cycle.get(self.cycle_index) else {
                    return;
                };
                if self.phase_elapsed >= secs {
                    self.enter_cycle_phase((self.cycle_index + 1) % self.cycle.len());
                }
            }
        }
    }

    fn enter_cycle_phase(&mut self, index: usize) {
        self.cycle_index = index;
        self.phase_elapsed = 0;
        // An all-zero pattern still shows a breath rather than sitting in Ready.
        self.phase = self
            .cycle
            .get(index)
            .map(|(phase, _)| *phase)
            .unwrap_or(BreathingPhase::Inhale);
    }
}
