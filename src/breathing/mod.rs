//! Countdown state machine behind the pause overlay.
//!
//! ```text
//! Ready -> Inhale -> (Hold -> Exhale -> Rest -> Inhale)* -> Complete
//! ```
//!
//! The machine is pure: the caller feeds it one `tick()` per elapsed second
//! plus visibility, focus and key events, and reads back a [`PauseState`].

mod evasion;
mod machine;

pub use evasion::{EvasionShortcut, KeyCombo};
pub use machine::{
    BreathingMachine, BreathingPattern, BreathingPhase, DecisionKind, PauseDecision, PauseState,
    EVASION_WINDOW_SECS, READY_DELAY_SECS,
};
