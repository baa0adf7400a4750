pub mod badge;
pub mod commands;
pub mod controller;
pub mod state;

pub use badge::{format_badge, Badge};
pub use commands::serve;
pub use controller::TimerService;
pub use state::{FocusSession, MAX_FOCUS_SECS};
