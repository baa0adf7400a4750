use crate::breathing::KeyCombo;

use super::OverlayView;

/// What the user picked once the pause completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserChoice {
    /// "I can wait": keep the pause and leave the site.
    Wait,
    /// Continue to the site for the given reason.
    Proceed(String),
}

/// Input delivered from the page to its agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    VisibilityChanged { hidden: bool },
    FocusChanged { focused: bool },
    KeyDown(KeyCombo),
    Choose(UserChoice),
    /// The page is navigating away or closing.
    Unload,
}

/// Rendering surface of one loaded page.
///
/// The agent calls these in a fixed order: `hide_content` as soon as the
/// page starts loading, then either `show_content` alone, or
/// `lock_scroll`, `mount_overlay`, any number of `render`s,
/// `unmount_overlay`, `restore_scroll`, `show_content`.
pub trait PageHost: Send {
    /// Cover the page before it paints. Rendering is suppressed, not the
    /// network load.
    fn hide_content(&mut self);

    fn show_content(&mut self);

    fn lock_scroll(&mut self);

    fn restore_scroll(&mut self);

    /// Put the full-viewport overlay in front of the page; it takes all input.
    fn mount_overlay(&mut self);

    fn render(&mut self, view: &OverlayView);

    fn unmount_overlay(&mut self);
}
