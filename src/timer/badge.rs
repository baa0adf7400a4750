use std::sync::Arc;

use tokio::sync::watch;

/// Host-visible countdown indicator. An empty string means no session.
#[derive(Clone)]
pub struct Badge {
    text: Arc<watch::Sender<String>>,
}

impl Badge {
    pub fn new() -> Self {
        let (text, _) = watch::channel(String::new());
        Self {
            text: Arc::new(text),
        }
    }

    pub fn set_text(&self, text: &str) {
        self.text.send_if_modified(|current| {
            if current == text {
                return false;
            }
            *current = text.to_string();
            true
        });
    }

    pub fn clear(&self) {
        self.set_text("");
    }

    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.text.subscribe()
    }
}

impl Default for Badge {
    fn default() -> Self {
        Self::new()
    }
}

/// Compact countdown: `2h`, `12m`, `45s`, or empty once time is up.
pub fn format_badge(remaining_secs: u64) -> String {
    if remaining_secs == 0 {
        String::new()
    } else if remaining_secs >= 3600 {
        format!("{}h", remaining_secs / 3600)
    } else if remaining_secs >= 60 {
        format!("{}m", remaining_secs / 60)
    } else {
        format!("{remaining_secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badge_text_uses_the_largest_whole_unit() {
        assert_eq!(format_badge(0), "");
        assert_eq!(format_badge(45), "45s");
        assert_eq!(format_badge(60), "1m");
        assert_eq!(format_badge(12 * 60 + 59), "12m");
        assert_eq!(format_badge(3600), "1h");
        assert_eq!(format_badge(2 * 3600 + 1), "2h");
    }

    #[tokio::test]
    async fn subscribers_see_only_changes() {
        let badge = Badge::new();
        let mut rx = badge.subscribe();

        badge.set_text("5m");
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), "5m");

        badge.set_text("5m");
        assert!(!rx.has_changed().unwrap());

        badge.clear();
        assert_eq!(badge.text(), "");
    }
}
