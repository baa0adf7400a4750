use std::{fmt, str::FromStr};

use anyhow::{bail, Result};

/// Shortcuts the overlay swallows instead of letting the browser act on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvasionShortcut {
    Refresh,
    NewTab,
    CloseTab,
    DevTools,
    ForceQuit,
    Escape,
}

impl EvasionShortcut {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvasionShortcut::Refresh => "refresh",
            EvasionShortcut::NewTab => "new-tab",
            EvasionShortcut::CloseTab => "close-tab",
            EvasionShortcut::DevTools => "dev-tools",
            EvasionShortcut::ForceQuit => "force-quit",
            EvasionShortcut::Escape => "escape",
        }
    }
}

/// A key press with its modifiers. `key` is lowercase (`"r"`, `"f12"`,
/// `"escape"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyCombo {
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyCombo {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn evasion(&self) -> Option<EvasionShortcut> {
        let key = self.key.as_str();
        // Ctrl on Windows/Linux, Cmd on macOS.
        let command = self.ctrl || self.meta;
        let inspector_key = matches!(key, "i" | "j" | "c");

        match key {
            "escape" | "esc" => Some(EvasionShortcut::Escape),
            "f12" => Some(EvasionShortcut::DevTools),
            "f5" => Some(EvasionShortcut::Refresh),
            "f4" if self.alt => Some(EvasionShortcut::ForceQuit),
            _ if inspector_key && ((self.ctrl && self.shift) || (self.meta && self.alt)) => {
                Some(EvasionShortcut::DevTools)
            }
            "r" if command => Some(EvasionShortcut::Refresh),
            "t" if command => Some(EvasionShortcut::NewTab),
            "w" if command => Some(EvasionShortcut::CloseTab),
            "q" if self.meta => Some(EvasionShortcut::ForceQuit),
            _ => None,
        }
    }
}

impl FromStr for KeyCombo {
    type Err = anyhow::Error;

    /// Parses `ctrl+shift+i`, `cmd+q`, `f5`, `escape`.
    fn from_str(s: &str) -> Result<Self> {
        let mut combo = KeyCombo::default();
        let mut key: Option<String> = None;

        for part in s.split('+').map(str::trim) {
            match part.to_ascii_lowercase().as_str() {
                "" => bail!("empty key in combo {s:?}"),
                "ctrl" | "control" => combo.ctrl = true,
                "shift" => combo.shift = true,
                "alt" | "option" => combo.alt = true,
                "meta" | "cmd" | "command" | "super" => combo.meta = true,
                other => {
                    if key.replace(other.to_string()).is_some() {
                        bail!("more than one key in combo {s:?}");
                    }
                }
            }
        }

        match key {
            Some(key) => {
                combo.key = key;
                Ok(combo)
            }
            None => bail!("no key in combo {s:?}"),
        }
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (held, name) in [
            (self.ctrl, "ctrl+"),
            (self.meta, "meta+"),
            (self.alt, "alt+"),
            (self.shift, "shift+"),
        ] {
            if held {
                f.write_str(name)?;
            }
        }
        f.write_str(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(s: &str) -> Option<EvasionShortcut> {
        s.parse::<KeyCombo>().unwrap().evasion()
    }

    #[test]
    fn trapped_shortcuts() {
        assert_eq!(classify("f5"), Some(EvasionShortcut::Refresh));
        assert_eq!(classify("ctrl+r"), Some(EvasionShortcut::Refresh));
        assert_eq!(classify("cmd+shift+r"), Some(EvasionShortcut::Refresh));
        assert_eq!(classify("ctrl+t"), Some(EvasionShortcut::NewTab));
        assert_eq!(classify("cmd+w"), Some(EvasionShortcut::CloseTab));
        assert_eq!(classify("f12"), Some(EvasionShortcut::DevTools));
        assert_eq!(classify("ctrl+shift+i"), Some(EvasionShortcut::DevTools));
        assert_eq!(classify("cmd+alt+j"), Some(EvasionShortcut::DevTools));
        assert_eq!(classify("alt+f4"), Some(EvasionShortcut::ForceQuit));
        assert_eq!(classify("cmd+q"), Some(EvasionShortcut::ForceQuit));
        assert_eq!(classify("Escape"), Some(EvasionShortcut::Escape));
    }

    #[test]
    fn ordinary_keys_pass_through() {
        assert_eq!(classify("r"), None);
        assert_eq!(classify("ctrl+c"), None);
        assert_eq!(classify("shift+i"), None);
        assert_eq!(classify("f4"), None);
        assert_eq!(classify("ctrl+q"), None);
        assert_eq!(classify("space"), None);
    }

    #[test]
    fn parse_errors() {
        assert!("ctrl+".parse::<KeyCombo>().is_err());
        assert!("ctrl+shift".parse::<KeyCombo>().is_err());
        assert!("a+b".parse::<KeyCombo>().is_err());
    }

    #[test]
    fn builder_and_display_agree() {
        let combo = KeyCombo::new("I").ctrl().shift();
        assert_eq!(combo.to_string(), "ctrl+shift+i");
        assert_eq!(combo.evasion(), Some(EvasionShortcut::DevTools));
        assert_eq!(KeyCombo::new("q").meta().to_string(), "meta+q");
        assert!(KeyCombo::new("f4").alt().evasion().is_some());
    }
}
