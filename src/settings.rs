use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fs, path::PathBuf, sync::Mutex};

pub const DEFAULT_PAUSE_SECS: u64 = 7;
pub const DEFAULT_FOCUS_MINUTES: u64 = 25;

/// The user settings the pause agent and the popup read. Keys owned by
/// other settings editors ride along in `extra` untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseSettings {
    #[serde(default)]
    pub distracting_sites: Vec<String>,
    #[serde(default = "default_pause_duration")]
    pub pause_duration: u64,
    #[serde(default = "default_enabled")]
    pub enable_pauses: bool,
    #[serde(default = "default_focus_minutes")]
    pub default_focus_minutes: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_pause_duration() -> u64 {
    DEFAULT_PAUSE_SECS
}

fn default_enabled() -> bool {
    true
}

fn default_focus_minutes() -> u64 {
    DEFAULT_FOCUS_MINUTES
}

impl Default for PauseSettings {
    fn default() -> Self {
        Self {
            distracting_sites: Vec::new(),
            pause_duration: DEFAULT_PAUSE_SECS,
            enable_pauses: true,
            default_focus_minutes: DEFAULT_FOCUS_MINUTES,
            extra: Map::new(),
        }
    }
}

impl PauseSettings {
    /// Settings that never intercept anything. Used when the store can't be read.
    pub fn disabled() -> Self {
        Self {
            enable_pauses: false,
            ..Self::default()
        }
    }

    /// A stored zero means "unset" for both durations.
    fn with_fallbacks(mut self) -> Self {
        if self.pause_duration == 0 {
            self.pause_duration = DEFAULT_PAUSE_SECS;
        }
        if self.default_focus_minutes == 0 {
            self.default_focus_minutes = DEFAULT_FOCUS_MINUTES;
        }
        self
    }
}

/// JSON-file settings store.
///
/// Reads go to disk every time so that edits made elsewhere apply on the
/// next page load; there is no in-memory copy that could go stale.
pub struct SettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Bulk fetch of the pause settings. A missing file yields defaults; an
    /// unreadable or corrupt file is an error.
    pub fn pause_settings(&self) -> Result<PauseSettings> {
        if !self.path.exists() {
            return Ok(PauseSettings::default());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let settings: PauseSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed settings in {}", self.path.display()))?;
        Ok(settings.with_fallbacks())
    }

    pub fn update<F>(&self, apply: F) -> Result<PauseSettings>
    where
        F: FnOnce(&mut PauseSettings),
    {
        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut settings = self.pause_settings()?;
        apply(&mut settings);
        self.persist(&settings)?;
        Ok(settings)
    }

    fn persist(&self, data: &PauseSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
