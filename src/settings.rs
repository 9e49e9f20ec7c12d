use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// Continuity flags for a live tracking session. Persisted on
/// `start_tracking` so a fresh process launch can detect a session that
/// was cut off mid-recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingSettings {
    pub active: bool,
    pub session_id: Option<String>,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            active: false,
            session_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserSettings {
    show_user_location: bool,
    tracking: TrackingSettings,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            show_user_location: false,
            tracking: TrackingSettings::default(),
        }
    }
}

/// Process-wide key/value settings backing the location flags. Reads the
/// JSON file once on construction and writes through on every update.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn show_user_location(&self) -> bool {
        self.data.read().unwrap().show_user_location
    }

    pub fn set_show_user_location(&self, enabled: bool) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.show_user_location = enabled;
        self.persist(&guard)
    }

    pub fn tracking(&self) -> TrackingSettings {
        self.data.read().unwrap().tracking.clone()
    }

    pub fn update_tracking(&self, tracking: TrackingSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.tracking = tracking;
        self.persist(&guard)
    }

    pub fn clear_tracking(&self) -> Result<()> {
        self.update_tracking(TrackingSettings::default())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
