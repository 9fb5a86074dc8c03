use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Default settings file name, resolved relative to the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "dialogue_fade.json";

/// Persisted fade settings
///
/// Missing keys take their defaults when loading, so older files keep working.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct FadeSettings {
    pub fade_enabled: bool,
    /// 0–100
    pub fade_intensity: u32,
    pub modify_dialogue_color: bool,
    /// `#RRGGBB`
    pub dialogue_color: String,
}

impl Default for FadeSettings {
    fn default() -> Self {
        Self {
            fade_enabled: true,
            fade_intensity: 100,
            modify_dialogue_color: false,
            dialogue_color: "#FFFFFF".to_string(),
        }
    }
}

impl FadeSettings {
    /// Parse JSON and merge over defaults; intensity is clamped to 0–100
    pub fn from_json(content: &str) -> Result<Self> {
        let mut settings: FadeSettings = serde_json::from_str(content).context("Invalid settings JSON")?;
        settings.set_intensity(settings.fade_intensity);
        Ok(settings)
    }

    pub fn set_intensity(&mut self, intensity: u32) {
        if intensity > 100 {
            warn!("Fade intensity {} clamped to 100", intensity);
        }
        self.fade_intensity = intensity.min(100);
    }
}

/// Settings bound to the file they persist to; every change is saved
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    settings: FadeSettings,
}

impl SettingsStore {
    /// Load settings from `path`, falling back to defaults if the file is
    /// missing or unreadable
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let settings = match fs::read_to_string(&path).await {
            Ok(content) => FadeSettings::from_json(&content).unwrap_or_else(|e| {
                warn!("Ignoring settings file {}: {:#}", path.display(), e);
                FadeSettings::default()
            }),
            Err(e) => {
                debug!("No settings at {} ({}), using defaults", path.display(), e);
                FadeSettings::default()
            }
        };
        Self { path, settings }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &FadeSettings {
        &self.settings
    }

    /// Write the current settings to disk
    pub async fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.settings)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(&self.path, content)
            .await
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))?;
        Ok(())
    }

    /// Apply `change` and persist
    pub async fn update(&mut self, change: impl FnOnce(&mut FadeSettings)) -> Result<()> {
        change(&mut self.settings);
        self.settings.set_intensity(self.settings.fade_intensity);
        self.save().await
    }

    /// Toggle command: flip `fade_enabled`, persist, return the new value.
    /// Callers must recompute both drivers afterwards.
    pub async fn toggle_fade(&mut self) -> Result<bool> {
        self.update(|s| s.fade_enabled = !s.fade_enabled).await?;
        info!("Dialogue fade {}", if self.settings.fade_enabled { "enabled" } else { "disabled" });
        Ok(self.settings.fade_enabled)
    }
}
