use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use crate::error::Result;

/// User playback toggles, read when a card mounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackSettings {
    pub audio_on: bool,
    pub captions_on: bool,
    pub autoplay_on: bool,
    pub muted_by_default: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            audio_on: true,
            captions_on: true,
            autoplay_on: true,
            muted_by_default: true,
        }
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub audio_on: Option<bool>,
    pub captions_on: Option<bool>,
    pub autoplay_on: Option<bool>,
    pub muted_by_default: Option<bool>,
}

impl SettingsPatch {
    /// Patch for a single setting by its camelCase or kebab-case key.
    pub fn single(key: &str, value: bool) -> Option<Self> {
        let mut patch = Self::default();
        match key {
            "audioOn" | "audio-on" | "audio" => patch.audio_on = Some(value),
            "captionsOn" | "captions-on" | "captions" => patch.captions_on = Some(value),
            "autoplayOn" | "autoplay-on" | "autoplay" => patch.autoplay_on = Some(value),
            "mutedByDefault" | "muted-by-default" | "muted" => patch.muted_by_default = Some(value),
            _ => return None,
        }
        Some(patch)
    }
}

impl PlaybackSettings {
    pub fn apply(mut self, patch: SettingsPatch) -> Self {
        if let Some(v) = patch.audio_on {
            self.audio_on = v;
        }
        if let Some(v) = patch.captions_on {
            self.captions_on = v;
        }
        if let Some(v) = patch.autoplay_on {
            self.autoplay_on = v;
        }
        if let Some(v) = patch.muted_by_default {
            self.muted_by_default = v;
        }
        self
    }

    /// Whether audio should start on its own when a card becomes active.
    pub fn audio_autoplay(&self) -> bool {
        self.audio_on && self.autoplay_on
    }
}

pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("microreel")
        .join("settings.json")
}

/// JSON file backed settings.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn at_default_location() -> Self {
        Self::new(default_settings_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored values merged over defaults. A missing or unreadable file yields defaults.
    pub async fn load(&self) -> PlaybackSettings {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(_) => return PlaybackSettings::default(),
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt settings file");
                PlaybackSettings::default()
            }
        }
    }

    pub async fn save(&self, settings: &PlaybackSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let pretty_json = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, pretty_json).await?;
        Ok(())
    }

    pub async fn update(&self, patch: SettingsPatch) -> Result<PlaybackSettings> {
        let next = self.load().await.apply(patch);
        self.save(&next).await?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> SettingsStore {
        let dir = std::env::temp_dir().join(format!(
            "microreel-settings-{}-{}",
            name,
            uuid::Uuid::new_v4()
        ));
        SettingsStore::new(dir.join("settings.json"))
    }

    #[tokio::test]
    async fn missing_file_gives_defaults() {
        let store = temp_store("missing");
        assert_eq!(store.load().await, PlaybackSettings::default());
    }

    #[tokio::test]
    async fn partial_file_merges_over_defaults() {
        let store = temp_store("partial");
        fs::create_dir_all(store.path().parent().unwrap()).await.unwrap();
        fs::write(store.path(), r#"{"audioOn":false}"#).await.unwrap();

        let settings = store.load().await;
        assert!(!settings.audio_on);
        assert!(settings.captions_on && settings.autoplay_on && settings.muted_by_default);
    }

    #[tokio::test]
    async fn corrupt_file_gives_defaults() {
        let store = temp_store("corrupt");
        fs::create_dir_all(store.path().parent().unwrap()).await.unwrap();
        fs::write(store.path(), "{{{").await.unwrap();
        assert_eq!(store.load().await, PlaybackSettings::default());
    }

    #[tokio::test]
    async fn update_persists_patch() {
        let store = temp_store("update");
        let patch = SettingsPatch::single("autoplay", false).unwrap();
        let next = store.update(patch).await.unwrap();
        assert!(!next.autoplay_on);
        assert_eq!(store.load().await, next);
    }

    #[test]
    fn unknown_key_has_no_patch() {
        assert!(SettingsPatch::single("volume", true).is_none());
        assert!(!PlaybackSettings::default()
            .apply(SettingsPatch::single("audioOn", false).unwrap())
            .audio_autoplay());
    }
}
