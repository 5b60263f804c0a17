//! Saved user preferences, kept in a small JSON file between runs.

use chrono::{DateTime, TimeDelta, Utc};
use cohost_core::{
    SessionConfig,
    settings::{
        DEFAULT_AGENT_NAME, DEFAULT_MODEL, DEFAULT_STOP_WORDS, DEFAULT_SYSTEM_PROMPT,
        DEFAULT_VOICE,
    },
    tools::ToolToggles,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

/// Saved settings older than this are discarded.
const MAX_AGE_DAYS: i64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed settings file: {0}")]
    Json(#[from] serde_json::Error),
}

/// The user-editable part of a session configuration.
///
/// API keys are deliberately absent; they only ever come from the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSettings {
    pub agent_name: String,
    pub voice: String,
    pub model: String,
    pub system_prompt: String,
    pub stop_words: String,
    #[serde(default)]
    pub tools: ToolToggles,
    pub saved_at: DateTime<Utc>,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self {
            agent_name: DEFAULT_AGENT_NAME.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            stop_words: DEFAULT_STOP_WORDS.to_string(),
            tools: ToolToggles::default(),
            saved_at: Utc::now(),
        }
    }
}

impl StoredSettings {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.saved_at >= TimeDelta::days(MAX_AGE_DAYS)
    }

    /// Builds the engine configuration, adding the search credential.
    pub fn to_session_config(&self, search_api_key: Option<SecretString>) -> SessionConfig {
        let mut config = SessionConfig::default();
        config.set_agent_name(&self.agent_name);
        config.set_stop_phrases(&self.stop_words);
        config.set_search_api_key(search_api_key);
        config.instructions = self.system_prompt.clone();
        config.voice = self.voice.clone();
        config.model = self.model.clone();
        config.tools = self.tools;
        config
    }
}

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads saved settings, or `None` when there are none worth using.
    ///
    /// Expired settings are removed from disk.
    pub fn load(&self, now: DateTime<Utc>) -> Result<Option<StoredSettings>, SettingsError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let settings: StoredSettings = serde_json::from_str(&raw)?;
        if settings.is_expired(now) {
            info!(saved_at = %settings.saved_at, "Saved settings expired; using defaults");
            self.clear()?;
            return Ok(None);
        }
        Ok(Some(settings))
    }

    /// Loads saved settings, falling back to defaults on any problem.
    pub fn load_or_default(&self) -> StoredSettings {
        match self.load(Utc::now()) {
            Ok(Some(settings)) => settings,
            Ok(None) => StoredSettings::default(),
            Err(e) => {
                warn!(error = %e, "Failed to load settings");
                StoredSettings::default()
            }
        }
    }

    /// Writes the settings, stamping them with the current time.
    pub fn save(&self, settings: &StoredSettings) -> Result<(), SettingsError> {
        let stamped = StoredSettings {
            saved_at: Utc::now(),
            ..settings.clone()
        };
        let json = serde_json::to_string_pretty(&stamped)?;
        fs::write(&self.path, json).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }

    /// Removes the settings file. Succeeds if there is none.
    pub fn clear(&self) -> Result<(), SettingsError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SettingsError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohost_core::tools::ToolKind;
    use tempfile::TempDir;

    fn store() -> (TempDir, SettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        (dir, store)
    }

    #[test]
    fn missing_file_loads_nothing() {
        let (_dir, store) = store();
        assert!(store.load(Utc::now()).unwrap().is_none());
        assert_eq!(store.load_or_default().agent_name, "Alex");
    }

    #[test]
    fn save_then_load_keeps_preferences() {
        let (_dir, store) = store();
        let mut settings = StoredSettings {
            agent_name: "Nova".into(),
            voice: "verse".into(),
            ..StoredSettings::default()
        };
        settings.tools.set(ToolKind::Calculator, false);
        store.save(&settings).unwrap();

        let loaded = store.load(Utc::now()).unwrap().expect("settings saved");
        assert_eq!(loaded.agent_name, "Nova");
        assert_eq!(loaded.voice, "verse");
        assert!(!loaded.tools.calculator);
    }

    #[test]
    fn expired_settings_are_removed() {
        let (_dir, store) = store();
        store.save(&StoredSettings::default()).unwrap();

        let later = Utc::now() + TimeDelta::days(31);
        assert!(store.load(later).unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn file_never_contains_keys() {
        let (_dir, store) = store();
        store.save(&StoredSettings::default()).unwrap();
        let raw = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert!(keys.iter().all(|k| !k.to_lowercase().contains("key")));
        assert!(keys.contains(&"agentName"));
        assert!(keys.contains(&"savedAt"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let (_dir, store) = store();
        fs::write(store.path(), "{ nope").unwrap();
        assert!(matches!(
            store.load(Utc::now()),
            Err(SettingsError::Json(_))
        ));
        assert_eq!(store.load_or_default().stop_words, DEFAULT_STOP_WORDS);
    }

    #[test]
    fn session_config_reflects_settings() {
        let settings = StoredSettings {
            agent_name: "Nova".into(),
            stop_words: "Enough, Later".into(),
            ..StoredSettings::default()
        };
        let config = settings.to_session_config(None);
        assert_eq!(config.agent_name(), "Nova");
        assert_eq!(config.stop_phrases(), ["enough", "later"]);
        assert!(!config.has_search_credential());
    }
}
