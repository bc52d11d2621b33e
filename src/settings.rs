use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{catalog::BrewingStyle, log_warn, models::DEFAULT_MINDFULNESS_THEME};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    /// Celsius with the Fahrenheit value alongside.
    #[default]
    Both,
    Celsius,
    Fahrenheit,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct MindfulnessDefaults {
    pub enabled: bool,
    pub theme: String,
}

impl Default for MindfulnessDefaults {
    fn default() -> Self {
        Self {
            enabled: true,
            theme: DEFAULT_MINDFULNESS_THEME.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub temperature_unit: TemperatureUnit,
    pub default_style: BrewingStyle,
    pub storage_backend: StorageBackend,
    pub mindfulness: MindfulnessDefaults,
}

impl Settings {
    pub fn format_temperature(&self, celsius: u32) -> String {
        match self.temperature_unit {
            TemperatureUnit::Both => crate::catalog::format_temperature(celsius),
            TemperatureUnit::Celsius => format!("{celsius}°C"),
            TemperatureUnit::Fahrenheit => {
                format!("{}°F", crate::catalog::celsius_to_fahrenheit(celsius))
            }
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    /// Opens `path`, falling back to defaults when the file is missing or
    /// unparsable. Only an unreadable existing file is an error.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!("[settings] ignoring malformed {}: {}", path.display(), err);
                Settings::default()
            })
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> Settings {
        self.read().clone()
    }

    pub fn update<F>(&self, change: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let mut guard = self.write();
        change(&mut guard);
        self.persist(&guard)?;
        Ok(guard.clone())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: Settings = serde_json::from_str(&contents)?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let settings = store.get();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.mindfulness.theme, "Focus on Aroma");
        assert_eq!(settings.default_style, BrewingStyle::Western);
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        store
            .update(|s| {
                s.default_style = BrewingStyle::Gongfu;
                s.storage_backend = StorageBackend::Sqlite;
            })
            .unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.get().default_style, BrewingStyle::Gongfu);
        assert_eq!(reopened.get().storage_backend, StorageBackend::Sqlite);
    }

    #[test]
    fn partial_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        fs::write(&path, r#"{"temperatureUnit":"celsius"}"#).unwrap();
        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.get().temperature_unit, TemperatureUnit::Celsius);
        assert!(store.get().mindfulness.enabled);

        fs::write(&path, "{oops").unwrap();
        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.get(), Settings::default());
    }

    #[test]
    fn temperature_display_follows_unit() {
        let mut settings = Settings::default();
        assert_eq!(settings.format_temperature(80), "80°C (176°F)");
        settings.temperature_unit = TemperatureUnit::Fahrenheit;
        assert_eq!(settings.format_temperature(80), "176°F");
        settings.temperature_unit = TemperatureUnit::Celsius;
        assert_eq!(settings.format_temperature(80), "80°C");
    }
}
