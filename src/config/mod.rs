use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::errors::Result;
use crate::utils::paths::{config_file, write_atomic};

/// Locale and presentation preferences plus the last signed-in user, so the
/// CLI can resume a session without re-prompting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub locale: String,
    pub currency_symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_user: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-PH".into(),
            currency_symbol: "₱".into(),
            last_user: None,
        }
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            path: config_file(),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Config> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, &json)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::at(temp.path().join("config.json"));
        let config = manager.load().expect("load defaults");
        assert_eq!(config.locale, "en-PH");
        assert_eq!(config.currency_symbol, "₱");
        assert!(config.last_user.is_none());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::at(temp.path().join("config.json"));
        let mut config = Config::default();
        config.last_user = Some("maria@example.com".into());
        manager.save(&config).expect("save config");

        let loaded = manager.load().expect("reload config");
        assert_eq!(loaded.last_user.as_deref(), Some("maria@example.com"));
    }
}
