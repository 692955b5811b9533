//! Persistent user configuration.
//!
//! The config file is a small JSON document holding the API key and the
//! preferred model. It lives at `$XDG_CONFIG_HOME/percent/config.json`, falling
//! back to `~/.config/percent/config.json`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::DEFAULT_MODEL;

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

const APP_DIR: &str = "percent";
const CONFIG_FILE: &str = "config.json";

/// The on-disk configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// OpenRouter API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Default model identifier or alias.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Returns the directory holding percent's config file.
pub fn config_dir() -> Option<PathBuf> {
    base_dir(std::env::var_os("XDG_CONFIG_HOME"), ".config")
}

pub(crate) fn base_dir(xdg: Option<std::ffi::OsString>, fallback: &str) -> Option<PathBuf> {
    xdg.filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(fallback)))
        .map(|dir| dir.join(APP_DIR))
}

/// Reads and writes the config file at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Creates a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at the default location.
    pub fn from_env() -> Result<Self> {
        let dir = config_dir()
            .ok_or_else(|| Error::io("cannot locate home directory", io::ErrorKind::NotFound.into()))?;
        Ok(Self::new(dir.join(CONFIG_FILE)))
    }

    /// The file this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the config; a missing or unparsable file yields the default.
    pub fn read(&self) -> Config {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Config::default(),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "cannot read config");
                return Config::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "ignoring malformed config");
                Config::default()
            }
        }
    }

    /// Writes the config, creating parent directories as needed.
    pub fn write(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, json)?;
        tracing::debug!(path = %self.path.display(), "config written");
        Ok(())
    }

    /// Resolves the API key: environment first, then the stored config.
    pub fn resolve_api_key(&self) -> Option<String> {
        pick_api_key(std::env::var(API_KEY_ENV).ok(), &self.read())
    }

    /// Resolves the default model: stored config, else [`DEFAULT_MODEL`].
    pub fn resolve_default_model(&self) -> String {
        pick_default_model(&self.read())
    }
}

/// Chooses between an environment-provided key and the stored one.
pub fn pick_api_key(env: Option<String>, config: &Config) -> Option<String> {
    env.filter(|key| !key.trim().is_empty())
        .or_else(|| config.api_key.clone().filter(|key| !key.trim().is_empty()))
}

/// Returns the stored model or [`DEFAULT_MODEL`].
pub fn pick_default_model(config: &Config) -> String {
    config
        .model
        .clone()
        .filter(|model| !model.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string())
}

/// Reads the config from its default location.
pub fn read_config() -> Result<Config> {
    Ok(ConfigStore::from_env()?.read())
}

/// Writes the config to its default location.
pub fn write_config(config: &Config) -> Result<()> {
    ConfigStore::from_env()?.write(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join("percent").join(CONFIG_FILE))
    }

    #[test]
    fn missing_file_reads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(store(&dir).read(), Config::default());
    }

    #[test]
    fn malformed_file_reads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.read(), Config::default());
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let config = Config {
            api_key: Some("sk-or-123".to_string()),
            model: Some("haiku".to_string()),
        };
        store.write(&config).unwrap();
        assert_eq!(store.read(), config);

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"apiKey\""));
    }

    #[test]
    fn absent_fields_are_not_written() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn env_key_wins() {
        let config = Config {
            api_key: Some("from-config".to_string()),
            model: None,
        };
        assert_eq!(
            pick_api_key(Some("from-env".to_string()), &config).as_deref(),
            Some("from-env")
        );
        assert_eq!(pick_api_key(None, &config).as_deref(), Some("from-config"));
        assert_eq!(
            pick_api_key(Some(String::new()), &config).as_deref(),
            Some("from-config")
        );
        assert_eq!(pick_api_key(None, &Config::default()), None);
    }

    #[test]
    fn default_model_fallback() {
        assert_eq!(pick_default_model(&Config::default()), DEFAULT_MODEL);
        let config = Config {
            api_key: None,
            model: Some("x/y".to_string()),
        };
        assert_eq!(pick_default_model(&config), "x/y");
    }

    #[test]
    fn xdg_dir_takes_precedence() {
        let dir = base_dir(Some("/tmp/xdg".into()), ".config").unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/xdg/percent"));
    }
}
