//! Persistent configuration for the assistant.
//!
//! The configuration is a small JSON record kept in the user's home
//! directory. It is read on demand by whichever component needs it and
//! written back immediately after every mutation.

use anyhow::{anyhow, Context, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Model used when the configuration does not name one.
pub const DEFAULT_MODEL: &str = "llama3.2";

const CONFIG_DIR_NAME: &str = ".jarvissh";
const CONFIG_FILE_NAME: &str = "jarvissh_config.json";

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            service: None,
            service_api_key: None,
        }
    }
}

impl Config {
    /// Returns the hosted credential, falling back to `OPENAI_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        self.service_api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Handle on the directory holding the configuration and the
/// custom-command corpus.
///
/// The store is cheap to clone and carries no cached state: every
/// [`ConfigStore::read`] goes back to disk.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Store rooted at `~/.jarvissh`.
    pub fn default_location() -> Result<Self> {
        let home = home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(Self::with_dir(home.join(CONFIG_DIR_NAME)))
    }

    /// Store rooted at an arbitrary directory.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    /// Reads the configuration, returning defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not a
    /// valid configuration object.
    pub fn read(&self) -> Result<Config> {
        let path = self.config_path();
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&content).with_context(|| {
            format!(
                "Config file {} is not valid JSON; fix or delete it",
                path.display()
            )
        })?;
        debug!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    ///
    /// The file is replaced through a rename, never truncated in place.
    pub fn save(&self, config: &Config) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.config_path();
        let staging = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&staging, content)?;
        fs::rename(&staging, &path)?;
        info!("Saved config to: {}", path.display());
        Ok(())
    }

    pub fn set_model(&self, model: &str) -> Result<Config> {
        self.update(|config| config.model = model.to_string())
    }

    pub fn set_service(&self, service: &str) -> Result<Config> {
        self.update(|config| config.service = Some(service.to_string()))
    }

    pub fn set_api_key(&self, api_key: &str) -> Result<Config> {
        self.update(|config| config.service_api_key = Some(api_key.to_string()))
    }

    fn update(&self, mutate: impl FnOnce(&mut Config)) -> Result<Config> {
        let mut config = self.read()?;
        mutate(&mut config);
        self.save(&config)?;
        Ok(config)
    }

    pub fn show_config_info(&self) -> Result<()> {
        let path = self.config_path();
        println!("Configuration file: {}", path.display());

        if path.exists() {
            println!("Status: Found");
        } else {
            println!("Status: Not found (using defaults)");
        }

        let config = self.read()?;
        println!("Model: {}", config.model);
        println!(
            "Service: {}",
            config.service.as_deref().unwrap_or("local (default)")
        );
        println!(
            "API Key: {}",
            if config.service_api_key.is_some() { "Set" } else { "Not set" }
        );

        println!("\nTo change settings:");
        println!("  jarvis --model <name>");
        println!("  jarvis --service <local|hosted>");
        println!("  jarvis --api-key <key>");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, ConfigStore) {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::with_dir(dir.path().join(".jarvissh"));
        (dir, store)
    }

    #[test]
    fn test_read_without_file_returns_default_model() {
        let (_dir, store) = temp_store();

        let config = store.read().unwrap();

        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.service.is_none());
        assert!(config.service_api_key.is_none());
    }

    #[test]
    fn test_save_then_read_round_trips() {
        let (_dir, store) = temp_store();
        let config = Config {
            model: "x".to_string(),
            service: Some("hosted".to_string()),
            service_api_key: None,
        };

        store.save(&config).unwrap();

        assert_eq!(store.read().unwrap(), config);
    }

    #[test]
    fn test_save_writes_pretty_json_with_expected_keys() {
        let (_dir, store) = temp_store();
        let config = Config {
            model: "gpt-4o-mini".to_string(),
            service: Some("hosted".to_string()),
            service_api_key: Some("sk-test".to_string()),
        };

        store.save(&config).unwrap();

        let raw = fs::read_to_string(store.config_path()).unwrap();
        assert!(raw.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["service"], "hosted");
        assert_eq!(value["service_api_key"], "sk-test");
    }

    #[test]
    fn test_missing_model_key_falls_back_to_default() {
        let (_dir, store) = temp_store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.config_path(), r#"{"service": "local"}"#).unwrap();

        let config = store.read().unwrap();

        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.service.as_deref(), Some("local"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let (_dir, store) = temp_store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.config_path(), "{ not json").unwrap();

        let err = store.read().unwrap_err();

        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn test_setters_preserve_other_fields() {
        let (_dir, store) = temp_store();

        store.set_service("hosted").unwrap();
        store.set_api_key("sk-abc").unwrap();
        let config = store.set_model("gpt-4o").unwrap();

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.service.as_deref(), Some("hosted"));
        assert_eq!(config.service_api_key.as_deref(), Some("sk-abc"));
        assert_eq!(store.read().unwrap(), config);
    }

    #[test]
    fn test_save_leaves_no_staging_file() {
        let (_dir, store) = temp_store();

        store.save(&Config::default()).unwrap();

        assert!(!store.config_path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_stored_api_key_wins() {
        let config = Config {
            service_api_key: Some("sk-stored".to_string()),
            ..Config::default()
        };

        assert_eq!(config.api_key().as_deref(), Some("sk-stored"));
    }
}
