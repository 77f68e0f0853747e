//! Project configuration stored in `.lineage/config.json`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_DIR: &str = ".lineage";
const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid PORT value: {0}")]
    InvalidPort(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the dataset and the correction log.
    pub data_dir: PathBuf,
    /// Dataset file, relative to `data_dir`.
    pub dataset: PathBuf,
    /// Correction log, relative to `data_dir`.
    pub corrections_log: PathBuf,
    /// Snapshot store directory.
    pub store: PathBuf,
    pub port: u16,
    /// Default lineage depth for queries.
    pub max_depth: usize,
    /// Rebuild from the dataset even when a snapshot exists.
    #[serde(skip)]
    pub force_reinit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            dataset: PathBuf::from("dissertations.csv"),
            corrections_log: PathBuf::from("corrections_log.csv"),
            store: PathBuf::from(CONFIG_DIR).join("store"),
            port: 5001,
            max_depth: 5,
            force_reinit: false,
        }
    }
}

impl Config {
    pub fn config_path(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Loads the config under `root`, then applies environment overrides.
    ///
    /// A missing config file gives the defaults. Relative paths are
    /// resolved against `root`.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        Self::load_with(root, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`], reading overrides through `var`.
    pub fn load_with<F>(root: &Path, var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = Self::config_path(root);

        let mut config = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?
        } else {
            Config::default()
        };

        config.apply_overrides(var)?;
        Ok(config.resolve(root))
    }

    fn apply_overrides<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = var("DATA_DIR").filter(|v| !v.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(port) = var("PORT").filter(|v| !v.is_empty()) {
            self.port = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
        }
        if var("FORCE_REINIT").is_some_and(|v| !v.is_empty()) {
            self.force_reinit = true;
        }
        Ok(())
    }

    fn resolve(mut self, root: &Path) -> Self {
        self.data_dir = root.join(&self.data_dir);
        self.dataset = self.data_dir.join(&self.dataset);
        self.corrections_log = self.data_dir.join(&self.corrections_log);
        self.store = root.join(&self.store);
        self
    }

    /// Writes the config file under `root`, creating `.lineage/`.
    pub fn write(&self, root: &Path) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path(root);
        let io_error = |source| ConfigError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(root.join(CONFIG_DIR)).map_err(io_error)?;
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, text).map_err(io_error)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_missing() {
        let dir = tempdir().unwrap();
        let config = Config::default().resolve(dir.path());

        assert_eq!(config.dataset, dir.path().join("data").join("dissertations.csv"));
        assert_eq!(config.store, dir.path().join(".lineage").join("store"));
        assert_eq!(config.port, 5001);
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempdir().unwrap();
        let config = Config {
            data_dir: PathBuf::from("mgp"),
            max_depth: 3,
            ..Config::default()
        };
        config.write(dir.path()).unwrap();

        let text = fs::read_to_string(Config::config_path(dir.path())).unwrap();
        let loaded: Config = serde_json::from_str(&text).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let loaded: Config = serde_json::from_str(r#"{"port": 8080}"#).unwrap();
        assert_eq!(loaded.port, 8080);
        assert_eq!(loaded.max_depth, 5);
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[("DATA_DIR", "/srv/data"), ("PORT", "9000"), ("FORCE_REINIT", "1")]);
        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/data"));
        assert_eq!(config.port, 9000);
        assert!(config.force_reinit);
    }

    #[test]
    fn test_invalid_port() {
        let vars = env(&[("PORT", "http")]);
        let mut config = Config::default();
        let err = config.apply_overrides(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(_)));
    }

    #[test]
    fn test_load_with_reads_file_then_overrides() {
        let dir = tempdir().unwrap();
        Config {
            port: 8080,
            ..Config::default()
        }
        .write(dir.path())
        .unwrap();

        let config = Config::load_with(dir.path(), |_| None).unwrap();
        assert_eq!(config.port, 8080);
        assert!(!config.force_reinit);

        let vars = env(&[("DATA_DIR", "mgp"), ("FORCE_REINIT", "1")]);
        let config = Config::load_with(dir.path(), |k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.dataset, dir.path().join("mgp").join("dissertations.csv"));
        assert!(config.force_reinit);
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
        fs::write(Config::config_path(dir.path()), "{ nope").unwrap();

        assert!(matches!(
            Config::load_with(dir.path(), |_| None),
            Err(ConfigError::Parse { .. })
        ));
    }
}
