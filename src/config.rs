// YAML configuration for the tasklist CLI

use crate::storage::{FileStorage, MemoryStorage, SqliteStorage};
use crate::store::{DEFAULT_KEY, TaskStore};
use crate::view::DEFAULT_DISPLAY_DATE_FORMAT;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const APP_DIR: &str = "tasklist";
const CONFIG_FILE: &str = "tasklist.yml";
const DB_FILE: &str = "tasklist.db";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    File,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: Backend,
    /// Data directory; defaults to the platform data dir
    pub path: Option<PathBuf>,
    /// Slot the task collection is stored under
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            path: None,
            key: DEFAULT_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// chrono format string for the date column
    pub date_format: String,
    pub color: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DISPLAY_DATE_FORMAT.to_string(),
            color: true,
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            debug!(path = ?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path).with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_yaml(&text).with_context(|| format!("Invalid config {}", path.display()))?;
        info!(path = ?path, "Loaded config");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("Failed to parse YAML config")
    }

    /// Directory holding the data files
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join(APP_DIR)))
            .unwrap_or_else(|| PathBuf::from(".").join(format!(".{}", APP_DIR)))
    }

    /// Open a task store over the configured backend
    pub fn open_store(&self) -> Result<TaskStore> {
        let key = self.storage.key.as_str();
        let mut store = match self.storage.backend {
            Backend::Sqlite => {
                let db_path = self.data_dir().join(DB_FILE);
                TaskStore::open_with_key(SqliteStorage::open(db_path)?, key)?
            }
            Backend::File => TaskStore::open_with_key(FileStorage::open(self.data_dir())?, key)?,
            Backend::Memory => TaskStore::open_with_key(MemoryStorage::new(), key)?,
        };
        store.set_date_format(&self.display.date_format);
        Ok(store)
    }
}

/// `<config dir>/tasklist/tasklist.yml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
}
