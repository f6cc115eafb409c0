// Configuration loading

use crate::slots::{FileSlots, MemorySlots, SlotStorage, SqliteSlots, validate_slot_name};
use crate::store::{DEFAULT_STORE_NAME, TaskStore};
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const APP_DIR: &str = "taskboard";
const CONFIG_FILE: &str = "config.yaml";
const SQLITE_FILE: &str = "taskboard.db";

/// Where the board state is kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One JSON file per slot under `data_dir`
    #[default]
    File,
    /// A SQLite database at `data_dir/taskboard.db`
    Sqlite,
    /// Nothing survives the process
    Memory,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Slot the board is persisted under
    pub store_name: String,
    pub backend: Backend,
    /// Defaults to the platform data directory
    pub data_dir: Option<PathBuf>,
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_name: DEFAULT_STORE_NAME.to_string(),
            backend: Backend::default(),
            data_dir: None,
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the per-user config file is
    /// read if present, and defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    debug!("No config file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read config file {:?}", path))?;
        let config = Self::from_yaml(&content).with_context(|| format!("Invalid config file {:?}", path))?;
        info!(path = ?path, "Loaded config");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document means "all defaults"
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content).context("Failed to parse YAML config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_slot_name(&self.store_name).context("Invalid store_name")
    }

    /// `$CONFIG_DIR/taskboard/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Configured data directory, else `$DATA_DIR/taskboard`, else `./.taskboard`
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join(APP_DIR)))
            .unwrap_or_else(|| PathBuf::from(".").join(format!(".{}", APP_DIR)))
    }

    /// Build the configured slot backend
    pub fn open_storage(&self) -> Result<Box<dyn SlotStorage>> {
        let storage: Box<dyn SlotStorage> = match self.backend {
            Backend::File => Box::new(FileSlots::open(self.data_dir())?),
            Backend::Sqlite => Box::new(SqliteSlots::open(self.data_dir().join(SQLITE_FILE))?),
            Backend::Memory => Box::new(MemorySlots::new()),
        };
        debug!(backend = ?self.backend, "Opened slot storage");
        Ok(storage)
    }

    pub fn open_store(&self) -> Result<TaskStore> {
        self.validate()?;
        let storage = self.open_storage()?;
        TaskStore::open(storage, &self.store_name)
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::File => write!(f, "file"),
            Backend::Sqlite => write!(f, "sqlite"),
            Backend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(eyre!("Unknown log level: {} (expected error, warn, info, debug or trace)", other)),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Backend::File),
            "sqlite" => Ok(Backend::Sqlite),
            "memory" => Ok(Backend::Memory),
            other => Err(eyre!("Unknown backend: {} (expected file, sqlite or memory)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewTask;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store_name, "task-store");
        assert_eq!(config.backend, Backend::File);
        assert_eq!(config.log_level, LogLevel::Warn);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = Config::from_yaml("backend: sqlite\nlog_level: debug\n").unwrap();
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.store_name, "task-store");
    }

    #[test]
    fn test_from_yaml_empty() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_from_yaml_rejects_bad_values() {
        assert!(Config::from_yaml("backend: postgres\n").is_err());
        assert!(Config::from_yaml("store_name: \"../boards\"\n").is_err());
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(Config::load(Some(temp.path().join("nope.yaml").as_path())).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "store_name: work-board\nbackend: memory\n").unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.store_name, "work-board");
        assert_eq!(config.backend, Backend::Memory);
    }

    #[test]
    fn test_data_dir_override() {
        let config = Config {
            data_dir: Some(PathBuf::from("/tmp/boards")),
            ..Config::default()
        };
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/boards"));
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(tracing::Level::from(LogLevel::Trace), tracing::Level::TRACE);
        assert_eq!(tracing::Level::from(LogLevel::Error), tracing::Level::ERROR);
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("SQLite".parse::<Backend>().unwrap(), Backend::Sqlite);
        assert!("redis".parse::<Backend>().is_err());
        assert_eq!(Backend::Memory.to_string(), "memory");
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!(" warning ".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    fn reopen_keeps_tasks(backend: Backend) {
        let temp = TempDir::new().unwrap();
        let config = Config {
            backend,
            data_dir: Some(temp.path().to_path_buf()),
            ..Config::default()
        };

        let due = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let id = {
            let mut store = config.open_store().unwrap();
            store.add_task(NewTask::new("Survives restart", due))
        };

        let store = config.open_store().unwrap();
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.get_task(&id).unwrap().title, "Survives restart");
    }

    #[test]
    fn test_file_backend_reopen() {
        reopen_keeps_tasks(Backend::File);
    }

    #[test]
    fn test_sqlite_backend_reopen() {
        reopen_keeps_tasks(Backend::Sqlite);
    }

    #[test]
    fn test_memory_backend_does_not_persist() {
        let config = Config {
            backend: Backend::Memory,
            ..Config::default()
        };
        {
            let mut store = config.open_store().unwrap();
            store.add_task(NewTask::new("Ephemeral", NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()));
        }
        assert!(config.open_store().unwrap().tasks().is_empty());
    }
}
