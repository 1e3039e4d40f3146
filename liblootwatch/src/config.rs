//! Configuration store.
//!
//! The watcher core reads (and the embedding front end writes) a small
//! string-keyed store behind the [`ConfigStore`] trait, so the engine never
//! touches the on-disk format directly. The shipped implementation keeps a
//! flat JSON object in the platform config directory.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use directories::{ProjectDirs, UserDirs};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Result;
use crate::strategy::{OverwriteStrategy, WatchStrategy};

pub const KEY_FILTERS_DIRECTORY: &str = "filters.directory";
pub const KEY_FILTERS_OVERWRITE_STRATEGY: &str = "filters.overwrite_strategy";
pub const KEY_FILTERS_SELECTED_FILE: &str = "filters.selected_file";

pub const KEY_DOWNLOADS_DIRECTORY: &str = "downloads.directory";
pub const KEY_DOWNLOADS_WATCH_STRATEGY: &str = "downloads.watch_strategy";
pub const KEY_DOWNLOADS_NAMED_FILE: &str = "downloads.named_file";

/// Read/write capability handed to the watcher core at construction.
///
/// The core only ever reads; writes come from the front end, so implementors
/// must be usable behind a shared reference.
pub trait ConfigStore: Send + Sync {
    fn get_string(&self, key: &str) -> Option<String>;
    fn get_bool(&self, key: &str) -> bool;
    fn set_string(&self, key: &str, value: &str);
    fn set_bool(&self, key: &str, value: bool);

    /// Flush the store to its backing file.
    fn persist(&self) -> Result<()>;
}

/// Flat JSON config file.
pub struct JsonConfig {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonConfig {
    /// Resolve the config path and load it, merging defaults for any
    /// missing keys.
    ///
    /// Priority:
    /// 1. `LOOTWATCH_CONFIG_PATH` env-var (explicit override)
    /// 2. Platform config dir (e.g. `~/.config/lootwatch/config.json`)
    /// 3. Fallback to `./lootwatch.json` when no config dir resolves
    pub fn load() -> Result<Self> {
        if let Some(val) = std::env::var_os("LOOTWATCH_CONFIG_PATH") {
            return Self::load_from(PathBuf::from(val));
        }

        if let Some(dirs) = ProjectDirs::from("io", "Lootwatch", "lootwatch") {
            return Self::load_from(dirs.config_dir().join("config.json"));
        }

        Self::load_from(PathBuf::from("lootwatch.json"))
    }

    /// Load from an explicit path — handy for tests or portable installs.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut values = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<Map<String, Value>>(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {}, starting from defaults", path.display());
                Map::new()
            }
            Err(err) => return Err(err.into()),
        };

        for (key, value) in defaults() {
            values.entry(key).or_insert(value);
        }

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonConfig {
    fn get_string(&self, key: &str) -> Option<String> {
        let values = self.values.lock().expect("config mutex");
        match values.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }

    fn get_bool(&self, key: &str) -> bool {
        let values = self.values.lock().expect("config mutex");
        matches!(values.get(key), Some(Value::Bool(true)))
    }

    fn set_string(&self, key: &str, value: &str) {
        let mut values = self.values.lock().expect("config mutex");
        values.insert(key.to_owned(), Value::String(value.to_owned()));
    }

    fn set_bool(&self, key: &str, value: bool) {
        let mut values = self.values.lock().expect("config mutex");
        values.insert(key.to_owned(), Value::Bool(value));
    }

    fn persist(&self) -> Result<()> {
        let values = self.values.lock().expect("config mutex");
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_vec_pretty(&Value::Object(values.clone()))?;
        std::fs::write(&self.path, body)?;
        debug!("Persisted config to {}", self.path.display());
        Ok(())
    }
}

fn defaults() -> Vec<(String, Value)> {
    vec![
        (
            KEY_FILTERS_DIRECTORY.to_owned(),
            path_value(default_filters_directory()),
        ),
        (
            KEY_FILTERS_OVERWRITE_STRATEGY.to_owned(),
            Value::String(OverwriteStrategy::SelectedFile.as_str().to_owned()),
        ),
        (KEY_FILTERS_SELECTED_FILE.to_owned(), Value::Null),
        (
            KEY_DOWNLOADS_DIRECTORY.to_owned(),
            path_value(default_downloads_directory()),
        ),
        (
            KEY_DOWNLOADS_WATCH_STRATEGY.to_owned(),
            Value::String(WatchStrategy::NewestFilterFile.as_str().to_owned()),
        ),
        (KEY_DOWNLOADS_NAMED_FILE.to_owned(), Value::Null),
    ]
}

fn path_value(path: Option<PathBuf>) -> Value {
    match path {
        Some(path) => Value::String(path.to_string_lossy().into_owned()),
        None => Value::Null,
    }
}

fn default_downloads_directory() -> Option<PathBuf> {
    UserDirs::new().and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
}

/// Path of Exile writes its filters next to the save data under Documents.
#[cfg(windows)]
fn default_filters_directory() -> Option<PathBuf> {
    UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(Path::to_path_buf))
        .map(|docs| docs.join("My Games").join("Path of Exile"))
}

#[cfg(not(windows))]
fn default_filters_directory() -> Option<PathBuf> {
    None
}
