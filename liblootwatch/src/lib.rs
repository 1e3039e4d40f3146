//! liblootwatch – core engine for the lootwatch filter updater.
//!
//! Watches a downloads directory for finished `.filter` downloads and
//! copies them over the active filter file in the game's filter
//! directory. Front ends (the CLI today) should depend only on the
//! facade and the traits exported here, never on module internals.

#![deny(warnings)]

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod pending;
pub mod replace;
pub mod strategy;
pub mod utils;
pub mod watcher;

#[cfg(test)]
mod test_utils;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::{debug, info};

use config::{ConfigStore, JsonConfig};
use events::Notifier;
use strategy::{OverwriteStrategy, WatchStrategy};
use watcher::{FilterWatcher, WatcherConfig};

/// Primary facade – load configuration, then hand out watchers.
pub struct Lootwatch {
    config: Arc<JsonConfig>,
    paused: Arc<AtomicBool>,
}

impl Lootwatch {
    /// Load configuration from its default location.
    pub fn open_default() -> Result<Self> {
        let config = JsonConfig::load().context("loading configuration")?;
        Ok(Self::from_config(config))
    }

    /// Load configuration from an explicit path – handy for tests or
    /// portable installs.
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        let config = JsonConfig::load_from(path).context("loading configuration")?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: JsonConfig) -> Self {
        Self {
            config: Arc::new(config),
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared handle to the configuration store.
    pub fn config(&self) -> Arc<dyn ConfigStore> {
        self.config.clone()
    }

    /// Build and start a watcher wired to this configuration, then apply
    /// the configured directories where they exist on disk.
    pub fn watch(
        &self,
        notifier: Arc<dyn Notifier>,
        settings: WatcherConfig,
    ) -> Result<FilterWatcher> {
        let mut watcher =
            FilterWatcher::new(self.config(), notifier, self.paused.clone(), settings)?;
        watcher.start()?;

        if let Some(dir) = self.configured_dir(config::KEY_FILTERS_DIRECTORY) {
            watcher.set_filters_directory(dir)?;
        }
        if let Some(dir) = self.configured_dir(config::KEY_DOWNLOADS_DIRECTORY) {
            watcher.set_downloads_directory(dir)?;
        }

        Ok(watcher)
    }

    fn configured_dir(&self, key: &str) -> Option<PathBuf> {
        let value = self.config.get_string(key).filter(|v| !v.is_empty())?;
        let dir = PathBuf::from(value);
        dir.is_dir().then_some(dir)
    }

    /// Flip the process-wide pause flag; returns the new value.
    pub fn toggle_pause(&self) -> bool {
        let paused = !self.paused.load(Ordering::Relaxed);
        self.paused.store(paused, Ordering::Relaxed);
        if paused {
            info!("Pausing");
        } else {
            info!("Resuming");
        }
        paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Update the filters directory and persist the store.
    pub fn set_filters_directory(&self, dir: &Path) -> Result<()> {
        self.config
            .set_string(config::KEY_FILTERS_DIRECTORY, &dir.to_string_lossy());
        self.config.persist().context("persisting configuration")
    }

    /// Update the downloads directory and persist the store.
    pub fn set_downloads_directory(&self, dir: &Path) -> Result<()> {
        self.config
            .set_string(config::KEY_DOWNLOADS_DIRECTORY, &dir.to_string_lossy());
        self.config.persist().context("persisting configuration")
    }

    /// Update the filters-side strategy and its target file together.
    pub fn set_filters_strategy(&self, strategy: OverwriteStrategy, file_name: &str) -> Result<()> {
        self.config
            .set_string(config::KEY_FILTERS_OVERWRITE_STRATEGY, strategy.as_str());
        self.config
            .set_string(config::KEY_FILTERS_SELECTED_FILE, file_name);
        self.config.persist().context("persisting configuration")
    }

    /// Update the downloads-side strategy and its named file together.
    pub fn set_downloads_strategy(&self, strategy: WatchStrategy, file_name: &str) -> Result<()> {
        self.config
            .set_string(config::KEY_DOWNLOADS_WATCH_STRATEGY, strategy.as_str());
        self.config
            .set_string(config::KEY_DOWNLOADS_NAMED_FILE, file_name);
        self.config.persist().context("persisting configuration")
    }

    /// Enumerate `.filter` files in `dir` (non-recursive).
    pub fn list_filter_files(&self, dir: &Path) -> Result<Vec<FilterFileEntry>> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("reading directory {}", dir.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() || !utils::is_filter_file(&path) {
                continue;
            }

            let meta = entry.metadata()?;
            let mut created = meta.modified()?;
            // prefer the birth time where the filesystem reports one
            if let Ok(birth) = meta.created() {
                if birth > created {
                    created = birth;
                }
            }

            files.push(FilterFileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                created,
            });
        }

        debug!("Found {} filter files in {}", files.len(), dir.display());
        Ok(files)
    }
}

/// A `.filter` file found by [`Lootwatch::list_filter_files`].
#[derive(Debug, Clone)]
pub struct FilterFileEntry {
    pub name: String,
    pub created: SystemTime,
}
