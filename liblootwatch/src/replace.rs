//! Replacement engine.
//!
//! Given a completed download, decides whether the configured strategies
//! want it copied over the target filter file, and performs the copy.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::{
    ConfigStore, KEY_DOWNLOADS_NAMED_FILE, KEY_DOWNLOADS_WATCH_STRATEGY, KEY_FILTERS_SELECTED_FILE,
};
use crate::error::Result;
use crate::strategy::WatchStrategy;
use crate::utils::file_names_equal;

/// A replacement the engine decided should happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementPlan {
    pub source: PathBuf,
    pub target: PathBuf,
}

pub struct ReplacementEngine {
    config: Arc<dyn ConfigStore>,
}

impl ReplacementEngine {
    pub fn new(config: Arc<dyn ConfigStore>) -> Self {
        Self { config }
    }

    /// Evaluate the configured strategies for a completed download.
    ///
    /// Returns `Ok(None)` when no replacement should happen: either no
    /// target file is configured yet, or the named-file strategy rejects
    /// this download. Returns `Err` when the configuration itself is
    /// unusable.
    pub fn plan(
        &self,
        downloads_dir: &Path,
        filters_dir: &Path,
        completed_name: &str,
    ) -> Result<Option<ReplacementPlan>> {
        let raw = self
            .config
            .get_string(KEY_DOWNLOADS_WATCH_STRATEGY)
            .unwrap_or_default();
        let strategy: WatchStrategy = raw.parse()?;

        let target_name = match self
            .config
            .get_string(KEY_FILTERS_SELECTED_FILE)
            .filter(|name| !name.is_empty())
        {
            Some(name) => name,
            None => {
                debug!("No filter file to replace selected, doing nothing");
                return Ok(None);
            }
        };

        if strategy == WatchStrategy::NamedFile {
            let named = self
                .config
                .get_string(KEY_DOWNLOADS_NAMED_FILE)
                .unwrap_or_default();
            if !file_names_equal(completed_name, &named) {
                debug!(
                    "Downloaded file name doesn't match exact watched file name: {} != {}",
                    completed_name, named
                );
                return Ok(None);
            }
        }

        Ok(Some(ReplacementPlan {
            source: downloads_dir.join(completed_name),
            target: filters_dir.join(target_name),
        }))
    }
}

/// Copy the downloaded bytes over the target, truncating it.
pub fn copy_filter_file(plan: &ReplacementPlan) -> io::Result<u64> {
    fs::copy(&plan.source, &plan.target)
}
