//! Book-keeping for downloads observed as created but not yet complete.
//!
//! Download mechanisms materialize the destination file first (a create
//! event, often zero-length) and then write bytes into it. A write event
//! within the timeout of the recorded create is the tail of that same
//! download; a write long after is an unrelated later edit.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// What a write event means for a path, given what was seen earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No create was observed for this path.
    Unknown,
    /// A create was observed, but longer ago than the download timeout.
    Expired,
    /// The write is the tail of a download that started `elapsed` ago.
    Completed { elapsed: Duration },
}

/// Map from downloads-directory path to the time its create event was seen.
pub struct PendingDownloads {
    entries: HashMap<PathBuf, Instant>,
    timeout: Duration,
}

impl PendingDownloads {
    pub fn new(timeout: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            timeout,
        }
    }

    /// Record the create event for `path`, (re)starting its window.
    pub fn record_created(&mut self, path: &Path) {
        self.entries.insert(path.to_path_buf(), Instant::now());
    }

    /// Resolve a write event for `path`.
    ///
    /// Any existing entry is consumed: completed and expired downloads
    /// alike leave the map, so a stale entry never lingers past its first
    /// write.
    pub fn resolve_written(&mut self, path: &Path) -> WriteOutcome {
        match self.entries.remove(path) {
            None => WriteOutcome::Unknown,
            Some(started) => {
                let elapsed = started.elapsed();
                if elapsed > self.timeout {
                    WriteOutcome::Expired
                } else {
                    WriteOutcome::Completed { elapsed }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn write_without_create_is_unknown() {
        let mut pending = PendingDownloads::new(Duration::from_secs(2));
        assert_eq!(
            pending.resolve_written(Path::new("/d/x.filter")),
            WriteOutcome::Unknown
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn create_then_write_within_window_completes() {
        let mut pending = PendingDownloads::new(Duration::from_secs(2));
        let path = Path::new("/d/x.filter");

        pending.record_created(path);
        assert_eq!(pending.len(), 1);

        match pending.resolve_written(path) {
            WriteOutcome::Completed { elapsed } => assert!(elapsed < Duration::from_secs(2)),
            other => panic!("expected completion, got {other:?}"),
        }
        assert!(pending.is_empty());
    }

    #[test]
    fn late_write_expires_and_clears_the_entry() {
        let mut pending = PendingDownloads::new(Duration::from_millis(30));
        let path = Path::new("/d/x.filter");

        pending.record_created(path);
        thread::sleep(Duration::from_millis(60));

        assert_eq!(pending.resolve_written(path), WriteOutcome::Expired);
        assert!(pending.is_empty());

        // a second write sees no entry at all
        assert_eq!(pending.resolve_written(path), WriteOutcome::Unknown);
    }

    #[test]
    fn recreate_restarts_the_window() {
        let mut pending = PendingDownloads::new(Duration::from_millis(50));
        let path = Path::new("/d/x.filter");

        pending.record_created(path);
        thread::sleep(Duration::from_millis(35));
        pending.record_created(path);
        thread::sleep(Duration::from_millis(35));

        assert!(matches!(
            pending.resolve_written(path),
            WriteOutcome::Completed { .. }
        ));
    }
}
