//! Error types for lootwatch
//!
//! The taxonomy mirrors how failures are surfaced: configuration problems
//! abort a single replacement attempt, subscription and I/O problems are
//! logged and the loop keeps running, and an event outside both watched
//! directories is reported as an invariant violation.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Convenience wrapper around `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// An IO error
    Io(io::Error),

    /// An error from the notify subscription
    Watch(String),

    /// Invalid or unparseable configuration
    Config(String),

    /// An event whose path lies in neither watched directory
    OutsideWatchedDirs(PathBuf),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Watch(msg) => write!(f, "Watch error: {}", msg),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::OutsideWatchedDirs(path) => write!(
                f,
                "Event path is in neither watched directory: {}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<notify::Error> for Error {
    fn from(err: notify::Error) -> Self {
        Self::Watch(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
