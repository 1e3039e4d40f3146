//! The two strategy axes controlling replacement behavior.
//!
//! Both axes are independent two-way choices: the downloads side decides
//! which completed download qualifies as a replacement source, the filters
//! side decides which existing filter file is the replacement target.
//! Values are stored in configuration as strings and parsed defensively.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Which completed downloads qualify as a replacement source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStrategy {
    /// Any completed `.filter` download qualifies.
    NewestFilterFile,
    /// Only a download matching the configured name (case-insensitively).
    NamedFile,
}

impl WatchStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewestFilterFile => "newest_filter_file",
            Self::NamedFile => "named_file",
        }
    }
}

impl FromStr for WatchStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "newest_filter_file" => Ok(Self::NewestFilterFile),
            "named_file" => Ok(Self::NamedFile),
            other => Err(Error::Config(format!(
                "unknown downloads watch strategy `{other}`"
            ))),
        }
    }
}

impl fmt::Display for WatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which existing filter file gets overwritten by a qualifying download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteStrategy {
    /// The file the user picked from the filters directory.
    SelectedFile,
    /// A file named explicitly in configuration.
    NamedFile,
}

impl OverwriteStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelectedFile => "selected_file",
            Self::NamedFile => "named_file",
        }
    }
}

impl FromStr for OverwriteStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "selected_file" => Ok(Self::SelectedFile),
            "named_file" => Ok(Self::NamedFile),
            other => Err(Error::Config(format!(
                "unknown filters overwrite strategy `{other}`"
            ))),
        }
    }
}

impl fmt::Display for OverwriteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_strategy_parses_known_values() {
        assert_eq!(
            "newest_filter_file".parse::<WatchStrategy>().unwrap(),
            WatchStrategy::NewestFilterFile
        );
        assert_eq!(
            "named_file".parse::<WatchStrategy>().unwrap(),
            WatchStrategy::NamedFile
        );
    }

    #[test]
    fn overwrite_strategy_parses_known_values() {
        assert_eq!(
            "selected_file".parse::<OverwriteStrategy>().unwrap(),
            OverwriteStrategy::SelectedFile
        );
        assert_eq!(
            "named_file".parse::<OverwriteStrategy>().unwrap(),
            OverwriteStrategy::NamedFile
        );
    }

    #[test]
    fn unknown_values_are_config_errors() {
        assert!("newest".parse::<WatchStrategy>().is_err());
        assert!("".parse::<WatchStrategy>().is_err());
        assert!("Selected_File".parse::<OverwriteStrategy>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for strategy in [WatchStrategy::NewestFilterFile, WatchStrategy::NamedFile] {
            assert_eq!(
                strategy.to_string().parse::<WatchStrategy>().unwrap(),
                strategy
            );
        }
    }
}
