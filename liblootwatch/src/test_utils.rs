//! Shared helpers for the test suite.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;

use crate::config::ConfigStore;
use crate::error::Result;
use crate::events::{Notification, Notifier};

lazy_static! {
    /// Global mutex to serialize environment-variable modifications in tests.
    pub static ref ENV_MUTEX: Mutex<()> = Mutex::new(());
}

/// In-memory [`ConfigStore`] with no backing file.
#[derive(Default)]
pub struct MemoryConfig {
    strings: Mutex<HashMap<String, String>>,
    bools: Mutex<HashMap<String, bool>>,
}

impl MemoryConfig {
    pub fn with(entries: &[(&str, &str)]) -> Arc<Self> {
        let config = Self::default();
        for (key, value) in entries {
            config.set_string(key, value);
        }
        Arc::new(config)
    }
}

impl ConfigStore for MemoryConfig {
    fn get_string(&self, key: &str) -> Option<String> {
        self.strings.lock().unwrap().get(key).cloned()
    }

    fn get_bool(&self, key: &str) -> bool {
        self.bools.lock().unwrap().get(key).copied().unwrap_or(false)
    }

    fn set_string(&self, key: &str, value: &str) {
        self.strings
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
    }

    fn set_bool(&self, key: &str, value: bool) {
        self.bools.lock().unwrap().insert(key.to_owned(), value);
    }

    fn persist(&self) -> Result<()> {
        Ok(())
    }
}

/// [`Notifier`] that records every delivered notification.
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count_of(&self, event: Notification) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|seen| **seen == event)
            .count()
    }

    pub fn total(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: Notification) {
        self.seen.lock().unwrap().push(event);
    }
}
