//! Outward notifications and their debouncing.
//!
//! The watcher tells the presentation layer *that* something happened,
//! never what: both notifications are payload-less. Bursts are coalesced
//! in two steps. Repeat emissions of one category inside the cooldown
//! window are suppressed entirely, and every delivered notification is
//! held back for a short flush interval so the burst of underlying
//! file-system events can settle first.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::trace;

/// Notification categories delivered to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notification {
    /// Something changed in one of the watched directories.
    WatchActivity,
    /// A completed download was copied over the target filter file.
    FilterReplaced,
}

impl Notification {
    /// Wire name of the notification, as front ends know it.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WatchActivity => "watch_event_triggered",
            Self::FilterReplaced => "filter_file_replaced",
        }
    }
}

/// Notification-emit capability handed to the watcher at construction.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: Notification);
}

/// Per-category cooldown tracking plus deferred delivery.
///
/// Owned and mutated exclusively by the control loop. The only thing that
/// leaves the loop thread is the detached flush timer, which holds no
/// emitter state.
pub struct DebouncedEmitter {
    notifier: Arc<dyn Notifier>,
    last_emit: HashMap<Notification, Instant>,
    cooldown: Duration,
    flush_wait: Duration,
}

impl DebouncedEmitter {
    pub fn new(notifier: Arc<dyn Notifier>, cooldown: Duration, flush_wait: Duration) -> Self {
        Self {
            notifier,
            last_emit: HashMap::new(),
            cooldown,
            flush_wait,
        }
    }

    /// Emit `event` unless its category already fired inside the cooldown
    /// window.
    ///
    /// Delivery happens after the flush interval on a detached thread, so a
    /// pending flush never stalls processing of the next raw event.
    pub fn emit(&mut self, event: Notification) {
        let now = Instant::now();
        if let Some(last) = self.last_emit.get(&event) {
            if now.duration_since(*last) < self.cooldown {
                trace!("Suppressing {} inside cooldown window", event.as_str());
                return;
            }
        }
        self.last_emit.insert(event, now);

        let notifier = Arc::clone(&self.notifier);
        let flush_wait = self.flush_wait;
        thread::spawn(move || {
            thread::sleep(flush_wait);
            notifier.notify(event);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingNotifier;

    fn emitter(notifier: Arc<RecordingNotifier>) -> DebouncedEmitter {
        DebouncedEmitter::new(
            notifier,
            Duration::from_millis(200),
            Duration::from_millis(10),
        )
    }

    #[test]
    fn burst_within_cooldown_delivers_exactly_once() {
        let notifier = RecordingNotifier::new();
        let mut emitter = emitter(notifier.clone());

        emitter.emit(Notification::WatchActivity);
        emitter.emit(Notification::WatchActivity);
        emitter.emit(Notification::WatchActivity);

        thread::sleep(Duration::from_millis(100));
        assert_eq!(notifier.count_of(Notification::WatchActivity), 1);
    }

    #[test]
    fn categories_cool_down_independently() {
        let notifier = RecordingNotifier::new();
        let mut emitter = emitter(notifier.clone());

        emitter.emit(Notification::WatchActivity);
        emitter.emit(Notification::FilterReplaced);

        thread::sleep(Duration::from_millis(100));
        assert_eq!(notifier.count_of(Notification::WatchActivity), 1);
        assert_eq!(notifier.count_of(Notification::FilterReplaced), 1);
    }

    #[test]
    fn emission_resumes_after_cooldown() {
        let notifier = RecordingNotifier::new();
        let mut emitter = emitter(notifier.clone());

        emitter.emit(Notification::WatchActivity);
        thread::sleep(Duration::from_millis(250));
        emitter.emit(Notification::WatchActivity);

        thread::sleep(Duration::from_millis(100));
        assert_eq!(notifier.count_of(Notification::WatchActivity), 2);
    }

    #[test]
    fn delivery_waits_for_the_flush_interval() {
        let notifier = RecordingNotifier::new();
        let mut emitter = DebouncedEmitter::new(
            notifier.clone(),
            Duration::from_millis(200),
            Duration::from_millis(80),
        );

        emitter.emit(Notification::WatchActivity);
        assert_eq!(notifier.count_of(Notification::WatchActivity), 0);

        thread::sleep(Duration::from_millis(200));
        assert_eq!(notifier.count_of(Notification::WatchActivity), 1);
    }
}
