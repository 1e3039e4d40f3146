//! Directory watcher and download-correlation engine.
//!
//! Subscribes to raw file-system notifications on the filters and
//! downloads directories, classifies every event, correlates create/write
//! pairs into completed downloads, and hands completed downloads to the
//! replacement engine. A dedicated thread drives the control loop and is
//! the sole mutator of watcher state; byte copies and notification flushes
//! run on detached threads so the loop never stalls between events.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcherTrait};
use tracing::{debug, error, info, trace, warn};

use crate::config::ConfigStore;
use crate::error::Error;
use crate::events::{DebouncedEmitter, Notification, Notifier};
use crate::pending::{PendingDownloads, WriteOutcome};
use crate::replace::{copy_filter_file, ReplacementEngine, ReplacementPlan};
use crate::utils::is_filter_file;

// Tuning values carried over from the shipped application. Exposed through
// `WatcherConfig` so tests can shorten them, but not re-tuned.
const DEFAULT_EMIT_COOLDOWN: Duration = Duration::from_millis(500);
const DEFAULT_FLUSH_WAIT: Duration = Duration::from_millis(200);
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Minimum spacing between two outward notifications of one category.
    pub emit_cooldown: Duration,
    /// Delay between accepting a notification and delivering it.
    pub flush_wait: Duration,
    /// How long after its create event a write still counts as the same
    /// download.
    pub download_timeout: Duration,
    /// Log replacements without copying any bytes.
    pub dry_run: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            emit_cooldown: DEFAULT_EMIT_COOLDOWN,
            flush_wait: DEFAULT_FLUSH_WAIT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            dry_run: false,
        }
    }
}

/// The two roles a watched directory can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirRole {
    Filters,
    Downloads,
}

impl DirRole {
    fn label(self) -> &'static str {
        match self {
            Self::Filters => "filters",
            Self::Downloads => "downloads",
        }
    }
}

/// Operation kinds the correlation procedure distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventOp {
    Create,
    Write,
    Remove,
    Rename,
    MetadataChange,
}

impl EventOp {
    fn from_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Create),
            EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Other) => Some(Self::Write),
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Rename),
            EventKind::Modify(ModifyKind::Metadata(_)) => Some(Self::MetadataChange),
            EventKind::Remove(_) => Some(Self::Remove),
            _ => None,
        }
    }
}

/// Where the event classifier routes a raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    /// Paused, a directory unset, or not a `.filter` file.
    Drop,
    /// Generic activity in the filters directory.
    FiltersActivity,
    /// A downloads-directory event for the correlation procedure.
    DownloadCorrelation,
    /// In neither watched directory — an invariant violation.
    OutsideWatchedDirs,
}

fn classify(
    paused: bool,
    filters_dir: Option<&Path>,
    downloads_dir: Option<&Path>,
    path: &Path,
) -> Classification {
    if paused {
        return Classification::Drop;
    }
    let (Some(filters_dir), Some(downloads_dir)) = (filters_dir, downloads_dir) else {
        return Classification::Drop;
    };
    if !is_filter_file(path) {
        return Classification::Drop;
    }
    if path.starts_with(filters_dir) {
        return Classification::FiltersActivity;
    }
    if path.starts_with(downloads_dir) {
        return Classification::DownloadCorrelation;
    }
    Classification::OutsideWatchedDirs
}

enum Command {
    SetDirectory { role: DirRole, path: PathBuf },
    CopyDone(ReplacementPlan, io::Result<u64>),
}

/// Lifecycle/status snapshot.
#[derive(Debug, Clone)]
pub struct WatcherStatus {
    pub running: bool,
    /// Raw events that made it past the drop filter.
    pub events_handled: usize,
}

/// Handle to the control loop. Construction wires up the `notify`
/// subscription; [`FilterWatcher::start`] spawns the loop thread.
pub struct FilterWatcher {
    command_tx: Sender<Command>,
    stop_tx: Sender<()>,
    teardown_rx: Receiver<std::result::Result<(), Error>>,
    events_handled: Arc<AtomicUsize>,
    state: Option<LoopState>,
    handle: Option<JoinHandle<()>>,
}

impl FilterWatcher {
    pub fn new(
        config: Arc<dyn ConfigStore>,
        notifier: Arc<dyn Notifier>,
        paused: Arc<AtomicBool>,
        settings: WatcherConfig,
    ) -> Result<Self> {
        let (event_tx, event_rx) = unbounded();
        let (notify_err_tx, notify_err_rx) = unbounded();
        let (command_tx, command_rx) = unbounded();
        let (stop_tx, stop_rx) = bounded(1);
        let (teardown_tx, teardown_rx) = bounded(1);

        let fs_watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    let _ = event_tx.send(event);
                }
                Err(err) => {
                    let _ = notify_err_tx.send(err);
                }
            },
            notify::Config::default(),
        )
        .context("Failed to create file system watcher")?;

        let events_handled = Arc::new(AtomicUsize::new(0));
        let emitter = DebouncedEmitter::new(notifier, settings.emit_cooldown, settings.flush_wait);
        let pending = PendingDownloads::new(settings.download_timeout);
        let replacer = ReplacementEngine::new(config);

        let state = LoopState {
            fs_watcher,
            event_rx,
            notify_err_rx,
            command_rx,
            command_tx: command_tx.clone(),
            stop_rx,
            teardown_tx,
            paused,
            settings,
            emitter,
            pending,
            replacer,
            filters_dir: None,
            downloads_dir: None,
            events_handled: events_handled.clone(),
        };

        Ok(Self {
            command_tx,
            stop_tx,
            teardown_rx,
            events_handled,
            state: Some(state),
            handle: None,
        })
    }

    /// Begin consuming events on a dedicated background thread.
    pub fn start(&mut self) -> Result<()> {
        let state = self
            .state
            .take()
            .ok_or_else(|| anyhow!("Watcher already started"))?;
        let handle = thread::Builder::new()
            .name("lootwatch-events".into())
            .spawn(move || state.run())
            .context("Failed to spawn watcher thread")?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Replace the filters-side subscription. No-op if the path is
    /// unchanged.
    pub fn set_filters_directory(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.send(Command::SetDirectory {
            role: DirRole::Filters,
            path: path.into(),
        })
    }

    /// Replace the downloads-side subscription. No-op if the path is
    /// unchanged.
    pub fn set_downloads_directory(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.send(Command::SetDirectory {
            role: DirRole::Downloads,
            path: path.into(),
        })
    }

    /// Signal the loop to terminate and wait for the subscription to close.
    ///
    /// Safe to call more than once; later calls are no-ops.
    pub fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        info!("Stopping file watcher");
        let _ = self.stop_tx.send(());
        handle
            .join()
            .map_err(|_| anyhow!("Watcher thread panicked"))?;

        match self.teardown_rx.try_recv() {
            Ok(Ok(())) => {
                debug!("Stopped file watcher");
                Ok(())
            }
            Ok(Err(err)) => Err(err).context("Failed to close file system subscription"),
            // loop exited without reporting teardown (its channels closed)
            Err(_) => Ok(()),
        }
    }

    pub fn status(&self) -> WatcherStatus {
        WatcherStatus {
            running: self.handle.is_some(),
            events_handled: self.events_handled.load(Ordering::Relaxed),
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| anyhow!("Watcher loop is not running"))
    }
}

impl Drop for FilterWatcher {
    fn drop(&mut self) {
        let _ = self.stop(); // ignore errors during drop
    }
}

struct LoopState {
    fs_watcher: RecommendedWatcher,
    event_rx: Receiver<notify::Event>,
    notify_err_rx: Receiver<notify::Error>,
    command_rx: Receiver<Command>,
    command_tx: Sender<Command>,
    stop_rx: Receiver<()>,
    teardown_tx: Sender<std::result::Result<(), Error>>,

    paused: Arc<AtomicBool>,
    settings: WatcherConfig,
    emitter: DebouncedEmitter,
    pending: PendingDownloads,
    replacer: ReplacementEngine,

    filters_dir: Option<PathBuf>,
    downloads_dir: Option<PathBuf>,
    events_handled: Arc<AtomicUsize>,
}

impl LoopState {
    fn run(mut self) {
        let event_rx = self.event_rx.clone();
        let notify_err_rx = self.notify_err_rx.clone();
        let command_rx = self.command_rx.clone();
        let stop_rx = self.stop_rx.clone();

        loop {
            select! {
                recv(event_rx) -> msg => match msg {
                    Ok(event) => self.handle_fs_event(event),
                    Err(_) => break,
                },
                recv(notify_err_rx) -> msg => match msg {
                    // subscription errors do not terminate the watch
                    Ok(err) => warn!("Got error from file watcher: {err}"),
                    Err(_) => break,
                },
                recv(command_rx) -> msg => match msg {
                    Ok(command) => self.handle_command(command),
                    Err(_) => break,
                },
                recv(stop_rx) -> _ => {
                    let result = self.teardown();
                    let _ = self.teardown_tx.send(result);
                    break;
                }
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetDirectory { role, path } => self.set_directory(role, path),
            Command::CopyDone(plan, result) => self.finish_replacement(plan, result),
        }
    }

    fn set_directory(&mut self, role: DirRole, path: PathBuf) {
        let current = match role {
            DirRole::Filters => self.filters_dir.take(),
            DirRole::Downloads => self.downloads_dir.take(),
        };

        if current.as_deref() == Some(path.as_path()) {
            debug!("{} directory unchanged", role.label());
            self.store_dir(role, current);
            return;
        }

        if let Some(previous) = &current {
            debug!(
                "Removing watch on previous {} directory {}",
                role.label(),
                previous.display()
            );
            if let Err(err) = self.fs_watcher.unwatch(previous) {
                warn!("Failed to remove previous {} watch: {err}", role.label());
            }
        }

        match self.fs_watcher.watch(&path, RecursiveMode::NonRecursive) {
            Ok(()) => {
                debug!("Now watching {} directory {}", role.label(), path.display());
                self.store_dir(role, Some(path));
            }
            Err(err) => {
                error!(
                    "Failed to watch {} directory {}: {err}",
                    role.label(),
                    path.display()
                );
                self.store_dir(role, None);
            }
        }
    }

    fn store_dir(&mut self, role: DirRole, value: Option<PathBuf>) {
        match role {
            DirRole::Filters => self.filters_dir = value,
            DirRole::Downloads => self.downloads_dir = value,
        }
    }

    fn handle_fs_event(&mut self, event: notify::Event) {
        let op = EventOp::from_kind(&event.kind);
        for path in &event.paths {
            if let Err(err) = self.handle_path_event(path, op) {
                error!("Failed to handle file watcher event: {err}");
            }
        }
    }

    fn handle_path_event(&mut self, path: &Path, op: Option<EventOp>) -> crate::error::Result<()> {
        let classification = classify(
            self.paused.load(Ordering::Relaxed),
            self.filters_dir.as_deref(),
            self.downloads_dir.as_deref(),
            path,
        );

        match classification {
            Classification::Drop => {
                trace!("Dropping event for {}", path.display());
                return Ok(());
            }
            Classification::FiltersActivity => {
                debug!(
                    "File watcher event in filters directory: {} ({op:?})",
                    display_name(path)
                );
                self.emitter.emit(Notification::WatchActivity);
            }
            Classification::DownloadCorrelation => {
                self.correlate_download(path, op);
            }
            Classification::OutsideWatchedDirs => {
                self.events_handled.fetch_add(1, Ordering::Relaxed);
                return Err(Error::OutsideWatchedDirs(path.to_path_buf()));
            }
        }

        self.events_handled.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn correlate_download(&mut self, path: &Path, op: Option<EventOp>) {
        let name = display_name(path);
        match op {
            Some(EventOp::Create) => {
                debug!("Detected new filter download: {name}");
                self.pending.record_created(path);
            }
            Some(EventOp::Write) => match self.pending.resolve_written(path) {
                WriteOutcome::Unknown => {
                    trace!("Write event for a file we're probably done downloading: {name}");
                }
                WriteOutcome::Expired => {
                    debug!("Write event after download timeout exceeded, ignoring: {name}");
                }
                WriteOutcome::Completed { elapsed } => {
                    debug!("Download completed: {name} (time since start: {elapsed:?})");
                    self.emitter.emit(Notification::WatchActivity);
                    self.run_replacement(&name);
                }
            },
            Some(EventOp::Remove) | Some(EventOp::Rename) | Some(EventOp::MetadataChange) => {
                trace!("Other watch-event-worthy file operation: {name} ({op:?})");
                self.emitter.emit(Notification::WatchActivity);
            }
            None => {
                trace!("Unclassified file operation on {name}, ignoring");
            }
        }
    }

    fn run_replacement(&mut self, completed_name: &str) {
        let (Some(downloads_dir), Some(filters_dir)) = (&self.downloads_dir, &self.filters_dir)
        else {
            return;
        };

        let plan = match self
            .replacer
            .plan(downloads_dir, filters_dir, completed_name)
        {
            Ok(Some(plan)) => plan,
            Ok(None) => return,
            Err(err) => {
                error!("Failed to replace filter file: {err}");
                return;
            }
        };

        info!(
            "Replacing filter file: {} -> {}",
            plan.source.display(),
            plan.target.display()
        );

        if self.settings.dry_run {
            debug!("Dry run, not actually replacing filter file");
            self.finish_replacement(plan, Ok(0));
            return;
        }

        let command_tx = self.command_tx.clone();
        thread::spawn(move || {
            let result = copy_filter_file(&plan);
            let _ = command_tx.send(Command::CopyDone(plan, result));
        });
    }

    fn finish_replacement(&mut self, plan: ReplacementPlan, result: io::Result<u64>) {
        match result {
            Ok(_) => {
                debug!(
                    "Successfully replaced filter file: {} -> {}",
                    plan.source.display(),
                    plan.target.display()
                );
                self.emitter.emit(Notification::FilterReplaced);
            }
            Err(err) => {
                error!(
                    "Failed to copy {} to {}: {err}",
                    plan.source.display(),
                    plan.target.display()
                );
            }
        }
    }

    fn teardown(&mut self) -> std::result::Result<(), Error> {
        for dir in [self.filters_dir.take(), self.downloads_dir.take()]
            .into_iter()
            .flatten()
        {
            self.fs_watcher.unwatch(&dir).map_err(|err| {
                Error::Watch(format!("closing watch on {}: {err}", dir.display()))
            })?;
        }
        Ok(())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
