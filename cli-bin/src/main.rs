//! lootwatch CLI entry-point.
//!
//! The engine lives in the `liblootwatch` crate; this binary handles
//! argument parsing, logging and wiring the watcher to a console
//! notifier.

#![deny(warnings)]

mod cli;

use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use clap::Parser;
use liblootwatch::config::{
    KEY_DOWNLOADS_DIRECTORY, KEY_DOWNLOADS_NAMED_FILE, KEY_DOWNLOADS_WATCH_STRATEGY,
    KEY_FILTERS_DIRECTORY, KEY_FILTERS_OVERWRITE_STRATEGY, KEY_FILTERS_SELECTED_FILE,
};
use liblootwatch::events::{Notification, Notifier};
use liblootwatch::strategy::{OverwriteStrategy, WatchStrategy};
use liblootwatch::watcher::WatcherConfig;
use liblootwatch::{logging, Lootwatch};
use tracing::info;

use cli::{Cli, Commands, ConfigCmd};

const CONFIG_KEYS: [&str; 6] = [
    KEY_FILTERS_DIRECTORY,
    KEY_FILTERS_OVERWRITE_STRATEGY,
    KEY_FILTERS_SELECTED_FILE,
    KEY_DOWNLOADS_DIRECTORY,
    KEY_DOWNLOADS_WATCH_STRATEGY,
    KEY_DOWNLOADS_NAMED_FILE,
];

/// Logs engine notifications; stands in for a GUI front end.
struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Notification) {
        info!("Event: {}", event.as_str());
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    if args.verbose {
        env::set_var("RUST_LOG", "debug");
    }
    logging::init();

    let app = Lootwatch::open_default()?;

    match args.command {
        Commands::Run { dry_run, paused } => run_watch(&app, dry_run, paused)?,

        Commands::Config { action } => match action {
            ConfigCmd::Show => {
                let store = app.config();
                for key in CONFIG_KEYS {
                    println!("{key} = {}", store.get_string(key).unwrap_or_default());
                }
            }
            ConfigCmd::Set { key, value } => set_config(&app, &key, &value)?,
        },

        Commands::List { dir } => list_filters(&app, dir)?,
    }

    Ok(())
}

fn run_watch(app: &Lootwatch, dry_run: bool, paused: bool) -> Result<()> {
    if paused && !app.is_paused() {
        app.toggle_pause();
    }

    let settings = WatcherConfig {
        dry_run,
        ..WatcherConfig::default()
    };
    let mut watcher = app.watch(Arc::new(LogNotifier), settings)?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("setting Ctrl-C handler")?;

    info!("Watching for filter downloads, press Ctrl-C to exit");
    while !interrupted.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(200));
    }

    watcher.stop()
}

fn set_config(app: &Lootwatch, key: &str, value: &str) -> Result<()> {
    if !CONFIG_KEYS.contains(&key) {
        bail!("unknown configuration key `{key}`");
    }

    // reject strategy values the engine would later refuse to parse
    if key == KEY_DOWNLOADS_WATCH_STRATEGY {
        value.parse::<WatchStrategy>()?;
    }
    if key == KEY_FILTERS_OVERWRITE_STRATEGY {
        value.parse::<OverwriteStrategy>()?;
    }

    let store = app.config();
    store.set_string(key, value);
    store.persist()?;
    println!("{key} = {value}");
    Ok(())
}

fn list_filters(app: &Lootwatch, dir: Option<PathBuf>) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => match app
            .config()
            .get_string(KEY_FILTERS_DIRECTORY)
            .filter(|v| !v.is_empty())
        {
            Some(configured) => PathBuf::from(configured),
            None => bail!("no directory given and filters.directory is unset"),
        },
    };

    let mut files = app.list_filter_files(&dir)?;
    files.sort_by(|a, b| a.name.cmp(&b.name));

    for entry in files {
        let created: DateTime<Local> = entry.created.into();
        println!("{}\t{}", created.format("%Y-%m-%d %H:%M"), entry.name);
    }
    Ok(())
}
