//! The `watch` subcommand: keep a live render of one source file.
//!
//! Plays the part of an editor view. The file is rendered on start and
//! re-rendered whenever a filesystem event touches it; the session log is
//! echoed to stdout as it grows. Ctrl-C closes the view and waits briefly for
//! the render process to go away so its artifact is cleaned up.

use std::collections::HashMap;
use std::io::{Write, stdout};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use d2_render::{CompilerConfig, LogDisplay, RenderSupervisor};
use d2_types::{Layout, Theme, ViewHandle, ViewId};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

/// Upper bound on events handled per tick.
const EVENT_BUDGET: usize = 256;

const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub source: PathBuf,
    pub theme: Option<Theme>,
    pub layout: Option<Layout>,
    pub poll_interval: Duration,
}

/// Prints each view's log lines once, as they are appended.
#[derive(Debug, Default)]
pub struct StdoutDisplay {
    printed: Mutex<HashMap<ViewId, usize>>,
}

impl StdoutDisplay {
    /// Lines of `log` not yet shown for `view`.
    fn take_unprinted<'a>(&self, view: ViewId, log: &'a [String]) -> &'a [String] {
        let mut printed = self.printed.lock().unwrap_or_else(PoisonError::into_inner);
        let cursor = printed.entry(view).or_insert(0);
        // A shorter log means the session was replaced.
        if *cursor > log.len() {
            *cursor = 0;
        }
        let fresh = &log[*cursor..];
        *cursor = log.len();
        fresh
    }
}

impl LogDisplay for StdoutDisplay {
    fn update(&self, view: ViewId, log: &[String]) {
        let fresh = self.take_unprinted(view, log);
        if fresh.is_empty() {
            return;
        }
        let mut out = stdout().lock();
        for line in fresh {
            let _ = writeln!(out, "{line}");
        }
        let _ = out.flush();
    }
}

/// Whether `event` means `source` may have new content.
fn touches_source(event: &Event, source: &Path) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event.paths.iter().any(|path| path == source)
}

/// Watch `source` for changes.
///
/// The parent directory is watched rather than the file: editors that save
/// by writing a new file and renaming it over the old one would otherwise
/// detach the watch after the first save.
fn watch_source(source: &Path) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<()>)> {
    let dir = source
        .parent()
        .with_context(|| format!("{} has no parent directory", source.display()))?;
    let (tx, rx) = mpsc::unbounded_channel();
    let target = source.to_path_buf();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) if touches_source(&event, &target) => {
                let _ = tx.send(());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("File watch error: {e}"),
        },
        notify::Config::default(),
    )
    .context("creating file watcher")?;
    watcher
        .watch(dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("watching {}", dir.display()))?;
    Ok((watcher, rx))
}

/// Open `source` as a view and render it with the requested preferences.
///
/// A new session always starts with the default theme and layout, and
/// selections reach the compiler through a restart, as when a user picks a
/// theme in an open preview. Explicit preferences therefore cost one extra
/// spawn, which is terminated before its replacement starts.
async fn open_view(
    supervisor: &mut RenderSupervisor,
    source: &Path,
    options: &WatchOptions,
) -> ViewHandle {
    let mut view = ViewHandle::new(ViewId::new(1), source);
    supervisor.compile(&view).await;
    if options.theme.is_some() || options.layout.is_some() {
        view.set_theme(options.theme);
        view.set_layout(options.layout.clone());
        supervisor.compile(&view).await;
    }
    view
}

pub async fn run(config: CompilerConfig, options: WatchOptions) -> Result<()> {
    let source = tokio::fs::canonicalize(&options.source)
        .await
        .with_context(|| format!("cannot open {}", options.source.display()))?;
    // Dropping the watcher stops the notifications.
    let (_watcher, mut changes) = watch_source(&source)?;

    let grace = config.termination_timeout();
    let mut supervisor =
        RenderSupervisor::new(config).with_display(Box::new(StdoutDisplay::default()));
    let mut view = open_view(&mut supervisor, &source, &options).await;

    let artifact = supervisor
        .command(view.id())
        .map(|command| command.dest().to_path_buf());
    if let Some(artifact) = &artifact {
        println!("Rendering {} to {}", source.display(), artifact.display());
    }

    let mut ticks = tokio::time::interval(options.poll_interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    tracing::warn!("Failed to listen for Ctrl-C: {e}");
                }
                break;
            }
            Some(()) = changes.recv() => {
                // One save usually arrives as several events.
                while changes.try_recv().is_ok() {}
                tracing::info!(path = %source.display(), "Source changed, re-rendering");
                supervisor.compile(&view).await;
            }
            _ = ticks.tick() => {
                supervisor.poll_events(EVENT_BUDGET);
            }
        }
    }

    supervisor.close_file(&mut view);
    if let Some(artifact) = artifact {
        let deadline = Instant::now() + grace;
        while artifact.exists() && Instant::now() < deadline {
            tokio::time::sleep(SHUTDOWN_POLL).await;
            supervisor.poll_events(EVENT_BUDGET);
        }
        if artifact.exists() {
            tracing::warn!(path = %artifact.display(), "Render artifact left behind");
        }
    }
    supervisor.teardown();
    Ok(())
}
