//! RenderSupervisor facade: the public API consumed by the host.
//!
//! The host interacts with render processes through this single type. It
//! owns the session registry: one session per open view, each with at most
//! one live `d2 --watch` subprocess.
//!
//! Single writer: only `&mut self` methods touch the registry. Subprocess
//! tasks push [`RenderEvent`]s into a channel that `poll_events` drains.

use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, TcpListener};
use std::path::Path;

use d2_types::{ViewHandle, ViewId};
use tokio::sync::mpsc;

use crate::artifact::{self, ArtifactJanitor};
use crate::command::RenderCommand;
use crate::log::{self, LogLevel, RenderLog};
use crate::process::RunningRender;
use crate::types::{
    CompilerConfig, LogDisplay, NoopDisplay, RenderEvent, RenderStopReason, SessionState,
};

/// Ask the OS for a free TCP port, then release it for the compiler to bind.
fn allocate_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    Ok(listener.local_addr()?.port())
}

struct RenderSession {
    command: RenderCommand,
    process: Option<RunningRender>,
    log: RenderLog,
}

pub struct RenderSupervisor {
    config: CompilerConfig,
    sessions: HashMap<ViewId, RenderSession>,
    janitor: ArtifactJanitor,
    display: Box<dyn LogDisplay>,
    event_rx: mpsc::UnboundedReceiver<RenderEvent>,
    event_tx: mpsc::UnboundedSender<RenderEvent>,
    next_generation: u64,
}

impl RenderSupervisor {
    #[must_use]
    pub fn new(config: CompilerConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            config,
            sessions: HashMap::new(),
            janitor: ArtifactJanitor::new(),
            display: Box::new(NoopDisplay),
            event_rx,
            event_tx,
            next_generation: 1,
        }
    }

    #[must_use]
    pub fn with_display(mut self, display: Box<dyn LogDisplay>) -> Self {
        self.display = display;
        self
    }

    #[must_use]
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Render `view`, replacing any process already rendering it.
    ///
    /// A first render allocates the session's artifact and port and uses the
    /// default theme and layout. Later renders keep source, artifact and port
    /// and pick up the view's current theme/layout selections. The previous
    /// process, if any, is killed and awaited (bounded) before the new one
    /// starts. Nothing is returned: failures end up in the session log.
    pub async fn compile(&mut self, view: &ViewHandle) {
        let id = view.id();
        let Some(source) = view.source() else {
            tracing::warn!(view = %id, "Cannot render a view without a source file");
            return;
        };

        let restarting = self.sessions.contains_key(&id);
        if !restarting {
            match Self::new_command(source) {
                Ok(command) => {
                    self.sessions.insert(
                        id,
                        RenderSession {
                            command,
                            process: None,
                            log: RenderLog::default(),
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(view = %id, "Failed to prepare render session: {e}");
                    return;
                }
            }
        }

        // The session stays registered across the wait; a cancelled compile
        // leaves it terminated.
        let previous = self
            .sessions
            .get_mut(&id)
            .and_then(|session| session.process.take());

        // A process that already exited has nothing to wait for.
        if let Some(process) = previous
            && !process.is_terminated()
        {
            let timeout = self.config.termination_timeout();
            let line = match process.terminate(timeout).await {
                Some(elapsed) => log::plugin_line(
                    LogLevel::Info,
                    &format!("D2 process termination {}ms", elapsed.as_millis()),
                ),
                None => log::plugin_line(
                    LogLevel::Warn,
                    &format!(
                        "D2 process did not terminate within {}ms",
                        timeout.as_millis()
                    ),
                ),
            };
            tracing::info!(view = %id, "{line}");
            if let Some(session) = self.sessions.get_mut(&id) {
                session.log.push(line);
            }
        }

        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        if restarting {
            let theme = view.theme().unwrap_or_default();
            let layout = view.layout().cloned().unwrap_or_default();
            session.command = session.command.with_preferences(theme, layout);
        }

        if let Err(e) = artifact::ensure_placeholder(session.command.dest()) {
            session.log.push(log::plugin_line(
                LogLevel::Warn,
                &format!("cannot create {}: {e}", session.command.dest().display()),
            ));
        }

        let seed = if restarting {
            "restarting process..."
        } else {
            "starting process..."
        };
        session.log.push(log::plugin_line(LogLevel::Info, seed));

        let generation = self.next_generation;
        self.next_generation += 1;
        match RunningRender::start(
            id,
            generation,
            &session.command,
            &self.config,
            self.event_tx.clone(),
        ) {
            Ok(process) => {
                tracing::info!(
                    view = %id,
                    generation,
                    port = session.command.port(),
                    "Render process started for {}",
                    session.command.source().display()
                );
                session.process = Some(process);
            }
            Err(e) => {
                tracing::warn!(view = %id, "Failed to start render process: {e:#}");
                session
                    .log
                    .push(log::plugin_line(LogLevel::Error, &format!("{e:#}")));
            }
        }

        self.display.update(id, session.log.lines());
    }

    fn new_command(source: &Path) -> std::io::Result<RenderCommand> {
        let dest = artifact::create_placeholder()?;
        match allocate_port() {
            Ok(port) => Ok(RenderCommand::new(source, dest, port)),
            Err(e) => {
                let _ = std::fs::remove_file(&dest);
                Err(e)
            }
        }
    }

    /// Forget `view`: its selections are cleared and its process is killed.
    ///
    /// Does not wait for the process. Its artifact is deleted once the exit
    /// is observed by `poll_events`.
    pub fn close_file(&mut self, view: &mut ViewHandle) {
        view.clear_preferences();
        let id = view.id();

        if let Some(session) = self.sessions.remove(&id) {
            match session.process {
                Some(process) => process.request_termination(),
                None => {
                    // No exit event will come for this session.
                    self.janitor.schedule(session.command.dest().to_path_buf());
                    self.flush_artifacts();
                }
            }
        }

        tracing::info!(view = %id, "Closed file");
    }

    /// Drain pending events from render tasks, up to `budget`.
    ///
    /// Non-blocking: returns immediately if no events are available.
    pub fn poll_events(&mut self, budget: usize) -> usize {
        let mut count = 0;
        while count < budget {
            match self.event_rx.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                    count += 1;
                }
                Err(mpsc::error::TryRecvError::Empty | mpsc::error::TryRecvError::Disconnected) => {
                    break;
                }
            }
        }
        if self.janitor.pending() > 0 {
            self.flush_artifacts();
        }
        count
    }

    fn handle_event(&mut self, event: RenderEvent) {
        match event {
            RenderEvent::Output {
                view,
                channel,
                text,
                ..
            } => {
                let line = log::normalize_output(channel, &text);
                tracing::debug!(view = %view, "{line}");
                // Output for a closed view is dropped.
                let Some(session) = self.sessions.get_mut(&view) else {
                    return;
                };
                session.log.push(line);
                self.display.update(view, session.log.lines());
            }
            RenderEvent::Exited {
                view,
                generation,
                artifact,
                reason,
            } => {
                match &reason {
                    RenderStopReason::Exited(code) => {
                        tracing::info!(view = %view, generation, ?code, "Render process exited");
                    }
                    RenderStopReason::Failed(msg) => {
                        tracing::warn!(view = %view, generation, error = %msg, "Render process failed");
                    }
                }
                if let Some(session) = self.sessions.get_mut(&view)
                    && session
                        .process
                        .as_ref()
                        .is_some_and(|p| p.generation() == generation)
                {
                    session.process = None;
                }
                self.janitor.schedule(artifact);
            }
        }
    }

    fn flush_artifacts(&mut self) {
        let live: HashSet<&Path> = self
            .sessions
            .values()
            .map(|session| session.command.dest())
            .collect();
        self.janitor.flush(&live);
    }

    #[must_use]
    pub fn session_state(&self, view: ViewId) -> SessionState {
        match self.sessions.get(&view) {
            None => SessionState::Absent,
            Some(session) => match &session.process {
                Some(process) if !process.is_terminated() => SessionState::Running,
                _ => SessionState::Terminated,
            },
        }
    }

    #[must_use]
    pub fn has_session(&self, view: ViewId) -> bool {
        self.sessions.contains_key(&view)
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// The invocation descriptor of `view`'s session.
    #[must_use]
    pub fn command(&self, view: ViewId) -> Option<&RenderCommand> {
        self.sessions.get(&view).map(|session| &session.command)
    }

    #[must_use]
    pub fn log(&self, view: ViewId) -> Option<&RenderLog> {
        self.sessions.get(&view).map(|session| &session.log)
    }

    /// Drop every session and delete their artifacts.
    ///
    /// Processes are not awaited; dropping their handles kills them.
    pub fn teardown(&mut self) {
        let count = self.sessions.len();
        for (_, session) in self.sessions.drain() {
            self.janitor.schedule(session.command.dest().to_path_buf());
        }
        self.janitor.flush(&HashSet::new());
        tracing::info!(sessions = count, "Render supervisor torn down");
    }

    #[cfg(test)]
    pub(crate) fn event_tx(&self) -> &mpsc::UnboundedSender<RenderEvent> {
        &self.event_tx
    }
}

impl Drop for RenderSupervisor {
    fn drop(&mut self) {
        if !self.sessions.is_empty() {
            self.teardown();
        }
    }
}
