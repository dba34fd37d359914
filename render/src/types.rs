//! Public types consumed by the host.
//!
//! The host constructs a [`CompilerConfig`], drives the supervisor, and reads
//! [`SessionState`]s and logs back out. [`RenderEvent`]s flow from subprocess
//! tasks into the supervisor and are only public so hosts can log them.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use d2_types::ViewId;

/// Default bound for one-shot queries (`version`, `layout`, `fmt`).
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_millis(500);

/// Default bound for waiting on a superseded render process to exit.
pub const DEFAULT_TERMINATION_TIMEOUT: Duration = Duration::from_secs(2);

/// How to invoke the `d2` compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Executable name or path, resolved through `PATH`.
    command: String,
    /// Arguments placed before every subcommand.
    args: Vec<String>,
    /// Environment overlay merged into every invocation.
    env: BTreeMap<String, String>,
    query_timeout: Duration,
    termination_timeout: Duration,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self::new("d2")
    }
}

impl CompilerConfig {
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            termination_timeout: DEFAULT_TERMINATION_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_termination_timeout(mut self, timeout: Duration) -> Self {
        self.termination_timeout = timeout;
        self
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    #[must_use]
    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    #[must_use]
    pub fn termination_timeout(&self) -> Duration {
        self.termination_timeout
    }
}

/// Which stream a line of subprocess output arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputChannel {
    /// Lines the supervisor emits about the process (command line, exit code).
    System,
    Stdout,
    Stderr,
}

impl OutputChannel {
    #[must_use]
    pub fn is_system(self) -> bool {
        self == Self::System
    }
}

/// Why a render process stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderStopReason {
    /// The process exited; `None` when it was killed by a signal.
    Exited(Option<i32>),
    /// Waiting on the process failed.
    Failed(String),
}

/// An event emitted by a render process task.
///
/// Every event carries the generation of the subprocess instance that
/// produced it, so events from a superseded instance are recognizable.
#[derive(Debug)]
pub enum RenderEvent {
    Output {
        view: ViewId,
        generation: u64,
        channel: OutputChannel,
        text: String,
    },
    /// Sent once per instance, after both output streams are closed.
    Exited {
        view: ViewId,
        generation: u64,
        /// The artifact this instance was rendering to.
        artifact: PathBuf,
        reason: RenderStopReason,
    },
}

/// Observable state of a view's render session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session is registered for the view.
    Absent,
    /// A subprocess is attached and has not exited.
    Running,
    /// The session exists but its last subprocess has exited (or never started).
    Terminated,
}

/// Display collaborator refreshed whenever a view's log grows.
pub trait LogDisplay: Send {
    fn update(&self, view: ViewId, log: &[String]);
}

/// A display that ignores updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDisplay;

impl LogDisplay for NoopDisplay {
    fn update(&self, _view: ViewId, _log: &[String]) {}
}
