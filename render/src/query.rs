//! One-shot compiler queries.
//!
//! Each query runs the compiler once with a bounded wait. Failures never
//! propagate: a missing or misbehaving compiler means the dependent feature
//! is unavailable, so callers get `None` (or a generic format error).

use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;

use d2_types::{FormatResult, LayoutEngine};
use thiserror::Error;

use crate::command::{CommandOutput, CompilerCommand};
use crate::process::build_command;
use crate::types::CompilerConfig;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{command} not found in PATH")]
    NotFound {
        command: String,
        #[source]
        source: which::Error,
    },
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read output of {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} did not finish within {}ms", timeout.as_millis())]
    Timeout { command: String, timeout: Duration },
    #[error("{command} exited with {status}: {output}")]
    ExitStatus {
        command: String,
        status: ExitStatus,
        output: String,
    },
}

/// Raw result of a finished one-shot invocation.
#[derive(Debug, Clone)]
pub struct QueryOutput {
    status: ExitStatus,
    /// Stdout followed by stderr.
    text: String,
}

impl QueryOutput {
    #[must_use]
    pub fn status(&self) -> ExitStatus {
        self.status
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Run `invocation` once, bounded by the configured query timeout.
///
/// The child is killed if the bound elapses.
pub async fn run_oneshot(
    config: &CompilerConfig,
    invocation: &CompilerCommand<'_>,
) -> Result<QueryOutput, QueryError> {
    let label = format!("{} {}", config.command(), invocation.name());
    let mut cmd = build_command(config, invocation).map_err(|source| QueryError::NotFound {
        command: config.command().to_string(),
        source,
    })?;
    let child = cmd.spawn().map_err(|source| QueryError::Spawn {
        command: label.clone(),
        source,
    })?;

    let timeout = config.query_timeout();
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(QueryError::Io {
                command: label,
                source,
            });
        }
        // Dropping the wait future drops the child, which kills it.
        Err(_) => {
            return Err(QueryError::Timeout {
                command: label,
                timeout,
            });
        }
    };

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(QueryOutput {
        status: output.status,
        text,
    })
}

/// Run a query that must exit successfully, and parse its output.
async fn checked_query(
    config: &CompilerConfig,
    invocation: &CompilerCommand<'_>,
) -> Option<CommandOutput> {
    let result = run_oneshot(config, invocation).await.and_then(|output| {
        if output.status.success() {
            Ok(output)
        } else {
            Err(QueryError::ExitStatus {
                command: format!("{} {}", config.command(), invocation.name()),
                status: output.status,
                output: output.text.trim().to_string(),
            })
        }
    });
    match result {
        Ok(output) => Some(invocation.parse_output(&output.text)),
        Err(e @ QueryError::NotFound { .. }) => {
            tracing::debug!("Compiler query unavailable: {e}");
            None
        }
        Err(e) => {
            tracing::warn!("Compiler query failed: {e}");
            None
        }
    }
}

/// The compiler's version string, e.g. `v0.6.3`.
pub async fn compiler_version(config: &CompilerConfig) -> Option<String> {
    match checked_query(config, &CompilerCommand::Version).await? {
        CommandOutput::Version(version) if !version.is_empty() => Some(version),
        _ => None,
    }
}

pub async fn is_compiler_installed(config: &CompilerConfig) -> bool {
    compiler_version(config).await.is_some()
}

/// Layout engines the installed compiler knows about.
pub async fn layout_engines(config: &CompilerConfig) -> Option<Vec<LayoutEngine>> {
    match checked_query(config, &CompilerCommand::LayoutEngines).await? {
        CommandOutput::LayoutEngines(engines) => Some(engines),
        _ => None,
    }
}

/// Run the formatter over `path`.
///
/// The exit status is not consulted: a parse failure is recognized by the
/// marker in the output, which is then carried as the diagnostic.
pub async fn format(config: &CompilerConfig, path: &Path) -> FormatResult {
    let invocation = CompilerCommand::Format(path);
    let content = match run_oneshot(config, &invocation).await {
        Ok(output) => match invocation.parse_output(output.text()) {
            CommandOutput::Format(content) => Some(content),
            _ => None,
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), "Formatter did not run: {e}");
            None
        }
    };
    FormatResult::classify(content)
}
