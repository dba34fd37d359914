//! Render process handle: owns one `d2 --watch` child and its output tasks.
//!
//! The child itself lives in a waiter task; the handle keeps a kill switch
//! and an exit flag. Dropping the handle kills the child.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use d2_types::ViewId;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot, watch};

use crate::command::{CompilerCommand, RenderCommand};
use crate::types::{CompilerConfig, OutputChannel, RenderEvent, RenderStopReason};

/// Build a `tokio` command for `invocation` under `config`.
///
/// Resolves the executable through `PATH` so a missing compiler is reported
/// before anything is spawned.
pub(crate) fn build_command(
    config: &CompilerConfig,
    invocation: &CompilerCommand<'_>,
) -> Result<Command, which::Error> {
    let program = which::which(config.command())?;
    let mut cmd = Command::new(program);
    cmd.args(config.args())
        .args(invocation.args())
        .envs(invocation.env_overlay().iter().copied())
        .envs(config.env())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    Ok(cmd)
}

pub(crate) struct RunningRender {
    generation: u64,
    kill_tx: Option<oneshot::Sender<()>>,
    exited: watch::Receiver<bool>,
}

impl RunningRender {
    /// Spawn the render process for `command` and its output/exit tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        view: ViewId,
        generation: u64,
        command: &RenderCommand,
        config: &CompilerConfig,
        event_tx: mpsc::UnboundedSender<RenderEvent>,
    ) -> Result<Self> {
        let invocation = CompilerCommand::Generate(command);
        let mut cmd = build_command(config, &invocation)
            .with_context(|| format!("{} not found in PATH", config.command()))?;
        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {}", config.command()))?;

        let stdout = child.stdout.take().context("no stdout from child")?;
        let stderr = child.stderr.take().context("no stderr from child")?;

        let _ = event_tx.send(RenderEvent::Output {
            view,
            generation,
            channel: OutputChannel::System,
            text: describe_invocation(config, &invocation),
        });

        let stdout_task = tokio::spawn(forward_lines(
            stdout,
            view,
            generation,
            OutputChannel::Stdout,
            event_tx.clone(),
        ));
        let stderr_task = tokio::spawn(forward_lines(
            stderr,
            view,
            generation,
            OutputChannel::Stderr,
            event_tx.clone(),
        ));

        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let (exited_tx, exited_rx) = watch::channel(false);
        let artifact = command.dest().to_path_buf();

        // Detached: the exit flag and the `Exited` event report completion.
        tokio::spawn(async move {
            // A dropped kill switch counts as a kill request.
            let status = tokio::select! {
                status = child.wait() => status,
                _ = kill_rx => {
                    let _ = child.start_kill();
                    child.wait().await
                }
            };
            let _ = exited_tx.send(true);

            // Exit is only reported once both streams are drained.
            let _ = stdout_task.await;
            let _ = stderr_task.await;

            let reason = match status {
                Ok(status) => RenderStopReason::Exited(status.code()),
                Err(e) => RenderStopReason::Failed(e.to_string()),
            };
            let summary = match &reason {
                RenderStopReason::Exited(Some(code)) => {
                    format!("process finished with exit code {code}")
                }
                RenderStopReason::Exited(None) => "process terminated by signal".to_string(),
                RenderStopReason::Failed(msg) => format!("waiting on process failed: {msg}"),
            };
            let _ = event_tx.send(RenderEvent::Output {
                view,
                generation,
                channel: OutputChannel::System,
                text: summary,
            });
            let _ = event_tx.send(RenderEvent::Exited {
                view,
                generation,
                artifact,
                reason,
            });
        });

        Ok(Self {
            generation,
            kill_tx: Some(kill_tx),
            exited: exited_rx,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the child has exited.
    pub fn is_terminated(&self) -> bool {
        *self.exited.borrow()
    }

    /// Ask the child to die without waiting for it.
    pub fn request_termination(mut self) {
        self.send_kill();
    }

    /// Kill the child and wait up to `timeout` for it to exit.
    ///
    /// Returns the observed termination latency, or `None` if the bound
    /// elapsed first. The kill has been delivered either way.
    pub async fn terminate(mut self, timeout: Duration) -> Option<Duration> {
        let started = Instant::now();
        self.send_kill();
        let mut exited = self.exited.clone();
        match tokio::time::timeout(timeout, exited.wait_for(|done| *done)).await {
            // A closed channel means the waiter task is gone, and the child with it.
            Ok(_) => Some(started.elapsed()),
            Err(_) => None,
        }
    }

    fn send_kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Forward each line of `stream` as an output event until EOF.
async fn forward_lines<R>(
    stream: R,
    view: ViewId,
    generation: u64,
    channel: OutputChannel,
    event_tx: mpsc::UnboundedSender<RenderEvent>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf).into_owned();
                let event = RenderEvent::Output {
                    view,
                    generation,
                    channel,
                    text,
                };
                if event_tx.send(event).is_err() {
                    // Supervisor is gone; nobody is listening.
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(view = %view, "Render output read error: {e}");
                break;
            }
        }
    }
}

/// The command line, as shown at the top of a session's log.
fn describe_invocation(config: &CompilerConfig, invocation: &CompilerCommand<'_>) -> String {
    let mut parts = vec![config.command().to_string()];
    parts.extend(config.args().iter().cloned());
    parts.extend(
        invocation
            .args()
            .iter()
            .map(|arg| Path::new(arg).display().to_string()),
    );
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_invocation_lists_full_command_line() {
        let config = CompilerConfig::new("d2").with_args(["--debug"]);
        let cmd = RenderCommand::new("/work/a.d2", "/tmp/out.svg", 9000);
        assert_eq!(
            describe_invocation(&config, &CompilerCommand::Generate(&cmd)),
            "d2 --debug /work/a.d2 /tmp/out.svg --layout=dagre --theme=0 --port=9000 --watch"
        );
    }

    #[test]
    fn build_command_reports_missing_executable() {
        let config = CompilerConfig::new("d2-definitely-not-installed-here");
        assert!(build_command(&config, &CompilerCommand::Version).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dropped_handle_kills_child_and_reports_exit() {
        let config = CompilerConfig::new("sh").with_args(["-c", "exec sleep 30", "sh"]);
        let cmd = RenderCommand::new("/work/a.d2", "/tmp/dropped.svg", 9000);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let process = RunningRender::start(ViewId::new(1), 4, &cmd, &config, tx).unwrap();
        let mut exited = process.exited.clone();
        drop(process);

        tokio::time::timeout(Duration::from_secs(5), exited.wait_for(|done| *done))
            .await
            .unwrap()
            .unwrap();
        let reported = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(event) = rx.recv().await {
                if let RenderEvent::Exited { generation, .. } = event {
                    return Some(generation);
                }
            }
            None
        })
        .await
        .unwrap();
        assert_eq!(reported, Some(4));
    }

    #[tokio::test]
    async fn forward_lines_emits_one_event_per_line() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let input: &[u8] = b"first\n12:00:00 second\nno newline";
        forward_lines(input, ViewId::new(1), 3, OutputChannel::Stdout, tx).await;

        let mut texts = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                RenderEvent::Output {
                    generation,
                    channel,
                    text,
                    ..
                } => {
                    assert_eq!(generation, 3);
                    assert_eq!(channel, OutputChannel::Stdout);
                    texts.push(text);
                }
                other @ RenderEvent::Exited { .. } => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(texts, ["first\n", "12:00:00 second\n", "no newline"]);
    }
}
