//! Render supervisor against a real (shell) subprocess.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use d2_render::{RenderSupervisor, SessionState};
use d2_types::{Layout, Theme, ViewHandle, ViewId};

use crate::common::{FakeCompiler, process_alive, wait_until};

const BUDGET: usize = 64;

fn log_contains(supervisor: &RenderSupervisor, view: ViewId, needle: &str) -> bool {
    supervisor
        .log(view)
        .is_some_and(|log| log.contains(needle))
}

fn dest_of(supervisor: &RenderSupervisor, view: ViewId) -> PathBuf {
    supervisor.command(view).unwrap().dest().to_path_buf()
}

#[tokio::test]
async fn render_output_is_streamed_into_the_log() {
    let compiler = FakeCompiler::d2_like();
    let source = compiler.source("diagram.d2", "a -> b\n");
    let mut supervisor = RenderSupervisor::new(compiler.config());
    let view = ViewHandle::new(ViewId::new(1), &source);

    supervisor.compile(&view).await;
    assert_eq!(supervisor.session_state(view.id()), SessionState::Running);

    let compiled = format!("[process] info: compiling {}", source.display());
    assert!(
        wait_until(|| {
            supervisor.poll_events(BUDGET);
            log_contains(&supervisor, view.id(), &compiled)
                && log_contains(&supervisor, view.id(), "browser=")
        })
        .await
    );

    let lines = supervisor.log(view.id()).unwrap().lines().to_vec();
    assert_eq!(lines[0], "[plugin ] info: starting process...");
    assert!(lines[1].starts_with("[process] info: sh "));
    assert!(lines[1].contains("--layout=dagre --theme=0 --port="));
    assert!(lines[1].ends_with("--watch"));
    // Timestamps are stripped and the browser is suppressed.
    assert!(lines.contains(&"[process] info: browser=0".to_string()));

    let dest = dest_of(&supervisor, view.id());
    assert_eq!(fs::read_to_string(&dest).unwrap().trim(), "<svg>--theme=0</svg>");
    supervisor.teardown();
}

#[tokio::test]
async fn restart_terminates_previous_process_first() {
    let compiler = FakeCompiler::d2_like();
    let source = compiler.source("diagram.d2", "a -> b\n");
    let mut supervisor = RenderSupervisor::new(compiler.config());
    let mut view = ViewHandle::new(ViewId::new(1), &source);

    supervisor.compile(&view).await;
    assert!(wait_until(|| compiler.pids().len() == 1).await);
    let first = compiler.pids()[0];
    let port = supervisor.command(view.id()).unwrap().port();
    let dest = dest_of(&supervisor, view.id());

    view.set_theme(Some(Theme::DarkMauve));
    view.set_layout(Layout::new("elk"));
    supervisor.compile(&view).await;

    // The old instance is gone before the new one is started.
    assert!(!process_alive(first));
    assert_eq!(supervisor.session_count(), 1);
    assert_eq!(supervisor.session_state(view.id()), SessionState::Running);
    assert!(log_contains(&supervisor, view.id(), "D2 process termination"));
    assert!(log_contains(&supervisor, view.id(), "restarting process..."));

    let command = supervisor.command(view.id()).unwrap();
    assert_eq!(command.port(), port);
    assert_eq!(command.dest(), dest);
    assert_eq!(command.theme(), Theme::DarkMauve);
    assert_eq!(command.layout().as_str(), "elk");

    assert!(
        wait_until(|| {
            supervisor.poll_events(BUDGET);
            compiler.pids().len() == 2
                && fs::read_to_string(&dest).is_ok_and(|svg| svg.contains("--theme=200"))
        })
        .await
    );
    // The superseded instance's exit must not delete the live artifact.
    assert!(dest.exists());
    supervisor.teardown();
}

#[tokio::test]
async fn cancelled_restart_keeps_the_session() {
    let compiler = FakeCompiler::d2_like();
    let source = compiler.source("diagram.d2", "a -> b\n");
    let mut supervisor = RenderSupervisor::new(compiler.config());
    let mut view = ViewHandle::new(ViewId::new(1), &source);

    supervisor.compile(&view).await;
    assert!(wait_until(|| compiler.pids().len() == 1).await);
    let first = compiler.pids()[0];
    let port = supervisor.command(view.id()).unwrap().port();
    let dest = dest_of(&supervisor, view.id());

    // Abandon the restart while it waits for the old process to exit.
    view.set_theme(Some(Theme::DarkMauve));
    tokio::select! {
        biased;
        () = supervisor.compile(&view) => {}
        () = std::future::ready(()) => {}
    }

    assert!(supervisor.has_session(view.id()));
    assert_eq!(supervisor.session_count(), 1);
    assert_eq!(supervisor.command(view.id()).unwrap().port(), port);
    assert_eq!(dest_of(&supervisor, view.id()), dest);
    assert!(wait_until(|| !process_alive(first)).await);

    // The next compile resumes the same session.
    supervisor.compile(&view).await;
    assert_eq!(supervisor.session_state(view.id()), SessionState::Running);
    assert_eq!(supervisor.command(view.id()).unwrap().port(), port);
    assert_eq!(dest_of(&supervisor, view.id()), dest);
    assert_eq!(supervisor.command(view.id()).unwrap().theme(), Theme::DarkMauve);
    assert!(log_contains(&supervisor, view.id(), "restarting process..."));
    supervisor.teardown();
}

#[tokio::test]
async fn at_most_one_process_runs_per_view() {
    let compiler = FakeCompiler::d2_like();
    let source = compiler.source("diagram.d2", "a -> b\n");
    let mut supervisor = RenderSupervisor::new(compiler.config());
    let view = ViewHandle::new(ViewId::new(1), &source);

    for started in 1..=3 {
        supervisor.compile(&view).await;
        assert!(wait_until(|| compiler.pids().len() == started).await);
    }

    let alive: Vec<u32> = compiler
        .pids()
        .into_iter()
        .filter(|pid| process_alive(*pid))
        .collect();
    assert_eq!(alive.len(), 1);
    assert_eq!(alive[0], *compiler.pids().last().unwrap());
    supervisor.teardown();
}

#[tokio::test]
async fn close_file_kills_process_and_deletes_artifact() {
    let compiler = FakeCompiler::d2_like();
    let source = compiler.source("diagram.d2", "a -> b\n");
    let mut supervisor = RenderSupervisor::new(compiler.config());
    let mut view = ViewHandle::new(ViewId::new(1), &source);
    view.set_theme(Some(Theme::Terminal));

    supervisor.compile(&view).await;
    assert!(wait_until(|| compiler.pids().len() == 1).await);
    let pid = compiler.pids()[0];
    let dest = dest_of(&supervisor, view.id());

    supervisor.close_file(&mut view);
    assert_eq!(view.theme(), None);
    assert_eq!(supervisor.session_state(view.id()), SessionState::Absent);

    assert!(
        wait_until(|| {
            supervisor.poll_events(BUDGET);
            !dest.exists()
        })
        .await
    );
    assert!(!process_alive(pid));
}

#[tokio::test]
async fn exited_process_leaves_terminated_session() {
    let compiler = FakeCompiler::new(
        r#"
echo "err: failed to compile $1: syntax error" >&2
exit 1
"#,
    );
    let source = compiler.source("broken.d2", "a -> \n");
    let mut supervisor = RenderSupervisor::new(compiler.config());
    let view = ViewHandle::new(ViewId::new(7), &source);

    supervisor.compile(&view).await;
    let dest = dest_of(&supervisor, view.id());

    assert!(
        wait_until(|| {
            supervisor.poll_events(BUDGET);
            supervisor.session_state(view.id()) == SessionState::Terminated
                && log_contains(&supervisor, view.id(), "exit code 1")
        })
        .await
    );
    assert!(log_contains(
        &supervisor,
        view.id(),
        "[process] err: failed to compile"
    ));
    assert!(log_contains(
        &supervisor,
        view.id(),
        "[process] info: process finished with exit code 1"
    ));
    // The session still owns its artifact.
    assert!(dest.exists());

    // Recompiling a terminated session starts a fresh process without waiting.
    supervisor.compile(&view).await;
    assert!(!log_contains(&supervisor, view.id(), "D2 process termination"));
    assert!(log_contains(&supervisor, view.id(), "restarting process..."));
    supervisor.teardown();
    assert!(!dest.exists());
}

#[tokio::test]
async fn teardown_removes_every_session_and_artifact() {
    let compiler = FakeCompiler::d2_like();
    let mut supervisor = RenderSupervisor::new(compiler.config());
    let a = ViewHandle::new(ViewId::new(1), compiler.source("a.d2", "a\n"));
    let b = ViewHandle::new(ViewId::new(2), compiler.source("b.d2", "b\n"));

    supervisor.compile(&a).await;
    supervisor.compile(&b).await;
    assert_eq!(supervisor.session_count(), 2);
    let dests = [dest_of(&supervisor, a.id()), dest_of(&supervisor, b.id())];
    assert_ne!(dests[0], dests[1]);

    supervisor.teardown();
    assert_eq!(supervisor.session_count(), 0);
    assert!(dests.iter().all(|dest| !dest.exists()));

    // Killed processes still report in; nothing is left to do for them.
    tokio::time::sleep(Duration::from_millis(100)).await;
    supervisor.poll_events(BUDGET);
    assert_eq!(supervisor.session_count(), 0);
}
