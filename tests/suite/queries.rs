//! One-shot compiler queries against a shell stand-in.

use std::time::Duration;

use d2_render::{QueryError, compiler_version, format, is_compiler_installed, layout_engines};
use d2_types::FormatResult;

use crate::common::FakeCompiler;

#[tokio::test]
async fn version_is_trimmed() {
    let compiler = FakeCompiler::d2_like();
    assert_eq!(
        compiler_version(&compiler.config()).await.as_deref(),
        Some("v0.6.3")
    );
    assert!(is_compiler_installed(&compiler.config()).await);
}

#[tokio::test]
async fn slow_compiler_has_no_version() {
    let compiler = FakeCompiler::new("exec sleep 5");
    let config = compiler
        .config()
        .with_query_timeout(Duration::from_millis(100));
    assert_eq!(compiler_version(&config).await, None);
}

#[tokio::test]
async fn failing_compiler_has_no_version() {
    let compiler = FakeCompiler::new("echo v0.6.3\nexit 2");
    assert_eq!(compiler_version(&compiler.config()).await, None);
    assert!(!is_compiler_installed(&compiler.config()).await);
}

#[tokio::test]
async fn blank_version_is_none() {
    let compiler = FakeCompiler::new("echo\nexit 0");
    assert_eq!(compiler_version(&compiler.config()).await, None);
}

#[tokio::test]
async fn timeout_is_reported_by_run_oneshot() {
    let compiler = FakeCompiler::new("exec sleep 5");
    let config = compiler
        .config()
        .with_query_timeout(Duration::from_millis(100));
    let err = d2_render::run_oneshot(&config, &d2_render::CompilerCommand::Version)
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Timeout { .. }));
}

#[tokio::test]
async fn layouts_are_listed() {
    let compiler = FakeCompiler::d2_like();
    let engines = layout_engines(&compiler.config()).await.unwrap();
    let ids: Vec<&str> = engines.iter().map(|e| e.layout().as_str()).collect();
    assert_eq!(ids, ["dagre", "elk"]);
    assert!(engines.iter().all(|e| e.bundled()));
}

#[tokio::test]
async fn format_returns_formatted_source() {
    let compiler = FakeCompiler::d2_like();
    let source = compiler.source("diagram.d2", "a -> b\n");
    assert_eq!(
        format(&compiler.config(), &source).await,
        FormatResult::Success("a -> b\n".to_string())
    );
}

#[tokio::test]
async fn format_failure_carries_diagnostic() {
    let compiler = FakeCompiler::new(
        r#"echo "err: failed to fmt: $3:1:6: unexpected end of line" >&2
exit 1"#,
    );
    let source = compiler.source("broken.d2", "a -> \n");
    let FormatResult::Failed(diagnostic) = format(&compiler.config(), &source).await else {
        panic!("expected a formatting failure");
    };
    assert!(diagnostic.contains("err: failed"));
    assert!(diagnostic.contains("unexpected end of line"));
}

#[tokio::test]
async fn format_without_output_is_success() {
    let compiler = FakeCompiler::new("exit 0");
    let source = compiler.source("empty.d2", "");
    assert_eq!(
        format(&compiler.config(), &source).await,
        FormatResult::Success(String::new())
    );
}

#[tokio::test]
async fn format_timeout_is_generic_error() {
    let compiler = FakeCompiler::new("exec sleep 5");
    let config = compiler
        .config()
        .with_query_timeout(Duration::from_millis(100));
    let source = compiler.source("diagram.d2", "a -> b\n");
    assert_eq!(
        format(&config, &source).await,
        FormatResult::Error("Unknown error".to_string())
    );
}
