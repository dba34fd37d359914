//! Shared test utilities and fixtures
//!
//! Process tests stand in a `/bin/sh` script for the `d2` compiler.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use d2_render::CompilerConfig;
use tempfile::TempDir;

/// Generous bound for anything that involves a real subprocess.
pub const PROCESS_TIMEOUT: Duration = Duration::from_secs(5);

/// A shell script posing as the compiler, in its own scratch directory.
pub struct FakeCompiler {
    dir: TempDir,
    script: PathBuf,
}

impl FakeCompiler {
    /// `body` runs with the compiler's arguments in `$1..`.
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-d2.sh");
        fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
        Self { dir, script }
    }

    /// Answers `version`, `layout` and `fmt`; renders by writing an SVG and
    /// then idling like `d2 --watch`. Each render's PID goes to `pids`.
    pub fn d2_like() -> Self {
        Self::new(
            r#"
case "$1" in
  version) echo "v0.6.3"; exit 0 ;;
  layout)
    echo "Available layout engines found:"
    echo
    echo "dagre (bundled) - The directed graph layout library Dagre"
    echo "elk (bundled) - Eclipse Layout Kernel (ELK) with the Layered algorithm."
    exit 0 ;;
  fmt) cat "$3"; exit 0 ;;
esac
echo $$ >> "$(dirname "$0")/pids"
echo "12:00:00 info: compiling $1"
echo "<svg>$4</svg>" > "$2"
echo "[12:00:01] info: browser=$BROWSER" >&2
exec sleep 30
"#,
        )
    }

    pub fn config(&self) -> CompilerConfig {
        CompilerConfig::new("sh").with_args([self.script.display().to_string()])
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Write a diagram source next to the script.
    pub fn source(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// PIDs of every render process started so far.
    pub fn pids(&self) -> Vec<u32> {
        fs::read_to_string(self.dir.path().join("pids"))
            .unwrap_or_default()
            .lines()
            .filter_map(|line| line.trim().parse().ok())
            .collect()
    }
}

/// Whether a process with `pid` still exists.
pub fn process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

/// Poll `condition` until it holds or `PROCESS_TIMEOUT` elapses.
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + PROCESS_TIMEOUT;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
