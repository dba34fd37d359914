//! Per-view render log and output normalization.
//!
//! Lines from the render subprocess are tagged `[process]`; lines the
//! supervisor writes about its own actions are tagged `[plugin ]`.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::OutputChannel;

/// `HH:MM:SS` stamps the compiler prefixes its log lines with, bracketed or bare.
static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[?\d{2}:\d{2}:\d{2}\]? ").expect("valid timestamp regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Normalize one line of subprocess output for the log.
#[must_use]
pub fn normalize_output(channel: OutputChannel, text: &str) -> String {
    let text = text.trim_end_matches(['\r', '\n']);
    if channel.is_system() {
        format!("[process] info: {text}")
    } else {
        format!("[process] {}", TIMESTAMP.replace_all(text, ""))
    }
}

/// A line describing something the supervisor did.
#[must_use]
pub fn plugin_line(level: LogLevel, message: &str) -> String {
    format!("[plugin ] {}: {message}", level.label())
}

/// Append-only log of one render session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderLog {
    lines: Vec<String>,
}

impl RenderLog {
    pub fn push(&mut self, line: String) {
        self.lines.push(line);
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether any line contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }
}

impl Extend<String> for RenderLog {
    fn extend<T: IntoIterator<Item = String>>(&mut self, iter: T) {
        self.lines.extend(iter);
    }
}
