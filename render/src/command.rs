//! Invocation descriptors and compiler command lines.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use d2_types::{Layout, LayoutEngine, Theme};

/// Parameters of one render invocation.
///
/// `source`, `dest` and `port` are fixed for the lifetime of a session;
/// only the theme and layout change between restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCommand {
    source: PathBuf,
    dest: PathBuf,
    port: u16,
    theme: Theme,
    layout: Layout,
}

impl RenderCommand {
    /// A descriptor with the default theme and layout.
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>, port: u16) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            port,
            theme: Theme::default(),
            layout: Layout::default(),
        }
    }

    /// Same session parameters, new theme and layout.
    #[must_use]
    pub fn with_preferences(&self, theme: Theme, layout: Layout) -> Self {
        Self {
            theme,
            layout,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Where the compiler writes the rendered SVG.
    #[must_use]
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Port of the compiler's watch-mode preview server.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }
}

/// A compiler invocation.
#[derive(Debug, Clone, Copy)]
pub enum CompilerCommand<'a> {
    Version,
    LayoutEngines,
    Generate(&'a RenderCommand),
    Format(&'a Path),
}

/// Parsed result of a compiler invocation, one shape per [`CompilerCommand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    Version(String),
    LayoutEngines(Vec<LayoutEngine>),
    /// Log lines for a render session.
    Generate(Vec<String>),
    Format(String),
}

impl CompilerCommand<'_> {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::LayoutEngines => "layout",
            Self::Generate(_) => "generate",
            Self::Format(_) => "fmt",
        }
    }

    /// Arguments following the configured command and its leading args.
    #[must_use]
    pub fn args(&self) -> Vec<OsString> {
        match self {
            Self::Version => vec!["version".into()],
            Self::LayoutEngines => vec!["layout".into()],
            Self::Generate(cmd) => vec![
                cmd.source().into(),
                cmd.dest().into(),
                format!("--layout={}", cmd.layout()).into(),
                format!("--theme={}", cmd.theme().id()).into(),
                format!("--port={}", cmd.port()).into(),
                "--watch".into(),
            ],
            Self::Format(path) => vec!["fmt".into(), "--stdout".into(), (*path).into()],
        }
    }

    /// Environment the command needs regardless of user configuration.
    #[must_use]
    pub fn env_overlay(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            // Watch mode opens a browser tab unless told otherwise.
            Self::Generate(_) => &[("BROWSER", "0")],
            Self::Version | Self::LayoutEngines | Self::Format(_) => &[],
        }
    }

    #[must_use]
    pub fn parse_output(&self, raw: &str) -> CommandOutput {
        match self {
            Self::Version => CommandOutput::Version(raw.trim().to_string()),
            Self::LayoutEngines => CommandOutput::LayoutEngines(parse_layout_engines(raw)),
            Self::Generate(_) => {
                CommandOutput::Generate(raw.lines().map(str::to_string).collect())
            }
            Self::Format(_) => CommandOutput::Format(raw.to_string()),
        }
    }
}

/// Parse `d2 layout` output.
///
/// Engine lines look like `elk (bundled) - Eclipse Layout Kernel ...`;
/// headers and usage text are skipped.
fn parse_layout_engines(raw: &str) -> Vec<LayoutEngine> {
    raw.lines()
        .filter_map(|line| {
            let (head, description) = line.trim().split_once(" - ")?;
            let mut words = head.split_whitespace();
            let id = words.next()?;
            if !id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return None;
            }
            let rest: Vec<&str> = words.collect();
            if rest.iter().any(|word| *word != "(bundled)") {
                return None;
            }
            let layout = Layout::new(id)?;
            Some(LayoutEngine::new(layout, !rest.is_empty(), description.trim()))
        })
        .collect()
}
