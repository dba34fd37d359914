use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use d2_render::CompilerConfig;
use d2_types::{Layout, Theme};
use serde::Deserialize;
use thiserror::Error;

/// Default cadence of the watch loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Default, Deserialize)]
pub struct PreviewConfig {
    pub compiler: Option<CompilerSection>,
    pub preview: Option<PreviewSection>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// `[compiler]`: how to run `d2`.
#[derive(Debug, Default, Deserialize)]
pub struct CompilerSection {
    /// Executable name or path. Default: `d2`.
    pub command: Option<String>,
    /// Arguments placed before every subcommand.
    #[serde(default)]
    pub args: Vec<String>,
    pub query_timeout_ms: Option<u64>,
    pub termination_timeout_ms: Option<u64>,
    /// Extra environment for every invocation. Values support `${VAR}`.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// `[preview]`: defaults for the watch loop.
#[derive(Debug, Default, Deserialize)]
pub struct PreviewSection {
    /// Theme id, e.g. `200` for Dark Mauve.
    pub theme: Option<Theme>,
    pub layout: Option<Layout>,
    /// How often the watch loop drains render events.
    pub poll_interval_ms: Option<u64>,
}

/// Replace `${VAR}` with the variable's value; unset variables become empty.
///
/// `${}` is dropped and an unterminated `${` is kept verbatim.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

impl PreviewConfig {
    /// Load `~/.d2-preview/config.toml`. A missing file is `Ok(None)`.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Compiler settings with defaults filled in.
    #[must_use]
    pub fn compiler_config(&self) -> CompilerConfig {
        let Some(section) = &self.compiler else {
            return CompilerConfig::default();
        };

        let mut config = match section.command.as_deref().map(str::trim) {
            Some(command) if !command.is_empty() => CompilerConfig::new(command),
            _ => CompilerConfig::default(),
        }
        .with_args(section.args.iter().cloned());

        if let Some(ms) = section.query_timeout_ms {
            config = config.with_query_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = section.termination_timeout_ms {
            config = config.with_termination_timeout(Duration::from_millis(ms));
        }
        for (key, value) in &section.env {
            config = config.with_env(key.clone(), expand_env_vars(value));
        }
        config
    }

    #[must_use]
    pub fn theme(&self) -> Option<Theme> {
        self.preview.as_ref().and_then(|p| p.theme)
    }

    #[must_use]
    pub fn layout(&self) -> Option<&Layout> {
        self.preview.as_ref().and_then(|p| p.layout.as_ref())
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.preview
            .as_ref()
            .and_then(|p| p.poll_interval_ms)
            .filter(|ms| *ms > 0)
            .map_or(DEFAULT_POLL_INTERVAL, Duration::from_millis)
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".d2-preview").join("config.toml"))
}
