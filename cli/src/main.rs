//! d2-preview - command-line host for the D2 render supervisor.
//!
//! Configuration is read from `~/.d2-preview/config.toml`; logs go to
//! `~/.d2-preview/logs/d2-preview.log`.

mod config;
mod watch;

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use d2_render::CompilerConfig;
use d2_types::{FormatResult, Layout, ShapeStyle, Theme};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::PreviewConfig;
use crate::watch::WatchOptions;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // stdout carries the render log and command output; no log beats a mixed one.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.d2-preview/logs/d2-preview.log
    if let Some(config_path) = PreviewConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("d2-preview.log"));
    }

    // Fallback: ./.d2-preview/logs/d2-preview.log
    candidates.push(
        PathBuf::from(".d2-preview")
            .join("logs")
            .join("d2-preview.log"),
    );

    candidates
}

#[derive(Debug, Parser)]
#[command(name = "d2-preview", version)]
#[command(about = "Live preview host for D2 diagrams")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
enum Commands {
    /// Print the installed d2 version
    Version,
    /// List available layout engines
    Layouts,
    /// Format a diagram to stdout, or in place
    Fmt {
        /// Diagram source to format
        file: PathBuf,
        /// Rewrite the file instead of printing
        #[arg(short, long)]
        write: bool,
    },
    /// List, describe or check style attributes
    Style {
        /// Attribute keyword, with or without the `style.` prefix
        keyword: Option<String>,
        /// Value to check against the attribute
        #[arg(allow_negative_numbers = true)]
        value: Option<String>,
    },
    /// Render continuously until Ctrl-C
    Watch {
        /// Diagram source to render
        file: PathBuf,
        /// Numeric theme id, as listed by `d2 themes`
        #[arg(long, value_parser = parse_theme)]
        theme: Option<Theme>,
        /// Layout engine id
        #[arg(long, value_parser = parse_layout)]
        layout: Option<Layout>,
    },
}

fn parse_theme(raw: &str) -> Result<Theme, String> {
    let id: i64 = raw
        .parse()
        .map_err(|_| format!("invalid theme id: {raw}"))?;
    Theme::try_from(id).map_err(|e| e.to_string())
}

fn parse_layout(raw: &str) -> Result<Layout, String> {
    Layout::new(raw).ok_or_else(|| "layout id must not be empty".to_string())
}

async fn run_version(config: &CompilerConfig) -> ExitCode {
    match d2_render::compiler_version(config).await {
        Some(version) => {
            println!("{version}");
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("{} is not installed or did not respond", config.command());
            ExitCode::FAILURE
        }
    }
}

async fn run_layouts(config: &CompilerConfig) -> ExitCode {
    let Some(engines) = d2_render::layout_engines(config).await else {
        eprintln!("could not list layout engines from {}", config.command());
        return ExitCode::FAILURE;
    };
    for engine in engines {
        let bundled = if engine.bundled() { " (bundled)" } else { "" };
        println!("{}{bundled} - {}", engine.layout(), engine.description());
    }
    ExitCode::SUCCESS
}

async fn run_format(config: &CompilerConfig, path: PathBuf, write: bool) -> Result<ExitCode> {
    match d2_render::format(config, &path).await {
        FormatResult::Success(content) if write => {
            tokio::fs::write(&path, content)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            Ok(ExitCode::SUCCESS)
        }
        FormatResult::Success(content) => {
            print!("{content}");
            Ok(ExitCode::SUCCESS)
        }
        FormatResult::Failed(diagnostic) => {
            eprint!("{diagnostic}");
            Ok(ExitCode::FAILURE)
        }
        FormatResult::Error(message) => {
            eprintln!("{message}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Returns whether the checked value (if any) is valid.
fn run_style(keyword: Option<&str>, value: Option<&str>) -> Result<bool> {
    let Some(keyword) = keyword else {
        for style in ShapeStyle::ALL {
            let scope = if style.connection_only() {
                " (connections)"
            } else {
                ""
            };
            println!("style.{}{scope}", style.keyword());
        }
        return Ok(true);
    };

    let keyword = keyword.strip_prefix("style.").unwrap_or(keyword);
    let style = ShapeStyle::from_keyword(keyword)
        .with_context(|| format!("unknown style attribute: {keyword}"))?;

    match value {
        None => {
            let validator = style.validator();
            println!("{}", validator.error_message(style.keyword()));
            if let Some(values) = validator.completions() {
                println!("values: {}", values.join(", "));
            }
            Ok(true)
        }
        Some(value) => match style.check(value) {
            Ok(()) => {
                println!("ok");
                Ok(true)
            }
            Err(message) => {
                eprintln!("{message}");
                Ok(false)
            }
        },
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();

    let config = match PreviewConfig::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("warning: {e}; using defaults");
            PreviewConfig::default()
        }
    };
    let compiler = config.compiler_config();

    match cli.command {
        Commands::Version => Ok(run_version(&compiler).await),
        Commands::Layouts => Ok(run_layouts(&compiler).await),
        Commands::Fmt { file, write } => run_format(&compiler, file, write).await,
        Commands::Style { keyword, value } => {
            if run_style(keyword.as_deref(), value.as_deref())? {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Watch {
            file,
            theme,
            layout,
        } => {
            let options = WatchOptions {
                source: file,
                theme: theme.or(config.theme()),
                layout: layout.or_else(|| config.layout().cloned()),
                poll_interval: config.poll_interval(),
            };
            watch::run(compiler, options).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
