//! Supervision of `d2 --watch` render processes and one-shot compiler queries.

pub mod artifact;
pub mod command;
pub mod log;
pub mod types;

pub(crate) mod process;

mod query;
mod supervisor;

pub use command::{CommandOutput, CompilerCommand, RenderCommand};
pub use log::{LogLevel, RenderLog};
pub use query::{
    QueryError, QueryOutput, compiler_version, format, is_compiler_installed, layout_engines,
    run_oneshot,
};
pub use supervisor::RenderSupervisor;
pub use types::{
    CompilerConfig, DEFAULT_QUERY_TIMEOUT, DEFAULT_TERMINATION_TIMEOUT, LogDisplay, NoopDisplay,
    OutputChannel, RenderEvent, RenderStopReason, SessionState,
};
