// src/cli.rs

//! Command line surface, parsed with `clap` derive.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Arguments accepted by the `specdag` binary.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "specdag",
    version,
    about = "Assemble a task graph from a directory tree of spec files.",
    long_about = None
)]
pub struct CliArgs {
    /// Root directory of the spec tree.
    #[arg(value_name = "DAG_DIR")]
    pub dag_dir: PathBuf,

    /// Assemble and validate, but print nothing on success.
    #[arg(long)]
    pub check: bool,

    /// Gate the graph's entry points behind a latest-only task.
    #[arg(long)]
    pub latest_only: bool,

    /// Logging verbosity; overrides the `SPECDAG_LOG` variable.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Verbosity steps exposed on the command line.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// The filter directive equivalent to this level.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
