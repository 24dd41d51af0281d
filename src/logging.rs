// src/logging.rs

//! Logging setup on `tracing` + `tracing-subscriber`.
//!
//! Diagnostics go to stderr; stdout stays reserved for the rendered
//! summary. A `--log-level` flag wins outright, otherwise `SPECDAG_LOG`
//! is read as a full filter spec, so per-module directives such as
//! `specdag::assemble=debug` work from the environment.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable holding the default filter directives.
pub const LOG_ENV_VAR: &str = "SPECDAG_LOG";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level.as_directive()),
        None => EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info")),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
