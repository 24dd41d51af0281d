// src/errors.rs

//! Error taxonomy shared across the assembly passes.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("DAG directory not found: {0}")]
    MissingDagRoot(PathBuf),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Decode error in {path}: {message}")]
    DecodeError { path: PathBuf, message: String },

    #[error("Unknown operator '{kind}' requested by task '{task_id}'")]
    OperatorResolve { kind: String, task_id: String },

    #[error("Duplicate task id: {0}")]
    DuplicateTask(String),

    #[error("Structure error: {0}")]
    StructureError(String),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssemblyError>;
