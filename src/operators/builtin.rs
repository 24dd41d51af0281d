// src/operators/builtin.rs

//! Built-in operator kinds.

use serde_yaml::Value;

use crate::errors::{AssemblyError, Result};
use crate::operators::OperatorFactory;
use crate::types::SpecMap;

/// No-op task; the default kind for specs that name none.
#[derive(Debug, Clone, Copy)]
pub struct DummyOperator;

impl OperatorFactory for DummyOperator {
    fn accepted_params(&self) -> &[&str] {
        &[]
    }

    fn build(&self, _task_id: &str, params: SpecMap) -> Result<SpecMap> {
        Ok(params)
    }
}

/// Runs a shell command.
#[derive(Debug, Clone, Copy)]
pub struct ShellOperator;

impl OperatorFactory for ShellOperator {
    fn accepted_params(&self) -> &[&str] {
        &["cmd", "env", "cwd"]
    }

    fn build(&self, task_id: &str, params: SpecMap) -> Result<SpecMap> {
        match params.get("cmd") {
            Some(Value::String(_)) => Ok(params),
            Some(_) => Err(AssemblyError::ConfigError(format!(
                "task '{task_id}': 'cmd' must be a string"
            ))),
            None => Err(AssemblyError::ConfigError(format!(
                "task '{task_id}': shell operator requires a 'cmd' parameter"
            ))),
        }
    }
}
