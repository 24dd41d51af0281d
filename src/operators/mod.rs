// src/operators/mod.rs

//! Task-kind resolution.
//!
//! A spec names its task kind with an `operator` string; the registry maps
//! that string to an [`OperatorFactory`]. Names under the reserved
//! `local.` namespace resolve against factories the caller registered as
//! local; every other name resolves verbatim against the qualified table.

pub mod builtin;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::Result;
use crate::types::SpecMap;

/// Operator kind used when a spec does not name one.
pub const DEFAULT_OPERATOR: &str = "dummy";

/// Builds tasks of one kind.
///
/// A factory advertises the parameter names it accepts; the task
/// materializer filters each spec down to that set (plus the engine's base
/// set) before calling [`OperatorFactory::build`]. `build` validates and
/// (if needed) enriches the parameters of one task.
pub trait OperatorFactory: Send + Sync {
    /// Parameter names this factory accepts on top of the engine's base
    /// set.
    fn accepted_params(&self) -> &[&str];

    /// Validate the filtered parameters for the task `task_id`.
    fn build(&self, task_id: &str, params: SpecMap) -> Result<SpecMap>;
}

/// Lookup table from task-kind strings to factories.
#[derive(Clone)]
pub struct OperatorRegistry {
    qualified: BTreeMap<String, Arc<dyn OperatorFactory>>,
    local: BTreeMap<String, Arc<dyn OperatorFactory>>,
}

impl OperatorRegistry {
    /// Empty registry, no kinds resolvable.
    pub fn new() -> Self {
        Self {
            qualified: BTreeMap::new(),
            local: BTreeMap::new(),
        }
    }

    /// Registry with the built-in kinds (`dummy` and `shell`).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(DEFAULT_OPERATOR, Arc::new(builtin::DummyOperator));
        registry.register("shell", Arc::new(builtin::ShellOperator));
        registry
    }

    /// Register a factory under a qualified name.
    pub fn register(&mut self, name: impl Into<String>, factory: Arc<dyn OperatorFactory>) {
        self.qualified.insert(name.into(), factory);
    }

    /// Register a factory resolvable as `local.{name}`.
    pub fn register_local(&mut self, name: impl Into<String>, factory: Arc<dyn OperatorFactory>) {
        self.local.insert(name.into(), factory);
    }

    /// Resolve a task-kind string to its factory.
    pub fn resolve(&self, kind: &str) -> Option<&Arc<dyn OperatorFactory>> {
        match kind.strip_prefix("local.") {
            Some(rest) => self.local.get(rest),
            None => self.qualified.get(kind),
        }
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("qualified", &self.qualified.keys().collect::<Vec<_>>())
            .field("local", &self.local.keys().collect::<Vec<_>>())
            .finish()
    }
}
