// src/settings.rs

//! Caller-supplied assembly configuration.
//!
//! Everything here is construction-time input: none of it is read from
//! the spec tree itself, though per-level metadata can override parts of
//! it (e.g. `latest_only`).

use std::collections::BTreeMap;
use std::fmt;

use serde_yaml::{Number, Value};

use crate::graph::TargetInstantFn;
use crate::operators::OperatorRegistry;
use crate::parsing::{ParseHook, TagConstructor};
use crate::types::SpecMap;

/// How an external wait placeholder polls for its remote target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitMode {
    /// Hold a worker slot while polling.
    #[default]
    Poke,
    /// Release the slot between polls.
    Reschedule,
}

impl WaitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitMode::Poke => "poke",
            WaitMode::Reschedule => "reschedule",
        }
    }
}

/// Poll/retry parameters applied to every external wait placeholder.
///
/// The defaults give up after a single short poll with no retries;
/// callers that want a placeholder to really wait must override them.
#[derive(Clone)]
pub struct WaitDefaults {
    /// Seconds between polls.
    pub poke_interval: u64,
    /// Seconds before the wait gives up.
    pub timeout: u64,
    pub retries: u32,
    pub mode: WaitMode,
    /// Treat a timed-out wait as skipped instead of failed.
    pub soft_fail: bool,
    /// Also check that the remote task exists at all.
    pub check_existence: bool,
    /// Maps this graph's execution instant onto the remote graph's.
    pub target_instant: Option<TargetInstantFn>,
}

impl WaitDefaults {
    /// Scalar view of these defaults, as injected into a placeholder's
    /// parameters. `target_instant` is a callable and rides on the task
    /// node itself instead.
    pub fn to_params(&self) -> SpecMap {
        let mut params = SpecMap::new();
        params.insert(
            "poke_interval".to_string(),
            Value::Number(Number::from(self.poke_interval)),
        );
        params.insert(
            "timeout".to_string(),
            Value::Number(Number::from(self.timeout)),
        );
        params.insert(
            "retries".to_string(),
            Value::Number(Number::from(self.retries)),
        );
        params.insert(
            "mode".to_string(),
            Value::String(self.mode.as_str().to_string()),
        );
        params.insert("soft_fail".to_string(), Value::Bool(self.soft_fail));
        params.insert(
            "check_existence".to_string(),
            Value::Bool(self.check_existence),
        );
        params
    }
}

impl Default for WaitDefaults {
    fn default() -> Self {
        Self {
            poke_interval: 999,
            timeout: 1,
            retries: 0,
            mode: WaitMode::Poke,
            soft_fail: false,
            check_existence: false,
            target_instant: None,
        }
    }
}

impl fmt::Debug for WaitDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitDefaults")
            .field("poke_interval", &self.poke_interval)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("mode", &self.mode)
            .field("soft_fail", &self.soft_fail)
            .field("check_existence", &self.check_existence)
            .field("has_target_instant", &self.target_instant.is_some())
            .finish()
    }
}

/// Top-level configuration for one assembly run.
#[derive(Clone)]
pub struct AssemblerSettings {
    /// Default metadata for the root level; root `METADATA.yml` keys
    /// override these per key.
    pub dag_defaults: SpecMap,
    /// Default metadata for every nested level.
    pub task_group_defaults: SpecMap,
    pub wait_defaults: WaitDefaults,
    /// Gate the graph's entry points behind a latest-schedule-only task.
    /// Root metadata can override this per graph.
    pub latest_only: bool,
    /// Extra or replacement file parsers, keyed by extension without the
    /// leading dot.
    pub parse_hooks: BTreeMap<String, ParseHook>,
    /// Extra or replacement YAML tag constructors.
    pub tag_constructors: BTreeMap<String, TagConstructor>,
    pub operators: OperatorRegistry,
}

impl Default for AssemblerSettings {
    fn default() -> Self {
        Self {
            dag_defaults: SpecMap::new(),
            task_group_defaults: SpecMap::new(),
            wait_defaults: WaitDefaults::default(),
            latest_only: false,
            parse_hooks: BTreeMap::new(),
            tag_constructors: BTreeMap::new(),
            operators: OperatorRegistry::with_builtins(),
        }
    }
}

impl fmt::Debug for AssemblerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssemblerSettings")
            .field("dag_defaults", &self.dag_defaults)
            .field("task_group_defaults", &self.task_group_defaults)
            .field("wait_defaults", &self.wait_defaults)
            .field("latest_only", &self.latest_only)
            .field("parse_hooks", &self.parse_hooks.keys().collect::<Vec<_>>())
            .field(
                "tag_constructors",
                &self.tag_constructors.keys().collect::<Vec<_>>(),
            )
            .field("operators", &self.operators)
            .finish()
    }
}
