// src/assemble/root.rs

//! Root-level finishing: root external dependencies and the
//! latest-schedule-only gate.
//!
//! Runs after all other wiring so that "entry point" means what it will
//! mean in the finished graph. Root external waits fan out over the
//! graph's current entry points; the gate then goes upstream of whatever
//! is still sourceless, which includes those waits.

use std::path::Path;

use serde_yaml::Value;
use tracing::{info, warn};

use crate::assemble::external::{ensure_wait_task, WaitTasks};
use crate::assemble::registry::TaskRegistry;
use crate::errors::Result;
use crate::graph::{NodeKind, NodeRef, TaskDag, TaskNode};
use crate::schematic::Schematic;
use crate::settings::AssemblerSettings;
use crate::types::SpecMap;

/// Task id and operator kind of the latest-schedule-only gate.
pub const LATEST_ONLY_TASK_ID: &str = "latest_only";

/// Finish the root level. No-op for nested levels.
pub fn create_root_dependencies(
    schematic: &Schematic,
    id: &Path,
    dag: &mut TaskDag,
    registry: &mut TaskRegistry,
    wait_tasks: &mut WaitTasks,
    settings: &AssemblerSettings,
) -> Result<()> {
    let level = schematic.level(id)?;
    if !level.is_root() {
        return Ok(());
    }

    // Entry points as of now: the root's own tasks and directly-nested
    // groups with no upstream edge. Snapshot once, so every root
    // reference fans out over the same set and placeholders never end up
    // waiting on each other.
    if !level.external_dependencies.is_empty() {
        let entry_points = entry_tasks_and_groups(dag);
        for reference in &level.external_dependencies {
            let wait_id =
                ensure_wait_task(reference, dag, registry, wait_tasks, &settings.wait_defaults)?;
            for entry in &entry_points {
                dag.set_upstream(NodeRef::Task(wait_id.clone()), entry.clone());
            }
        }
    }

    if latest_only(level.metadata.get("latest_only"), settings.latest_only) {
        // Compute targets before the gate exists so it cannot target
        // itself.
        let targets = sourceless_root_nodes(dag);

        let mut params = SpecMap::new();
        params.insert(
            "task_id".to_string(),
            Value::String(LATEST_ONLY_TASK_ID.to_string()),
        );
        registry.register_task(LATEST_ONLY_TASK_ID.to_string())?;
        dag.add_task(TaskNode {
            id: LATEST_ONLY_TASK_ID.to_string(),
            operator: LATEST_ONLY_TASK_ID.to_string(),
            params,
            group: None,
            kind: NodeKind::LatestOnlyGate,
        })?;

        info!(gated = targets.len(), "gating graph entry points behind latest-only");
        for target in targets {
            dag.set_upstream(NodeRef::Task(LATEST_ONLY_TASK_ID.to_string()), target);
        }
    }

    Ok(())
}

fn latest_only(declared: Option<&Value>, default: bool) -> bool {
    match declared {
        None => default,
        Some(Value::Bool(enabled)) => *enabled,
        Some(other) => {
            warn!(
                value = ?other,
                "'latest_only' must be a boolean, using the configured default"
            );
            default
        }
    }
}

/// Root-level operator tasks and root-child groups with no upstream edge.
/// Wait placeholders and the gate are excluded by construction.
fn entry_tasks_and_groups(dag: &TaskDag) -> Vec<NodeRef> {
    let mut entries: Vec<NodeRef> = Vec::new();
    for task in dag.tasks().values() {
        if task.group.is_none() && matches!(task.kind, NodeKind::Operator) {
            let node = NodeRef::Task(task.id.clone());
            if !dag.has_upstream(&node) {
                entries.push(node);
            }
        }
    }
    for group in dag.groups().values() {
        if group.parent.is_none() {
            let node = NodeRef::Group(group.id.clone());
            if !dag.has_upstream(&node) {
                entries.push(node);
            }
        }
    }
    entries
}

/// Every root-level node with no upstream edge, wait placeholders
/// included.
fn sourceless_root_nodes(dag: &TaskDag) -> Vec<NodeRef> {
    let mut nodes: Vec<NodeRef> = Vec::new();
    for task in dag.tasks().values() {
        if task.group.is_none() {
            let node = NodeRef::Task(task.id.clone());
            if !dag.has_upstream(&node) {
                nodes.push(node);
            }
        }
    }
    for group in dag.groups().values() {
        if group.parent.is_none() {
            let node = NodeRef::Group(group.id.clone());
            if !dag.has_upstream(&node) {
                nodes.push(node);
            }
        }
    }
    nodes
}
