// src/assemble/external.rs

//! External dependency wiring.
//!
//! Every reference to a task owned by another graph is represented by a
//! wait placeholder inside this graph. Placeholders are deduplicated by
//! the exact reference: however many tasks or levels wait on
//! `other_dag.some_task`, there is exactly one placeholder for it, with
//! one downstream edge per dependent.

use std::collections::BTreeMap;
use std::path::Path;

use serde_yaml::Value;
use tracing::info;

use crate::assemble::registry::TaskRegistry;
use crate::errors::Result;
use crate::graph::{Container, ExternalRef, NodeKind, NodeRef, TaskDag, TaskNode};
use crate::schematic::metadata::external_refs;
use crate::schematic::Schematic;
use crate::settings::WaitDefaults;
use crate::types::TaskId;

/// Operator kind recorded on wait placeholders.
pub const WAIT_OPERATOR: &str = "external_task_sensor";

/// Already-created placeholders, keyed by their external reference.
pub type WaitTasks = BTreeMap<ExternalRef, TaskId>;

/// Wire each task's declared `external_dependencies` through wait
/// placeholders.
pub fn create_task_external_dependencies(
    schematic: &Schematic,
    id: &Path,
    dag: &mut TaskDag,
    registry: &mut TaskRegistry,
    wait_tasks: &mut WaitTasks,
    defaults: &WaitDefaults,
) -> Result<()> {
    let level = schematic.level(id)?;
    for spec in &level.specs {
        let Some(task_id) = spec.get("task_id").and_then(Value::as_str) else {
            continue;
        };
        if !level.tasks.contains(task_id) {
            continue;
        }
        let Some(declared) = spec.get("external_dependencies") else {
            continue;
        };

        for reference in external_refs(declared) {
            let wait_id = ensure_wait_task(&reference, dag, registry, wait_tasks, defaults)?;
            dag.set_upstream(NodeRef::Task(wait_id), NodeRef::Task(task_id.to_string()));
        }
    }
    Ok(())
}

/// Wire a nested level's `external_dependencies` upstream of its group.
///
/// The root level's external dependencies are handled by the root
/// finisher, which fans them out over the graph's entry points instead.
pub fn create_level_external_dependencies(
    schematic: &Schematic,
    id: &Path,
    dag: &mut TaskDag,
    registry: &mut TaskRegistry,
    wait_tasks: &mut WaitTasks,
    defaults: &WaitDefaults,
) -> Result<()> {
    let level = schematic.level(id)?;
    let Some(Container::Nested(group_id)) = &level.structure else {
        return Ok(());
    };

    for reference in &level.external_dependencies {
        let wait_id = ensure_wait_task(reference, dag, registry, wait_tasks, defaults)?;
        dag.set_upstream(NodeRef::Task(wait_id), NodeRef::Group(group_id.clone()));
    }
    Ok(())
}

/// Look up the placeholder for `reference`, creating it on first use.
pub fn ensure_wait_task(
    reference: &ExternalRef,
    dag: &mut TaskDag,
    registry: &mut TaskRegistry,
    wait_tasks: &mut WaitTasks,
    defaults: &WaitDefaults,
) -> Result<TaskId> {
    if let Some(existing) = wait_tasks.get(reference) {
        return Ok(existing.clone());
    }

    let task_id = reference.wait_task_id();
    let mut params = defaults.to_params();
    params.insert("task_id".to_string(), Value::String(task_id.clone()));
    params.insert(
        "external_dag_id".to_string(),
        Value::String(reference.dag_id.clone()),
    );
    if let Some(external_task) = &reference.task_id {
        params.insert(
            "external_task_id".to_string(),
            Value::String(external_task.clone()),
        );
    }

    registry.register_task(task_id.clone())?;
    dag.add_task(TaskNode {
        id: task_id.clone(),
        operator: WAIT_OPERATOR.to_string(),
        params,
        group: None,
        kind: NodeKind::ExternalWait {
            reference: reference.clone(),
            target_instant: defaults.target_instant.clone(),
        },
    })?;

    info!(reference = %reference, wait_task = %task_id, "created external wait placeholder");
    wait_tasks.insert(reference.clone(), task_id.clone());
    Ok(task_id)
}
