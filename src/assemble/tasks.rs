// src/assemble/tasks.rs

//! Task materialization: one graph task per spec record.

use std::collections::BTreeSet;
use std::path::Path;

use serde_yaml::Value;
use tracing::{debug, warn};

use crate::assemble::registry::TaskRegistry;
use crate::errors::{AssemblyError, Result};
use crate::graph::{Container, NodeKind, TaskDag, TaskNode, BASE_TASK_PARAMS};
use crate::operators::{OperatorRegistry, DEFAULT_OPERATOR};
use crate::schematic::Schematic;
use crate::types::{SpecMap, TaskId};

/// Identifier for a spec that carries no usable `task_id` at all. The
/// loader derives one from the file name, so hitting this means the file
/// content overrode it with something that is not a string.
const FALLBACK_TASK_ID: &str = "unnamed_task";

/// Materialize every spec of a level into a task.
pub fn create_tasks(
    schematic: &mut Schematic,
    id: &Path,
    dag: &mut TaskDag,
    registry: &mut TaskRegistry,
    operators: &OperatorRegistry,
) -> Result<()> {
    let (specs, structure) = {
        let level = schematic.level(id)?;
        let structure = level.structure.clone().ok_or_else(|| {
            AssemblyError::StructureError(format!(
                "tasks for '{}' created before its container was built",
                id.display()
            ))
        })?;
        (level.specs.clone(), structure)
    };

    let group = match structure {
        Container::TopLevel => None,
        Container::Nested(group_id) => Some(group_id),
    };

    let mut task_ids: BTreeSet<TaskId> = BTreeSet::new();
    for spec in specs {
        let task_id = materialize_task(spec, group.clone(), dag, registry, operators)?;
        task_ids.insert(task_id);
    }

    debug!(level = %id.display(), tasks = task_ids.len(), "materialized level tasks");
    schematic.level_mut(id)?.tasks = task_ids;
    Ok(())
}

fn materialize_task(
    spec: SpecMap,
    group: Option<String>,
    dag: &mut TaskDag,
    registry: &mut TaskRegistry,
    operators: &OperatorRegistry,
) -> Result<TaskId> {
    let task_id = match spec.get("task_id").and_then(Value::as_str) {
        Some(task_id) => task_id.to_string(),
        None => {
            let file = spec
                .get("file_path")
                .and_then(Value::as_str)
                .unwrap_or("<unknown>");
            warn!(
                file,
                fallback = FALLBACK_TASK_ID,
                "spec has no usable task_id, falling back to a fixed one"
            );
            FALLBACK_TASK_ID.to_string()
        }
    };

    let kind = match spec.get("operator") {
        None => DEFAULT_OPERATOR.to_string(),
        Some(Value::String(kind)) => kind.clone(),
        Some(other) => {
            return Err(AssemblyError::ConfigError(format!(
                "task '{task_id}': 'operator' must be a string, got {other:?}"
            )));
        }
    };
    let factory = operators
        .resolve(&kind)
        .ok_or_else(|| AssemblyError::OperatorResolve {
            kind: kind.clone(),
            task_id: task_id.clone(),
        })?;

    // Admissible parameters: the engine's base set plus whatever the
    // factory declares.
    let accepted = factory.accepted_params();
    let mut params: SpecMap = spec
        .iter()
        .filter(|(key, _)| {
            BASE_TASK_PARAMS.contains(&key.as_str()) || accepted.contains(&key.as_str())
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    params.insert("task_id".to_string(), Value::String(task_id.clone()));

    let params = factory.build(&task_id, params)?;

    registry.register_task(task_id.clone())?;
    dag.add_task(TaskNode {
        id: task_id.clone(),
        operator: kind,
        params,
        group,
        kind: NodeKind::Operator,
    })?;
    Ok(task_id)
}
