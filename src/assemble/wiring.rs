// src/assemble/wiring.rs

//! Dependency wiring within the schematic.
//!
//! Both passes resolve identifiers through the build registry, so a
//! dependency can name a task or a whole group. Unknown identifiers are
//! ignored by policy: a spec tree under active authoring may reference
//! tasks that do not exist yet, and wiring tolerates that instead of
//! failing the build.

use std::path::Path;

use serde_yaml::Value;
use tracing::debug;

use crate::assemble::registry::TaskRegistry;
use crate::errors::Result;
use crate::graph::{Container, NodeRef, TaskDag};
use crate::schematic::metadata::string_list;
use crate::schematic::Schematic;

/// Wire a nested level's own `dependencies` upstream of its group.
pub fn create_level_dependencies(
    schematic: &Schematic,
    id: &Path,
    dag: &mut TaskDag,
    registry: &TaskRegistry,
) -> Result<()> {
    let level = schematic.level(id)?;
    let downstream = match &level.structure {
        Some(Container::Nested(group_id)) => NodeRef::Group(group_id.clone()),
        // The root has no container to depend on anything.
        _ => return Ok(()),
    };

    for dependency in &level.dependencies {
        match registry.resolve(dependency) {
            Some(upstream) => {
                debug!(level = %id.display(), dependency = %dependency, "wired level dependency");
                dag.set_upstream(upstream.clone(), downstream.clone());
            }
            None => {
                debug!(
                    level = %id.display(),
                    dependency = %dependency,
                    "ignoring unknown level dependency"
                );
            }
        }
    }
    Ok(())
}

/// Wire each task's declared `dependencies` upstream of it.
pub fn create_task_dependencies(
    schematic: &Schematic,
    id: &Path,
    dag: &mut TaskDag,
    registry: &TaskRegistry,
) -> Result<()> {
    let level = schematic.level(id)?;
    for spec in &level.specs {
        let Some(task_id) = spec.get("task_id").and_then(Value::as_str) else {
            continue;
        };
        if !level.tasks.contains(task_id) {
            continue;
        }
        let Some(declared) = spec.get("dependencies") else {
            continue;
        };

        let downstream = NodeRef::Task(task_id.to_string());
        for dependency in string_list(declared) {
            match registry.resolve(&dependency) {
                Some(upstream) => {
                    debug!(task = %task_id, dependency = %dependency, "wired task dependency");
                    dag.set_upstream(upstream.clone(), downstream.clone());
                }
                None => {
                    debug!(
                        task = %task_id,
                        dependency = %dependency,
                        "ignoring unknown task dependency"
                    );
                }
            }
        }
    }
    Ok(())
}
