// src/assemble/structure.rs

//! Container construction: the root level becomes the graph itself,
//! nested levels become task groups.
//!
//! This is the one pass that must run shallowest-first: a nested group
//! can only be attached once its parent's container exists.

use std::path::Path;

use serde_yaml::Value;
use tracing::debug;

use crate::assemble::registry::TaskRegistry;
use crate::errors::{AssemblyError, Result};
use crate::graph::{Container, TaskDag, TaskGroup};
use crate::schematic::Schematic;
use crate::types::SpecMap;

/// Metadata keys the assembler consumes for the root level; everything
/// else becomes a graph parameter.
const DAG_RESERVED_KEYS: &[&str] = &[
    "dag_id",
    "latest_only",
    "dependencies",
    "external_dependencies",
];

/// Metadata keys the assembler consumes for a nested level; everything
/// else becomes a group parameter.
const GROUP_RESERVED_KEYS: &[&str] = &[
    "group_id",
    "prefix_group_id",
    "suffix_group_id",
    "dependencies",
    "external_dependencies",
    "dag",
    "parent_group",
];

/// Build the container for one level and store it in the level record.
pub fn create_structure(
    schematic: &mut Schematic,
    id: &Path,
    dag: &mut TaskDag,
    registry: &mut TaskRegistry,
) -> Result<()> {
    let (name, parent_id, metadata) = {
        let level = schematic.level(id)?;
        (
            level.name.clone(),
            level.parent_id.clone(),
            level.metadata.clone(),
        )
    };

    let container = match parent_id {
        None => {
            dag.set_params(scrub(&metadata, DAG_RESERVED_KEYS));
            Container::TopLevel
        }
        Some(parent_id) => {
            let parent_container = schematic
                .level(&parent_id)?
                .structure
                .clone()
                .ok_or_else(|| {
                    AssemblyError::StructureError(format!(
                        "level '{}' built before its parent '{}'",
                        id.display(),
                        parent_id.display()
                    ))
                })?;

            let (group_id, parent_group) = match parent_container {
                Container::TopLevel => (name.clone(), None),
                Container::Nested(parent_group) => {
                    (format!("{parent_group}.{name}"), Some(parent_group))
                }
            };

            let group = TaskGroup {
                id: group_id.clone(),
                name: name.clone(),
                prefix_group_id: bool_key(&metadata, "prefix_group_id", true),
                suffix_group_id: bool_key(&metadata, "suffix_group_id", false),
                parent: parent_group,
                params: scrub(&metadata, GROUP_RESERVED_KEYS),
            };
            registry.register_group(name.clone(), group_id.clone())?;
            dag.add_group(group)?;
            Container::Nested(group_id)
        }
    };

    debug!(level = %id.display(), container = ?container, "built level container");
    schematic.level_mut(id)?.structure = Some(container);
    Ok(())
}

fn scrub(metadata: &SpecMap, reserved: &[&str]) -> SpecMap {
    metadata
        .iter()
        .filter(|(key, _)| !reserved.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn bool_key(metadata: &SpecMap, key: &str, default: bool) -> bool {
    metadata
        .get(key)
        .and_then(Value::as_bool)
        .unwrap_or(default)
}
