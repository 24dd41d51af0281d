// src/assemble/specs.rs

//! Spec materialization: load every spec file of a level, fold in the
//! level's metadata as defaults, and rewrite task ids for nested scopes.

use std::path::Path;

use serde_yaml::Value;
use tracing::debug;

use crate::errors::{AssemblyError, Result};
use crate::graph::{Container, TaskDag};
use crate::parsing::SpecLoader;
use crate::schematic::Schematic;
use crate::types::SpecMap;

/// Metadata keys that are never inherited into a spec record: the first
/// two belong to the level itself, the last two control id rewriting.
const NON_INHERITED_KEYS: &[&str] = &[
    "dependencies",
    "external_dependencies",
    "prefix_group_id",
    "suffix_group_id",
];

/// Populate one level's spec records.
///
/// Always materializes from the loader's unrewritten output, so re-running
/// the pass can never prefix an already-prefixed id.
pub fn read_specs(
    schematic: &mut Schematic,
    id: &Path,
    loader: &SpecLoader,
    dag: &TaskDag,
) -> Result<()> {
    let (name, metadata, spec_paths, structure) = {
        let level = schematic.level(id)?;
        let structure = level.structure.clone().ok_or_else(|| {
            AssemblyError::StructureError(format!(
                "specs for '{}' read before its container was built",
                id.display()
            ))
        })?;
        (
            level.name.clone(),
            level.metadata.clone(),
            level.spec_paths.clone(),
            structure,
        )
    };

    let mut specs: Vec<SpecMap> = Vec::with_capacity(spec_paths.len());
    for path in &spec_paths {
        let mut spec = loader.load(path);
        // Metadata is a default layer: it fills gaps, it never overrides
        // what the file itself says.
        for (key, value) in &metadata {
            if !spec.contains_key(key) && !NON_INHERITED_KEYS.contains(&key.as_str()) {
                spec.insert(key.clone(), value.clone());
            }
        }
        specs.push(spec);
    }

    if let Container::Nested(group_id) = &structure {
        let group = dag.groups().get(group_id).ok_or_else(|| {
            AssemblyError::StructureError(format!("group '{group_id}' missing from the graph"))
        })?;
        for spec in &mut specs {
            let Some(task_id) = spec.get("task_id").and_then(Value::as_str) else {
                continue;
            };
            let rewritten = if group.prefix_group_id && !group.suffix_group_id {
                format!("{task_id}_{name}")
            } else if group.suffix_group_id {
                format!("{name}_{task_id}")
            } else {
                continue;
            };
            spec.insert("task_id".to_string(), Value::String(rewritten));
        }
    }

    debug!(level = %id.display(), specs = specs.len(), "materialized level specs");
    schematic.level_mut(id)?.specs = specs;
    Ok(())
}
