// src/schematic/metadata.rs

//! Per-level metadata resolution.
//!
//! Each level's effective metadata is the scope-kind defaults (root
//! defaults for the root, group defaults for nested levels) overridden
//! per key by the level's `METADATA.yml`. Unlike spec files, a metadata
//! file that fails to decode aborts the build: defaults silently standing
//! in for a whole tree's configuration would be much harder to notice
//! than one degraded task.

use std::fs;
use std::path::Path;

use serde_yaml::Value;
use tracing::{debug, warn};

use crate::errors::{AssemblyError, Result};
use crate::graph::ExternalRef;
use crate::parsing::TagDecoder;
use crate::schematic::Schematic;
use crate::settings::AssemblerSettings;
use crate::types::SpecMap;

/// Resolve one level's effective metadata and pull out its declared
/// dependencies.
///
/// Idempotent: every call rebuilds the metadata from the defaults and the
/// file, so re-running a pass cannot compound earlier merges.
pub fn parse_metadata(
    schematic: &mut Schematic,
    id: &Path,
    settings: &AssemblerSettings,
    decoder: &TagDecoder,
) -> Result<()> {
    let level = schematic.level_mut(id)?;
    let is_root = level.is_root();

    let mut metadata = if is_root {
        settings.dag_defaults.clone()
    } else {
        settings.task_group_defaults.clone()
    };

    let file_metadata = match &level.metadata_path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            decoder.decode_map(&text, path)?
        }
        None => SpecMap::new(),
    };

    // Last-write-wins per key. Composite values such as `default_args`
    // are replaced wholesale, never deep-merged.
    for (key, value) in &file_metadata {
        metadata.insert(key.clone(), value.clone());
    }

    level.dependencies = Vec::new();
    level.external_dependencies = Vec::new();

    // The file's own declarations fully override any defaults; the
    // root-only fallback below applies only when the file declares
    // neither key.
    let file_declares = file_metadata.contains_key("dependencies")
        || file_metadata.contains_key("external_dependencies");
    if file_declares {
        if let Some(deps) = file_metadata.get("dependencies") {
            if is_root {
                warn!(
                    level = %id.display(),
                    "'dependencies' in root metadata has nothing to attach to, ignoring"
                );
            } else {
                level.dependencies = string_list(deps);
            }
        }
        if let Some(refs) = file_metadata.get("external_dependencies") {
            level.external_dependencies = external_refs(refs);
        }
    } else if is_root {
        if let Some(refs) = settings.dag_defaults.get("external_dependencies") {
            level.external_dependencies = external_refs_strict(refs)?;
        }
    }

    debug!(
        level = %id.display(),
        keys = metadata.len(),
        dependencies = level.dependencies.len(),
        external_dependencies = level.external_dependencies.len(),
        "resolved level metadata"
    );
    level.metadata = metadata;
    Ok(())
}

/// Read a list of identifiers, accepting a single bare string as a
/// one-element list. Anything else contributes nothing.
pub(crate) fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Sequence(seq) => seq
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                other => {
                    warn!(value = ?other, "ignoring non-string dependency entry");
                    None
                }
            })
            .collect(),
        other => {
            warn!(value = ?other, "ignoring malformed dependency list");
            Vec::new()
        }
    }
}

/// Read external references from a declared `external_dependencies`
/// value.
///
/// Each entry is either a `{graph_id: task_id}` mapping (possibly with
/// several pairs, each pair one reference) or a bare graph id string.
/// A task id of `"all"` or null means the whole remote graph.
pub(crate) fn external_refs(value: &Value) -> Vec<ExternalRef> {
    let Value::Sequence(entries) = value else {
        warn!(value = ?value, "ignoring malformed external_dependencies, expected a list");
        return Vec::new();
    };

    let mut refs = Vec::new();
    for entry in entries {
        match entry {
            Value::String(dag_id) => refs.push(ExternalRef {
                dag_id: dag_id.clone(),
                task_id: None,
            }),
            Value::Mapping(map) => {
                for (key, val) in map {
                    let Some(dag_id) = key.as_str() else {
                        warn!(key = ?key, "ignoring external dependency with non-string graph id");
                        continue;
                    };
                    let task_id = match val {
                        Value::Null => None,
                        Value::String(task) if task == "all" => None,
                        Value::String(task) => Some(task.clone()),
                        other => {
                            warn!(
                                graph = dag_id,
                                value = ?other,
                                "ignoring external dependency with non-string task id"
                            );
                            continue;
                        }
                    };
                    refs.push(ExternalRef {
                        dag_id: dag_id.to_string(),
                        task_id,
                    });
                }
            }
            other => {
                warn!(entry = ?other, "ignoring malformed external dependency entry");
            }
        }
    }
    refs
}

/// Like [`external_refs`], but for the root-level defaults supplied at
/// construction time: those must be a list of `{graph_id: task_id}`
/// mappings, and anything else is a configuration error.
pub(crate) fn external_refs_strict(value: &Value) -> Result<Vec<ExternalRef>> {
    let Value::Sequence(entries) = value else {
        return Err(AssemblyError::ConfigError(
            "root external_dependencies must be a list of {graph_id: task_id} mappings"
                .to_string(),
        ));
    };
    if entries.iter().any(|entry| !entry.is_mapping()) {
        return Err(AssemblyError::ConfigError(
            "root external_dependencies must be a list of {graph_id: task_id} mappings"
                .to_string(),
        ));
    }
    Ok(external_refs(value))
}
