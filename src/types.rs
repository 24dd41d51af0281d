use std::collections::BTreeMap;

use serde_yaml::Value;

/// Flat key/value record decoded from a spec file or a metadata file.
///
/// Keys are plain strings; values stay as YAML values until an operator
/// factory consumes them. A `BTreeMap` keeps iteration deterministic.
pub type SpecMap = BTreeMap<String, Value>;

/// Final identifier of a task inside the assembled DAG (after any
/// group-scope rewriting).
pub type TaskId = String;

/// Dotted path of a task group, e.g. `"outer.inner"` for a group nested
/// one level below `outer`.
pub type GroupId = String;

/// Order in which the levels of a schematic are visited.
///
/// Assembly passes that fill in per-level data run deepest-first so that
/// children are complete before their parents are consulted; structure
/// building runs shallowest-first because a child container can only be
/// attached to an already-built parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalOrder {
    DeepestFirst,
    ShallowestFirst,
}
