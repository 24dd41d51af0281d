// src/schematic/mod.rs

//! The schematic: one record per directory level of a spec tree.
//!
//! [`discover::discover`] walks the tree once and seeds a [`LevelRecord`]
//! per directory; the assembly passes then fill the records in until every
//! level knows its metadata, container, specs and tasks. The schematic is
//! plain data — all behaviour lives in the passes that mutate it.

pub mod discover;
pub mod metadata;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::errors::{AssemblyError, Result};
use crate::graph::{Container, ExternalRef};
use crate::types::{SpecMap, TaskId, TraversalOrder};

/// Reserved file name for per-level metadata.
pub const METADATA_FILENAME: &str = "METADATA.yml";

/// Everything the assembler knows about one directory level.
#[derive(Debug, Clone)]
pub struct LevelRecord {
    /// Canonical directory path; doubles as the level id.
    pub id: PathBuf,
    /// Directory base name; the root's name becomes the graph name,
    /// nested names become group names.
    pub name: String,
    /// `None` only for the root level.
    pub parent_id: Option<PathBuf>,
    /// Directory depth below the root; the root is 0.
    pub depth: usize,
    /// Spec files directly in this directory, sorted.
    pub spec_paths: Vec<PathBuf>,
    /// `METADATA.yml` in this directory, if present.
    pub metadata_path: Option<PathBuf>,
    /// Effective metadata after defaults and file content are merged.
    pub metadata: SpecMap,
    /// Container built for this level; `None` until the structure pass.
    pub structure: Option<Container>,
    /// Loaded spec records, parallel to `spec_paths`.
    pub specs: Vec<SpecMap>,
    /// Final ids of the tasks materialized at this level.
    pub tasks: BTreeSet<TaskId>,
    /// Sibling identifiers this whole level depends on. Only meaningful
    /// for nested levels.
    pub dependencies: Vec<String>,
    /// External references this whole level depends on.
    pub external_dependencies: Vec<ExternalRef>,
}

impl LevelRecord {
    /// Seed a record for a discovered directory; everything beyond
    /// identity starts empty.
    pub fn new(id: PathBuf, name: String, parent_id: Option<PathBuf>, depth: usize) -> Self {
        Self {
            id,
            name,
            parent_id,
            depth,
            spec_paths: Vec::new(),
            metadata_path: None,
            metadata: SpecMap::new(),
            structure: None,
            specs: Vec::new(),
            tasks: BTreeSet::new(),
            dependencies: Vec::new(),
            external_dependencies: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// All levels of one spec tree, keyed by directory path.
#[derive(Debug, Clone)]
pub struct Schematic {
    root_id: PathBuf,
    levels: BTreeMap<PathBuf, LevelRecord>,
}

impl Schematic {
    pub(crate) fn new(root_id: PathBuf, levels: BTreeMap<PathBuf, LevelRecord>) -> Self {
        Self { root_id, levels }
    }

    pub fn root_id(&self) -> &Path {
        &self.root_id
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn contains(&self, id: &Path) -> bool {
        self.levels.contains_key(id)
    }

    pub fn level(&self, id: &Path) -> Result<&LevelRecord> {
        self.levels.get(id).ok_or_else(|| {
            AssemblyError::StructureError(format!("unknown level '{}'", id.display()))
        })
    }

    pub fn level_mut(&mut self, id: &Path) -> Result<&mut LevelRecord> {
        self.levels.get_mut(id).ok_or_else(|| {
            AssemblyError::StructureError(format!("unknown level '{}'", id.display()))
        })
    }

    pub fn levels(&self) -> impl Iterator<Item = &LevelRecord> {
        self.levels.values()
    }

    /// Level ids in the given traversal order.
    ///
    /// Ordering is by depth with the path as tiebreak, so a pass over the
    /// returned ids is deterministic for a given tree.
    pub fn ids(&self, order: TraversalOrder) -> Vec<PathBuf> {
        let mut keyed: Vec<(usize, PathBuf)> = self
            .levels
            .values()
            .map(|level| (level.depth, level.id.clone()))
            .collect();
        keyed.sort();
        let ids = keyed.into_iter().map(|(_, id)| id);
        match order {
            TraversalOrder::ShallowestFirst => ids.collect(),
            TraversalOrder::DeepestFirst => ids.rev().collect(),
        }
    }
}
