// src/assemble/registry.rs

//! Build-session registry of every name a dependency can reference.
//!
//! Owned by one [`Assembler`](crate::assemble::Assembler) and discarded
//! with it; nothing here is process-global. Tasks register under their
//! final id, groups under their base name, in the same namespace — a
//! dependency list refers to either kind by one identifier.

use std::collections::BTreeMap;

use crate::errors::{AssemblyError, Result};
use crate::graph::NodeRef;
use crate::types::{GroupId, TaskId};

#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    entries: BTreeMap<String, NodeRef>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task under its final id.
    pub fn register_task(&mut self, id: TaskId) -> Result<()> {
        if self.entries.contains_key(&id) {
            return Err(AssemblyError::DuplicateTask(id));
        }
        self.entries.insert(id.clone(), NodeRef::Task(id));
        Ok(())
    }

    /// Register a group under its base name.
    ///
    /// Two groups at different depths may share a dotted path prefix but
    /// never a base name: allowing that would make a dependency on the
    /// name ambiguous.
    pub fn register_group(&mut self, name: String, group_id: GroupId) -> Result<()> {
        if self.entries.contains_key(&name) {
            return Err(AssemblyError::DuplicateTask(name));
        }
        self.entries.insert(name, NodeRef::Group(group_id));
        Ok(())
    }

    /// Look up what a dependency identifier refers to.
    pub fn resolve(&self, name: &str) -> Option<&NodeRef> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
