// src/graph/mod.rs

//! In-memory task graph the assembler builds into.
//!
//! This is the host-engine side of the crate: a top-level [`TaskDag`]
//! holding tasks, nested task groups and precedes-edges. The assembler
//! only ever talks to it through [`TaskDag::add_task`],
//! [`TaskDag::add_group`] and [`TaskDag::set_upstream`]; everything else
//! here is lookup and validation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{AssemblyError, Result};
use crate::types::{GroupId, SpecMap, TaskId};

/// Parameter names every task accepts regardless of its operator, mirroring
/// the scheduling knobs of the execution engine the graph is handed to.
pub const BASE_TASK_PARAMS: &[&str] = &[
    "task_id",
    "owner",
    "email",
    "email_on_failure",
    "email_on_retry",
    "retries",
    "retry_delay",
    "retry_exponential_backoff",
    "depends_on_past",
    "start_date",
    "end_date",
    "schedule_interval",
    "queue",
    "pool",
    "pool_slots",
    "priority_weight",
    "weight_rule",
    "execution_timeout",
    "trigger_rule",
    "sla",
    "run_as_user",
    "doc",
    "doc_md",
];

/// Maps a logical execution instant of this graph onto the instant of the
/// remote graph an external wait should look at.
pub type TargetInstantFn = Arc<dyn Fn(DateTime<Utc>) -> DateTime<Utc> + Send + Sync>;

/// Either endpoint of a precedes-edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeRef {
    Task(TaskId),
    Group(GroupId),
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Task(id) => write!(f, "task '{id}'"),
            NodeRef::Group(id) => write!(f, "group '{id}'"),
        }
    }
}

/// Directed precedes-edge: `upstream` must make progress before
/// `downstream` may run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Edge {
    pub upstream: NodeRef,
    pub downstream: NodeRef,
}

/// Reference to a task (or a whole graph) owned by some other DAG.
///
/// `task_id: None` means "the remote graph as a whole". Placeholder reuse
/// is keyed by this exact value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExternalRef {
    pub dag_id: String,
    pub task_id: Option<TaskId>,
}

impl ExternalRef {
    /// Identifier of the wait placeholder standing in for this reference.
    ///
    /// The owning graph's id is always part of the name so that waits on
    /// `other.x` and `third.x` cannot collide.
    pub fn wait_task_id(&self) -> TaskId {
        match &self.task_id {
            Some(task) => format!("wait_for_{}_{}", self.dag_id, task),
            None => format!("wait_for_dag_{}", self.dag_id),
        }
    }
}

impl fmt::Display for ExternalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.task_id {
            Some(task) => write!(f, "{}.{}", self.dag_id, task),
            None => write!(f, "{} (whole graph)", self.dag_id),
        }
    }
}

/// What a task node stands for.
#[derive(Clone)]
pub enum NodeKind {
    /// A regular task built by an operator factory.
    Operator,
    /// A wait placeholder for a task owned by another graph.
    ExternalWait {
        reference: ExternalRef,
        target_instant: Option<TargetInstantFn>,
    },
    /// The latest-schedule-only gate at the root of the graph.
    LatestOnlyGate,
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Operator => write!(f, "Operator"),
            NodeKind::ExternalWait { reference, target_instant } => f
                .debug_struct("ExternalWait")
                .field("reference", reference)
                .field("has_target_instant", &target_instant.is_some())
                .finish(),
            NodeKind::LatestOnlyGate => write!(f, "LatestOnlyGate"),
        }
    }
}

/// One constructed task.
#[derive(Debug, Clone)]
pub struct TaskNode {
    pub id: TaskId,
    /// Operator kind the task was built with, e.g. `"shell"` or
    /// `"local.my_op"`.
    pub operator: String,
    /// Parameters that survived admissibility filtering and the operator
    /// factory.
    pub params: SpecMap,
    /// Owning scope; `None` for tasks directly under the graph root.
    pub group: Option<GroupId>,
    pub kind: NodeKind,
}

/// A named nested scope of the graph.
#[derive(Debug, Clone)]
pub struct TaskGroup {
    /// Dotted path unique within the graph, e.g. `"outer.inner"`.
    pub id: GroupId,
    /// Base name, i.e. the last path segment.
    pub name: String,
    /// Rewrite member task ids to `{id}_{name}` (on by default).
    pub prefix_group_id: bool,
    /// Rewrite member task ids to `{name}_{id}` instead.
    pub suffix_group_id: bool,
    /// Enclosing group; `None` for groups directly under the root.
    pub parent: Option<GroupId>,
    pub params: SpecMap,
}

/// The container a level's members are attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    /// The graph root itself.
    TopLevel,
    /// A nested group, by its dotted path.
    Nested(GroupId),
}

/// The assembled graph: tasks, groups and edges.
#[derive(Debug, Clone)]
pub struct TaskDag {
    name: String,
    params: SpecMap,
    tasks: BTreeMap<TaskId, TaskNode>,
    groups: BTreeMap<GroupId, TaskGroup>,
    edges: BTreeSet<Edge>,
}

impl TaskDag {
    pub fn new(name: impl Into<String>, params: SpecMap) -> Self {
        Self {
            name: name.into(),
            params,
            tasks: BTreeMap::new(),
            groups: BTreeMap::new(),
            edges: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &SpecMap {
        &self.params
    }

    /// Replace the graph-level parameters. The structure pass calls this
    /// once the root level's metadata is known.
    pub fn set_params(&mut self, params: SpecMap) {
        self.params = params;
    }

    pub fn tasks(&self) -> &BTreeMap<TaskId, TaskNode> {
        &self.tasks
    }

    pub fn groups(&self) -> &BTreeMap<GroupId, TaskGroup> {
        &self.groups
    }

    pub fn edges(&self) -> &BTreeSet<Edge> {
        &self.edges
    }

    /// Add a task. Task ids are unique per graph.
    pub fn add_task(&mut self, task: TaskNode) -> Result<()> {
        if self.tasks.contains_key(&task.id) {
            return Err(AssemblyError::DuplicateTask(task.id));
        }
        self.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    /// Add a group. Group paths are unique per graph.
    pub fn add_group(&mut self, group: TaskGroup) -> Result<()> {
        if self.groups.contains_key(&group.id) {
            return Err(AssemblyError::StructureError(format!(
                "group '{}' already exists",
                group.id
            )));
        }
        self.groups.insert(group.id.clone(), group);
        Ok(())
    }

    /// Record that `upstream` precedes `downstream`.
    ///
    /// Idempotent: re-adding an existing edge changes nothing, so a
    /// rebuild can safely re-wire the same pairs. Callers are responsible
    /// for only passing endpoints that exist in the graph.
    pub fn set_upstream(&mut self, upstream: NodeRef, downstream: NodeRef) {
        self.edges.insert(Edge { upstream, downstream });
    }

    /// Whether any edge points at `node`.
    pub fn has_upstream(&self, node: &NodeRef) -> bool {
        self.edges.iter().any(|edge| edge.downstream == *node)
    }

    /// Direct upstream endpoints of `node`.
    pub fn upstream_of(&self, node: &NodeRef) -> Vec<&NodeRef> {
        self.edges
            .iter()
            .filter(|edge| edge.downstream == *node)
            .map(|edge| &edge.upstream)
            .collect()
    }

    /// Direct downstream endpoints of `node`.
    pub fn downstream_of(&self, node: &NodeRef) -> Vec<&NodeRef> {
        self.edges
            .iter()
            .filter(|edge| edge.upstream == *node)
            .map(|edge| &edge.downstream)
            .collect()
    }

    /// Check the edge set for cycles.
    ///
    /// A topological sort over the edge endpoints will fail if and only if
    /// there is a cycle; nodes without edges cannot participate in one.
    pub fn validate_acyclic(&self) -> Result<()> {
        let mut graph: DiGraphMap<&NodeRef, ()> = DiGraphMap::new();
        for edge in &self.edges {
            graph.add_edge(&edge.upstream, &edge.downstream, ());
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(AssemblyError::DagCycle(format!(
                "cycle detected in task graph involving {}",
                cycle.node_id()
            ))),
        }
    }
}
