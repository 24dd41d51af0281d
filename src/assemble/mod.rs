// src/assemble/mod.rs

//! The assembler: drives a spec tree through the construction passes.
//!
//! Pass order, over the whole schematic each time:
//!
//! 1. `parse_metadata` — resolve every level's effective metadata.
//! 2. `create_structure` — build containers, parents before children.
//! 3. `read_specs` — load spec files, fold in metadata, rewrite ids.
//! 4. `create_tasks` — materialize tasks through operator factories.
//! 5. `create_level_dependencies` / `create_task_dependencies` — wire
//!    declared dependencies; runs only after every task exists, since a
//!    dependency may reference any level.
//! 6. `create_task_external_dependencies` /
//!    `create_level_external_dependencies` — wait placeholders.
//! 7. `create_root_dependencies` — root externals and the latest-only
//!    gate.
//!
//! Each pass is public so tests can drive assembly stage by stage; the
//! one-shot path is [`Assembler::assemble`] or the [`assemble_dag`]
//! convenience.

pub mod external;
pub mod registry;
pub mod root;
pub mod specs;
pub mod structure;
pub mod tasks;
pub mod wiring;

use std::path::Path;

use tracing::info;

use crate::errors::Result;
use crate::graph::TaskDag;
use crate::parsing::{SpecLoader, TagDecoder};
use crate::schematic::{discover::discover, metadata, Schematic};
use crate::settings::AssemblerSettings;
use crate::types::{SpecMap, TraversalOrder};

pub use external::WaitTasks;
pub use registry::TaskRegistry;

/// One graph assembly session.
///
/// Owns the schematic, the graph under construction and the build
/// registry; all of it is discarded together when the session ends.
#[derive(Debug)]
pub struct Assembler {
    settings: AssemblerSettings,
    decoder: TagDecoder,
    loader: SpecLoader,
    schematic: Schematic,
    dag: TaskDag,
    registry: TaskRegistry,
    wait_tasks: WaitTasks,
}

impl Assembler {
    /// Discover `dag_dir` and prepare an assembly session for it.
    pub fn new(dag_dir: impl AsRef<Path>, settings: AssemblerSettings) -> Result<Self> {
        let mut decoder = TagDecoder::new();
        for (name, constructor) in &settings.tag_constructors {
            decoder.register(name.clone(), constructor.clone());
        }
        let mut loader = SpecLoader::new(decoder.clone());
        for (extension, hook) in &settings.parse_hooks {
            loader.register(extension.clone(), hook.clone());
        }

        let schematic = discover(dag_dir.as_ref(), &loader)?;
        let root_name = schematic.level(schematic.root_id())?.name.clone();
        info!(
            root = %schematic.root_id().display(),
            levels = schematic.len(),
            name = %root_name,
            "prepared assembly session"
        );

        Ok(Self {
            settings,
            decoder,
            loader,
            schematic,
            dag: TaskDag::new(root_name, SpecMap::new()),
            registry: TaskRegistry::new(),
            wait_tasks: WaitTasks::new(),
        })
    }

    pub fn schematic(&self) -> &Schematic {
        &self.schematic
    }

    pub fn dag(&self) -> &TaskDag {
        &self.dag
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Pass 1: resolve effective metadata for every level.
    pub fn parse_metadata(&mut self) -> Result<()> {
        for id in self.schematic.ids(TraversalOrder::DeepestFirst) {
            metadata::parse_metadata(&mut self.schematic, &id, &self.settings, &self.decoder)?;
        }
        Ok(())
    }

    /// Pass 2: build every level's container.
    ///
    /// The only shallowest-first pass: a group can't attach to a parent
    /// that doesn't exist yet.
    pub fn create_structure(&mut self) -> Result<()> {
        for id in self.schematic.ids(TraversalOrder::ShallowestFirst) {
            structure::create_structure(
                &mut self.schematic,
                &id,
                &mut self.dag,
                &mut self.registry,
            )?;
        }
        Ok(())
    }

    /// Pass 3: load and materialize every level's spec records.
    pub fn read_specs(&mut self) -> Result<()> {
        for id in self.schematic.ids(TraversalOrder::DeepestFirst) {
            specs::read_specs(&mut self.schematic, &id, &self.loader, &self.dag)?;
        }
        Ok(())
    }

    /// Pass 4: materialize tasks from the spec records.
    pub fn create_tasks(&mut self) -> Result<()> {
        for id in self.schematic.ids(TraversalOrder::DeepestFirst) {
            tasks::create_tasks(
                &mut self.schematic,
                &id,
                &mut self.dag,
                &mut self.registry,
                &self.settings.operators,
            )?;
        }
        Ok(())
    }

    /// Pass 5a: wire level-to-sibling dependencies.
    pub fn create_level_dependencies(&mut self) -> Result<()> {
        for id in self.schematic.ids(TraversalOrder::DeepestFirst) {
            wiring::create_level_dependencies(&self.schematic, &id, &mut self.dag, &self.registry)?;
        }
        Ok(())
    }

    /// Pass 5b: wire task-to-task (or task-to-group) dependencies.
    pub fn create_task_dependencies(&mut self) -> Result<()> {
        for id in self.schematic.ids(TraversalOrder::DeepestFirst) {
            wiring::create_task_dependencies(&self.schematic, &id, &mut self.dag, &self.registry)?;
        }
        Ok(())
    }

    /// Pass 6a: wait placeholders for task-level external dependencies.
    pub fn create_task_external_dependencies(&mut self) -> Result<()> {
        for id in self.schematic.ids(TraversalOrder::DeepestFirst) {
            external::create_task_external_dependencies(
                &self.schematic,
                &id,
                &mut self.dag,
                &mut self.registry,
                &mut self.wait_tasks,
                &self.settings.wait_defaults,
            )?;
        }
        Ok(())
    }

    /// Pass 6b: wait placeholders for level-level external dependencies.
    pub fn create_level_external_dependencies(&mut self) -> Result<()> {
        for id in self.schematic.ids(TraversalOrder::DeepestFirst) {
            external::create_level_external_dependencies(
                &self.schematic,
                &id,
                &mut self.dag,
                &mut self.registry,
                &mut self.wait_tasks,
                &self.settings.wait_defaults,
            )?;
        }
        Ok(())
    }

    /// Pass 7: root externals and the latest-only gate.
    pub fn create_root_dependencies(&mut self) -> Result<()> {
        for id in self.schematic.ids(TraversalOrder::DeepestFirst) {
            root::create_root_dependencies(
                &self.schematic,
                &id,
                &mut self.dag,
                &mut self.registry,
                &mut self.wait_tasks,
                &self.settings,
            )?;
        }
        Ok(())
    }

    /// Run every pass in order and hand back the finished graph.
    pub fn assemble(mut self) -> Result<TaskDag> {
        self.parse_metadata()?;
        self.create_structure()?;
        self.read_specs()?;
        self.create_tasks()?;
        self.create_level_dependencies()?;
        self.create_task_dependencies()?;
        self.create_task_external_dependencies()?;
        self.create_level_external_dependencies()?;
        self.create_root_dependencies()?;
        self.finish()
    }

    /// Validate and release the graph, ending the session.
    pub fn finish(self) -> Result<TaskDag> {
        self.dag.validate_acyclic()?;
        info!(
            name = %self.dag.name(),
            tasks = self.dag.tasks().len(),
            groups = self.dag.groups().len(),
            edges = self.dag.edges().len(),
            "assembled task graph"
        );
        Ok(self.dag)
    }
}

/// Assemble the graph for a spec tree in one call.
pub fn assemble_dag(dag_dir: impl AsRef<Path>, settings: AssemblerSettings) -> Result<TaskDag> {
    Assembler::new(dag_dir, settings)?.assemble()
}
