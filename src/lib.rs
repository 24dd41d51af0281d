// src/lib.rs

pub mod assemble;
pub mod cli;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod operators;
pub mod parsing;
pub mod schematic;
pub mod settings;
pub mod types;

use tracing::info;

use crate::cli::CliArgs;
use crate::graph::NodeRef;

pub use crate::assemble::{assemble_dag, Assembler};
pub use crate::errors::{AssemblyError, Result};
pub use crate::graph::TaskDag;
pub use crate::settings::{AssemblerSettings, WaitDefaults, WaitMode};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - assembly settings from CLI flags
/// - the assembly session itself
/// - the summary printed for human consumption
pub fn run(args: CliArgs) -> Result<()> {
    let settings = AssemblerSettings {
        latest_only: args.latest_only,
        ..AssemblerSettings::default()
    };

    let dag = assemble_dag(&args.dag_dir, settings)?;

    if args.check {
        info!(
            name = %dag.name(),
            tasks = dag.tasks().len(),
            "graph assembled cleanly"
        );
        return Ok(());
    }

    print_summary(&dag);
    Ok(())
}

/// Simple summary output: graph, groups, tasks and their upstreams.
fn print_summary(dag: &TaskDag) {
    println!("dag: {}", dag.name());
    if !dag.params().is_empty() {
        println!(
            "  params: {:?}",
            dag.params().keys().collect::<Vec<_>>()
        );
    }
    println!();

    if !dag.groups().is_empty() {
        println!("groups ({}):", dag.groups().len());
        for group in dag.groups().values() {
            println!("  - {}", group.id);
            if let Some(ref parent) = group.parent {
                println!("      parent: {parent}");
            }
        }
        println!();
    }

    println!("tasks ({}):", dag.tasks().len());
    for task in dag.tasks().values() {
        println!("  - {}", task.id);
        println!("      operator: {}", task.operator);
        if let Some(ref group) = task.group {
            println!("      group: {group}");
        }
        let upstream = dag.upstream_of(&NodeRef::Task(task.id.clone()));
        if !upstream.is_empty() {
            let names: Vec<String> = upstream.iter().map(|node| node.to_string()).collect();
            println!("      upstream: {names:?}");
        }
    }
}
