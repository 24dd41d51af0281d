use std::collections::BTreeSet;

use proptest::prelude::*;
use specdag::graph::{Edge, NodeRef};
use specdag::{assemble_dag, AssemblerSettings};
use specdag_test_utils::builders::DagDirBuilder;

// Strategy for dependency sets where task N may only depend on tasks
// 0..N, which keeps every generated graph acyclic by construction.
fn acyclic_deps_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(|raw_deps| {
            raw_deps
                .into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    // Sanitize: only allow deps < i.
                    potential
                        .into_iter()
                        .filter(|_| i > 0)
                        .map(|idx| idx % i)
                        .collect::<BTreeSet<usize>>()
                })
                .collect()
        })
    })
}

fn spec_content(deps: &BTreeSet<usize>) -> String {
    let mut content = String::from("operator: dummy\n");
    if !deps.is_empty() {
        content.push_str("dependencies:\n");
        for dep in deps {
            content.push_str(&format!("  - t{dep}\n"));
        }
    }
    content
}

fn write_tree(deps: &[BTreeSet<usize>]) -> DagDirBuilder {
    let mut dir = DagDirBuilder::new();
    for (i, task_deps) in deps.iter().enumerate() {
        dir = dir.with_file(&format!("t{i}.yml"), &spec_content(task_deps));
    }
    dir
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Whatever the declared shape, assembly produces exactly one task
    // per file and exactly the declared edges.
    #[test]
    fn assembly_wires_exactly_the_declared_edges(deps in acyclic_deps_strategy(8)) {
        let dir = write_tree(&deps);
        let dag = assemble_dag(dir.path(), AssemblerSettings::default())
            .expect("an acyclic tree must assemble");

        prop_assert_eq!(dag.tasks().len(), deps.len());
        prop_assert!(dag.groups().is_empty());

        let expected: BTreeSet<Edge> = deps
            .iter()
            .enumerate()
            .flat_map(|(i, task_deps)| {
                task_deps.iter().map(move |dep| Edge {
                    upstream: NodeRef::Task(format!("t{dep}")),
                    downstream: NodeRef::Task(format!("t{i}")),
                })
            })
            .collect();
        prop_assert_eq!(dag.edges(), &expected);
    }

    // Declaring the same dependency repeatedly never produces more than
    // one edge for it.
    #[test]
    fn duplicate_declarations_collapse(deps in acyclic_deps_strategy(8)) {
        let mut dir = DagDirBuilder::new();
        for (i, task_deps) in deps.iter().enumerate() {
            let mut content = String::from("operator: dummy\n");
            if !task_deps.is_empty() {
                content.push_str("dependencies:\n");
                for dep in task_deps {
                    content.push_str(&format!("  - t{dep}\n  - t{dep}\n"));
                }
            }
            dir = dir.with_file(&format!("t{i}.yml"), &content);
        }

        let dag = assemble_dag(dir.path(), AssemblerSettings::default())
            .expect("an acyclic tree must assemble");

        let expected_edges: usize = deps.iter().map(BTreeSet::len).sum();
        prop_assert_eq!(dag.edges().len(), expected_edges);
    }
}
