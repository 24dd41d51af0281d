// tests/external_waits.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;

use serde_yaml::Value;
use specdag::graph::{Edge, NodeKind, NodeRef};
use specdag::{assemble_dag, AssemblerSettings, WaitDefaults};
use specdag_test_utils::builders::DagDirBuilder;

type TestResult = Result<(), Box<dyn Error>>;

fn task(id: &str) -> NodeRef {
    NodeRef::Task(id.to_string())
}

fn group(id: &str) -> NodeRef {
    NodeRef::Group(id.to_string())
}

fn edge(upstream: NodeRef, downstream: NodeRef) -> Edge {
    Edge { upstream, downstream }
}

/// A task-level external dependency becomes a wait placeholder upstream
/// of the declaring task, carrying the configured wait defaults.
#[test]
fn external_dependency_creates_a_wait_placeholder() -> TestResult {
    init_tracing();

    let dir = DagDirBuilder::new().with_file(
        "b.yml",
        "operator: dummy\nexternal_dependencies:\n  - other_dag: x\n",
    );

    let dag = assemble_dag(dir.path(), AssemblerSettings::default())?;

    assert_eq!(dag.tasks().len(), 2);
    let wait = &dag.tasks()["wait_for_other_dag_x"];
    assert_eq!(wait.operator, "external_task_sensor");
    match &wait.kind {
        NodeKind::ExternalWait { reference, .. } => {
            assert_eq!(reference.dag_id, "other_dag");
            assert_eq!(reference.task_id.as_deref(), Some("x"));
        }
        other => panic!("expected an external wait, got {other:?}"),
    }

    assert_eq!(wait.params.get("poke_interval").and_then(Value::as_u64), Some(999));
    assert_eq!(wait.params.get("timeout").and_then(Value::as_u64), Some(1));
    assert_eq!(wait.params.get("retries").and_then(Value::as_u64), Some(0));
    assert_eq!(wait.params.get("mode").and_then(Value::as_str), Some("poke"));
    assert_eq!(
        wait.params.get("external_dag_id").and_then(Value::as_str),
        Some("other_dag")
    );
    assert_eq!(
        wait.params.get("external_task_id").and_then(Value::as_str),
        Some("x")
    );

    assert!(dag
        .edges()
        .contains(&edge(task("wait_for_other_dag_x"), task("b"))));
    Ok(())
}

/// However many tasks wait on the same remote task, there is exactly one
/// placeholder, with one downstream edge per dependent.
#[test]
fn placeholders_are_reused_per_reference() -> TestResult {
    init_tracing();

    let dir = DagDirBuilder::new()
        .with_file(
            "b.yml",
            "operator: dummy\nexternal_dependencies:\n  - other_dag: x\n",
        )
        .with_file(
            "c.yml",
            "operator: dummy\nexternal_dependencies:\n  - other_dag: x\n",
        );

    let dag = assemble_dag(dir.path(), AssemblerSettings::default())?;

    assert_eq!(dag.tasks().len(), 3);
    assert_eq!(dag.edges().len(), 2);
    assert!(dag
        .edges()
        .contains(&edge(task("wait_for_other_dag_x"), task("b"))));
    assert!(dag
        .edges()
        .contains(&edge(task("wait_for_other_dag_x"), task("c"))));
    Ok(())
}

/// A bare graph id waits on the remote graph as a whole; the placeholder
/// then has no remote task id.
#[test]
fn whole_graph_waits_have_their_own_id_shape() -> TestResult {
    init_tracing();

    let dir = DagDirBuilder::new().with_file(
        "b.yml",
        "operator: dummy\nexternal_dependencies:\n  - other_dag\n",
    );

    let dag = assemble_dag(dir.path(), AssemblerSettings::default())?;

    let wait = &dag.tasks()["wait_for_dag_other_dag"];
    assert!(!wait.params.contains_key("external_task_id"));
    assert_eq!(
        wait.params.get("external_dag_id").and_then(Value::as_str),
        Some("other_dag")
    );
    Ok(())
}

/// The owning graph's id is part of the placeholder name, so the same
/// task name in two remote graphs cannot collide.
#[test]
fn same_remote_task_name_in_two_graphs_does_not_collide() -> TestResult {
    init_tracing();

    let dir = DagDirBuilder::new().with_file(
        "b.yml",
        "operator: dummy\nexternal_dependencies:\n  - other: x\n  - third: x\n",
    );

    let dag = assemble_dag(dir.path(), AssemblerSettings::default())?;

    assert!(dag.tasks().contains_key("wait_for_other_x"));
    assert!(dag.tasks().contains_key("wait_for_third_x"));
    Ok(())
}

/// A nested level's external dependencies sit upstream of its group.
#[test]
fn level_externals_target_the_group() -> TestResult {
    init_tracing();

    let dir = DagDirBuilder::new()
        .with_file("grp/x.yml", "operator: dummy\n")
        .with_metadata("grp", "external_dependencies:\n  - up: t\n");

    let dag = assemble_dag(dir.path(), AssemblerSettings::default())?;

    assert!(dag
        .edges()
        .contains(&edge(task("wait_for_up_t"), group("grp"))));
    Ok(())
}

/// Root-level external dependencies fan out over the graph's entry
/// points; tasks that already have an upstream are left alone.
#[test]
fn root_externals_fan_out_over_entry_points() -> TestResult {
    init_tracing();

    let dir = DagDirBuilder::new()
        .with_file("a.yml", "operator: dummy\n")
        .with_file("b.yml", "operator: dummy\ndependencies:\n  - a\n")
        .with_metadata(".", "external_dependencies:\n  - up: t\n");

    let dag = assemble_dag(dir.path(), AssemblerSettings::default())?;

    assert_eq!(dag.edges().len(), 2);
    assert!(dag.edges().contains(&edge(task("wait_for_up_t"), task("a"))));
    assert!(dag.edges().contains(&edge(task("a"), task("b"))));
    Ok(())
}

#[test]
fn wait_defaults_flow_into_placeholder_params() -> TestResult {
    init_tracing();

    let settings = AssemblerSettings {
        wait_defaults: WaitDefaults {
            poke_interval: 5,
            soft_fail: true,
            ..WaitDefaults::default()
        },
        ..AssemblerSettings::default()
    };
    let dir = DagDirBuilder::new().with_file(
        "b.yml",
        "operator: dummy\nexternal_dependencies:\n  - other_dag: x\n",
    );

    let dag = assemble_dag(dir.path(), settings)?;

    let wait = &dag.tasks()["wait_for_other_dag_x"];
    assert_eq!(wait.params.get("poke_interval").and_then(Value::as_u64), Some(5));
    assert_eq!(wait.params.get("soft_fail").and_then(Value::as_bool), Some(true));
    Ok(())
}
