mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::path::Path;

use serde_yaml::Value;
use specdag::errors::AssemblyError;
use specdag::graph::ExternalRef;
use specdag::parsing::TagDecoder;
use specdag::types::SpecMap;
use specdag::{Assembler, AssemblerSettings};
use specdag_test_utils::builders::DagDirBuilder;

type TestResult = Result<(), Box<dyn Error>>;

fn yaml_map(text: &str) -> SpecMap {
    TagDecoder::new()
        .decode_map(text, Path::new("inline.yml"))
        .expect("inline yaml must decode")
}

#[test]
fn metadata_file_overrides_defaults_per_key() -> TestResult {
    init_tracing();

    let dir = DagDirBuilder::new()
        .with_file("a.yml", "operator: dummy\n")
        .with_metadata(".", "retries: 5\n");
    let settings = AssemblerSettings {
        dag_defaults: yaml_map("retries: 1\ndescription: demo\n"),
        ..AssemblerSettings::default()
    };

    let mut assembler = Assembler::new(dir.path(), settings)?;
    assembler.parse_metadata()?;

    let schematic = assembler.schematic();
    let root = schematic.level(schematic.root_id())?;
    assert_eq!(root.metadata.get("retries").and_then(Value::as_u64), Some(5));
    assert_eq!(
        root.metadata.get("description").and_then(Value::as_str),
        Some("demo")
    );
    Ok(())
}

/// Composite values are replaced wholesale: a `default_args` mapping from
/// the file does not deep-merge with the one from the defaults.
#[test]
fn default_args_are_replaced_not_merged() -> TestResult {
    init_tracing();

    let dir = DagDirBuilder::new()
        .with_file("a.yml", "operator: dummy\n")
        .with_metadata(".", "default_args:\n  owner: b\n");
    let settings = AssemblerSettings {
        dag_defaults: yaml_map("default_args:\n  owner: a\n  retries: 2\n"),
        ..AssemblerSettings::default()
    };

    let mut assembler = Assembler::new(dir.path(), settings)?;
    assembler.parse_metadata()?;

    let schematic = assembler.schematic();
    let root = schematic.level(schematic.root_id())?;
    let expected: Value = serde_yaml::from_str("owner: b\n")?;
    assert_eq!(root.metadata.get("default_args"), Some(&expected));
    Ok(())
}

/// The root level layers over the graph defaults, nested levels over the
/// group defaults.
#[test]
fn nested_levels_use_group_defaults() -> TestResult {
    init_tracing();

    let dir = DagDirBuilder::new()
        .with_file("a.yml", "operator: dummy\n")
        .with_file("grp/x.yml", "operator: dummy\n");
    let settings = AssemblerSettings {
        dag_defaults: yaml_map("pool: main\n"),
        task_group_defaults: yaml_map("pool: batch\n"),
        ..AssemblerSettings::default()
    };

    let mut assembler = Assembler::new(dir.path(), settings)?;
    assembler.parse_metadata()?;

    let schematic = assembler.schematic();
    let root = schematic.level(schematic.root_id())?;
    let grp = schematic.level(&schematic.root_id().join("grp"))?;
    assert_eq!(root.metadata.get("pool").and_then(Value::as_str), Some("main"));
    assert_eq!(grp.metadata.get("pool").and_then(Value::as_str), Some("batch"));
    Ok(())
}

#[test]
fn declared_dependencies_land_on_the_level() -> TestResult {
    init_tracing();

    let dir = DagDirBuilder::new()
        .with_file("a.yml", "operator: dummy\n")
        .with_file("grp/x.yml", "operator: dummy\n")
        .with_metadata("grp", "dependencies: a\n");

    let mut assembler = Assembler::new(dir.path(), AssemblerSettings::default())?;
    assembler.parse_metadata()?;

    let schematic = assembler.schematic();
    let grp = schematic.level(&schematic.root_id().join("grp"))?;
    assert_eq!(grp.dependencies, vec!["a".to_string()]);
    Ok(())
}

/// Root-level `dependencies` have nothing to attach to. They are dropped,
/// and because the file declared a dependency key, the defaults' external
/// dependencies are not adopted either.
#[test]
fn root_dependencies_are_ignored() -> TestResult {
    init_tracing();

    let dir = DagDirBuilder::new()
        .with_file("a.yml", "operator: dummy\n")
        .with_metadata(".", "dependencies:\n  - x\n");
    let settings = AssemblerSettings {
        dag_defaults: yaml_map("external_dependencies:\n  - other: t\n"),
        ..AssemblerSettings::default()
    };

    let mut assembler = Assembler::new(dir.path(), settings)?;
    assembler.parse_metadata()?;

    let schematic = assembler.schematic();
    let root = schematic.level(schematic.root_id())?;
    assert!(root.dependencies.is_empty());
    assert!(root.external_dependencies.is_empty());
    Ok(())
}

#[test]
fn root_adopts_default_externals_when_the_file_is_silent() -> TestResult {
    init_tracing();

    let dir = DagDirBuilder::new().with_file("a.yml", "operator: dummy\n");
    let settings = AssemblerSettings {
        dag_defaults: yaml_map("external_dependencies:\n  - other: t\n"),
        ..AssemblerSettings::default()
    };

    let mut assembler = Assembler::new(dir.path(), settings)?;
    assembler.parse_metadata()?;

    let schematic = assembler.schematic();
    let root = schematic.level(schematic.root_id())?;
    assert_eq!(
        root.external_dependencies,
        vec![ExternalRef {
            dag_id: "other".to_string(),
            task_id: Some("t".to_string()),
        }]
    );
    Ok(())
}

#[test]
fn declared_externals_override_default_externals() -> TestResult {
    init_tracing();

    let dir = DagDirBuilder::new()
        .with_file("a.yml", "operator: dummy\n")
        .with_metadata(".", "external_dependencies:\n  - mine: x\n");
    let settings = AssemblerSettings {
        dag_defaults: yaml_map("external_dependencies:\n  - other: t\n"),
        ..AssemblerSettings::default()
    };

    let mut assembler = Assembler::new(dir.path(), settings)?;
    assembler.parse_metadata()?;

    let schematic = assembler.schematic();
    let root = schematic.level(schematic.root_id())?;
    assert_eq!(
        root.external_dependencies,
        vec![ExternalRef {
            dag_id: "mine".to_string(),
            task_id: Some("x".to_string()),
        }]
    );
    Ok(())
}

/// A bare graph id, an `all` task id and a null task id all mean "the
/// whole remote graph".
#[test]
fn whole_graph_references_have_no_task_id() -> TestResult {
    init_tracing();

    let dir = DagDirBuilder::new()
        .with_file("a.yml", "operator: dummy\n")
        .with_metadata(
            ".",
            "external_dependencies:\n  - other_dag\n  - another: all\n  - third:\n",
        );

    let mut assembler = Assembler::new(dir.path(), AssemblerSettings::default())?;
    assembler.parse_metadata()?;

    let schematic = assembler.schematic();
    let root = schematic.level(schematic.root_id())?;
    assert_eq!(root.external_dependencies.len(), 3);
    assert!(root.external_dependencies.iter().all(|r| r.task_id.is_none()));
    Ok(())
}

/// Defaults supplied in code are held to a stricter standard than files:
/// they must be a list of mappings.
#[test]
fn malformed_default_externals_are_a_config_error() -> TestResult {
    init_tracing();

    let dir = DagDirBuilder::new().with_file("a.yml", "operator: dummy\n");
    let settings = AssemblerSettings {
        dag_defaults: yaml_map("external_dependencies:\n  - just_a_string\n"),
        ..AssemblerSettings::default()
    };

    let mut assembler = Assembler::new(dir.path(), settings)?;
    let result = assembler.parse_metadata();
    assert!(matches!(result, Err(AssemblyError::ConfigError(_))));
    Ok(())
}

/// Resolution rebuilds each level's metadata from scratch, so running the
/// pass twice changes nothing.
#[test]
fn metadata_resolution_is_idempotent() -> TestResult {
    init_tracing();

    let dir = DagDirBuilder::new()
        .with_file("a.yml", "operator: dummy\n")
        .with_metadata(".", "retries: 5\n");
    let settings = AssemblerSettings {
        dag_defaults: yaml_map("retries: 1\ndescription: demo\n"),
        ..AssemblerSettings::default()
    };

    let mut assembler = Assembler::new(dir.path(), settings)?;
    assembler.parse_metadata()?;
    let first = {
        let schematic = assembler.schematic();
        schematic.level(schematic.root_id())?.metadata.clone()
    };

    assembler.parse_metadata()?;
    let schematic = assembler.schematic();
    assert_eq!(schematic.level(schematic.root_id())?.metadata, first);
    Ok(())
}

/// Unlike spec files, a metadata file that fails to decode aborts the
/// build.
#[test]
fn malformed_metadata_file_is_fatal() -> TestResult {
    init_tracing();

    let dir = DagDirBuilder::new()
        .with_file("a.yml", "operator: dummy\n")
        .with_metadata(".", "key: [unclosed\n");

    let mut assembler = Assembler::new(dir.path(), AssemblerSettings::default())?;
    let result = assembler.parse_metadata();
    assert!(matches!(result, Err(AssemblyError::DecodeError { .. })));
    Ok(())
}
