//! Tests for CLI command parsing and output.

use super::{Command, get_command, get_flags, render_result, write_output};
use crate::compiler_frontend::Flag;
use crate::runtime::QueryResult;
use std::collections::BTreeMap;
use std::path::PathBuf;

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn build_command_takes_optional_output() {
    assert_eq!(
        get_command(&args(&["build", "graph.json"])).expect("command should parse"),
        Command::Build {
            graph: PathBuf::from("graph.json"),
            output: None,
        }
    );

    assert_eq!(
        get_command(&args(&["build", "graph.json", "out/query.js", "--pretty"]))
            .expect("command should parse"),
        Command::Build {
            graph: PathBuf::from("graph.json"),
            output: Some(PathBuf::from("out/query.js")),
        }
    );
}

#[test]
fn run_command_needs_graph_and_data() {
    assert_eq!(
        get_command(&args(&["run", "--hide-warnings", "graph.json", "data.json"]))
            .expect("command should parse"),
        Command::Run {
            graph: PathBuf::from("graph.json"),
            data: PathBuf::from("data.json"),
        }
    );

    let error = get_command(&args(&["run", "graph.json"])).expect_err("data file is required");
    assert!(error.contains("Usage: run"));
}

#[test]
fn rejects_unknown_commands_and_flags() {
    let error = get_command(&args(&["deploy"])).expect_err("unknown command should fail");
    assert!(error.contains("Invalid command"));

    let error = get_command(&args(&["build", "graph.json", "--wat"]))
        .expect_err("unknown flag should fail");
    assert!(error.contains("Unknown flag"));
}

#[test]
fn collects_flags() {
    let flags = get_flags(&args(&["flow", "run", "a", "b", "--pretty", "--hide-warnings"]));
    assert_eq!(flags, vec![Flag::Pretty, Flag::DisableWarnings]);
}

#[test]
fn renders_results_compact_or_pretty() {
    let result = QueryResult {
        targets: BTreeMap::from([(String::from("t"), Vec::new())]),
        edge_counts: BTreeMap::from([(String::from("s-output_t-input"), 0)]),
    };

    assert_eq!(
        render_result(&result, false).expect("json"),
        r#"{"targets":{"t":[]},"edgeCounts":{"s-output_t-input":0}}"#
    );
    assert!(render_result(&result, true).expect("json").contains('\n'));
}

#[test]
fn writes_output_into_new_directories() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("out").join("query.js");

    write_output(&path, "function query(data) {}").expect("write");
    assert_eq!(
        std::fs::read_to_string(&path).expect("read back"),
        "function query(data) {}"
    );
}
