//! The pipeline behind the CLI: graph file -> AST -> program, and optionally -> query run.

use crate::compiler_frontend::CompilerFrontend;
use crate::compiler_frontend::ast::ast_nodes::Ast;
use crate::compiler_frontend::compiler_errors::{CompilerError, CompilerMessages};
use crate::compiler_frontend::compiler_warnings::CompilerWarning;
use crate::query_client::QueryClient;
use crate::runtime::{DataSource, QueryResult};
use crate::settings::Config;
use crate::{ast_log, graph_log, timer_log};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Instant;

pub struct BuiltProgram {
    pub source: String,
    pub warnings: Vec<CompilerWarning>,
}

pub struct QueryRun {
    pub result: QueryResult,
    pub warnings: Vec<CompilerWarning>,
}

/// Settings for a graph come from the config file next to it, if there is one.
pub fn load_config_for(graph_path: &Path) -> Result<Config, CompilerError> {
    match graph_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => Config::load_from_dir(dir),
        _ => Config::load_from_dir(Path::new(".")),
    }
}

/// Reads, parses and compiles a graph file into the AST plus frontend warnings.
pub fn compile_graph_file(
    graph_path: &Path,
) -> Result<(Ast, Vec<CompilerWarning>), CompilerMessages> {
    let time = Instant::now();

    let source = fs::read_to_string(graph_path).map_err(|error| {
        CompilerMessages::from_error(CompilerError::file_error(graph_path, error.to_string()))
    })?;

    let frontend =
        CompilerFrontend::with_standard_blocks().map_err(CompilerMessages::from_error)?;
    let graph = frontend
        .parse_graph(&source)
        .map_err(CompilerMessages::from_error)?;
    graph_log!("Graph has ", {graph.blocks.len()}, " blocks");

    let (ast, warnings) = frontend.graph_to_ast(&graph)?;
    ast_log!("AST: ", {ast.sets.len()}, " subsets, ", {ast.targets.len()}, " targets");

    timer_log!(time, "Graph compiled in: ");
    Ok((ast, warnings))
}

pub fn build_graph(graph_path: &Path, config: &Config) -> Result<BuiltProgram, CompilerMessages> {
    let (ast, mut warnings) = compile_graph_file(graph_path)?;

    let mut client = QueryClient::new(config, Vec::new()).map_err(CompilerMessages::from_error)?;
    let source = client
        .generate_code(&ast)
        .map_err(|error| with_warnings(error, &warnings))?;

    warnings.extend_from_slice(client.warnings());
    Ok(BuiltProgram { source, warnings })
}

pub fn run_graph(
    graph_path: &Path,
    data_path: &Path,
    config: &Config,
) -> Result<QueryRun, CompilerMessages> {
    let (ast, mut warnings) = compile_graph_file(graph_path)?;
    let data = read_data_source(data_path).map_err(|error| with_warnings(error, &warnings))?;

    let mut client = QueryClient::new(config, data).map_err(CompilerMessages::from_error)?;
    let result = client
        .execute(&ast)
        .map_err(|error| with_warnings(error, &warnings))?;

    warnings.extend_from_slice(client.warnings());
    Ok(QueryRun { result, warnings })
}

/// A data file holds a JSON array of records.
pub fn read_data_source(path: &Path) -> Result<DataSource, CompilerError> {
    let source = fs::read_to_string(path)
        .map_err(|error| CompilerError::file_error(path, error.to_string()))?;

    match serde_json::from_str::<Value>(&source) {
        Ok(Value::Array(records)) => Ok(records),
        Ok(_) => Err(CompilerError::new_config_error(format!(
            "{} must contain a JSON array of records",
            path.display()
        ))),
        Err(error) => Err(CompilerError::new_config_error(format!(
            "{} is not valid JSON: {}",
            path.display(),
            error
        ))),
    }
}

fn with_warnings(error: CompilerError, warnings: &[CompilerWarning]) -> CompilerMessages {
    CompilerMessages {
        errors: vec![error],
        warnings: warnings.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler_frontend::compiler_errors::ErrorType;
    use crate::compiler_frontend::compiler_warnings::WarningKind;
    use crate::settings::CONFIG_FILE_NAME;

    const GRAPH: &str = r#"{
        "blocks": [
            {"id": "s", "type": "source_node"},
            {"id": "t", "type": "target_node", "connections": {"input": [{"block": "s"}]}},
            {"id": "lost", "type": "target_node"}
        ]
    }"#;

    #[test]
    fn builds_graph_file_with_local_config() {
        let dir = tempfile::tempdir().expect("temp dir");
        let graph_path = dir.path().join("graph.json");
        fs::write(&graph_path, GRAPH).expect("write graph");
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[generator]\nentry_name = \"run_flow\"\n",
        )
        .expect("write config");

        let config = load_config_for(&graph_path).expect("config");
        let built = build_graph(&graph_path, &config).unwrap_or_else(|messages| {
            panic!("build failed: {:?}", messages.errors)
        });

        assert!(built.source.contains("function run_flow(data) {"));
        assert!(
            built
                .warnings
                .iter()
                .any(|warning| warning.warning_kind == WarningKind::UnreachableBlock
                    && warning.msg == "lost")
        );
    }

    #[test]
    fn missing_graph_file_is_a_file_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let Err(messages) = build_graph(&dir.path().join("nope.json"), &Config::default()) else {
            panic!("missing file should fail");
        };

        assert_eq!(messages.errors[0].error_type, ErrorType::File);
    }

    #[test]
    fn data_source_must_be_an_array() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("data.json");

        fs::write(&path, r#"{"age": 3}"#).expect("write data");
        let error = read_data_source(&path).expect_err("object is not a data source");
        assert_eq!(error.error_type, ErrorType::Config);

        fs::write(&path, r#"[{"age": 3}, {"age": 40}]"#).expect("write data");
        assert_eq!(read_data_source(&path).expect("array").len(), 2);
    }
}
