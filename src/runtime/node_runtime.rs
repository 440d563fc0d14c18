use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::runtime::{DataSource, QueryResult, Runtime};
use crate::settings::{DEFAULT_ENTRY_NAME, DEFAULT_NODE_BINARY};
use crate::{return_runtime_error, timer_log};
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Instant;

/// Runs generated JavaScript in a Node.js child process.
///
/// The program, the data and a call to the entry point are piped to `node` as one script.
/// The result is read back from stdout as JSON.
#[derive(Debug, Clone)]
pub struct NodeRuntime {
    pub node_binary: String,
    pub entry_name: String,
}

impl Default for NodeRuntime {
    fn default() -> Self {
        NodeRuntime {
            node_binary: String::from(DEFAULT_NODE_BINARY),
            entry_name: String::from(DEFAULT_ENTRY_NAME),
        }
    }
}

impl NodeRuntime {
    pub fn new(node_binary: impl Into<String>, entry_name: impl Into<String>) -> Self {
        NodeRuntime {
            node_binary: node_binary.into(),
            entry_name: entry_name.into(),
        }
    }

    /// Whether the configured binary can be started at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.node_binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }

    fn script(&self, code: &str, data: &DataSource) -> Result<String, CompilerError> {
        let data = serde_json::to_string(data).map_err(|error| {
            CompilerError::new_runtime_error(format!("Could not serialize data source: {}", error))
        })?;

        Ok(format!(
            "{}\n\nprocess.stdout.write(JSON.stringify({}({})));\n",
            code, self.entry_name, data
        ))
    }
}

impl Runtime for NodeRuntime {
    fn execute(&self, code: &str, data: &DataSource) -> Result<QueryResult, CompilerError> {
        let time = Instant::now();
        let script = self.script(code, data)?;

        let mut child = Command::new(&self.node_binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| {
                CompilerError::new_runtime_error(format!(
                    "Could not start '{}': {}",
                    self.node_binary, error
                ))
            })?;

        // Dropping stdin closes it so node starts running the script
        if let Some(mut stdin) = child.stdin.take()
            && let Err(error) = stdin.write_all(script.as_bytes())
        {
            drop(stdin);
            let _ = child.kill();
            let _ = child.wait();

            return_runtime_error!(
                "Could not send the program to '{}': {}",
                self.node_binary,
                error
            );
        }

        let output = child.wait_with_output().map_err(|error| {
            CompilerError::new_runtime_error(format!(
                "Lost '{}' while it was running: {}",
                self.node_binary, error
            ))
        })?;

        if !output.status.success() {
            return_runtime_error!(
                "Query failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        timer_log!(time, "Query executed in: ");
        QueryResult::from_json(&String::from_utf8_lossy(&output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::js::js_code_generator;
    use crate::compiler_frontend::CompilerFrontend;
    use crate::compiler_frontend::compiler_errors::ErrorType;
    use crate::compiler_frontend::graph::BlockGraph;
    use crate::settings::GeneratorConfig;
    use serde_json::json;

    const AGE_GRAPH: &str = r#"{
        "blocks": [
            {"id": "s", "type": "source_node"},
            {
                "id": "adults",
                "type": "subset_node",
                "connections": {"input": [{"block": "s"}]},
                "statements": {"conditions": "cmp"}
            },
            {
                "id": "grown",
                "type": "target_node",
                "connections": {"input": [{"block": "adults", "port": "positive"}]}
            },
            {
                "id": "young",
                "type": "target_node",
                "connections": {"input": [{"block": "adults", "port": "negative"}]}
            },
            {
                "id": "cmp",
                "type": "compare_numbers",
                "inputs": {"A": "age", "B": "limit"},
                "fields": {"OP": "GREATER_OR_EQUAL"}
            },
            {"id": "age", "type": "record_field", "fields": {"FIELD": "age", "TYPE": "number"}},
            {"id": "limit", "type": "math_number", "fields": {"NUM": 18}}
        ]
    }"#;

    #[test]
    fn script_calls_the_entry_point() {
        let runtime = NodeRuntime::new("node", "run_query");
        let script = runtime
            .script("function run_query(data) { return data; }", &vec![json!(1)])
            .expect("script");

        assert!(script.ends_with("process.stdout.write(JSON.stringify(run_query([1])));\n"));
    }

    #[test]
    fn missing_binary_is_a_runtime_error() {
        let runtime = NodeRuntime::new("blockflow-no-such-binary", "query");
        let error = runtime
            .execute("function query(data) { return {}; }", &Vec::new())
            .expect_err("binary does not exist");

        assert_eq!(error.error_type, ErrorType::Runtime);
    }

    #[test]
    fn process_that_ignores_the_script_is_reaped() {
        // `true` exits without reading stdin, so a large script cannot be delivered
        let runtime = NodeRuntime::new("true", "query");
        if !runtime.is_available() {
            return;
        }

        let data = vec![json!("x".repeat(1024)); 4096];
        let error = runtime
            .execute("function query(data) { return {}; }", &data)
            .expect_err("nothing runs the query");

        assert_eq!(error.error_type, ErrorType::Runtime);
    }

    #[test]
    fn runs_generated_query_in_node() {
        let runtime = NodeRuntime::default();
        if !runtime.is_available() {
            return;
        }

        let frontend = CompilerFrontend::with_standard_blocks().expect("standard blocks");
        let graph = BlockGraph::from_json(AGE_GRAPH).expect("graph json");
        let (ast, _) = frontend.graph_to_ast(&graph).expect("ast");

        let program = js_code_generator(&GeneratorConfig::default())
            .expect("generator")
            .generate_code(&ast)
            .expect("program");

        let data = vec![
            json!({"name": "ada", "age": 36}),
            json!({"name": "tim", "age": 9}),
            json!({"name": "kim", "age": 18}),
        ];
        let result = runtime.execute(&program.source, &data).expect("query runs");

        assert_eq!(result.target("grown"), &[data[0].clone(), data[2].clone()]);
        assert_eq!(result.target("young"), &[data[1].clone()]);
        assert_eq!(result.edge_counts["s-output_adults-input"], 3);
        assert_eq!(result.edge_counts["adults-positive_grown-input"], 2);
        assert_eq!(result.edge_counts["adults-negative_young-input"], 1);
    }
}
