//! Runs generated query programs against a data source.

pub mod node_runtime;

use crate::compiler_frontend::compiler_errors::CompilerError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub use node_runtime::NodeRuntime;

/// The records a query filters. Every element is one record.
pub type DataSource = Vec<Value>;

/// What a query function returns: the records in each target and how many records
/// travelled along each edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub targets: BTreeMap<String, Vec<Value>>,

    #[serde(default, rename = "edgeCounts")]
    pub edge_counts: BTreeMap<String, u64>,
}

impl QueryResult {
    pub fn from_json(source: &str) -> Result<Self, CompilerError> {
        serde_json::from_str(source).map_err(|error| {
            CompilerError::new_runtime_error(format!(
                "Query returned something that is not a query result: {}",
                error
            ))
        })
    }

    pub fn target(&self, id: &str) -> &[Value] {
        self.targets.get(id).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Executes generated code. `code` must define the entry point the runtime was built for.
pub trait Runtime {
    fn execute(&self, code: &str, data: &DataSource) -> Result<QueryResult, CompilerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler_frontend::compiler_errors::ErrorType;
    use serde_json::json;

    #[test]
    fn parses_query_output() {
        let result = QueryResult::from_json(
            r#"{"targets": {"t": [{"age": 4}]}, "edgeCounts": {"s-output_sub-input": 2}}"#,
        )
        .expect("valid result");

        assert_eq!(result.target("t"), &[json!({"age": 4})]);
        assert!(result.target("missing").is_empty());
        assert_eq!(result.edge_counts["s-output_sub-input"], 2);
    }

    #[test]
    fn malformed_output_is_a_runtime_error() {
        let error = QueryResult::from_json("[1, 2]").expect_err("not an object");
        assert_eq!(error.error_type, ErrorType::Runtime);
    }
}
