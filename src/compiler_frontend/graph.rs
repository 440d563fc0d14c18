//! The block graph handed over by the editor layer.
//!
//! Graph-level blocks (sources, subsets, targets) are wired together through named
//! connection sockets. Expression blocks hang off them through value inputs and
//! statement chains.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockGraph {
    pub blocks: Vec<GraphBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphBlock {
    pub id: String,

    #[serde(rename = "type")]
    pub block_type: String,

    // Inline field values (text boxes, dropdowns, number fields)
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,

    // Value input name -> id of the expression block plugged into it
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,

    // Statement input name -> id of the first block of the chain
    #[serde(default)]
    pub statements: BTreeMap<String, String>,

    // Next block in a statement chain
    #[serde(default)]
    pub next: Option<String>,

    // Graph socket name -> upstream blocks wired into it
    #[serde(default)]
    pub connections: BTreeMap<String, Vec<GraphConnection>>,
}

/// One wire into a graph socket: the upstream block and the output port it leaves from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConnection {
    pub block: String,

    #[serde(default)]
    pub port: Option<String>,
}

impl BlockGraph {
    pub fn new(blocks: Vec<GraphBlock>) -> Self {
        BlockGraph { blocks }
    }

    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    pub fn block(&self, id: &str) -> Option<&GraphBlock> {
        self.blocks.iter().find(|block| block.id == id)
    }

    pub fn index(&self) -> FxHashMap<&str, &GraphBlock> {
        self.blocks
            .iter()
            .map(|block| (block.id.as_str(), block))
            .collect()
    }
}

impl GraphBlock {
    pub fn new(id: impl Into<String>, block_type: impl Into<String>) -> Self {
        GraphBlock {
            id: id.into(),
            block_type: block_type.into(),
            ..GraphBlock::default()
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, block_id: impl Into<String>) -> Self {
        self.inputs.insert(name.into(), block_id.into());
        self
    }

    pub fn with_statement(mut self, name: impl Into<String>, block_id: impl Into<String>) -> Self {
        self.statements.insert(name.into(), block_id.into());
        self
    }

    pub fn with_next(mut self, block_id: impl Into<String>) -> Self {
        self.next = Some(block_id.into());
        self
    }

    pub fn with_connection(
        mut self,
        socket: impl Into<String>,
        block_id: impl Into<String>,
        port: Option<&str>,
    ) -> Self {
        self.connections
            .entry(socket.into())
            .or_default()
            .push(GraphConnection {
                block: block_id.into(),
                port: port.map(str::to_owned),
            });
        self
    }

    /// Ids of every graph-level block this one reads from.
    pub fn upstream_ids(&self) -> impl Iterator<Item = &str> {
        self.connections
            .values()
            .flatten()
            .map(|connection| connection.block.as_str())
    }
}
