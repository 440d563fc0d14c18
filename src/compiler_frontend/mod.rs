pub mod ast;
pub mod blocks;
pub mod graph;
pub mod types;

pub mod compiler_messages {
    pub mod compiler_dev_logging;
    pub mod compiler_errors;
    pub mod compiler_warnings;
    pub mod display_messages;
}
pub use compiler_messages::compiler_errors;
pub use compiler_messages::compiler_warnings;
pub use compiler_messages::display_messages;

use crate::compiler_frontend::ast::ast_nodes::{Ast, SetCategory};
use crate::compiler_frontend::ast::build_ast::AstBuilder;
use crate::compiler_frontend::compiler_errors::{CompilerError, CompilerMessages};
use crate::compiler_frontend::compiler_warnings::{CompilerWarning, WarningKind};
use crate::compiler_frontend::graph::BlockGraph;
use rustc_hash::FxHashSet;

/// Flags change the behavior of the CLI pipeline.
#[derive(PartialEq, Debug, Clone)]
pub enum Flag {
    DisableWarnings,
    Pretty,
}

/// Owns the block registrations and turns graphs into ASTs.
pub struct CompilerFrontend {
    pub builder: AstBuilder,
}

impl CompilerFrontend {
    pub fn new(builder: AstBuilder) -> Self {
        CompilerFrontend { builder }
    }

    /// A frontend with the standard block library registered.
    pub fn with_standard_blocks() -> Result<Self, CompilerError> {
        Ok(CompilerFrontend::new(blocks::standard_ast_builder()?))
    }

    pub fn parse_graph(&self, source: &str) -> Result<BlockGraph, CompilerError> {
        BlockGraph::from_json(source).map_err(|error| {
            CompilerError::new_config_error(format!("Could not parse block graph: {}", error))
        })
    }

    /// -----------------------------
    /// AST CREATION
    /// -----------------------------
    /// Builds the AST and reports graph-level blocks that were left out because they are
    /// not connected to the source.
    pub fn graph_to_ast(
        &self,
        graph: &BlockGraph,
    ) -> Result<(Ast, Vec<CompilerWarning>), CompilerMessages> {
        let ast = self
            .builder
            .build(graph)
            .map_err(CompilerMessages::from_error)?;

        let mut built = FxHashSet::default();
        built.insert(ast.root.id());
        for set in ast.sets.iter().chain(&ast.targets) {
            built.insert(set.id());
        }

        let warnings = graph
            .blocks
            .iter()
            .filter(|block| {
                matches!(
                    self.builder.node_category(&block.block_type),
                    Some(SetCategory::Subset | SetCategory::Target)
                )
            })
            .filter(|block| !built.contains(block.id.as_str()))
            .map(|block| CompilerWarning::new(&block.id, WarningKind::UnreachableBlock))
            .collect();

        Ok((ast, warnings))
    }
}
