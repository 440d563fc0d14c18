//! Turns a block graph into an `Ast`.
//!
//! Block types are registered once with a builder callback. `build` walks the graph from
//! the source block in dependency order and hands each graph-level block to its builder,
//! which pulls its expression children in through the `NodeContext` helpers.

use crate::compiler_frontend::ast::ast_nodes::{
    Ast, ExprNode, NEGATIVE_OUTPUT, OperationNode, POSITIVE_OUTPUT, PrimitiveNode, SetAttributes,
    SetCategory, SetInput, SetNode,
};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::graph::{BlockGraph, GraphBlock};
use crate::compiler_frontend::types::IType;
use crate::{ast_log, graph_log, return_config_error, timer_log};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::ops::Deref;
use std::time::Instant;

pub type NodeBuilderFn = Box<dyn Fn(&NodeContext<'_>) -> Result<SetNode, CompilerError>>;
pub type OperationBuilderFn =
    Box<dyn Fn(&OperationContext<'_>) -> Result<ExprNode, CompilerError>>;

/// What the AST builder needs to know about a graph-level block type.
#[derive(Debug, Clone)]
pub struct NodeDefinition {
    pub category: SetCategory,
    pub field_types: BTreeMap<String, IType>,
}

impl NodeDefinition {
    pub fn new(category: SetCategory) -> Self {
        NodeDefinition {
            category,
            field_types: BTreeMap::new(),
        }
    }

    pub fn with_field_type(mut self, field: impl Into<String>, ty: IType) -> Self {
        self.field_types.insert(field.into(), ty);
        self
    }
}

/// What the AST builder needs to know about an expression block type.
#[derive(Debug, Clone, Default)]
pub struct OperationDefinition {
    pub output_type: Option<IType>,
    pub field_types: BTreeMap<String, IType>,
}

impl OperationDefinition {
    pub fn new(output_type: Option<IType>) -> Self {
        OperationDefinition {
            output_type,
            field_types: BTreeMap::new(),
        }
    }

    pub fn with_field_type(mut self, field: impl Into<String>, ty: IType) -> Self {
        self.field_types.insert(field.into(), ty);
        self
    }
}

struct NodeRegistration {
    definition: NodeDefinition,
    builder: NodeBuilderFn,
}

struct OperationRegistration {
    definition: OperationDefinition,
    builder: OperationBuilderFn,
}

/// Registry of block builders. Owned by whoever compiles programs and passed around
/// explicitly.
#[derive(Default)]
pub struct AstBuilder {
    node_snippets: FxHashMap<String, NodeRegistration>,
    operation_snippets: FxHashMap<String, OperationRegistration>,
}

impl AstBuilder {
    pub fn new() -> Self {
        AstBuilder::default()
    }

    pub fn register_node(
        &mut self,
        block_type: impl Into<String>,
        definition: NodeDefinition,
        builder: impl Fn(&NodeContext<'_>) -> Result<SetNode, CompilerError> + 'static,
    ) -> Result<(), CompilerError> {
        let block_type = block_type.into();
        self.check_unregistered(&block_type)?;

        self.node_snippets.insert(
            block_type,
            NodeRegistration {
                definition,
                builder: Box::new(builder),
            },
        );

        Ok(())
    }

    pub fn register_operation(
        &mut self,
        block_type: impl Into<String>,
        definition: OperationDefinition,
        builder: impl Fn(&OperationContext<'_>) -> Result<ExprNode, CompilerError> + 'static,
    ) -> Result<(), CompilerError> {
        let block_type = block_type.into();
        self.check_unregistered(&block_type)?;

        self.operation_snippets.insert(
            block_type,
            OperationRegistration {
                definition,
                builder: Box::new(builder),
            },
        );

        Ok(())
    }

    fn check_unregistered(&self, block_type: &str) -> Result<(), CompilerError> {
        if self.node_snippets.contains_key(block_type)
            || self.operation_snippets.contains_key(block_type)
        {
            return_config_error!(
                format!("Block type '{}' is already registered", block_type),
                {
                    BlockType => block_type,
                    CompilationStage => "Block Registration",
                }
            );
        }

        Ok(())
    }

    pub fn node_category(&self, block_type: &str) -> Option<SetCategory> {
        self.node_snippets
            .get(block_type)
            .map(|registration| registration.definition.category)
    }

    pub fn is_registered(&self, block_type: &str) -> bool {
        self.node_snippets.contains_key(block_type)
            || self.operation_snippets.contains_key(block_type)
    }

    pub fn build(&self, graph: &BlockGraph) -> Result<Ast, CompilerError> {
        let time = Instant::now();

        let sources = graph
            .blocks
            .iter()
            .filter(|block| self.node_category(&block.block_type) == Some(SetCategory::Source))
            .collect::<Vec<_>>();

        let source = match sources.as_slice() {
            [] => {
                graph_log!("No source block in graph, building an empty AST");
                return Ok(Ast::empty());
            }
            [source] => *source,
            [first, second, ..] => {
                return_config_error!(
                    format!(
                        "Graph has more than one source block ('{}' and '{}')",
                        first.id, second.id
                    ),
                    {
                        BlockId => second.id,
                        CompilationStage => "AST Construction",
                        PrimarySuggestion => "Remove all but one source block",
                    }
                );
            }
        };

        let index = graph.index();
        let ordered = dependency_order(graph, source);
        graph_log!("Visiting ", {ordered.len()}, " blocks downstream of source ", source.id);

        let root = self.build_set(source, &index)?;
        let mut sets = Vec::new();
        let mut targets = Vec::new();

        for block in ordered.into_iter().skip(1) {
            match self.node_category(&block.block_type) {
                Some(SetCategory::Subset) => sets.push(self.build_set(block, &index)?),
                Some(SetCategory::Target) => targets.push(self.build_set(block, &index)?),
                Some(SetCategory::Source) => {
                    return_config_error!(
                        format!("Source block '{}' cannot have inputs", block.id),
                        { BlockId => block.id, BlockType => block.block_type }
                    );
                }
                None => {
                    return_config_error!(
                        format!(
                            "Block '{}' is wired into the graph but its type '{}' is not a registered node",
                            block.id, block.block_type
                        ),
                        {
                            BlockId => block.id,
                            BlockType => block.block_type,
                            CompilationStage => "AST Construction",
                        }
                    );
                }
            }
        }

        ast_log!("Built AST with ", {sets.len()}, " subsets and ", {targets.len()}, " targets");
        timer_log!(time, "AST built in: ");

        Ok(Ast {
            root,
            sets,
            targets,
        })
    }

    fn build_set(
        &self,
        block: &GraphBlock,
        index: &FxHashMap<&str, &GraphBlock>,
    ) -> Result<SetNode, CompilerError> {
        let Some(registration) = self.node_snippets.get(&block.block_type) else {
            return_config_error!(
                format!("No node builder registered for block type '{}'", block.block_type),
                { BlockId => block.id, BlockType => block.block_type }
            );
        };

        let active = RefCell::new(FxHashSet::default());
        let context = NodeContext {
            scope: BuildScope {
                builder: self,
                index,
                active: &active,
                block,
                field_types: &registration.definition.field_types,
                output_type: None,
            },
        };

        (registration.builder)(&context)
    }

    /// `active` holds the expression blocks being compiled above this one.
    fn compile_expression(
        &self,
        block: &GraphBlock,
        socket: &str,
        index: &FxHashMap<&str, &GraphBlock>,
        active: &RefCell<FxHashSet<String>>,
    ) -> Result<ExprNode, CompilerError> {
        let Some(registration) = self.operation_snippets.get(&block.block_type) else {
            return_config_error!(
                format!(
                    "No operation builder registered for block type '{}'",
                    block.block_type
                ),
                { BlockId => block.id, BlockType => block.block_type }
            );
        };

        if !active.borrow_mut().insert(block.id.clone()) {
            return_config_error!(
                format!(
                    "Block '{}' is wired into its own inputs through '{}'",
                    block.id, socket
                ),
                {
                    BlockId => block.id,
                    ConnectionPoint => socket,
                    CompilationStage => "AST Construction",
                }
            );
        }

        let context = OperationContext {
            scope: BuildScope {
                builder: self,
                index,
                active,
                block,
                field_types: &registration.definition.field_types,
                output_type: registration.definition.output_type.as_ref(),
            },
        };

        let compiled = (registration.builder)(&context);
        active.borrow_mut().remove(&block.id);
        compiled
    }
}

/// Breadth-first walk from the source that only visits a block once every block wired
/// into it has been visited. Blocks not reachable from the source are left out.
fn dependency_order<'g>(graph: &'g BlockGraph, source: &'g GraphBlock) -> Vec<&'g GraphBlock> {
    let mut consumers: FxHashMap<&str, Vec<&GraphBlock>> = FxHashMap::default();
    for block in &graph.blocks {
        let mut seen = FxHashSet::default();
        for upstream in block.upstream_ids() {
            if seen.insert(upstream) {
                consumers.entry(upstream).or_default().push(block);
            }
        }
    }

    let mut visited: FxHashSet<&str> = FxHashSet::default();
    let mut queued: FxHashSet<&str> = FxHashSet::default();
    let mut queue = VecDeque::from([source]);
    let mut order = Vec::new();
    queued.insert(source.id.as_str());

    while let Some(block) = queue.pop_front() {
        visited.insert(block.id.as_str());
        order.push(block);

        let Some(downstream) = consumers.get(block.id.as_str()) else {
            continue;
        };

        for consumer in downstream {
            if queued.contains(consumer.id.as_str()) {
                continue;
            }

            if consumer
                .upstream_ids()
                .all(|upstream| visited.contains(upstream))
            {
                queued.insert(consumer.id.as_str());
                queue.push_back(*consumer);
            }
        }
    }

    order
}

/// Helpers shared by node and operation builders, scoped to one block.
pub struct BuildScope<'a> {
    builder: &'a AstBuilder,
    index: &'a FxHashMap<&'a str, &'a GraphBlock>,
    active: &'a RefCell<FxHashSet<String>>,
    block: &'a GraphBlock,
    field_types: &'a BTreeMap<String, IType>,
    output_type: Option<&'a IType>,
}

impl<'a> BuildScope<'a> {
    pub fn block(&self) -> &'a GraphBlock {
        self.block
    }

    pub fn block_id(&self) -> &'a str {
        &self.block.id
    }

    pub fn field_value(&self, name: &str) -> Option<&'a Value> {
        self.block.fields.get(name)
    }

    /// The compiled child plugged into `name`, or a `type: None` primitive holding the
    /// inline field value when the socket is empty.
    pub fn value_input(&self, name: &str) -> Result<ExprNode, CompilerError> {
        let Some(child_id) = self.block.inputs.get(name) else {
            let value = self.block.fields.get(name).cloned().unwrap_or(Value::Null);
            return Ok(ExprNode::Primitive(PrimitiveNode::new(value, None)));
        };

        let child = self.lookup(child_id, name)?;
        self.builder
            .compile_expression(child, name, self.index, self.active)
    }

    /// A primitive for the field `name`, typed by `override_type`, else the declared
    /// field type, else the block's output type.
    pub fn field(
        &self,
        name: &str,
        override_type: Option<IType>,
    ) -> Result<PrimitiveNode, CompilerError> {
        let Some(value) = self.block.fields.get(name) else {
            return_config_error!(
                format!("Block '{}' is missing required field '{}'", self.block.id, name),
                {
                    BlockId => self.block.id,
                    BlockType => self.block.block_type,
                    CompilationStage => "AST Construction",
                }
            );
        };

        let ty = override_type
            .or_else(|| self.field_types.get(name).cloned())
            .or_else(|| self.output_type.cloned());

        Ok(PrimitiveNode::new(value.clone(), ty))
    }

    /// Compiles the statement chain plugged into `name`. Every segment must compile to an
    /// operation.
    pub fn statement_input(&self, name: &str) -> Result<Vec<OperationNode>, CompilerError> {
        let mut statements = Vec::new();
        let mut seen = FxHashSet::default();
        let mut next = self.block.statements.get(name);

        while let Some(block_id) = next {
            if !seen.insert(block_id.as_str()) {
                return_config_error!(
                    format!("Statement chain in '{}' loops back on '{}'", self.block.id, block_id),
                    { BlockId => block_id, ConnectionPoint => name }
                );
            }

            let block = self.lookup(block_id, name)?;
            let compiled = self
                .builder
                .compile_expression(block, name, self.index, self.active)?;

            match compiled {
                ExprNode::Operation(operation) => statements.push(operation),
                ExprNode::Primitive(_) => {
                    return_config_error!(
                        format!(
                            "Block '{}' in statement input '{}' compiled to a bare value",
                            block.id, name
                        ),
                        {
                            BlockId => block.id,
                            BlockType => block.block_type,
                            PrimarySuggestion => "Only statement blocks can be placed in a statement input",
                        }
                    );
                }
            }

            next = block.next.as_ref();
        }

        Ok(statements)
    }

    fn lookup(&self, block_id: &str, socket: &str) -> Result<&'a GraphBlock, CompilerError> {
        match self.index.get(block_id) {
            Some(block) => Ok(*block),
            None => {
                return_config_error!(
                    format!(
                        "Block '{}' references missing block '{}' through '{}'",
                        self.block.id, block_id, socket
                    ),
                    { BlockId => self.block.id, ConnectionPoint => socket }
                );
            }
        }
    }
}

/// Context handed to node (set) builders.
pub struct NodeContext<'a> {
    scope: BuildScope<'a>,
}

impl NodeContext<'_> {
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.scope.block.fields.get(name)
    }

    /// The block id plus every inline field, for set builders that want to keep them.
    pub fn attributes(&self) -> SetAttributes {
        SetAttributes {
            id: self.scope.block.id.clone(),
            extra: self.scope.block.fields.clone(),
        }
    }

    /// Upstream sets wired into socket `name`. Wires leaving a subset are tagged with the
    /// subset output they used.
    pub fn connection_point(&self, name: &str) -> Vec<SetInput> {
        let Some(connections) = self.scope.block.connections.get(name) else {
            return Vec::new();
        };

        connections
            .iter()
            .map(|connection| {
                let upstream_category = self
                    .scope
                    .index
                    .get(connection.block.as_str())
                    .and_then(|block| self.scope.builder.node_category(&block.block_type));

                let connection_point = match upstream_category {
                    Some(SetCategory::Subset) => match connection.port.as_deref() {
                        Some(NEGATIVE_OUTPUT) => Some(NEGATIVE_OUTPUT),
                        _ => Some(POSITIVE_OUTPUT),
                    },
                    _ => None,
                };

                SetInput::new(connection.block.clone(), connection_point)
            })
            .collect()
    }

    /// Every connection socket on the block, resolved.
    pub fn all_connection_points(&self) -> BTreeMap<String, Vec<SetInput>> {
        self.scope
            .block
            .connections
            .keys()
            .map(|name| (name.clone(), self.connection_point(name)))
            .collect()
    }
}

impl<'a> Deref for NodeContext<'a> {
    type Target = BuildScope<'a>;

    fn deref(&self) -> &Self::Target {
        &self.scope
    }
}

/// Context handed to operation (expression) builders.
pub struct OperationContext<'a> {
    scope: BuildScope<'a>,
}

impl OperationContext<'_> {
    pub fn output_type(&self) -> Option<IType> {
        self.scope.output_type.cloned()
    }
}

impl<'a> Deref for OperationContext<'a> {
    type Target = BuildScope<'a>;

    fn deref(&self) -> &Self::Target {
        &self.scope
    }
}
