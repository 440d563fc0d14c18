use crate::compiler_frontend::types::IType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

pub const SOURCE_NODE: &str = "source_node";
pub const SUBSET_NODE: &str = "subset_node";
pub const TARGET_NODE: &str = "target_node";

// Output sockets of a subset node
pub const POSITIVE_OUTPUT: &str = "positive";
pub const NEGATIVE_OUTPUT: &str = "negative";

// Used for edge keys when the upstream set only has one output
pub const DEFAULT_OUTPUT: &str = "output";

// Id given to the root of an AST built from a graph without a source
pub const EMPTY_SOURCE_ID: &str = "source";

/// A whole compiled graph. Rebuilt from scratch for every compile request.
#[derive(Debug, Clone)]
pub struct Ast {
    pub root: SetNode,
    pub sets: Vec<SetNode>,
    pub targets: Vec<SetNode>,
}

impl Ast {
    /// The legal "nothing to run" program.
    pub fn empty() -> Self {
        Ast {
            root: SetNode::source(EMPTY_SOURCE_ID),
            sets: Vec::new(),
            targets: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty() && self.targets.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetCategory {
    Source,
    Subset,
    Target,
}

impl SetCategory {
    pub fn block_name(&self) -> &'static str {
        match self {
            SetCategory::Source => SOURCE_NODE,
            SetCategory::Subset => SUBSET_NODE,
            SetCategory::Target => TARGET_NODE,
        }
    }
}

impl fmt::Display for SetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.block_name())
    }
}

/// `id` is the only join key used across the pipeline. Everything else is carried along
/// for transformers that want it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SetAttributes {
    pub id: String,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SetAttributes {
    pub fn new(id: impl Into<String>) -> Self {
        SetAttributes {
            id: id.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// One incoming edge of a set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetInput {
    pub connected_set_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_point: Option<String>,
}

impl SetInput {
    pub fn new(connected_set_id: impl Into<String>, connection_point: Option<&str>) -> Self {
        SetInput {
            connected_set_id: connected_set_id.into(),
            connection_point: connection_point.map(str::to_owned),
        }
    }

    /// The upstream port used in edge keys.
    pub fn source_port(&self) -> &str {
        self.connection_point.as_deref().unwrap_or(DEFAULT_OUTPUT)
    }
}

/// The category is derived from shape: operations make a subset, inputs alone make a
/// target, neither makes a source.
#[derive(Debug, Clone)]
pub struct SetNode {
    pub attributes: SetAttributes,
    pub inputs: Option<BTreeMap<String, Vec<SetInput>>>,
    pub operations: Option<Vec<OperationNode>>,
}

impl SetNode {
    pub fn source(id: impl Into<String>) -> Self {
        SetNode {
            attributes: SetAttributes::new(id),
            inputs: None,
            operations: None,
        }
    }

    pub fn subset(
        id: impl Into<String>,
        inputs: BTreeMap<String, Vec<SetInput>>,
        operations: Vec<OperationNode>,
    ) -> Self {
        SetNode {
            attributes: SetAttributes::new(id),
            inputs: Some(inputs),
            operations: Some(operations),
        }
    }

    pub fn target(id: impl Into<String>, inputs: BTreeMap<String, Vec<SetInput>>) -> Self {
        SetNode {
            attributes: SetAttributes::new(id),
            inputs: Some(inputs),
            operations: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.attributes.id
    }

    pub fn category(&self) -> SetCategory {
        match (&self.operations, &self.inputs) {
            (Some(_), _) => SetCategory::Subset,
            (None, Some(_)) => SetCategory::Target,
            (None, None) => SetCategory::Source,
        }
    }
}

/// A typed expression or statement inside a set's predicate.
#[derive(Debug, Clone)]
pub struct OperationNode {
    pub operation: String,
    pub ty: Option<IType>,
    pub args: Args,
}

impl OperationNode {
    pub fn new(operation: impl Into<String>, ty: Option<IType>, args: ArgMap) -> Self {
        OperationNode {
            operation: operation.into(),
            ty,
            args: Args::Literal(args),
        }
    }

    /// Args built lazily from the node itself, once the evaluated AST is produced.
    pub fn deferred(
        operation: impl Into<String>,
        ty: Option<IType>,
        args: impl Fn(&OperationNode) -> ArgMap + 'static,
    ) -> Self {
        OperationNode {
            operation: operation.into(),
            ty,
            args: Args::Deferred(DeferredArgs(Rc::new(args))),
        }
    }

    /// Literal args as-is, deferred args by invoking them against this node.
    pub fn materialize_args(&self) -> ArgMap {
        match &self.args {
            Args::Literal(args) => args.clone(),
            Args::Deferred(thunk) => (thunk.0)(self),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Args {
    Literal(ArgMap),
    Deferred(DeferredArgs),
}

pub type ArgMap = BTreeMap<String, ArgValue>;

#[derive(Clone)]
pub struct DeferredArgs(pub Rc<dyn Fn(&OperationNode) -> ArgMap>);

impl fmt::Debug for DeferredArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeferredArgs(..)")
    }
}

/// An argument is one child, or a list of children for variadic sockets.
#[derive(Debug, Clone)]
pub enum ArgValue {
    Single(ExprNode),
    Many(Vec<ExprNode>),
}

/// A literal leaf. `ty: None` means "infer from context", used for unset sockets that
/// fall back to an inline default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveNode {
    pub value: Value,

    #[serde(rename = "type")]
    pub ty: Option<IType>,
}

impl PrimitiveNode {
    pub fn new(value: Value, ty: Option<IType>) -> Self {
        PrimitiveNode { value, ty }
    }
}

#[derive(Debug, Clone)]
pub enum ExprNode {
    Operation(OperationNode),
    Primitive(PrimitiveNode),
}

impl ExprNode {
    pub fn primitive(value: Value, ty: Option<IType>) -> Self {
        ExprNode::Primitive(PrimitiveNode::new(value, ty))
    }

    pub fn ty(&self) -> Option<&IType> {
        match self {
            ExprNode::Operation(operation) => operation.ty.as_ref(),
            ExprNode::Primitive(primitive) => primitive.ty.as_ref(),
        }
    }
}

impl From<OperationNode> for ExprNode {
    fn from(node: OperationNode) -> Self {
        ExprNode::Operation(node)
    }
}

impl From<PrimitiveNode> for ExprNode {
    fn from(node: PrimitiveNode) -> Self {
        ExprNode::Primitive(node)
    }
}

impl From<ExprNode> for ArgValue {
    fn from(node: ExprNode) -> Self {
        ArgValue::Single(node)
    }
}

impl From<Vec<ExprNode>> for ArgValue {
    fn from(nodes: Vec<ExprNode>) -> Self {
        ArgValue::Many(nodes)
    }
}

/// Borrowed view of any AST node, handed to visitors.
#[derive(Debug, Clone, Copy)]
pub enum AstNodeRef<'a> {
    Set(&'a SetNode),
    Operation(&'a OperationNode),
    Primitive(&'a PrimitiveNode),
}
