//! The evaluated AST: a disposable deep clone of an `Ast` where every deferred argument
//! list has been materialized into concrete children, and every node carries empty slots
//! for the code its children produce.
//!
//! The code generator fills the slots from its cache right before invoking a node's
//! transformer, so transformers read `evaluated_args` and `evaluated_operations` rather
//! than walking children themselves.

use crate::compiler_frontend::ast::ast_nodes::{
    ArgValue, Ast, ExprNode, OperationNode, PrimitiveNode, SetAttributes, SetCategory, SetInput,
    SetNode,
};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::types::IType;
use rustc_hash::FxHasher;
use serde::Serialize;
use std::collections::BTreeMap;
use std::hash::Hasher;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedAst {
    pub root: EvaluatedSet,
    pub sets: Vec<EvaluatedSet>,
    pub targets: Vec<EvaluatedSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedSet {
    pub attributes: SetAttributes,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<BTreeMap<String, Vec<SetInput>>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub operations: Option<Vec<EvaluatedOperation>>,

    // Code of each operation, same length as `operations`
    #[serde(skip)]
    pub evaluated_operations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedOperation {
    pub operation: String,

    #[serde(rename = "type")]
    pub ty: Option<IType>,

    pub args: BTreeMap<String, EvaluatedArg>,

    #[serde(skip)]
    pub evaluated_args: BTreeMap<String, EvaluatedCode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EvaluatedArg {
    Single(EvaluatedExpr),
    Many(Vec<EvaluatedExpr>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum EvaluatedExpr {
    Operation(EvaluatedOperation),
    Primitive(PrimitiveNode),
}

/// Generated code for one argument, shaped like the argument itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluatedCode {
    Single(String),
    Many(Vec<String>),
}

impl EvaluatedCode {
    /// The code of a single argument, or the elements joined with `", "`.
    pub fn joined(&self) -> String {
        match self {
            EvaluatedCode::Single(code) => code.clone(),
            EvaluatedCode::Many(codes) => codes.join(", "),
        }
    }
}

impl EvaluatedAst {
    pub fn from_ast(ast: &Ast) -> Self {
        EvaluatedAst {
            root: EvaluatedSet::from_set(&ast.root),
            sets: ast.sets.iter().map(EvaluatedSet::from_set).collect(),
            targets: ast.targets.iter().map(EvaluatedSet::from_set).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty() && self.targets.is_empty()
    }

    /// Looks up the root or a subset by id. Targets are never inputs to anything.
    pub fn producer(&self, id: &str) -> Option<&EvaluatedSet> {
        if self.root.id() == id {
            return Some(&self.root);
        }

        self.sets.iter().find(|set| set.id() == id)
    }
}

impl EvaluatedSet {
    pub fn from_set(set: &SetNode) -> Self {
        let operations = set.operations.as_ref().map(|operations| {
            operations
                .iter()
                .map(EvaluatedOperation::from_operation)
                .collect::<Vec<_>>()
        });

        let evaluated_operations = operations
            .as_ref()
            .map(|operations| vec![String::new(); operations.len()])
            .unwrap_or_default();

        EvaluatedSet {
            attributes: set.attributes.clone(),
            inputs: set.inputs.clone(),
            operations,
            evaluated_operations,
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

    /// Every incoming edge, across all connection sockets, with the socket name.
    pub fn incoming(&self) -> impl Iterator<Item = (&str, &SetInput)> {
        self.inputs.iter().flatten().flat_map(|(socket, inputs)| {
            inputs.iter().map(move |input| (socket.as_str(), input))
        })
    }
}

impl EvaluatedOperation {
    pub fn from_operation(operation: &OperationNode) -> Self {
        let mut args = BTreeMap::new();
        let mut evaluated_args = BTreeMap::new();

        for (name, value) in operation.materialize_args() {
            let (arg, placeholder) = match value {
                ArgValue::Single(child) => (
                    EvaluatedArg::Single(EvaluatedExpr::from_expr(&child)),
                    EvaluatedCode::Single(String::new()),
                ),
                ArgValue::Many(children) => (
                    EvaluatedArg::Many(children.iter().map(EvaluatedExpr::from_expr).collect()),
                    EvaluatedCode::Many(vec![String::new(); children.len()]),
                ),
            };

            args.insert(name.clone(), arg);
            evaluated_args.insert(name, placeholder);
        }

        EvaluatedOperation {
            operation: operation.operation.clone(),
            ty: operation.ty.clone(),
            args,
            evaluated_args,
        }
    }

    /// Filled-in code of argument `name`. Empty if the argument does not exist.
    pub fn arg_code(&self, name: &str) -> String {
        self.evaluated_args
            .get(name)
            .map(EvaluatedCode::joined)
            .unwrap_or_default()
    }
}

impl EvaluatedExpr {
    pub fn from_expr(expr: &ExprNode) -> Self {
        match expr {
            ExprNode::Operation(operation) => {
                EvaluatedExpr::Operation(EvaluatedOperation::from_operation(operation))
            }
            ExprNode::Primitive(primitive) => EvaluatedExpr::Primitive(primitive.clone()),
        }
    }

    pub fn ty(&self) -> Option<&IType> {
        match self {
            EvaluatedExpr::Operation(operation) => operation.ty.as_ref(),
            EvaluatedExpr::Primitive(primitive) => primitive.ty.as_ref(),
        }
    }

    pub fn structural_key(&self) -> Result<StructuralKey, CompilerError> {
        match self {
            EvaluatedExpr::Operation(operation) => StructuralKey::of(operation),
            EvaluatedExpr::Primitive(primitive) => StructuralKey::of(primitive),
        }
    }
}

impl EvaluatedArg {
    pub fn children(&self) -> &[EvaluatedExpr] {
        match self {
            EvaluatedArg::Single(child) => std::slice::from_ref(child),
            EvaluatedArg::Many(children) => children,
        }
    }
}

/// Content identity of a node: its canonical JSON plus an `FxHasher` digest of it.
///
/// Canonical because every map in the AST is a `BTreeMap` and `serde_json` objects are
/// sorted, so structurally equal nodes always serialize to the same string. The
/// placeholder slots are skipped, so a node hashes the same before and after filling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralKey {
    pub hash: u64,
    pub canonical: String,
}

impl StructuralKey {
    pub fn of<T: Serialize>(node: &T) -> Result<Self, CompilerError> {
        let canonical = serde_json::to_string(node).map_err(|error| {
            CompilerError::compiler_error(format!("Could not serialize AST node: {}", error))
        })?;

        let mut hasher = FxHasher::default();
        hasher.write(canonical.as_bytes());

        Ok(StructuralKey {
            hash: hasher.finish(),
            canonical,
        })
    }
}
