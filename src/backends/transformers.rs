//! Transformer definitions and the registry that resolves them.
//!
//! A transformer turns one evaluated AST node into a code fragment. Operation
//! transformers overload on the types of their arguments, primitive transformers on the
//! type of the literal, and set transformers on the set category.

use crate::backends::name_manager::NameManager;
use crate::compiler_frontend::ast::ast_nodes::{DEFAULT_OUTPUT, PrimitiveNode, SetCategory};
use crate::compiler_frontend::ast::evaluated_ast::{
    EvaluatedArg, EvaluatedAst, EvaluatedOperation, EvaluatedSet,
};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::types::{IType, check_type_compatibility, specificity_cost};
use crate::return_config_error;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub type OperationTransformFn =
    Box<dyn Fn(&EvaluatedOperation, &mut TransformUtils<'_>) -> String>;
pub type PrimitiveTransformFn = Box<dyn Fn(&PrimitiveNode, &mut TransformUtils<'_>) -> String>;
pub type SetTransformFn = Box<dyn Fn(&EvaluatedSet, &mut TransformUtils<'_>) -> String>;
pub type QueryFunctionFn =
    Box<dyn Fn(&QueryFunctionInput<'_>, &mut TransformUtils<'_>) -> String>;

pub enum TransformerDef {
    Operation {
        operation: String,
        args: BTreeMap<String, IType>,
        transformer: OperationTransformFn,
    },
    Primitive {
        ty: IType,
        transformer: PrimitiveTransformFn,
    },
    Set {
        block_name: SetCategory,
        transformer: SetTransformFn,
    },
    QueryFunction {
        transformer: QueryFunctionFn,
    },
}

pub fn create_operation_transformer<K: Into<String>>(
    operation: &str,
    args: impl IntoIterator<Item = (K, IType)>,
    transformer: impl Fn(&EvaluatedOperation, &mut TransformUtils<'_>) -> String + 'static,
) -> TransformerDef {
    TransformerDef::Operation {
        operation: operation.to_owned(),
        args: args
            .into_iter()
            .map(|(name, ty)| (name.into(), ty))
            .collect(),
        transformer: Box::new(transformer),
    }
}

pub fn create_primitive_transformer(
    ty: IType,
    transformer: impl Fn(&PrimitiveNode, &mut TransformUtils<'_>) -> String + 'static,
) -> TransformerDef {
    TransformerDef::Primitive {
        ty,
        transformer: Box::new(transformer),
    }
}

pub fn create_source_transformer(
    transformer: impl Fn(&EvaluatedSet, &mut TransformUtils<'_>) -> String + 'static,
) -> TransformerDef {
    TransformerDef::Set {
        block_name: SetCategory::Source,
        transformer: Box::new(transformer),
    }
}

pub fn create_subset_transformer(
    transformer: impl Fn(&EvaluatedSet, &mut TransformUtils<'_>) -> String + 'static,
) -> TransformerDef {
    TransformerDef::Set {
        block_name: SetCategory::Subset,
        transformer: Box::new(transformer),
    }
}

pub fn create_target_transformer(
    transformer: impl Fn(&EvaluatedSet, &mut TransformUtils<'_>) -> String + 'static,
) -> TransformerDef {
    TransformerDef::Set {
        block_name: SetCategory::Target,
        transformer: Box::new(transformer),
    }
}

pub fn create_query_function_transformer(
    transformer: impl Fn(&QueryFunctionInput<'_>, &mut TransformUtils<'_>) -> String + 'static,
) -> TransformerDef {
    TransformerDef::QueryFunction {
        transformer: Box::new(transformer),
    }
}

/// One deduplicated wire between two sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source_id: String,
    pub source_port: String,
    pub target_id: String,
    pub target_port: String,
}

impl Edge {
    /// `"{source}-{sourcePort}_{target}-{targetPort}"`, the key used in `edgeCounts`.
    pub fn key(&self) -> String {
        format!(
            "{}-{}_{}-{}",
            self.source_id, self.source_port, self.target_id, self.target_port
        )
    }
}

/// Everything the entry point transformer gets to see.
pub struct QueryFunctionInput<'a> {
    pub ast: &'a EvaluatedAst,
    pub edges: &'a BTreeMap<String, Edge>,

    // Code produced by the source and target transformers, keyed by set id
    pub set_code: &'a BTreeMap<String, String>,

    pub entry_name: &'a str,
}

/// Helpers handed to every transformer call.
pub struct TransformUtils<'a> {
    pub names: &'a mut NameManager,
}

impl TransformUtils<'_> {
    pub fn name(&mut self, id: &str, base: &str) -> String {
        self.names.get_name(id, base)
    }

    pub fn distinct_name(&mut self, base: &str) -> String {
        self.names.get_distinct_name(base)
    }

    /// Name of the predicate function generated for a subset.
    pub fn subset_function(&mut self, set_id: &str) -> String {
        self.names
            .get_name(&format!("subset_fn:{}", set_id), &format!("subset_{}", set_id))
    }

    /// Name of the variable holding the records leaving `set_id` through `port`.
    pub fn set_variable(&mut self, set_id: &str, port: &str) -> String {
        let base = if port == DEFAULT_OUTPUT {
            format!("set_{}", set_id)
        } else {
            format!("set_{}_{}", set_id, port)
        };

        self.names.get_name(&format!("set:{}:{}", set_id, port), &base)
    }
}

pub struct OperationTransformer {
    pub args: BTreeMap<String, IType>,
    pub transformer: OperationTransformFn,
}

pub struct PrimitiveTransformer {
    pub ty: IType,
    pub transformer: PrimitiveTransformFn,
}

/// How a primitive was resolved. `candidates > 1` means specificity ranking broke a tie.
pub struct PrimitiveResolution<'a> {
    pub transformer: &'a PrimitiveTransformer,
    pub candidates: usize,
}

/// Transformers indexed by operation name, primitive type and set category.
#[derive(Default)]
pub struct TransformerRegistry {
    operations: FxHashMap<String, Vec<OperationTransformer>>,
    primitives: Vec<PrimitiveTransformer>,
    sets: FxHashMap<SetCategory, SetTransformFn>,
    query_function: Option<QueryFunctionFn>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        TransformerRegistry::default()
    }

    pub fn from_defs(
        defs: impl IntoIterator<Item = TransformerDef>,
    ) -> Result<Self, CompilerError> {
        let mut registry = TransformerRegistry::new();
        for def in defs {
            registry.register(def)?;
        }
        Ok(registry)
    }

    /// Operation and primitive transformers keep registration order, which is their
    /// priority. Set and query function transformers can only be registered once.
    pub fn register(&mut self, def: TransformerDef) -> Result<(), CompilerError> {
        match def {
            TransformerDef::Operation {
                operation,
                args,
                transformer,
            } => {
                self.operations
                    .entry(operation)
                    .or_default()
                    .push(OperationTransformer { args, transformer });
            }

            TransformerDef::Primitive { ty, transformer } => {
                self.primitives.push(PrimitiveTransformer { ty, transformer });
            }

            TransformerDef::Set {
                block_name,
                transformer,
            } => {
                if self.sets.contains_key(&block_name) {
                    return_config_error!(
                        format!("A transformer for '{}' is already registered", block_name),
                        {
                            BlockType => block_name,
                            CompilationStage => "Transformer Registration",
                        }
                    );
                }
                self.sets.insert(block_name, transformer);
            }

            TransformerDef::QueryFunction { transformer } => {
                if self.query_function.is_some() {
                    return_config_error!(
                        "A query function transformer is already registered",
                        { CompilationStage => "Transformer Registration" }
                    );
                }
                self.query_function = Some(transformer);
            }
        }

        Ok(())
    }

    /// First transformer, in registration order, that declares every argument the node
    /// has and accepts each child's type. No ranking happens here.
    pub fn resolve_operation(&self, node: &EvaluatedOperation) -> Option<&OperationTransformer> {
        self.operations
            .get(&node.operation)?
            .iter()
            .find(|candidate| operation_matches(candidate, node))
    }

    /// Every primitive transformer compatible with the literal, narrowed to the most
    /// specific one. Ties go to the earliest registration.
    pub fn resolve_primitive(&self, node: &PrimitiveNode) -> Option<PrimitiveResolution<'_>> {
        let ty = narrow_to_value(&primitive_type(node), &node.value);

        let candidates = self
            .primitives
            .iter()
            .filter(|candidate| check_type_compatibility(&candidate.ty, &ty))
            .collect::<Vec<_>>();

        let transformer = candidates
            .iter()
            .copied()
            .min_by_key(|candidate| specificity_cost(&candidate.ty))?;

        Some(PrimitiveResolution {
            transformer,
            candidates: candidates.len(),
        })
    }

    pub fn resolve_set(&self, category: SetCategory) -> Option<&SetTransformFn> {
        self.sets.get(&category)
    }

    pub fn query_function(&self) -> Option<&QueryFunctionFn> {
        self.query_function.as_ref()
    }
}

fn operation_matches(candidate: &OperationTransformer, node: &EvaluatedOperation) -> bool {
    node.args.iter().all(|(name, arg)| {
        let Some(required) = candidate.args.get(name) else {
            return false;
        };

        match arg {
            EvaluatedArg::Single(child) => child_matches(required, child.ty()),
            EvaluatedArg::Many(children) => children
                .iter()
                .all(|child| child_matches(required, child.ty())),
        }
    })
}

// An untyped child is inferred from context, so it never rules a transformer out
fn child_matches(required: &IType, actual: Option<&IType>) -> bool {
    actual.is_none_or(|actual| check_type_compatibility(required, actual))
}

/// The declared type of a literal, or one read off its JSON value when it has none.
pub fn primitive_type(node: &PrimitiveNode) -> IType {
    if let Some(ty) = &node.ty {
        return ty.clone();
    }

    json_type(&node.value)
}

fn json_type(value: &Value) -> IType {
    match value {
        Value::Number(_) => IType::Number,
        Value::String(_) => IType::String,
        Value::Bool(_) => IType::Boolean,
        Value::Null => IType::Null,
        Value::Array(_) | Value::Object(_) => IType::Wildcard,
    }
}

/// Nullable and union literals resolve under the branch their value takes: a null value
/// is `null`, anything else is the inner type, and a union picks its first member that
/// fits the value.
fn narrow_to_value(ty: &IType, value: &Value) -> IType {
    match ty {
        IType::Nullable(_) if value.is_null() => IType::Null,
        IType::Nullable(inner) => narrow_to_value(inner, value),
        IType::Union(members) => {
            let shape = json_type(value);
            members
                .iter()
                .map(|member| narrow_to_value(member, value))
                .find(|member| check_type_compatibility(member, &shape))
                .unwrap_or_else(|| ty.clone())
        }
        _ => ty.clone(),
    }
}
