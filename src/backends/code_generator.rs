//! Drives code generation for one AST.
//!
//! The evaluated AST is walked in post-order. Every node's code lands in a cache keyed by
//! its structural hash, so a parent finds its children's code by hashing them again.
//! After the walk the program is assembled from the ambient prelude, the subset
//! functions and the query function, then passed through the hooks.

use crate::backends::name_manager::NameManager;
use crate::backends::transformers::{
    Edge, QueryFunctionInput, TransformUtils, TransformerRegistry, primitive_type,
};
use crate::compiler_frontend::ast::ast_nodes::{Ast, PrimitiveNode, SetCategory};
use crate::compiler_frontend::ast::evaluated_ast::{
    EvaluatedArg, EvaluatedAst, EvaluatedCode, EvaluatedOperation, EvaluatedSet, StructuralKey,
};
use crate::compiler_frontend::ast::traverse::{
    EvaluatedNodeRef, EvaluatedVisitor, traverse_ast_reverse,
};
use crate::compiler_frontend::compiler_errors::{CompilerError, ErrorType};
use crate::compiler_frontend::compiler_warnings::{CompilerWarning, WarningKind};
use crate::{codegen_log, eval_log, return_compiler_error, return_config_error, timer_log};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::time::Instant;

/// Post-passes over the assembled program. All default to doing nothing.
pub trait CodeHooks {
    fn format_code(&self, code: String) -> String {
        code
    }

    /// `None` means the optimizer could not produce a program, which fails generation.
    fn optimize_code(&self, code: String) -> Option<String> {
        Some(code)
    }

    fn verify_code(&self, _code: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl CodeHooks for DefaultHooks {}

/// The output of one generation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedProgram {
    pub source: String,
    pub warnings: Vec<CompilerWarning>,
    pub edges: BTreeMap<String, Edge>,
}

/// Generated code keyed by structural hash. Entries in a bucket are told apart by their
/// full canonical form, so a hash collision can never hand back the wrong code.
#[derive(Debug, Default)]
pub struct StructuralCache {
    buckets: FxHashMap<u64, Vec<(String, String)>>,
}

impl StructuralCache {
    pub fn get(&self, key: &StructuralKey) -> Option<&str> {
        self.buckets
            .get(&key.hash)?
            .iter()
            .find(|(canonical, _)| *canonical == key.canonical)
            .map(|(_, code)| code.as_str())
    }

    pub fn insert(&mut self, key: StructuralKey, code: String) {
        let bucket = self.buckets.entry(key.hash).or_default();

        match bucket
            .iter_mut()
            .find(|(canonical, _)| *canonical == key.canonical)
        {
            Some(entry) => entry.1 = code,
            None => bucket.push((key.canonical, code)),
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

pub struct CodeGenerator {
    transformers: TransformerRegistry,
    ambient_functions: Vec<String>,
    hooks: Box<dyn CodeHooks>,
    names: NameManager,
    cache: StructuralCache,
    entry_name: String,
}

impl CodeGenerator {
    pub fn new(
        transformers: TransformerRegistry,
        ambient_functions: Vec<String>,
        names: NameManager,
        entry_name: impl Into<String>,
    ) -> Self {
        CodeGenerator {
            transformers,
            ambient_functions,
            hooks: Box::new(DefaultHooks),
            names,
            cache: StructuralCache::default(),
            entry_name: entry_name.into(),
        }
    }

    pub fn with_hooks(mut self, hooks: impl CodeHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    pub fn verify_code(&self, code: &str) -> bool {
        self.hooks.verify_code(code)
    }

    /// Cache of the last pass.
    pub fn cache(&self) -> &StructuralCache {
        &self.cache
    }

    pub fn generate_code(&mut self, ast: &Ast) -> Result<GeneratedProgram, CompilerError> {
        let time = Instant::now();

        self.names.reset();
        self.cache.clear();

        let evaluated = EvaluatedAst::from_ast(ast);
        check_set_inputs(&evaluated)?;

        let mut sections = self.ambient_functions.clone();
        let mut warnings = Vec::new();
        let mut edges = BTreeMap::new();

        if !evaluated.is_empty() {
            let mut pass = EvaluationPass {
                transformers: &self.transformers,
                utils: TransformUtils {
                    names: &mut self.names,
                },
                cache: &mut self.cache,
                edges: BTreeMap::new(),
                set_code: BTreeMap::new(),
                subset_functions: Vec::new(),
                warnings: Vec::new(),
            };

            traverse_ast_reverse(&evaluated, &mut pass)?;
            eval_log!("Evaluated ", {pass.cache.len()}, " distinct nodes");

            sections.append(&mut pass.subset_functions);

            match self.transformers.query_function() {
                Some(query_function) => {
                    let input = QueryFunctionInput {
                        ast: &evaluated,
                        edges: &pass.edges,
                        set_code: &pass.set_code,
                        entry_name: &self.entry_name,
                    };
                    sections.push(query_function(&input, &mut pass.utils));
                }
                None => pass.warn(CompilerWarning::new(
                    "the program has no entry point",
                    WarningKind::MissingQueryFunction,
                )),
            }

            warnings = pass.warnings;
            edges = pass.edges;
        }

        let source = sections.join("\n\n");
        let source = self.hooks.format_code(source);
        let Some(source) = self.hooks.optimize_code(source) else {
            return Err(CompilerError::new(
                "Code optimization did not produce a program",
                ErrorType::Optimization,
            ));
        };

        codegen_log!("Generated program:\n", source);
        timer_log!(time, "Code generated in: ");

        Ok(GeneratedProgram {
            source,
            warnings,
            edges,
        })
    }
}

/// Every input must come from the root or a subset of the same AST.
fn check_set_inputs(ast: &EvaluatedAst) -> Result<(), CompilerError> {
    for set in ast.sets.iter().chain(&ast.targets) {
        for (socket, input) in set.incoming() {
            if ast.producer(&input.connected_set_id).is_none() {
                return_config_error!(
                    format!(
                        "Set '{}' reads from '{}', which is not the source or a subset of this graph",
                        set.id(),
                        input.connected_set_id
                    ),
                    {
                        BlockId => set.id(),
                        ConnectionPoint => socket,
                        CompilationStage => "Code Generation",
                    }
                );
            }
        }
    }

    Ok(())
}

struct EvaluationPass<'a> {
    transformers: &'a TransformerRegistry,
    utils: TransformUtils<'a>,
    cache: &'a mut StructuralCache,
    edges: BTreeMap<String, Edge>,
    set_code: BTreeMap<String, String>,
    subset_functions: Vec<String>,
    warnings: Vec<CompilerWarning>,
}

impl EvaluationPass<'_> {
    fn warn(&mut self, warning: CompilerWarning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    fn cached(&self, key: &StructuralKey) -> Result<String, CompilerError> {
        match self.cache.get(key) {
            Some(code) => Ok(code.to_owned()),
            None => return_compiler_error!(
                "Child node was not evaluated before its parent: {}",
                key.canonical
            ),
        }
    }

    fn record_edges(&mut self, set: &EvaluatedSet) {
        for (socket, input) in set.incoming() {
            let edge = Edge {
                source_id: input.connected_set_id.clone(),
                source_port: input.source_port().to_owned(),
                target_id: set.id().to_owned(),
                target_port: socket.to_owned(),
            };
            self.edges.insert(edge.key(), edge);
        }
    }

    fn evaluate_primitive(&mut self, primitive: &PrimitiveNode) -> Result<(), CompilerError> {
        let key = StructuralKey::of(primitive)?;
        if self.cache.get(&key).is_some() {
            return Ok(());
        }

        let transformers = self.transformers;
        let code = match transformers.resolve_primitive(primitive) {
            Some(resolution) => {
                if resolution.candidates > 1 {
                    self.warn(CompilerWarning::new(
                        format!(
                            "{} literal matched {} transformers, used `{}`",
                            primitive_label(primitive),
                            resolution.candidates,
                            resolution.transformer.ty
                        ),
                        WarningKind::AmbiguousPrimitiveMatch,
                    ));
                }
                (resolution.transformer.transformer)(primitive, &mut self.utils)
            }
            None => {
                self.warn(CompilerWarning::new(
                    primitive_label(primitive),
                    WarningKind::UnresolvedPrimitive,
                ));
                String::from("undefined")
            }
        };

        self.cache.insert(key, code);
        Ok(())
    }

    fn evaluate_operation(&mut self, operation: &EvaluatedOperation) -> Result<(), CompilerError> {
        let key = StructuralKey::of(operation)?;
        if self.cache.get(&key).is_some() {
            return Ok(());
        }

        let mut filled = operation.clone();
        for (name, arg) in &operation.args {
            let code = match arg {
                EvaluatedArg::Single(child) => {
                    EvaluatedCode::Single(self.cached(&child.structural_key()?)?)
                }
                EvaluatedArg::Many(children) => EvaluatedCode::Many(
                    children
                        .iter()
                        .map(|child| self.cached(&child.structural_key()?))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
            };
            filled.evaluated_args.insert(name.clone(), code);
        }

        let transformers = self.transformers;
        let code = match transformers.resolve_operation(&filled) {
            Some(resolved) => (resolved.transformer)(&filled, &mut self.utils),
            None => {
                self.warn(CompilerWarning::new(
                    &operation.operation,
                    WarningKind::UnresolvedOperation,
                ));
                format!("/* unresolved operation: {} */", operation.operation)
            }
        };

        self.cache.insert(key, code);
        Ok(())
    }

    fn evaluate_set(&mut self, set: &EvaluatedSet) -> Result<(), CompilerError> {
        self.record_edges(set);

        let mut filled = set.clone();
        if let Some(operations) = &set.operations {
            filled.evaluated_operations = operations
                .iter()
                .map(|operation| self.cached(&StructuralKey::of(operation)?))
                .collect::<Result<Vec<_>, _>>()?;
        }

        let category = set.category();
        let transformers = self.transformers;
        let code = match transformers.resolve_set(category) {
            Some(transformer) => transformer(&filled, &mut self.utils),
            None => {
                self.warn(
                    CompilerWarning::new(
                        format!("{} '{}'", category, set.id()),
                        WarningKind::UnresolvedSet,
                    )
                    .in_set(set.id()),
                );
                format!("/* unresolved set: {} */", set.id())
            }
        };

        self.cache.insert(StructuralKey::of(set)?, code.clone());

        match category {
            SetCategory::Subset => self.subset_functions.push(code),
            SetCategory::Source | SetCategory::Target => {
                self.set_code.insert(set.id().to_owned(), code);
            }
        }

        Ok(())
    }
}

impl EvaluatedVisitor for EvaluationPass<'_> {
    fn visit(&mut self, node: EvaluatedNodeRef<'_>) -> Result<(), CompilerError> {
        match node {
            EvaluatedNodeRef::Primitive(primitive) => self.evaluate_primitive(primitive),
            EvaluatedNodeRef::Operation(operation) => self.evaluate_operation(operation),
            EvaluatedNodeRef::Set(set) => self.evaluate_set(set),
        }
    }
}

fn primitive_label(primitive: &PrimitiveNode) -> String {
    format!("{} ({})", primitive.value, primitive_type(primitive))
}
