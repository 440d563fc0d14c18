use crate::backends::code_generator::{CodeGenerator, CodeHooks, DefaultHooks};
use crate::backends::js::{
    JS_RESERVED_WORDS, js_ambient_functions, js_code_generator, js_transformers,
};
use crate::backends::name_manager::NameManager;
use crate::backends::transformers::{
    TransformerRegistry, create_operation_transformer, create_primitive_transformer,
    create_subset_transformer,
};
use crate::compiler_frontend::CompilerFrontend;
use crate::compiler_frontend::ast::ast_nodes::{
    ArgMap, ArgValue, Ast, ExprNode, OperationNode, POSITIVE_OUTPUT, PrimitiveNode, SetInput,
    SetNode,
};
use crate::compiler_frontend::blocks::{CONDITIONS_STATEMENT, INPUT_SOCKET};
use crate::compiler_frontend::compiler_errors::{ErrorMetaDataKey, ErrorType};
use crate::compiler_frontend::compiler_warnings::WarningKind;
use crate::compiler_frontend::graph::{BlockGraph, GraphBlock};
use crate::compiler_frontend::types::IType;
use crate::settings::GeneratorConfig;
use serde_json::json;
use std::collections::BTreeMap;

fn number(id: &str, value: i64) -> GraphBlock {
    GraphBlock::new(id, "math_number").with_field("NUM", json!(value))
}

fn compare(id: &str, a: &str, b: &str, operator: &str) -> GraphBlock {
    GraphBlock::new(id, "compare_numbers")
        .with_input("A", a)
        .with_input("B", b)
        .with_field("OP", json!(operator))
}

/// source s -> subset sub (5 > 3) -> target t on the positive output
fn compare_graph() -> BlockGraph {
    BlockGraph::new(vec![
        GraphBlock::new("s", "source_node"),
        GraphBlock::new("sub", "subset_node")
            .with_connection(INPUT_SOCKET, "s", None)
            .with_statement(CONDITIONS_STATEMENT, "cmp"),
        GraphBlock::new("t", "target_node").with_connection(
            INPUT_SOCKET,
            "sub",
            Some(POSITIVE_OUTPUT),
        ),
        compare("cmp", "five", "three", "GREATER"),
        number("five", 5),
        number("three", 3),
    ])
}

fn build(graph: &BlockGraph) -> Ast {
    let frontend = CompilerFrontend::with_standard_blocks().expect("standard blocks");
    let (ast, _) = frontend.graph_to_ast(graph).expect("graph should build");
    ast
}

fn generator() -> CodeGenerator {
    js_code_generator(&GeneratorConfig::default()).expect("js generator")
}

fn single_subset_ast(operation: OperationNode) -> Ast {
    Ast {
        root: SetNode::source("s"),
        sets: vec![SetNode::subset(
            "sub",
            BTreeMap::from([(INPUT_SOCKET.to_owned(), vec![SetInput::new("s", None)])]),
            vec![operation],
        )],
        targets: Vec::new(),
    }
}

#[test]
fn compiles_compare_scenario() {
    let program = generator()
        .generate_code(&build(&compare_graph()))
        .expect("generation should succeed");

    let source = &program.source;
    assert!(source.contains("function subset_sub(record) {"));
    assert!(source.contains("return (5 > 3);"));
    assert!(source.contains("function query(data) {"));
    assert!(source.contains("const set_s = data;"));
    assert!(source.contains("const set_sub_input = unionOf([set_s]);"));
    assert!(source.contains("const set_sub_positive = set_sub_input.filter(subset_sub);"));
    assert!(source.contains("targets[\"t\"] = unionOf([set_sub_positive]);"));
    assert!(source.contains("edgeCounts[\"s-output_sub-input\"] = set_s.length;"));
    assert!(source.contains("edgeCounts[\"sub-positive_t-input\"] = set_sub_positive.length;"));
    assert!(program.warnings.is_empty());

    // Prelude comes before the subset functions, which come before the entry point
    let prelude = source.find("function unionOf").expect("prelude");
    let subset = source.find("function subset_sub").expect("subset function");
    let query = source.find("function query").expect("query function");
    assert!(prelude < subset && subset < query);
}

#[test]
fn records_deduplicated_edges() {
    let program = generator()
        .generate_code(&build(&compare_graph()))
        .expect("generation should succeed");

    let keys = program.edges.keys().cloned().collect::<Vec<_>>();
    assert_eq!(keys, vec!["s-output_sub-input", "sub-positive_t-input"]);

    let edge = &program.edges["sub-positive_t-input"];
    assert_eq!(edge.source_id, "sub");
    assert_eq!(edge.target_port, INPUT_SOCKET);
}

#[test]
fn generation_is_repeatable() {
    let ast = build(&compare_graph());
    let mut generator = generator();

    let first = generator.generate_code(&ast).expect("first pass");
    let second = generator.generate_code(&ast).expect("second pass");
    assert_eq!(first, second);
}

#[test]
fn all_of_joins_its_stack() {
    let graph = BlockGraph::new(vec![
        GraphBlock::new("s", "source_node"),
        GraphBlock::new("sub", "subset_node")
            .with_connection(INPUT_SOCKET, "s", None)
            .with_statement(CONDITIONS_STATEMENT, "all"),
        GraphBlock::new("all", "all_of").with_statement("STACK", "c1"),
        compare("c1", "five", "three", "GREATER").with_next("c2"),
        compare("c2", "one", "two", "LESS"),
        number("five", 5),
        number("three", 3),
        number("one", 1),
        number("two", 2),
    ]);

    let program = generator()
        .generate_code(&build(&graph))
        .expect("generation should succeed");

    assert!(program.source.contains("return ((5 > 3) && (1 < 2));"));
}

#[test]
fn compare_overloads_resolve_in_registration_order() {
    let field = |ty: Option<IType>| {
        ExprNode::Operation(OperationNode::new(
            "record_field",
            ty,
            ArgMap::from([(
                "name".to_owned(),
                ArgValue::Single(ExprNode::primitive(json!("age"), Some(IType::String))),
            )]),
        ))
    };

    let compare_field = |ty: Option<IType>| {
        OperationNode::new(
            "compare_numbers",
            Some(IType::Boolean),
            ArgMap::from([
                ("a".to_owned(), ArgValue::Single(field(ty))),
                (
                    "b".to_owned(),
                    ArgValue::Single(ExprNode::primitive(json!(3), Some(IType::Number))),
                ),
                (
                    "operator".to_owned(),
                    ArgValue::Single(ExprNode::primitive(json!("LESS"), Some(IType::String))),
                ),
            ]),
        )
    };

    // An untyped field fits the first overload
    let untyped = generator()
        .generate_code(&single_subset_ast(compare_field(None)))
        .expect("generation should succeed");
    assert!(untyped.source.contains("return (recordField(record, \"age\") < 3);"));

    // A nullable field is rejected by the plain number overload
    let nullable = generator()
        .generate_code(&single_subset_ast(compare_field(Some(IType::nullable(
            IType::Number,
        )))))
        .expect("generation should succeed");
    assert!(
        nullable
            .source
            .contains("return compareNullableNumbers(recordField(record, \"age\"), \"LESS\", 3);")
    );
}

#[test]
fn nullable_and_union_literals_resolve_by_value() {
    let nullable = || Some(IType::nullable(IType::Number));
    let operation = OperationNode::new(
        "compare_numbers",
        Some(IType::Boolean),
        ArgMap::from([
            (
                "a".to_owned(),
                ArgValue::Single(ExprNode::primitive(json!(5), nullable())),
            ),
            (
                "b".to_owned(),
                ArgValue::Single(ExprNode::primitive(json!(null), nullable())),
            ),
            (
                "operator".to_owned(),
                ArgValue::Single(ExprNode::primitive(json!("LESS"), Some(IType::String))),
            ),
        ]),
    );

    let program = generator()
        .generate_code(&single_subset_ast(operation))
        .expect("generation should succeed");
    assert!(program.source.contains("return compareNullableNumbers(5, \"LESS\", null);"));
    assert!(program.warnings.is_empty());

    let registry = TransformerRegistry::from_defs(js_transformers()).expect("registry");
    let union = IType::union([IType::Number, IType::String]);
    let resolution = registry
        .resolve_primitive(&PrimitiveNode::new(json!("x"), Some(union)))
        .expect("the string branch matches");
    assert_eq!(resolution.transformer.ty, IType::String);
    assert_eq!(resolution.candidates, 1);
}

#[test]
fn dynamic_operator_falls_back_to_helper() {
    let operation = OperationNode::new(
        "compare_numbers",
        Some(IType::Boolean),
        ArgMap::from([
            (
                "a".to_owned(),
                ArgValue::Single(ExprNode::primitive(json!(1), Some(IType::Number))),
            ),
            (
                "b".to_owned(),
                ArgValue::Single(ExprNode::primitive(json!(2), Some(IType::Number))),
            ),
            (
                "operator".to_owned(),
                ArgValue::Single(ExprNode::primitive(json!("SIDEWAYS"), Some(IType::String))),
            ),
        ]),
    );

    let program = generator()
        .generate_code(&single_subset_ast(operation))
        .expect("generation should succeed");
    assert!(program.source.contains("return compareNumbers(1, \"SIDEWAYS\", 2);"));
}

#[test]
fn unresolved_operation_gets_placeholder_and_warning() {
    let program = generator()
        .generate_code(&single_subset_ast(OperationNode::new(
            "mystery",
            Some(IType::Boolean),
            ArgMap::new(),
        )))
        .expect("unresolved nodes are not fatal");

    assert!(program.source.contains("/* unresolved operation: mystery */"));
    assert_eq!(program.warnings.len(), 1);
    assert_eq!(program.warnings[0].warning_kind, WarningKind::UnresolvedOperation);
    assert_eq!(program.warnings[0].msg, "mystery");
}

#[test]
fn empty_ast_generates_prelude_only() {
    let program = generator()
        .generate_code(&Ast::empty())
        .expect("empty program");

    assert!(program.source.contains("function unionOf(sets) {"));
    assert!(!program.source.contains("function query"));
    assert!(program.warnings.is_empty());
    assert!(program.edges.is_empty());
}

#[test]
fn unknown_input_is_a_config_error() {
    let ast = Ast {
        root: SetNode::source("s"),
        sets: Vec::new(),
        targets: vec![SetNode::target(
            "t",
            BTreeMap::from([(INPUT_SOCKET.to_owned(), vec![SetInput::new("ghost", None)])]),
        )],
    };

    let error = generator()
        .generate_code(&ast)
        .expect_err("dangling input should fail");
    assert_eq!(error.error_type, ErrorType::Config);
    assert_eq!(error.metadata_value(ErrorMetaDataKey::BlockId), Some("t"));
}

struct RejectingOptimizer;

impl CodeHooks for RejectingOptimizer {
    fn optimize_code(&self, _code: String) -> Option<String> {
        None
    }
}

#[test]
fn failed_optimization_is_an_error() {
    let registry = TransformerRegistry::from_defs(js_transformers()).expect("registry");
    let names = NameManager::new(JS_RESERVED_WORDS.iter().copied(), "");
    let mut generator = CodeGenerator::new(registry, js_ambient_functions(), names, "query")
        .with_hooks(RejectingOptimizer);

    let error = generator
        .generate_code(&build(&compare_graph()))
        .expect_err("optimizer returned nothing");
    assert_eq!(error.error_type, ErrorType::Optimization);
}

#[test]
fn names_respect_prefix_and_reserved_entry_name() {
    let config = GeneratorConfig {
        entry_name: String::from("subset_sub"),
        name_prefix: String::new(),
        pretty_indent: 2,
    };
    let program = js_code_generator(&config)
        .expect("js generator")
        .generate_code(&build(&compare_graph()))
        .expect("generation should succeed");

    assert!(program.source.contains("function subset_sub(data) {"));
    assert!(program.source.contains("function subset_sub1(record) {"));

    let prefixed = js_code_generator(&GeneratorConfig {
        name_prefix: String::from("bf_"),
        ..GeneratorConfig::default()
    })
    .expect("js generator")
    .generate_code(&build(&compare_graph()))
    .expect("generation should succeed");

    assert!(prefixed.source.contains("function bf_subset_sub(record) {"));
    assert!(prefixed.source.contains("const bf_set_s = data;"));
}

#[test]
fn generated_program_passes_verification() {
    let mut generator = generator();
    let program = generator
        .generate_code(&build(&compare_graph()))
        .expect("generation should succeed");

    assert!(generator.verify_code(&program.source));
}

#[test]
fn program_for_subset_named_like_a_global_passes_verification() {
    let graph = BlockGraph::new(vec![
        GraphBlock::new("s", "source_node"),
        GraphBlock::new("retrieval", "subset_node")
            .with_connection(INPUT_SOCKET, "s", None)
            .with_statement(CONDITIONS_STATEMENT, "cmp"),
        GraphBlock::new("t", "target_node").with_connection(
            INPUT_SOCKET,
            "retrieval",
            Some(POSITIVE_OUTPUT),
        ),
        compare("cmp", "five", "three", "GREATER"),
        number("five", 5),
        number("three", 3),
    ]);

    let mut generator = generator();
    let program = generator
        .generate_code(&build(&graph))
        .expect("generation should succeed");

    assert!(program.source.contains("function subset_retrieval(record) {"));
    assert!(generator.verify_code(&program.source));
}

#[test]
fn primitive_ranking_prefers_most_specific_type() {
    for _ in 0..5 {
        let registry = TransformerRegistry::from_defs([
            create_primitive_transformer(IType::union([IType::Number, IType::String]), |_, _| {
                String::from("union")
            }),
            create_primitive_transformer(IType::Number, |_, _| String::from("number")),
        ])
        .expect("registry");

        let resolution = registry
            .resolve_primitive(&PrimitiveNode::new(json!(1), Some(IType::Number)))
            .expect("a number transformer matches");

        assert_eq!(resolution.transformer.ty, IType::Number);
        assert_eq!(resolution.candidates, 2);
    }
}

#[test]
fn ambiguous_primitive_match_warns_once() {
    let registry = TransformerRegistry::from_defs([
        create_primitive_transformer(IType::union([IType::Number, IType::String]), |_, _| {
            String::from("union")
        }),
        create_primitive_transformer(IType::Number, |_, _| String::from("number")),
        create_operation_transformer("check", [("value", IType::Number)], |node, _| {
            node.arg_code("value")
        }),
        create_subset_transformer(|set, _| set.evaluated_operations.join(" && ")),
    ])
    .expect("registry");

    let check = || {
        OperationNode::new(
            "check",
            Some(IType::Boolean),
            ArgMap::from([(
                "value".to_owned(),
                ArgValue::Single(ExprNode::primitive(json!(1), Some(IType::Number))),
            )]),
        )
    };

    let mut ast = single_subset_ast(check());
    if let Some(operations) = ast.sets[0].operations.as_mut() {
        operations.push(check());
    }

    let mut generator = CodeGenerator::new(
        registry,
        Vec::new(),
        NameManager::new(Vec::<String>::new(), ""),
        "query",
    )
    .with_hooks(DefaultHooks);
    let program = generator.generate_code(&ast).expect("generation should succeed");

    assert!(program.source.contains("number && number"));

    let ambiguous = program
        .warnings
        .iter()
        .filter(|warning| warning.warning_kind == WarningKind::AmbiguousPrimitiveMatch)
        .count();
    assert_eq!(ambiguous, 1);

    assert!(
        program
            .warnings
            .iter()
            .any(|warning| warning.warning_kind == WarningKind::MissingQueryFunction)
    );
    assert!(
        program
            .warnings
            .iter()
            .any(|warning| warning.warning_kind == WarningKind::UnresolvedSet)
    );
}
