//! JavaScript target.
//!
//! The generated program is a single `function query(data)` (name configurable) that
//! filters an array of records through every subset and returns
//! `{ targets, edgeCounts }`. Subsets compile to predicate functions over one `record`.

mod js_hooks;
mod js_literals;

#[cfg(test)]
mod tests;

pub use js_hooks::JsHooks;
pub use js_literals::{JS_RESERVED_WORDS, escape_js_string, js_literal};

use crate::backends::code_generator::CodeGenerator;
use crate::backends::name_manager::NameManager;
use crate::backends::transformers::{
    QueryFunctionInput, TransformUtils, TransformerDef, TransformerRegistry,
    create_operation_transformer, create_primitive_transformer, create_query_function_transformer,
    create_source_transformer, create_subset_transformer, create_target_transformer,
};
use crate::compiler_frontend::ast::ast_nodes::{DEFAULT_OUTPUT, NEGATIVE_OUTPUT, POSITIVE_OUTPUT};
use crate::compiler_frontend::ast::evaluated_ast::{
    EvaluatedArg, EvaluatedCode, EvaluatedExpr, EvaluatedOperation, EvaluatedSet,
};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::types::IType;
use crate::settings::GeneratorConfig;
use js_literals::{comparison_operator, logic_operator};
use serde_json::Value;

// Parameter names the generated program relies on
const DATA_PARAM: &str = "data";
const RECORD_PARAM: &str = "record";

const UNION_OF: &str = r#"function unionOf(sets) {
    if (sets.length === 1) {
        return sets[0];
    }
    const seen = new Set();
    const result = [];
    for (const set of sets) {
        for (const record of set) {
            if (!seen.has(record)) {
                seen.add(record);
                result.push(record);
            }
        }
    }
    return result;
}"#;

const RECORD_FIELD: &str = r#"function recordField(record, name) {
    return record == null ? undefined : record[name];
}"#;

const COMPARE_NUMBERS: &str = r#"function compareNumbers(a, operator, b) {
    switch (operator) {
        case "EQUAL": return a === b;
        case "NOT_EQUAL": return a !== b;
        case "LESS": return a < b;
        case "LESS_OR_EQUAL": return a <= b;
        case "GREATER": return a > b;
        case "GREATER_OR_EQUAL": return a >= b;
        default: return false;
    }
}"#;

const COMPARE_NULLABLE_NUMBERS: &str = r#"function compareNullableNumbers(a, operator, b) {
    if (a == null || b == null) {
        return false;
    }
    return compareNumbers(a, operator, b);
}"#;

const LOGIC_OPERATION: &str = r#"function logicOperation(a, operator, b) {
    return operator === "OR" ? Boolean(a || b) : Boolean(a && b);
}"#;

const TEXT_CONTAINS: &str = r#"function textContains(text, search) {
    return typeof text === "string" && text.includes(String(search));
}"#;

pub const PRELUDE_FUNCTION_NAMES: &[&str] = &[
    "unionOf",
    "recordField",
    "compareNumbers",
    "compareNullableNumbers",
    "logicOperation",
    "textContains",
];

/// Helper functions inlined at the top of every program.
pub fn js_ambient_functions() -> Vec<String> {
    [
        UNION_OF,
        RECORD_FIELD,
        COMPARE_NUMBERS,
        COMPARE_NULLABLE_NUMBERS,
        LOGIC_OPERATION,
        TEXT_CONTAINS,
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// A generator for the JavaScript target with the standard transformers.
pub fn js_code_generator(config: &GeneratorConfig) -> Result<CodeGenerator, CompilerError> {
    let registry = TransformerRegistry::from_defs(js_transformers())?;

    let reserved = JS_RESERVED_WORDS
        .iter()
        .chain(PRELUDE_FUNCTION_NAMES)
        .copied()
        .chain([config.entry_name.as_str()]);
    let names = NameManager::new(reserved, &config.name_prefix);

    let generator = CodeGenerator::new(
        registry,
        js_ambient_functions(),
        names,
        config.entry_name.clone(),
    )
    .with_hooks(JsHooks {
        indent: config.pretty_indent,
    });

    Ok(generator)
}

/// Every transformer of the JavaScript target, in priority order.
pub fn js_transformers() -> Vec<TransformerDef> {
    let mut transformers = operation_transformers();
    transformers.extend(primitive_transformers());
    transformers.extend(set_transformers());
    transformers.push(create_query_function_transformer(query_function));
    transformers
}

fn operation_transformers() -> Vec<TransformerDef> {
    vec![
        create_operation_transformer(
            "compare_numbers",
            [
                ("a", IType::Number),
                ("b", IType::Number),
                ("operator", IType::String),
            ],
            |node: &EvaluatedOperation, _: &mut TransformUtils<'_>| {
                let a = node.arg_code("a");
                let b = node.arg_code("b");

                match literal_string_arg(node, "operator").and_then(comparison_operator) {
                    Some(operator) => format!("({} {} {})", a, operator, b),
                    None => format!(
                        "compareNumbers({}, {}, {})",
                        a,
                        node.arg_code("operator"),
                        b
                    ),
                }
            },
        ),
        // Only reached by nullable inputs, plain numbers match the overload above first
        create_operation_transformer(
            "compare_numbers",
            [
                ("a", IType::nullable(IType::Number)),
                ("b", IType::nullable(IType::Number)),
                ("operator", IType::String),
            ],
            |node: &EvaluatedOperation, _: &mut TransformUtils<'_>| {
                format!(
                    "compareNullableNumbers({}, {}, {})",
                    node.arg_code("a"),
                    node.arg_code("operator"),
                    node.arg_code("b")
                )
            },
        ),
        create_operation_transformer(
            "logic_operation",
            [
                ("a", IType::Boolean),
                ("b", IType::Boolean),
                ("operator", IType::String),
            ],
            |node: &EvaluatedOperation, _: &mut TransformUtils<'_>| {
                let a = node.arg_code("a");
                let b = node.arg_code("b");

                match literal_string_arg(node, "operator").and_then(logic_operator) {
                    Some(operator) => format!("({} {} {})", a, operator, b),
                    None => format!(
                        "logicOperation({}, {}, {})",
                        a,
                        node.arg_code("operator"),
                        b
                    ),
                }
            },
        ),
        create_operation_transformer(
            "logic_negate",
            [("value", IType::Boolean)],
            |node: &EvaluatedOperation, _: &mut TransformUtils<'_>| {
                format!("(!{})", node.arg_code("value"))
            },
        ),
        create_operation_transformer(
            "record_field",
            [("name", IType::String)],
            |node: &EvaluatedOperation, _: &mut TransformUtils<'_>| {
                format!("recordField({}, {})", RECORD_PARAM, node.arg_code("name"))
            },
        ),
        create_operation_transformer(
            "text_contains",
            [("text", IType::String), ("search", IType::String)],
            |node: &EvaluatedOperation, _: &mut TransformUtils<'_>| {
                format!(
                    "textContains({}, {})",
                    node.arg_code("text"),
                    node.arg_code("search")
                )
            },
        ),
        create_operation_transformer(
            "all_of",
            [("conditions", IType::Boolean)],
            |node: &EvaluatedOperation, _: &mut TransformUtils<'_>| {
                match node.evaluated_args.get("conditions") {
                    Some(EvaluatedCode::Many(codes)) if !codes.is_empty() => {
                        conjunction(codes)
                    }
                    Some(EvaluatedCode::Single(code)) => code.clone(),
                    _ => String::from("true"),
                }
            },
        ),
    ]
}

// One transformer per concrete type, so a typed literal never has competing matches
fn primitive_transformers() -> Vec<TransformerDef> {
    vec![
        create_primitive_transformer(IType::Number, |node, _| match &node.value {
            Value::String(text) => match text.trim().parse::<f64>() {
                Ok(number) if number.is_finite() => number.to_string(),
                _ => String::from("NaN"),
            },
            other => js_literal(other),
        }),
        create_primitive_transformer(IType::String, |node, _| match &node.value {
            Value::String(text) => escape_js_string(text),
            other => escape_js_string(&other.to_string()),
        }),
        create_primitive_transformer(IType::Boolean, |node, _| match &node.value {
            Value::Bool(value) => value.to_string(),
            Value::String(text) => text.eq_ignore_ascii_case("true").to_string(),
            other => format!("Boolean({})", js_literal(other)),
        }),
        create_primitive_transformer(IType::Null, |_, _| String::from("null")),
        create_primitive_transformer(IType::Timestamp, |node, _| {
            format!("new Date({})", js_literal(&node.value))
        }),
    ]
}

fn set_transformers() -> Vec<TransformerDef> {
    vec![
        create_source_transformer(|set: &EvaluatedSet, utils: &mut TransformUtils<'_>| {
            format!(
                "const {} = {};",
                utils.set_variable(set.id(), DEFAULT_OUTPUT),
                DATA_PARAM
            )
        }),
        create_subset_transformer(|set: &EvaluatedSet, utils: &mut TransformUtils<'_>| {
            let name = utils.subset_function(set.id());
            let body = match set.evaluated_operations.as_slice() {
                [] => String::from("true"),
                [single] => single.clone(),
                many => conjunction(many),
            };

            format!(
                "function {}({}) {{\n    return {};\n}}",
                name, RECORD_PARAM, body
            )
        }),
        create_target_transformer(|set: &EvaluatedSet, utils: &mut TransformUtils<'_>| {
            let sources = set
                .incoming()
                .map(|(_, input)| utils.set_variable(&input.connected_set_id, input.source_port()))
                .collect::<Vec<_>>();

            format!(
                "targets[{}] = unionOf([{}]);",
                escape_js_string(set.id()),
                sources.join(", ")
            )
        }),
    ]
}

fn query_function(input: &QueryFunctionInput<'_>, utils: &mut TransformUtils<'_>) -> String {
    let mut lines = vec![
        format!("function {}({}) {{", input.entry_name, DATA_PARAM),
        String::from("const targets = {};"),
        String::from("const edgeCounts = {};"),
    ];

    if let Some(code) = input.set_code.get(input.ast.root.id()) {
        lines.push(code.clone());
    }

    for set in &input.ast.sets {
        let sources = set
            .incoming()
            .map(|(_, source)| utils.set_variable(&source.connected_set_id, source.source_port()))
            .collect::<Vec<_>>();

        let records = utils.set_variable(set.id(), "input");
        let predicate = utils.subset_function(set.id());
        let positive = utils.set_variable(set.id(), POSITIVE_OUTPUT);
        let negative = utils.set_variable(set.id(), NEGATIVE_OUTPUT);

        lines.push(format!("const {} = unionOf([{}]);", records, sources.join(", ")));
        lines.push(format!("const {} = {}.filter({});", positive, records, predicate));
        lines.push(format!(
            "const {} = {}.filter(({}) => !{}({}));",
            negative, records, RECORD_PARAM, predicate, RECORD_PARAM
        ));
    }

    for target in &input.ast.targets {
        if let Some(code) = input.set_code.get(target.id()) {
            lines.push(code.clone());
        }
    }

    for (key, edge) in input.edges {
        let records = utils.set_variable(&edge.source_id, &edge.source_port);
        lines.push(format!(
            "edgeCounts[{}] = {}.length;",
            escape_js_string(key),
            records
        ));
    }

    lines.push(String::from("return { targets: targets, edgeCounts: edgeCounts };"));
    lines.push(String::from("}"));
    lines.join("\n")
}

/// The string value of a literal argument, for transformers that inline operators.
fn literal_string_arg<'a>(node: &'a EvaluatedOperation, name: &str) -> Option<&'a str> {
    match node.args.get(name)? {
        EvaluatedArg::Single(EvaluatedExpr::Primitive(primitive)) => primitive.value.as_str(),
        _ => None,
    }
}

// Every operand is already a call or a parenthesized expression
fn conjunction(codes: &[String]) -> String {
    format!("({})", codes.join(" && "))
}
