//! The standard block library: builders for the block types the bundled editor toolbox
//! offers. Each block type here has a matching transformer in `backends::js`.

use crate::compiler_frontend::ast::ast_nodes::{
    ArgMap, ArgValue, ExprNode, OperationNode, SetCategory, SetNode,
};
use crate::compiler_frontend::ast::build_ast::{
    AstBuilder, NodeContext, NodeDefinition, OperationContext, OperationDefinition,
};
use crate::compiler_frontend::compiler_errors::{CompilerError, ErrorMetaDataKey};
use crate::compiler_frontend::types::IType;
use std::collections::BTreeMap;

// Graph-level sockets
pub const INPUT_SOCKET: &str = "input";
pub const CONDITIONS_STATEMENT: &str = "conditions";

pub fn standard_ast_builder() -> Result<AstBuilder, CompilerError> {
    let mut builder = AstBuilder::new();
    register_set_blocks(&mut builder)?;
    register_value_blocks(&mut builder)?;
    register_logic_blocks(&mut builder)?;
    Ok(builder)
}

fn register_set_blocks(builder: &mut AstBuilder) -> Result<(), CompilerError> {
    builder.register_node(
        SetCategory::Source.block_name(),
        NodeDefinition::new(SetCategory::Source),
        |ctx: &NodeContext<'_>| {
            Ok(SetNode {
                attributes: ctx.attributes(),
                inputs: None,
                operations: None,
            })
        },
    )?;

    builder.register_node(
        SetCategory::Subset.block_name(),
        NodeDefinition::new(SetCategory::Subset),
        |ctx: &NodeContext<'_>| {
            Ok(SetNode {
                attributes: ctx.attributes(),
                inputs: Some(ctx.all_connection_points()),
                operations: Some(ctx.statement_input(CONDITIONS_STATEMENT)?),
            })
        },
    )?;

    builder.register_node(
        SetCategory::Target.block_name(),
        NodeDefinition::new(SetCategory::Target),
        |ctx: &NodeContext<'_>| {
            Ok(SetNode {
                attributes: ctx.attributes(),
                inputs: Some(ctx.all_connection_points()),
                operations: None,
            })
        },
    )
}

fn register_value_blocks(builder: &mut AstBuilder) -> Result<(), CompilerError> {
    builder.register_operation(
        "math_number",
        OperationDefinition::new(Some(IType::Number)),
        |ctx: &OperationContext<'_>| Ok(ctx.field("NUM", None)?.into()),
    )?;

    builder.register_operation(
        "text",
        OperationDefinition::new(Some(IType::String)),
        |ctx: &OperationContext<'_>| Ok(ctx.field("TEXT", None)?.into()),
    )?;

    builder.register_operation(
        "logic_boolean",
        OperationDefinition::new(Some(IType::Boolean)),
        |ctx: &OperationContext<'_>| Ok(ctx.field("BOOL", None)?.into()),
    )?;

    // Reads a field of the record being filtered. The optional TYPE field pins its type,
    // otherwise it is left for inference.
    builder.register_operation(
        "record_field",
        OperationDefinition::new(None).with_field_type("FIELD", IType::String),
        |ctx: &OperationContext<'_>| {
            let ty = match ctx.field_value("TYPE").and_then(|value| value.as_str()) {
                Some(text) => Some(text.parse::<IType>().map_err(|error| {
                    error.with_metadata(ErrorMetaDataKey::BlockId, ctx.block_id())
                })?),
                None => None,
            };

            let args = ArgMap::from([(
                "name".to_owned(),
                ArgValue::from(ExprNode::from(ctx.field("FIELD", None)?)),
            )]);

            Ok(OperationNode::new("record_field", ty, args).into())
        },
    )
}

fn register_logic_blocks(builder: &mut AstBuilder) -> Result<(), CompilerError> {
    builder.register_operation(
        "compare_numbers",
        OperationDefinition::new(Some(IType::Boolean)).with_field_type("OP", IType::String),
        |ctx: &OperationContext<'_>| {
            let args = ArgMap::from([
                ("a".to_owned(), ctx.value_input("A")?.into()),
                ("b".to_owned(), ctx.value_input("B")?.into()),
                (
                    "operator".to_owned(),
                    ExprNode::from(ctx.field("OP", None)?).into(),
                ),
            ]);

            Ok(OperationNode::new("compare_numbers", ctx.output_type(), args).into())
        },
    )?;

    builder.register_operation(
        "logic_operation",
        OperationDefinition::new(Some(IType::Boolean)).with_field_type("OP", IType::String),
        |ctx: &OperationContext<'_>| {
            let args = ArgMap::from([
                ("a".to_owned(), ctx.value_input("A")?.into()),
                ("b".to_owned(), ctx.value_input("B")?.into()),
                (
                    "operator".to_owned(),
                    ExprNode::from(ctx.field("OP", None)?).into(),
                ),
            ]);

            Ok(OperationNode::new("logic_operation", ctx.output_type(), args).into())
        },
    )?;

    builder.register_operation(
        "logic_negate",
        OperationDefinition::new(Some(IType::Boolean)),
        |ctx: &OperationContext<'_>| {
            let args = ArgMap::from([("value".to_owned(), ctx.value_input("BOOL")?.into())]);
            Ok(OperationNode::new("logic_negate", ctx.output_type(), args).into())
        },
    )?;

    builder.register_operation(
        "text_contains",
        OperationDefinition::new(Some(IType::Boolean)),
        |ctx: &OperationContext<'_>| {
            let args = ArgMap::from([
                ("text".to_owned(), ctx.value_input("TEXT")?.into()),
                ("search".to_owned(), ctx.value_input("SEARCH")?.into()),
            ]);

            Ok(OperationNode::new("text_contains", ctx.output_type(), args).into())
        },
    )?;

    // Folds a nested statement stack into one condition. The args are rebuilt from the
    // compiled stack each time the node is evaluated.
    builder.register_operation(
        "all_of",
        OperationDefinition::new(Some(IType::Boolean)),
        |ctx: &OperationContext<'_>| {
            let statements = ctx.statement_input("STACK")?;

            let node = OperationNode::deferred("all_of", ctx.output_type(), move |_| {
                let conditions = statements
                    .iter()
                    .cloned()
                    .map(ExprNode::Operation)
                    .collect::<Vec<_>>();

                BTreeMap::from([("conditions".to_owned(), ArgValue::Many(conditions))])
            });

            Ok(node.into())
        },
    )
}
