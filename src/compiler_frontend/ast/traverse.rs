//! Visit orders over the AST.
//!
//! Forward order is pre-order: root, then each set followed by its operations, each
//! operation followed by its arguments. Reverse order is post-order and is what code
//! generation runs on, since a parent's code needs its children's code first.

use crate::compiler_frontend::ast::ast_nodes::{
    ArgValue, Ast, AstNodeRef, ExprNode, OperationNode, PrimitiveNode, SetNode,
};
use crate::compiler_frontend::ast::evaluated_ast::{
    EvaluatedArg, EvaluatedAst, EvaluatedExpr, EvaluatedOperation, EvaluatedSet,
};
use crate::compiler_frontend::compiler_errors::CompilerError;

pub trait AstVisitor {
    fn visit(&mut self, node: AstNodeRef<'_>);
}

/// Borrowed view of any evaluated AST node.
#[derive(Debug, Clone, Copy)]
pub enum EvaluatedNodeRef<'a> {
    Set(&'a EvaluatedSet),
    Operation(&'a EvaluatedOperation),
    Primitive(&'a PrimitiveNode),
}

/// Visitors over the evaluated AST may fail, which stops the traversal.
pub trait EvaluatedVisitor {
    fn visit(&mut self, node: EvaluatedNodeRef<'_>) -> Result<(), CompilerError>;
}

impl<F: FnMut(AstNodeRef<'_>)> AstVisitor for F {
    fn visit(&mut self, node: AstNodeRef<'_>) {
        self(node)
    }
}

impl<F: FnMut(EvaluatedNodeRef<'_>) -> Result<(), CompilerError>> EvaluatedVisitor for F {
    fn visit(&mut self, node: EvaluatedNodeRef<'_>) -> Result<(), CompilerError> {
        self(node)
    }
}

pub fn traverse_ast(ast: &Ast, visitor: &mut impl AstVisitor) {
    traverse_partial_ast(&ast.root, visitor);

    for set in ast.sets.iter().chain(&ast.targets) {
        traverse_partial_ast(set, visitor);
    }
}

/// Forward walk of one set. Deferred args are materialized on the way down.
pub fn traverse_partial_ast(set: &SetNode, visitor: &mut impl AstVisitor) {
    visitor.visit(AstNodeRef::Set(set));

    for operation in set.operations.iter().flatten() {
        visit_operation(operation, visitor);
    }
}

fn visit_operation(operation: &OperationNode, visitor: &mut impl AstVisitor) {
    visitor.visit(AstNodeRef::Operation(operation));

    for arg in operation.materialize_args().values() {
        match arg {
            ArgValue::Single(child) => visit_expr(child, visitor),
            ArgValue::Many(children) => {
                for child in children {
                    visit_expr(child, visitor);
                }
            }
        }
    }
}

fn visit_expr(expr: &ExprNode, visitor: &mut impl AstVisitor) {
    match expr {
        ExprNode::Operation(operation) => visit_operation(operation, visitor),
        ExprNode::Primitive(primitive) => visitor.visit(AstNodeRef::Primitive(primitive)),
    }
}

pub fn traverse_evaluated_ast(
    ast: &EvaluatedAst,
    visitor: &mut impl EvaluatedVisitor,
) -> Result<(), CompilerError> {
    traverse_partial_evaluated_ast(&ast.root, visitor)?;

    for set in ast.sets.iter().chain(&ast.targets) {
        traverse_partial_evaluated_ast(set, visitor)?;
    }

    Ok(())
}

pub fn traverse_partial_evaluated_ast(
    set: &EvaluatedSet,
    visitor: &mut impl EvaluatedVisitor,
) -> Result<(), CompilerError> {
    visitor.visit(EvaluatedNodeRef::Set(set))?;

    for operation in set.operations.iter().flatten() {
        visit_evaluated_expr_forward(operation, visitor)?;
    }

    Ok(())
}

fn visit_evaluated_expr_forward(
    operation: &EvaluatedOperation,
    visitor: &mut impl EvaluatedVisitor,
) -> Result<(), CompilerError> {
    visitor.visit(EvaluatedNodeRef::Operation(operation))?;

    for child in operation.args.values().flat_map(EvaluatedArg::children) {
        match child {
            EvaluatedExpr::Operation(child) => visit_evaluated_expr_forward(child, visitor)?,
            EvaluatedExpr::Primitive(primitive) => {
                visitor.visit(EvaluatedNodeRef::Primitive(primitive))?
            }
        }
    }

    Ok(())
}

/// Post-order walk: subsets, then targets, then the root. Within a set every argument is
/// visited before its operation and every operation before the set.
pub fn traverse_ast_reverse(
    ast: &EvaluatedAst,
    visitor: &mut impl EvaluatedVisitor,
) -> Result<(), CompilerError> {
    for set in ast.sets.iter().chain(&ast.targets) {
        traverse_partial_ast_reverse(set, visitor)?;
    }

    traverse_partial_ast_reverse(&ast.root, visitor)
}

pub fn traverse_partial_ast_reverse(
    set: &EvaluatedSet,
    visitor: &mut impl EvaluatedVisitor,
) -> Result<(), CompilerError> {
    for operation in set.operations.iter().flatten() {
        visit_evaluated_expr_reverse(operation, visitor)?;
    }

    visitor.visit(EvaluatedNodeRef::Set(set))
}

fn visit_evaluated_expr_reverse(
    operation: &EvaluatedOperation,
    visitor: &mut impl EvaluatedVisitor,
) -> Result<(), CompilerError> {
    for child in operation.args.values().flat_map(EvaluatedArg::children) {
        match child {
            EvaluatedExpr::Operation(child) => visit_evaluated_expr_reverse(child, visitor)?,
            EvaluatedExpr::Primitive(primitive) => {
                visitor.visit(EvaluatedNodeRef::Primitive(primitive))?
            }
        }
    }

    visitor.visit(EvaluatedNodeRef::Operation(operation))
}
