pub mod ast_nodes;
pub mod build_ast;
pub mod evaluated_ast;
pub mod traverse;
