//! blockflow compiles block graphs built in a visual editor into query programs.
//!
//! graph -> `CompilerFrontend` (AST) -> `CodeGenerator` (program) -> `QueryClient`
//! (local runtime or remote endpoint).

pub mod backends;
pub mod compiler_frontend;
pub mod projects;
pub mod query_client;
pub mod runtime;
pub mod settings;
