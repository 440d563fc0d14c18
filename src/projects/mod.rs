/// # The built-in front ends to the compiler pipeline
/// Library users drive `CompilerFrontend` and `QueryClient` directly. These are what the
/// `flow` binary ships with.

// The graph -> program -> result pipeline the CLI runs
pub mod build;

// The basic compiler CLI
pub mod cli;
