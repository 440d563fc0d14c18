//! Dispatches a compiled AST either to a local generator and runtime, or to a remote
//! endpoint that does both on the other side.

#[cfg(test)]
mod tests;

use crate::backends::code_generator::CodeGenerator;
use crate::backends::js::js_code_generator;
use crate::compiler_frontend::ast::ast_nodes::Ast;
use crate::compiler_frontend::ast::evaluated_ast::EvaluatedAst;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::compiler_warnings::CompilerWarning;
use crate::runtime::{DataSource, NodeRuntime, QueryResult, Runtime};
use crate::settings::{ClientMode, Config};
use crate::{return_compiler_error, return_config_error, timer_log};
use std::time::Instant;

pub const REMOTE_PLACEHOLDER_CODE: &str = "/* code is generated by the remote endpoint */";

pub enum QueryClient {
    Local(LocalQueryClient),
    Remote(RemoteQueryClient),
}

impl QueryClient {
    /// Builds the client described by the `[client]` section. Local clients get the JS
    /// generator from `[generator]` and a node runtime.
    pub fn new(config: &Config, data: DataSource) -> Result<Self, CompilerError> {
        match config.client.mode {
            ClientMode::Local => {
                let generator = js_code_generator(&config.generator)?;
                let runtime =
                    NodeRuntime::new(&config.client.node_binary, &config.generator.entry_name);
                Ok(QueryClient::local(generator, Box::new(runtime), data))
            }

            ClientMode::Remote => {
                let Some(endpoint) = &config.client.endpoint else {
                    return_config_error!(
                        "Remote mode needs an endpoint",
                        { PrimarySuggestion => "Set 'endpoint' in the [client] section" }
                    );
                };
                QueryClient::remote(endpoint)
            }
        }
    }

    pub fn local(generator: CodeGenerator, runtime: Box<dyn Runtime>, data: DataSource) -> Self {
        QueryClient::Local(LocalQueryClient {
            generator,
            runtime,
            data,
            warnings: Vec::new(),
        })
    }

    pub fn remote(endpoint: &str) -> Result<Self, CompilerError> {
        Ok(QueryClient::Remote(RemoteQueryClient::new(endpoint)?))
    }

    pub fn execute(&mut self, ast: &Ast) -> Result<QueryResult, CompilerError> {
        match self {
            QueryClient::Local(client) => client.execute(ast),
            QueryClient::Remote(client) => client.execute(ast),
        }
    }

    pub fn generate_code(&mut self, ast: &Ast) -> Result<String, CompilerError> {
        match self {
            QueryClient::Local(client) => client.generate_code(ast),
            QueryClient::Remote(_) => Ok(String::from(REMOTE_PLACEHOLDER_CODE)),
        }
    }

    /// Warnings from the last local generation. Remote clients never have any.
    pub fn warnings(&self) -> &[CompilerWarning] {
        match self {
            QueryClient::Local(client) => &client.warnings,
            QueryClient::Remote(_) => &[],
        }
    }
}

pub struct LocalQueryClient {
    generator: CodeGenerator,
    runtime: Box<dyn Runtime>,
    data: DataSource,
    warnings: Vec<CompilerWarning>,
}

impl LocalQueryClient {
    pub fn generate_code(&mut self, ast: &Ast) -> Result<String, CompilerError> {
        let program = self.generator.generate_code(ast)?;
        self.warnings = program.warnings;
        Ok(program.source)
    }

    pub fn verify(&self, code: &str) -> bool {
        self.generator.verify_code(code)
    }

    /// Generates, verifies, then runs against the client's data.
    pub fn execute(&mut self, ast: &Ast) -> Result<QueryResult, CompilerError> {
        let code = self.generate_code(ast)?;

        if !self.verify(&code) {
            return_compiler_error!("Generated code failed verification");
        }

        self.runtime.execute(&code, &self.data)
    }
}

pub struct RemoteQueryClient {
    endpoint: String,
}

impl RemoteQueryClient {
    pub fn new(endpoint: &str) -> Result<Self, CompilerError> {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return_config_error!(
                format!("'{}' is not an http(s) endpoint", endpoint),
                { PrimarySuggestion => "Endpoints must start with http:// or https://" }
            );
        }

        Ok(RemoteQueryClient {
            endpoint: endpoint.to_owned(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Posts the evaluated AST and reads a `QueryResult` back.
    pub fn execute(&self, ast: &Ast) -> Result<QueryResult, CompilerError> {
        let time = Instant::now();

        let body = serde_json::to_string(&EvaluatedAst::from_ast(ast)).map_err(|error| {
            CompilerError::compiler_error(format!("Could not serialize the AST: {}", error))
        })?;

        let mut response = ureq::post(&self.endpoint)
            .header("Content-Type", "application/json")
            .send(body.as_str())
            .map_err(|error| self.remote_error(error))?;

        let reply = response
            .body_mut()
            .read_to_string()
            .map_err(|error| self.remote_error(error))?;

        timer_log!(time, "Remote query answered in: ");

        serde_json::from_str(&reply).map_err(|error| {
            CompilerError::new_remote_error(format!(
                "{} replied with something that is not a query result: {}",
                self.endpoint, error
            ))
        })
    }

    fn remote_error(&self, error: ureq::Error) -> CompilerError {
        CompilerError::new_remote_error(format!("Request to {} failed: {}", self.endpoint, error))
    }
}
