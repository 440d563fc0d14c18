use crate::backends::js::js_code_generator;
use crate::compiler_frontend::CompilerFrontend;
use crate::compiler_frontend::ast::ast_nodes::Ast;
use crate::compiler_frontend::compiler_errors::{CompilerError, ErrorType};
use crate::compiler_frontend::graph::{BlockGraph, GraphBlock};
use crate::query_client::{QueryClient, REMOTE_PLACEHOLDER_CODE};
use crate::runtime::{DataSource, QueryResult, Runtime};
use crate::settings::{ClientConfig, ClientMode, Config, GeneratorConfig};
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Records what it was asked to run and hands every record to target "t".
#[derive(Default)]
struct StubRuntime {
    seen: Rc<RefCell<Vec<String>>>,
}

impl Runtime for StubRuntime {
    fn execute(&self, code: &str, data: &DataSource) -> Result<QueryResult, CompilerError> {
        self.seen.borrow_mut().push(code.to_owned());
        Ok(QueryResult {
            targets: BTreeMap::from([(String::from("t"), data.clone())]),
            edge_counts: BTreeMap::new(),
        })
    }
}

fn simple_ast() -> Ast {
    let graph = BlockGraph::new(vec![
        GraphBlock::new("s", "source_node"),
        GraphBlock::new("t", "target_node").with_connection("input", "s", None),
    ]);

    let frontend = CompilerFrontend::with_standard_blocks().expect("standard blocks");
    frontend.graph_to_ast(&graph).expect("ast").0
}

fn local_client(data: Vec<Value>) -> (QueryClient, Rc<RefCell<Vec<String>>>) {
    let runtime = StubRuntime::default();
    let seen = Rc::clone(&runtime.seen);
    let generator = js_code_generator(&GeneratorConfig::default()).expect("generator");

    (QueryClient::local(generator, Box::new(runtime), data), seen)
}

#[test]
fn local_client_generates_then_runs() {
    let data = vec![json!({"id": 1}), json!({"id": 2})];
    let (mut client, seen) = local_client(data.clone());

    let result = client.execute(&simple_ast()).expect("query runs");
    assert_eq!(result.target("t"), data.as_slice());

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].contains("targets[\"t\"] = unionOf([set_s]);"));
}

#[test]
fn local_client_exposes_generated_code_and_verification() {
    let (mut client, seen) = local_client(Vec::new());

    let code = client.generate_code(&simple_ast()).expect("code");
    assert!(code.contains("function query(data) {"));
    assert!(seen.borrow().is_empty());

    let QueryClient::Local(local) = &client else {
        panic!("expected a local client");
    };
    assert!(local.verify(&code));
    assert!(!local.verify("function query(data) {"));
}

#[test]
fn remote_endpoint_must_be_http() {
    let error = QueryClient::remote("ftp://example.com/query")
        .err()
        .expect("ftp is not accepted");
    assert_eq!(error.error_type, ErrorType::Config);

    assert!(QueryClient::remote("https://example.com/query").is_ok());
    assert!(QueryClient::remote("http://localhost:8080").is_ok());
}

#[test]
fn remote_client_returns_placeholder_code() {
    let mut client = QueryClient::remote("https://example.com/query").expect("client");
    let code = client.generate_code(&simple_ast()).expect("placeholder");

    assert_eq!(code, REMOTE_PLACEHOLDER_CODE);
    assert!(client.warnings().is_empty());
}

#[test]
fn unreachable_remote_is_a_remote_error() {
    // Port 9 (discard) on localhost is closed in any sane test environment
    let mut client = QueryClient::remote("http://127.0.0.1:9/query").expect("client");
    let error = client
        .execute(&simple_ast())
        .expect_err("nothing is listening");

    assert_eq!(error.error_type, ErrorType::Remote);
}

#[test]
fn config_selects_client_mode() {
    let local = QueryClient::new(&Config::default(), Vec::new()).expect("local client");
    assert!(matches!(local, QueryClient::Local(_)));

    let remote_config = Config {
        client: ClientConfig {
            mode: ClientMode::Remote,
            endpoint: Some(String::from("https://example.com/query")),
            ..ClientConfig::default()
        },
        ..Config::default()
    };
    let QueryClient::Remote(remote) =
        QueryClient::new(&remote_config, Vec::new()).expect("remote client")
    else {
        panic!("expected a remote client");
    };
    assert_eq!(remote.endpoint(), "https://example.com/query");

    let missing_endpoint = Config {
        client: ClientConfig {
            mode: ClientMode::Remote,
            ..ClientConfig::default()
        },
        ..Config::default()
    };
    let error = QueryClient::new(&missing_endpoint, Vec::new())
        .err()
        .expect("remote needs an endpoint");
    assert_eq!(error.error_type, ErrorType::Config);
}
