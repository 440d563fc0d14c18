//! Command-line entrypoints for blockflow.
//!
//! Parses commands and dispatches them into the build and run pipelines.

use crate::compiler_frontend::Flag;
use crate::compiler_frontend::compiler_errors::{CompilerError, CompilerMessages};
use crate::compiler_frontend::compiler_warnings::CompilerWarning;
use crate::compiler_frontend::display_messages::print_compiler_messages;
use crate::projects::build::{build_graph, load_config_for, run_graph};
use crate::runtime::QueryResult;
use saying::say;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, PartialEq, Eq)]
enum Command {
    // Compiles a graph to JavaScript, printed or written to a file
    Build {
        graph: PathBuf,
        output: Option<PathBuf>,
    },

    // Compiles a graph and runs it against a data file
    Run {
        graph: PathBuf,
        data: PathBuf,
    },

    Help,
}

pub fn start_cli() {
    let compiler_args: Vec<String> = env::args().collect();

    if compiler_args.len() < 2 {
        print_help(false);
        return;
    }

    let command = match get_command(&compiler_args[1..]) {
        Ok(command) => command,
        Err(e) => {
            say!(Red e);
            print_help(true);
            return;
        }
    };

    let flags = get_flags(&compiler_args);

    match command {
        Command::Help => print_help(false),

        Command::Build { graph, output } => {
            let result = load_config_for(&graph)
                .map_err(CompilerMessages::from_error)
                .and_then(|config| build_graph(&graph, &config));

            match result {
                Ok(built) => {
                    match &output {
                        Some(path) => match write_output(path, &built.source) {
                            Ok(()) => {
                                let written = path.display().to_string();
                                say!(Green "Wrote ", written);
                            }
                            Err(e) => print_compiler_messages(CompilerMessages::from_error(e)),
                        },
                        None => println!("{}", built.source),
                    }
                    print_warnings(built.warnings, &flags);
                }
                Err(messages) => print_messages(messages, &flags),
            }
        }

        Command::Run { graph, data } => {
            let result = load_config_for(&graph)
                .map_err(CompilerMessages::from_error)
                .and_then(|config| run_graph(&graph, &data, &config));

            match result {
                Ok(run) => {
                    match render_result(&run.result, flags.contains(&Flag::Pretty)) {
                        Ok(json) => println!("{}", json),
                        Err(e) => print_compiler_messages(CompilerMessages::from_error(e)),
                    }
                    print_warnings(run.warnings, &flags);
                }
                Err(messages) => print_messages(messages, &flags),
            }
        }
    }
}

fn get_command(args: &[String]) -> Result<Command, String> {
    // Flags can go anywhere, only positional arguments decide the command
    let positional = args
        .iter()
        .filter(|arg| !arg.starts_with("--"))
        .map(String::as_str)
        .collect::<Vec<_>>();

    if let Some(unknown) = args
        .iter()
        .find(|arg| arg.starts_with("--") && !KNOWN_FLAGS.contains(&arg.as_str()))
    {
        return Err(format!(
            "Unknown flag: '{unknown}'. Supported flags are {}.",
            KNOWN_FLAGS.join(", ")
        ));
    }

    match positional.as_slice() {
        ["help", ..] => Ok(Command::Help),

        ["build", graph] => Ok(Command::Build {
            graph: PathBuf::from(graph),
            output: None,
        }),
        ["build", graph, output] => Ok(Command::Build {
            graph: PathBuf::from(graph),
            output: Some(PathBuf::from(output)),
        }),
        ["build", ..] => Err(String::from("Usage: build <graph.json> [output.js]")),

        ["run", graph, data] => Ok(Command::Run {
            graph: PathBuf::from(graph),
            data: PathBuf::from(data),
        }),
        ["run", ..] => Err(String::from("Usage: run <graph.json> <data.json>")),

        [other, ..] => Err(format!("Invalid command: '{other}'")),
        [] => Ok(Command::Help),
    }
}

const KNOWN_FLAGS: &[&str] = &["--hide-warnings", "--pretty"];

fn get_flags(args: &[String]) -> Vec<Flag> {
    let mut flags = Vec::new();

    for arg in args {
        match arg.as_str() {
            "--hide-warnings" => flags.push(Flag::DisableWarnings),
            "--pretty" => flags.push(Flag::Pretty),
            _ => {}
        }
    }

    flags
}

fn render_result(result: &QueryResult, pretty: bool) -> Result<String, CompilerError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(result)
    } else {
        serde_json::to_string(result)
    };

    rendered.map_err(|e| CompilerError::compiler_error(format!("Could not print result: {e}")))
}

fn write_output(path: &Path, source: &str) -> Result<(), CompilerError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| CompilerError::file_error(parent, e.to_string()))?;
    }

    fs::write(path, source).map_err(|e| CompilerError::file_error(path, e.to_string()))
}

fn print_warnings(warnings: Vec<CompilerWarning>, flags: &[Flag]) {
    print_messages(
        CompilerMessages {
            errors: Vec::new(),
            warnings,
        },
        flags,
    );
}

fn print_messages(mut messages: CompilerMessages, flags: &[Flag]) {
    if flags.contains(&Flag::DisableWarnings) {
        messages.warnings.clear();
    }
    print_compiler_messages(messages);
}

fn print_help(commands_only: bool) {
    if !commands_only {
        say!(Bright Black "------------------------------------");
        say!(Green Bold "blockflow - compiles block graphs into query programs");
        say!("Usage: ", Bold "<command>", Italic " <args>");
    }
    say!(Green Bold "\nCommands:");
    say!("  build <graph.json> [out.js]   - Compiles a graph to JavaScript");
    say!("  run <graph.json> <data.json>  - Compiles a graph and runs it on the data");
    say!("  help                          - Shows this message");

    say!(Green Bold "\nFlags:");
    say!("  --hide-warnings");
    say!("  --pretty                      (pretty-prints run results)");
}

#[cfg(test)]
#[path = "tests/cli_tests.rs"]
mod tests;
