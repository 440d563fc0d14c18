use crate::compiler_frontend::compiler_errors::{CompilerError, CompilerMessages, ErrorType};
use crate::compiler_frontend::compiler_warnings::print_formatted_warning;
use saying::say;

pub fn print_compiler_messages(messages: CompilerMessages) {
    for err in messages.errors {
        print_formatted_error(err);
    }

    for warning in messages.warnings {
        print_formatted_warning(warning);
    }
}

pub fn print_formatted_error(e: CompilerError) {
    match e.error_type {
        ErrorType::Config => {
            say!("\n (-_-)  🔥🔥 ", Red "Block Configuration", " 🔥🔥  <(^~^)/ ");
        }

        ErrorType::Type => {
            say!("\n(ಠ_ಠ) ", Red "Type Error");
        }

        ErrorType::Compiler => {
            say!("\nヽ༼☉ ‿ ⚆༽ﾉ  🔥🔥🔥🔥 ", Yellow "COMPILER BUG - ");
            say!(Dark Yellow "blockflow developer skill issue (not your fault)");
        }

        ErrorType::Optimization => {
            say!("\n(╯°□°)╯  ", Yellow "Optimization pass failed");
        }

        ErrorType::Runtime => {
            say!("\n(ﾉ☉_⚆)ﾉ  ", Red "Query Runtime");
        }

        ErrorType::Remote => {
            say!("\n(ﾉ☉_⚆)ﾉ  ", Red "Remote Query Endpoint");
        }

        ErrorType::File => {
            say!(Yellow "🏚 Can't find/read file or directory");
            say!(e.msg);
            return;
        }
    }

    say!(Red e.msg);

    let mut details = e.metadata.iter().collect::<Vec<_>>();
    details.sort_by_key(|(key, _)| **key);
    for (key, value) in details {
        let label = format!("{:?}: ", key);
        say!(Dark Magenta label, value);
    }
}
