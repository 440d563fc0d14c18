use crate::compiler_frontend::compiler_warnings::CompilerWarning;
use std::collections::HashMap;
use std::fmt;

// The final set of errors and warnings emitted from a compile request
#[derive(Debug, Default)]
pub struct CompilerMessages {
    pub errors: Vec<CompilerError>,
    pub warnings: Vec<CompilerWarning>,
}

impl CompilerMessages {
    pub fn new() -> Self {
        CompilerMessages {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn from_error(error: CompilerError) -> Self {
        CompilerMessages {
            errors: vec![error],
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum ErrorMetaDataKey {
    CompilationStage,

    // The graph element the error is about
    BlockId,
    BlockType,
    Operation,
    ConnectionPoint,

    // Optional suggestions
    PrimarySuggestion,
    AlternativeSuggestion,

    // Data type information
    ExpectedType,
    FoundType,
}

#[derive(Debug, Clone)]
pub struct CompilerError {
    pub msg: String,
    pub error_type: ErrorType,

    // Structured details so callers (and the editor layer) can point at the offending block
    pub metadata: HashMap<ErrorMetaDataKey, String>,
}

impl CompilerError {
    pub fn new(msg: impl Into<String>, error_type: ErrorType) -> CompilerError {
        CompilerError {
            msg: msg.into(),
            error_type,
            metadata: HashMap::new(),
        }
    }

    pub fn with_error_type(mut self, error_type: ErrorType) -> Self {
        self.error_type = error_type;
        self
    }

    pub fn with_metadata(mut self, key: ErrorMetaDataKey, value: impl Into<String>) -> Self {
        self.metadata.insert(key, value.into());
        self
    }

    pub fn new_metadata_entry(&mut self, key: ErrorMetaDataKey, value: impl Into<String>) {
        self.metadata.insert(key, value.into());
    }

    /// Block or transformer setup mistake. Never recovered.
    pub fn new_config_error(msg: impl Into<String>) -> Self {
        CompilerError::new(msg, ErrorType::Config)
    }

    pub fn new_type_error(msg: impl Into<String>) -> Self {
        CompilerError::new(msg, ErrorType::Type)
    }

    /// Create a compiler error (internal bug, not the user's fault)
    pub fn compiler_error(msg: impl Into<String>) -> Self {
        CompilerError::new(msg, ErrorType::Compiler)
    }

    pub fn new_runtime_error(msg: impl Into<String>) -> Self {
        CompilerError::new(msg, ErrorType::Runtime)
    }

    pub fn new_remote_error(msg: impl Into<String>) -> Self {
        CompilerError::new(msg, ErrorType::Remote)
    }

    pub fn file_error(path: &std::path::Path, msg: impl Into<String>) -> Self {
        CompilerError::new(msg, ErrorType::File)
            .with_metadata(ErrorMetaDataKey::CompilationStage, path.to_string_lossy())
    }

    pub fn metadata_value(&self, key: ErrorMetaDataKey) -> Option<&str> {
        self.metadata.get(&key).map(String::as_str)
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", error_type_to_str(&self.error_type), self.msg)
    }
}

impl std::error::Error for CompilerError {}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ErrorType {
    Config,
    Type,
    Compiler,
    Optimization,
    Runtime,
    Remote,
    File,
}

pub fn error_type_to_str(e_type: &ErrorType) -> &'static str {
    match e_type {
        ErrorType::Config => "Configuration Error",
        ErrorType::Type => "Type Error",
        ErrorType::Compiler => "Compiler Bug",
        ErrorType::Optimization => "Optimization Failure",
        ErrorType::Runtime => "Runtime Error",
        ErrorType::Remote => "Remote Query Error",
        ErrorType::File => "File Error",
    }
}

/// Returns a new CompilerError for block or transformer configuration mistakes.
///
/// Usage:
/// `return_config_error!("Block type registered twice", { BlockType => block_type })`;
#[macro_export]
macro_rules! return_config_error {
    ($msg:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Config,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert($crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::$key, $value.to_string()); )*
                map
            },
        })
    };
    ($msg:expr) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Config,
            metadata: std::collections::HashMap::new(),
        })
    };
}

/// Returns a new CompilerError for type system violations.
///
/// Usage:
/// `return_type_error!("Malformed type string", { FoundType => text })`;
#[macro_export]
macro_rules! return_type_error {
    ($msg:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Type,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert($crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::$key, $value.to_string()); )*
                map
            },
        })
    };
    ($msg:expr) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Type,
            metadata: std::collections::HashMap::new(),
        })
    };
}

/// Returns a new CompilerError for internal compiler bugs.
#[macro_export]
macro_rules! return_compiler_error {
    ($fmt:expr, $($arg:expr),+ $(,)?) => {{
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: format!($fmt, $($arg),+),
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Compiler,
            metadata: std::collections::HashMap::new(),
        });
    }};
    ($msg:expr) => {{
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Compiler,
            metadata: std::collections::HashMap::new(),
        });
    }};
}

/// Returns a new CompilerError for failures while running generated code.
#[macro_export]
macro_rules! return_runtime_error {
    ($fmt:expr, $($arg:expr),+ $(,)?) => {{
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: format!($fmt, $($arg),+),
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Runtime,
            metadata: std::collections::HashMap::new(),
        });
    }};
    ($msg:expr) => {{
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Runtime,
            metadata: std::collections::HashMap::new(),
        });
    }};
}
