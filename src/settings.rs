use crate::compiler_frontend::compiler_errors::CompilerError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "#flow.toml";
pub const DEFAULT_ENTRY_NAME: &str = "query";
pub const DEFAULT_NODE_BINARY: &str = "node";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub generator: GeneratorConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Name of the generated entry point function.
    pub entry_name: String,

    /// Prepended to every generated identifier.
    pub name_prefix: String,

    /// Spaces per indentation level in the formatted output. Zero leaves code flat.
    pub pretty_indent: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            entry_name: String::from(DEFAULT_ENTRY_NAME),
            name_prefix: String::new(),
            pretty_indent: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientMode {
    #[default]
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub mode: ClientMode,

    // Only used in remote mode
    pub endpoint: Option<String>,

    pub node_binary: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            mode: ClientMode::Local,
            endpoint: None,
            node_binary: String::from(DEFAULT_NODE_BINARY),
        }
    }
}

impl Config {
    pub fn from_toml(source: &str) -> Result<Self, CompilerError> {
        toml::from_str(source).map_err(|error| {
            CompilerError::new_config_error(format!("Invalid {}: {}", CONFIG_FILE_NAME, error))
        })
    }

    pub fn load(path: &Path) -> Result<Self, CompilerError> {
        let source = fs::read_to_string(path)
            .map_err(|error| CompilerError::file_error(path, error.to_string()))?;

        Config::from_toml(&source)
    }

    /// The config file in `dir`, or the defaults when there is none.
    pub fn load_from_dir(dir: &Path) -> Result<Self, CompilerError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Config::load(&path)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [generator]
            entry_name = "run_query"

            [client]
            mode = "remote"
            endpoint = "https://example.com/query"
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.generator.entry_name, "run_query");
        assert_eq!(config.generator.pretty_indent, 4);
        assert_eq!(config.client.mode, ClientMode::Remote);
        assert_eq!(config.client.node_binary, DEFAULT_NODE_BINARY);
    }

    #[test]
    fn invalid_config_is_a_config_error() {
        let error = Config::from_toml("[client]\nmode = \"sideways\"")
            .expect_err("unknown mode should fail");
        assert_eq!(
            error.error_type,
            crate::compiler_frontend::compiler_errors::ErrorType::Config
        );
    }

    #[test]
    fn loads_from_directory_or_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert_eq!(
            Config::load_from_dir(dir.path()).expect("defaults"),
            Config::default()
        );

        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[generator]\nname_prefix = \"bf_\"\n",
        )
        .expect("write config");

        let config = Config::load_from_dir(dir.path()).expect("config should load");
        assert_eq!(config.generator.name_prefix, "bf_");
    }
}
