use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;

/// Top-level project configuration loaded from `.routedoc.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Route manifest to read.
    pub input: String,
    /// Document to write. `-` writes to stdout.
    pub output: String,
    pub format: OutputFormat,
    /// Version tag passed to the exporter registry.
    pub target: String,
    pub info: InfoConfig,
    pub host: Option<String>,
    pub base_path: Option<String>,
    pub schemes: Vec<String>,
    /// Default request media types for routes that declare none.
    pub consumes: Vec<String>,
    /// Default response media types for routes that declare none.
    pub produces: Vec<String>,
    /// Path variable name to published parameter name.
    pub param_aliases: IndexMap<String, String>,
    /// Security scheme objects, copied into the document verbatim.
    pub security_schemes: IndexMap<String, Value>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            input: "routes.yaml".to_string(),
            output: "openapi.json".to_string(),
            format: OutputFormat::Json,
            target: "3.0".to_string(),
            info: InfoConfig::default(),
            host: None,
            base_path: None,
            schemes: Vec::new(),
            consumes: Vec::new(),
            produces: Vec::new(),
            param_aliases: IndexMap::new(),
            security_schemes: IndexMap::new(),
        }
    }
}

/// Serialization of the written document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Document `info` block.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InfoConfig {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

impl Default for InfoConfig {
    fn default() -> Self {
        Self {
            title: "API".to_string(),
            version: "0.0.1".to_string(),
            description: None,
        }
    }
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".routedoc.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<GeneratorConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Load {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let config: GeneratorConfig =
        serde_yaml_ng::from_str(&content).map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# routedoc configuration
input: routes.yaml
output: openapi.json    # "-" writes to stdout
format: json            # json | yaml
target: "3.0"           # 2.0 | 3.0 | 3.1

info:
  title: API
  version: 0.0.1
  # description: What this API does

# host: api.example.com
# base_path: /v1
schemes: []

consumes: []            # defaults to application/json
produces: []

param_aliases: {}
  # user_id: id         # path variable -> published name

security_schemes: {}
  # api_key:
  #   type: apiKey
  #   name: X-Api-Key
  #   in: header
"#
}
