use thiserror::Error;

/// Setup mistakes detected while wiring registries or loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no exporter registered for version: {0}")]
    NoExporter(String),

    #[error("no resolver named '{0}' to register against")]
    UnknownResolver(String),

    #[error("failed to read config {path}: {message}")]
    Load { path: String, message: String },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("definition name collision: '{first}' and '{second}' both export as '{sanitized}'")]
    NameCollision {
        sanitized: String,
        first: String,
        second: String,
    },

    #[error("reference to '{0}' has no definition")]
    MissingDefinition(String),
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("export error: {0}")]
    Export(#[from] ExportError),
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("entity '{0}' is declared more than once")]
    DuplicateEntity(String),
}
