//! Version exporters.
//!
//! Every exporter shares one walk over the IR ([`export`]) and only
//! supplies the version-specific pieces through the [`Exporter`] hooks:
//! document header, `$ref` prefix, where definitions live, how nullable and
//! file schemas look, and how parameters, bodies and responses are shaped.

pub mod v2;
pub mod v3;
mod walk;

use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::ir::{Api, Operation, Parameter, RequestBody, Response};

pub use v2::SwaggerExporter;
pub use v3::OpenApi3Exporter;
pub use walk::{export, sanitize_name};

/// A request body content entry with its schema already rendered.
#[derive(Debug, Clone)]
pub struct RenderedMedia {
    pub mime: String,
    pub schema: Value,
    pub example: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct RenderedHeader {
    pub description: Option<String>,
    pub schema: Value,
}

/// Where an exporter puts a request body.
#[derive(Debug, Clone)]
pub enum BodyPlacement {
    /// Appended to the operation's parameter list.
    Parameters(Vec<Value>),
    /// Emitted as the operation's `requestBody`.
    RequestBody(Value),
}

/// Version-specific half of an export.
pub trait Exporter: Send + Sync {
    /// The version string written into the document.
    fn version(&self) -> &'static str;

    /// Top-level fields preceding `tags` and `paths`.
    fn header(&self, api: &Api) -> Map<String, Value>;

    fn ref_prefix(&self) -> &'static str;

    /// Attach the definitions table and security schemes to the finished document.
    fn finish(
        &self,
        doc: &mut Map<String, Value>,
        definitions: Map<String, Value>,
        security_schemes: Map<String, Value>,
    );

    /// Mark a rendered schema (possibly a bare `$ref`) as nullable.
    fn nullable(&self, schema: &mut Map<String, Value>);

    /// Whether multi-type schemas can be rendered as `oneOf`. When not,
    /// only the first declared type is kept.
    fn supports_one_of(&self) -> bool {
        true
    }

    fn file_schema(&self) -> Map<String, Value>;

    /// Render a non-body parameter. `None` drops it from the document.
    fn parameter(&self, param: &Parameter, schema: Value) -> Option<Map<String, Value>>;

    fn request_body(&self, body: &RequestBody, content: Vec<RenderedMedia>) -> BodyPlacement;

    fn response(
        &self,
        response: &Response,
        schema: Option<Value>,
        headers: Vec<(String, RenderedHeader)>,
        produces: &[String],
    ) -> Map<String, Value>;

    /// Operation-level media type lists, for versions that have them.
    fn operation_media(&self, _op: &Operation, _out: &mut Map<String, Value>) {}
}

/// Maps version tags to exporters.
pub struct ExporterRegistry {
    exporters: IndexMap<String, Arc<dyn Exporter>>,
}

impl Default for ExporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExporterRegistry {
    /// Registry with `2.0` (aliases `2`, `swagger`), `3.0` (alias `3`) and `3.1`.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(SwaggerExporter), &["2.0", "2", "swagger"]);
        registry.register(Arc::new(OpenApi3Exporter::v3_0()), &["3.0", "3"]);
        registry.register(Arc::new(OpenApi3Exporter::v3_1()), &["3.1"]);
        registry
    }

    pub fn empty() -> Self {
        Self {
            exporters: IndexMap::new(),
        }
    }

    /// Register `exporter` under each of `versions`, replacing previous owners.
    pub fn register(&mut self, exporter: Arc<dyn Exporter>, versions: &[&str]) {
        for version in versions {
            let key = version_key(version);
            if self.exporters.contains_key(&key) {
                debug!("replacing exporter for version {key}");
            }
            self.exporters.insert(key, Arc::clone(&exporter));
        }
    }

    pub fn unregister(&mut self, version: &str) -> Option<Arc<dyn Exporter>> {
        self.exporters.shift_remove(&version_key(version))
    }

    pub fn for_version(&self, version: &str) -> Result<&dyn Exporter, ConfigError> {
        self.exporters
            .get(&version_key(version))
            .map(|exporter| exporter.as_ref())
            .ok_or_else(|| ConfigError::NoExporter(version.to_string()))
    }

    pub fn is_registered(&self, version: &str) -> bool {
        self.exporters.contains_key(&version_key(version))
    }

    /// Registered version tags, in registration order.
    pub fn versions(&self) -> Vec<&str> {
        self.exporters.keys().map(String::as_str).collect()
    }
}

fn version_key(version: &str) -> String {
    version.trim().to_ascii_lowercase()
}
