use log::warn;
use serde_json::{Map, Value};

use super::v2::info;
use super::walk::insert_some;
use super::{BodyPlacement, Exporter, RenderedHeader, RenderedMedia};
use crate::ir::{Api, CollectionFormat, Parameter, ParameterLocation, RequestBody, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    V30,
    V31,
}

/// OpenAPI 3.0 and 3.1. The dialects differ only in how nullable is written.
pub struct OpenApi3Exporter {
    dialect: Dialect,
}

impl OpenApi3Exporter {
    pub fn v3_0() -> Self {
        Self {
            dialect: Dialect::V30,
        }
    }

    pub fn v3_1() -> Self {
        Self {
            dialect: Dialect::V31,
        }
    }
}

impl Exporter for OpenApi3Exporter {
    fn version(&self) -> &'static str {
        match self.dialect {
            Dialect::V30 => "3.0.3",
            Dialect::V31 => "3.1.0",
        }
    }

    fn header(&self, api: &Api) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert("openapi".into(), self.version().into());
        doc.insert("info".into(), info(api));
        let servers = servers(api);
        if !servers.is_empty() {
            doc.insert("servers".into(), Value::Array(servers));
        }
        doc
    }

    fn ref_prefix(&self) -> &'static str {
        "#/components/schemas/"
    }

    fn finish(
        &self,
        doc: &mut Map<String, Value>,
        definitions: Map<String, Value>,
        security_schemes: Map<String, Value>,
    ) {
        let mut components = Map::new();
        if !definitions.is_empty() {
            components.insert("schemas".into(), Value::Object(definitions));
        }
        if !security_schemes.is_empty() {
            components.insert("securitySchemes".into(), Value::Object(security_schemes));
        }
        if !components.is_empty() {
            doc.insert("components".into(), Value::Object(components));
        }
    }

    fn nullable(&self, schema: &mut Map<String, Value>) {
        match self.dialect {
            Dialect::V30 => {
                if schema.contains_key("$ref") {
                    // Siblings of `$ref` are ignored in 3.0.
                    let reference = std::mem::take(schema);
                    schema.insert("allOf".into(), Value::Array(vec![Value::Object(reference)]));
                }
                schema.insert("nullable".into(), Value::Bool(true));
            }
            Dialect::V31 => nullable_31(schema),
        }
    }

    fn file_schema(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("type".into(), "string".into());
        out.insert("format".into(), "binary".into());
        out
    }

    fn parameter(&self, param: &Parameter, schema: Value) -> Option<Map<String, Value>> {
        if param.location == ParameterLocation::Body {
            warn!("parameter '{}' is body-bound, it belongs in the request body", param.name);
            return None;
        }
        let mut out = Map::new();
        out.insert("name".into(), param.name.clone().into());
        out.insert("in".into(), param.location.as_str().into());
        insert_some(&mut out, "description", param.description.clone());
        out.insert("required".into(), param.required.into());
        out.insert("schema".into(), schema);
        if let Some(format) = param.collection_format {
            let (style, explode) = style_of(format);
            out.insert("style".into(), style.into());
            out.insert("explode".into(), explode.into());
        }
        insert_some(&mut out, "example", param.example.clone());
        Some(out)
    }

    fn request_body(&self, body: &RequestBody, content: Vec<RenderedMedia>) -> BodyPlacement {
        let mut out = Map::new();
        insert_some(&mut out, "description", body.description.clone());
        let content = content
            .into_iter()
            .map(|media| (media.mime, media_object(media.schema, media.example)))
            .collect();
        out.insert("content".into(), Value::Object(content));
        if body.required {
            out.insert("required".into(), Value::Bool(true));
        }
        BodyPlacement::RequestBody(Value::Object(out))
    }

    fn response(
        &self,
        response: &Response,
        schema: Option<Value>,
        headers: Vec<(String, RenderedHeader)>,
        produces: &[String],
    ) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("description".into(), response.description.clone().into());
        if !headers.is_empty() {
            let headers = headers
                .into_iter()
                .map(|(name, header)| {
                    let mut rendered = Map::new();
                    insert_some(&mut rendered, "description", header.description);
                    rendered.insert("schema".into(), header.schema);
                    (name, Value::Object(rendered))
                })
                .collect();
            out.insert("headers".into(), Value::Object(headers));
        }
        if schema.is_some() || response.examples.is_some() {
            let content = produces
                .iter()
                .map(|mime| {
                    let schema = schema.clone().unwrap_or_else(|| Value::Object(Map::new()));
                    (mime.clone(), media_object(schema, response.examples.clone()))
                })
                .collect();
            out.insert("content".into(), Value::Object(content));
        }
        out
    }
}

fn servers(api: &Api) -> Vec<Value> {
    let base_path = api.base_path.as_deref().unwrap_or("");
    let urls: Vec<String> = match &api.host {
        Some(host) if api.schemes.is_empty() => vec![format!("https://{host}{base_path}")],
        Some(host) => api
            .schemes
            .iter()
            .map(|scheme| format!("{scheme}://{host}{base_path}"))
            .collect(),
        None if !base_path.is_empty() => vec![base_path.to_string()],
        None => Vec::new(),
    };
    urls.into_iter()
        .map(|url| {
            let mut server = Map::new();
            server.insert("url".into(), url.into());
            Value::Object(server)
        })
        .collect()
}

fn media_object(schema: Value, example: Option<Value>) -> Value {
    let mut out = Map::new();
    out.insert("schema".into(), schema);
    insert_some(&mut out, "example", example);
    Value::Object(out)
}

fn style_of(format: CollectionFormat) -> (&'static str, bool) {
    match format {
        CollectionFormat::Csv | CollectionFormat::Tsv => ("form", false),
        CollectionFormat::Ssv => ("spaceDelimited", false),
        CollectionFormat::Pipes => ("pipeDelimited", false),
        CollectionFormat::Multi => ("form", true),
    }
}

/// 3.1 has no `nullable`: `null` joins the type list, or the `oneOf`.
fn nullable_31(schema: &mut Map<String, Value>) {
    let null_variant = || {
        let mut null = Map::new();
        null.insert("type".into(), "null".into());
        Value::Object(null)
    };

    if let Some(Value::Array(variants)) = schema.get_mut("oneOf") {
        variants.push(null_variant());
        return;
    }
    match schema.get_mut("type") {
        Some(Value::String(name)) => {
            let name = std::mem::take(name);
            schema.insert("type".into(), Value::Array(vec![name.into(), "null".into()]));
        }
        Some(Value::Array(types)) => {
            if !types.iter().any(|t| t == "null") {
                types.push("null".into());
            }
        }
        _ => {
            let inner = std::mem::take(schema);
            schema.insert(
                "oneOf".into(),
                Value::Array(vec![Value::Object(inner), null_variant()]),
            );
        }
    }
}
