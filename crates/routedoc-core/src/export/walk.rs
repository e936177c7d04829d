use std::borrow::Cow;

use indexmap::IndexMap;
use log::debug;
use serde_json::{Map, Value};

use super::{BodyPlacement, Exporter, RenderedHeader, RenderedMedia};
use crate::error::ExportError;
use crate::ir::{Api, Operation, Schema, SchemaType};

const DEFAULT_MEDIA_TYPE: &str = "application/json";

/// Walk `api` and render it with `exporter`.
///
/// Every schema carrying a canonical name is rendered as a `$ref`; its full
/// definition is emitted once, the first time the name is met.
pub fn export(api: &Api, exporter: &dyn Exporter) -> Result<Value, ExportError> {
    let mut walker = Walker {
        api,
        exporter,
        refs: RefTracker::default(),
        definitions: Map::new(),
    };

    let mut doc = exporter.header(api);
    if !api.tags.is_empty() {
        let tags = api
            .tags
            .iter()
            .map(|tag| {
                let mut out = Map::new();
                out.insert("name".into(), tag.name.clone().into());
                insert_some(&mut out, "description", tag.description.clone());
                Value::Object(out)
            })
            .collect::<Vec<_>>();
        doc.insert("tags".into(), Value::Array(tags));
    }

    let mut paths = Map::new();
    for path in &api.paths {
        let mut item = Map::new();
        for (method, op) in &path.operations {
            item.insert(method.key().into(), Value::Object(walker.operation(op)?));
        }
        paths.insert(path.template.clone(), Value::Object(item));
    }
    doc.insert("paths".into(), Value::Object(paths));

    // Named types no route reaches directly, e.g. ones only merged into others.
    for (name, definition) in &api.definitions {
        walker.reference(name, definition)?;
    }

    let security_schemes = api
        .security_schemes
        .iter()
        .map(|(name, scheme)| (name.clone(), scheme.clone()))
        .collect();
    exporter.finish(&mut doc, walker.definitions, security_schemes);
    Ok(Value::Object(doc))
}

/// Replace `::` and anything outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.replace("::", "_")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Canonical names emitted so far, keyed by their sanitized form.
#[derive(Default)]
struct RefTracker {
    seen: IndexMap<String, String>,
}

struct Reservation {
    sanitized: String,
    fresh: bool,
}

impl RefTracker {
    fn reserve(&mut self, canonical: &str) -> Result<Reservation, ExportError> {
        let sanitized = sanitize_name(canonical);
        match self.seen.get(&sanitized) {
            Some(owner) if owner == canonical => Ok(Reservation {
                sanitized,
                fresh: false,
            }),
            Some(owner) => Err(ExportError::NameCollision {
                sanitized,
                first: owner.clone(),
                second: canonical.to_string(),
            }),
            None => {
                self.seen.insert(sanitized.clone(), canonical.to_string());
                Ok(Reservation {
                    sanitized,
                    fresh: true,
                })
            }
        }
    }
}

struct Walker<'a> {
    api: &'a Api,
    exporter: &'a dyn Exporter,
    refs: RefTracker,
    definitions: Map<String, Value>,
}

impl<'a> Walker<'a> {
    fn operation(&mut self, op: &Operation) -> Result<Map<String, Value>, ExportError> {
        let mut out = Map::new();
        insert_some(&mut out, "operationId", op.operation_id.clone());
        insert_some(&mut out, "summary", op.summary.clone());
        insert_some(&mut out, "description", op.description.clone());
        if !op.tags.is_empty() {
            out.insert("tags".into(), op.tags.clone().into());
        }
        self.exporter.operation_media(op, &mut out);

        let mut parameters = Vec::new();
        for param in &op.parameters {
            let schema = self.schema(&param.schema)?;
            match self.exporter.parameter(param, schema) {
                Some(mut rendered) => {
                    extend_extensions(&mut rendered, &param.extensions);
                    parameters.push(Value::Object(rendered));
                }
                None => debug!("dropping parameter '{}' ({})", param.name, param.location.as_str()),
            }
        }

        if let Some(body) = &op.request_body {
            let mut content = Vec::with_capacity(body.content.len());
            for media in &body.content {
                content.push(RenderedMedia {
                    mime: media.mime.clone(),
                    schema: self.schema(&media.schema)?,
                    example: media.example.clone(),
                });
            }
            match self.exporter.request_body(body, content) {
                BodyPlacement::Parameters(extra) => parameters.extend(extra),
                BodyPlacement::RequestBody(rendered) => {
                    if !parameters.is_empty() {
                        out.insert("parameters".into(), Value::Array(std::mem::take(&mut parameters)));
                    }
                    out.insert("requestBody".into(), rendered);
                }
            }
        }
        if !parameters.is_empty() {
            out.insert("parameters".into(), Value::Array(parameters));
        }

        let produces: Vec<String> = if op.produces.is_empty() {
            vec![DEFAULT_MEDIA_TYPE.to_string()]
        } else {
            op.produces.clone()
        };
        let mut responses = Map::new();
        for (code, response) in &op.responses {
            let schema = match &response.schema {
                Some(schema) => Some(self.schema(schema)?),
                None => None,
            };
            let mut headers = Vec::new();
            for (name, header) in &response.headers {
                headers.push((
                    name.clone(),
                    RenderedHeader {
                        description: header.description.clone(),
                        schema: self.schema(&header.schema)?,
                    },
                ));
            }
            let mut rendered = self.exporter.response(response, schema, headers, &produces);
            extend_extensions(&mut rendered, &response.extensions);
            responses.insert(code.clone(), Value::Object(rendered));
        }
        out.insert("responses".into(), Value::Object(responses));

        if op.deprecated {
            out.insert("deprecated".into(), Value::Bool(true));
        }
        if !op.security.is_empty() {
            let security = op
                .security
                .iter()
                .map(|requirement| {
                    Value::Object(
                        requirement
                            .iter()
                            .map(|(name, scopes)| (name.clone(), scopes.clone().into()))
                            .collect(),
                    )
                })
                .collect();
            out.insert("security".into(), Value::Array(security));
        }
        extend_extensions(&mut out, &op.extensions);
        Ok(out)
    }

    /// Render a schema in a use position.
    fn schema(&mut self, schema: &Schema) -> Result<Value, ExportError> {
        match &schema.canonical_name {
            Some(name) => self.reference(name, schema),
            None => Ok(Value::Object(self.inline(schema)?)),
        }
    }

    /// A `$ref` to `name`, emitting its definition on first use.
    fn reference(&mut self, name: &str, site: &Schema) -> Result<Value, ExportError> {
        let reservation = self.refs.reserve(name)?;
        if reservation.fresh {
            // Reserve the slot first so self-references see it.
            self.definitions
                .insert(reservation.sanitized.clone(), Value::Null);
            let api = self.api;
            let body = match api.definitions.get(name) {
                Some(definition) => Cow::Borrowed(definition),
                None if !site.is_reference_stub() => Cow::Owned(Schema {
                    canonical_name: None,
                    nullable: false,
                    extensions: IndexMap::new(),
                    ..site.clone()
                }),
                None => return Err(ExportError::MissingDefinition(name.to_string())),
            };
            let rendered = self.inline(&body)?;
            self.definitions
                .insert(reservation.sanitized.clone(), Value::Object(rendered));
        }

        let mut out = Map::new();
        out.insert(
            "$ref".into(),
            format!("{}{}", self.exporter.ref_prefix(), reservation.sanitized).into(),
        );
        if site.nullable {
            self.exporter.nullable(&mut out);
        }
        extend_extensions(&mut out, &site.extensions);
        Ok(Value::Object(out))
    }

    /// Render the full body of a schema, ignoring its canonical name.
    fn inline(&mut self, schema: &Schema) -> Result<Map<String, Value>, ExportError> {
        let mut out = if !schema.one_of.is_empty() {
            if self.exporter.supports_one_of() {
                let variants = schema
                    .one_of
                    .iter()
                    .map(|variant| self.schema(variant))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut out = Map::new();
                out.insert("oneOf".into(), Value::Array(variants));
                out
            } else {
                match self.schema(&schema.one_of[0])? {
                    Value::Object(first) => first,
                    _ => Map::new(),
                }
            }
        } else {
            match schema.schema_type {
                Some(SchemaType::File) => self.exporter.file_schema(),
                Some(schema_type) => {
                    let mut out = Map::new();
                    out.insert("type".into(), schema_type.as_str().into());
                    insert_some(&mut out, "format", schema.format.clone());
                    out
                }
                None => Map::new(),
            }
        };

        insert_some(&mut out, "description", schema.description.clone());

        if !schema.properties.is_empty() {
            let mut properties = Map::new();
            for (name, property) in &schema.properties {
                properties.insert(name.clone(), self.schema(property)?);
            }
            out.insert("properties".into(), Value::Object(properties));
        }
        if !schema.required.is_empty() {
            let required = schema.required.iter().cloned().map(Value::from).collect();
            out.insert("required".into(), Value::Array(required));
        }
        if schema.is_type(SchemaType::Array) {
            let items = match schema.items.as_deref() {
                Some(items) => self.schema(items)?,
                None => Value::Object(self.inline(&Schema::string())?),
            };
            out.insert("items".into(), items);
        }
        if !schema.enum_values.is_empty() {
            out.insert("enum".into(), Value::Array(schema.enum_values.clone()));
        }
        insert_some(&mut out, "default", schema.default_value.clone());
        insert_some(&mut out, "example", schema.example.clone());
        if schema.nullable {
            self.exporter.nullable(&mut out);
        }
        extend_extensions(&mut out, &schema.extensions);
        Ok(out)
    }
}

/// Insert `value` under `key` unless it is absent.
pub(crate) fn insert_some<V: Into<Value>>(map: &mut Map<String, Value>, key: &str, value: Option<V>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}

fn extend_extensions(map: &mut Map<String, Value>, extensions: &IndexMap<String, Value>) {
    for (key, value) in extensions {
        map.insert(key.clone(), value.clone());
    }
}
