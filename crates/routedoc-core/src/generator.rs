//! Top-level orchestration: route descriptors in, OpenAPI document out.

use heck::ToLowerCamelCase;
use indexmap::{IndexMap, IndexSet};
use log::{debug, info, warn};
use serde_json::Value;

use crate::config::GeneratorConfig;
use crate::entity::{Entity, EntityCatalog};
use crate::error::GenerateError;
use crate::export::{export, ExporterRegistry};
use crate::ir::{
    normalize_status, Api, Header, HttpMethod, MediaType, Operation, RequestBody, Response,
    Schema, SchemaType, Tag,
};
use crate::resolve::{BuildContext, ResolverRegistry, TypeToken};
use crate::route::path::{alias_template, normalize_template};
use crate::route::{build_params, HeaderSpec, ResponseSpec, RouteDescriptor};

const DEFAULT_MEDIA_TYPE: &str = "application/json";
const MULTIPART_MEDIA_TYPE: &str = "multipart/form-data";
const FORM_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";

/// Owns the registries and configuration shared by every generation run.
///
/// Registries are mutated only through `&mut self`; builds borrow the
/// generator immutably and keep their own per-run state, so independent runs
/// may share one generator.
pub struct Generator {
    resolvers: ResolverRegistry,
    exporters: ExporterRegistry,
    entities: EntityCatalog,
    config: GeneratorConfig,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            resolvers: ResolverRegistry::new(),
            exporters: ExporterRegistry::new(),
            entities: EntityCatalog::new(),
            config,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn resolvers_mut(&mut self) -> &mut ResolverRegistry {
        &mut self.resolvers
    }

    pub fn exporters(&self) -> &ExporterRegistry {
        &self.exporters
    }

    pub fn exporters_mut(&mut self) -> &mut ExporterRegistry {
        &mut self.exporters
    }

    pub fn entities_mut(&mut self) -> &mut EntityCatalog {
        &mut self.entities
    }

    pub fn register_entity<E: Entity + 'static>(&mut self, entity: E) {
        self.entities.register(entity);
    }

    /// Build the version-agnostic IR for `routes`.
    pub fn build_api(&self, routes: &[RouteDescriptor]) -> Api {
        let info = &self.config.info;
        let mut api = Api::new(&info.title, &info.version);
        api.description = info.description.clone();
        api.host = self.config.host.clone();
        api.base_path = self.config.base_path.clone();
        api.schemes = self.config.schemes.clone();
        api.security_schemes = self.config.security_schemes.clone();

        let mut cx = BuildContext::new(&self.resolvers, &self.entities);
        let mut tags: IndexSet<String> = IndexSet::new();
        let mut operation_ids: IndexSet<String> = IndexSet::new();

        for route in routes {
            if route.hidden {
                debug!("skipping hidden route {} {}", route.method, route.path);
                continue;
            }
            let template = alias_template(&normalize_template(&route.path), &self.config.param_aliases);
            let mut op = self.build_operation(route, &template, &mut cx);
            tags.extend(op.tags.iter().cloned());

            let path = api.path_mut(&template);
            if let Some(replaced) = path.operations.get(&route.method) {
                warn!("{} {template} declared twice, keeping the last one", route.method);
                if let Some(old_id) = &replaced.operation_id {
                    operation_ids.shift_remove(old_id);
                }
            }
            let id = op
                .operation_id
                .take()
                .unwrap_or_else(|| operation_id(route.method, &template));
            op.operation_id = Some(unique_id(&mut operation_ids, id));
            path.operations.insert(route.method, op);
        }

        api.tags = tags
            .into_iter()
            .map(|name| Tag {
                description: Some(format!("Operations about {name}")),
                name,
            })
            .collect();
        api.definitions = cx.into_definitions();
        info!(
            "built {} paths, {} definitions",
            api.paths.len(),
            api.definitions.len()
        );
        api
    }

    /// Render `api` with the exporter registered for `version`.
    pub fn export(&self, api: &Api, version: &str) -> Result<Value, GenerateError> {
        let exporter = self.exporters.for_version(version)?;
        Ok(export(api, exporter)?)
    }

    /// Build and export in one go.
    pub fn generate(&self, routes: &[RouteDescriptor], version: &str) -> Result<Value, GenerateError> {
        // Fail on an unknown version before doing any work.
        let exporter = self.exporters.for_version(version)?;
        let api = self.build_api(routes);
        Ok(export(&api, exporter)?)
    }

    fn build_operation(
        &self,
        route: &RouteDescriptor,
        template: &str,
        cx: &mut BuildContext<'_>,
    ) -> Operation {
        let mut op = Operation::new(route.method);
        op.operation_id = route.operation_id.clone();
        op.summary = route.summary.clone();
        op.description = route.description.clone();
        op.deprecated = route.deprecated;
        op.tags = if route.tags.is_empty() {
            default_tag(template).into_iter().collect()
        } else {
            route.tags.clone()
        };
        op.security = route.security.clone();
        op.consumes = or_default(&route.consumes, &self.config.consumes);
        op.produces = or_default(&route.produces, &self.config.produces);
        op.extensions = route.extensions();

        let (body, parameters) = build_params(route, &self.config.param_aliases, cx);
        op.parameters = parameters;
        if let Some(body) = body {
            if op.consumes.is_empty() && has_file(&body) {
                op.consumes = vec![MULTIPART_MEDIA_TYPE.to_string()];
            } else if op.consumes.is_empty() && route.declares_form() {
                op.consumes = vec![FORM_MEDIA_TYPE.to_string()];
            }
            let mimes = if op.consumes.is_empty() {
                vec![DEFAULT_MEDIA_TYPE.to_string()]
            } else {
                op.consumes.clone()
            };
            op.request_body = Some(RequestBody {
                description: route.body_description.clone(),
                required: !body.required.is_empty(),
                content: mimes
                    .into_iter()
                    .map(|mime| MediaType {
                        mime,
                        schema: body.clone(),
                        example: None,
                    })
                    .collect(),
            });
        }

        op.insert_response(success_response(route, cx));
        for spec in &route.responses {
            op.insert_response(declared_response(spec, cx));
        }
        op
    }
}

fn success_response(route: &RouteDescriptor, cx: &mut BuildContext<'_>) -> Response {
    let status = route.default_status.unwrap_or(match route.method {
        HttpMethod::Post => 201,
        HttpMethod::Delete if route.entity.is_none() => 204,
        _ => 200,
    });
    let code = status.to_string();
    Response {
        description: route
            .success_message
            .clone()
            .unwrap_or_else(|| reason_phrase(&code).to_string()),
        code,
        schema: route
            .entity
            .as_ref()
            .map(|token| payload_schema(token, route.is_array, cx)),
        headers: IndexMap::new(),
        examples: None,
        extensions: IndexMap::new(),
    }
}

fn declared_response(spec: &ResponseSpec, cx: &mut BuildContext<'_>) -> Response {
    let code = normalize_status(&spec.code.0);
    let headers = spec
        .headers
        .iter()
        .map(|(name, header)| (name.clone(), response_header(header, cx)))
        .collect();
    Response {
        description: spec
            .message
            .clone()
            .unwrap_or_else(|| reason_phrase(&code).to_string()),
        schema: spec
            .model
            .as_ref()
            .map(|token| payload_schema(token, spec.is_array, cx)),
        code,
        headers,
        examples: spec.examples.clone(),
        extensions: crate::entity::extensions_of(&spec.extra),
    }
}

fn response_header(header: &HeaderSpec, cx: &mut BuildContext<'_>) -> Header {
    Header {
        description: header.description.clone(),
        schema: header
            .header_type
            .as_ref()
            .map(|token| cx.resolve_or_default(token))
            .unwrap_or_else(Schema::string),
    }
}

fn payload_schema(token: &TypeToken, is_array: bool, cx: &mut BuildContext<'_>) -> Schema {
    let schema = cx.resolve_or_default(token);
    if is_array && !schema.is_type(SchemaType::Array) {
        Schema::array(schema)
    } else {
        schema
    }
}

fn has_file(body: &Schema) -> bool {
    body.properties
        .values()
        .any(|prop| prop.is_type(SchemaType::File))
}

fn or_default(declared: &[String], fallback: &[String]) -> Vec<String> {
    if declared.is_empty() {
        fallback.to_vec()
    } else {
        declared.to_vec()
    }
}

/// Derive a camelCase operation id from method and template:
/// `GET /items/{id}` becomes `getItemsId`.
pub fn operation_id(method: HttpMethod, template: &str) -> String {
    let words: Vec<&str> = template
        .split('/')
        .map(|seg| seg.trim_start_matches('{').trim_end_matches('}'))
        .filter(|seg| !seg.is_empty())
        .collect();
    format!("{} {}", method.key(), words.join(" ")).to_lower_camel_case()
}

fn unique_id(seen: &mut IndexSet<String>, id: String) -> String {
    if seen.insert(id.clone()) {
        return id;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{id}{n}");
        if seen.insert(candidate.clone()) {
            warn!("operation id '{id}' is taken, using '{candidate}'");
            return candidate;
        }
        n += 1;
    }
}

/// First literal segment of the template, skipping a version prefix.
fn default_tag(template: &str) -> Option<String> {
    template
        .split('/')
        .filter(|seg| !seg.is_empty() && !seg.starts_with('{'))
        .find(|seg| !is_version_segment(seg))
        .map(str::to_string)
}

fn is_version_segment(seg: &str) -> bool {
    seg.strip_prefix('v')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

fn reason_phrase(code: &str) -> &'static str {
    match code {
        "200" => "OK",
        "201" => "Created",
        "202" => "Accepted",
        "204" => "No Content",
        "301" => "Moved Permanently",
        "302" => "Found",
        "304" => "Not Modified",
        "400" => "Bad Request",
        "401" => "Unauthorized",
        "403" => "Forbidden",
        "404" => "Not Found",
        "405" => "Method Not Allowed",
        "409" => "Conflict",
        "410" => "Gone",
        "415" => "Unsupported Media Type",
        "422" => "Unprocessable Entity",
        "429" => "Too Many Requests",
        "500" => "Internal Server Error",
        "502" => "Bad Gateway",
        "503" => "Service Unavailable",
        "default" => "Unexpected error",
        _ => "Response",
    }
}
