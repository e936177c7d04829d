use indexmap::IndexMap;
use log::{debug, warn};

use super::descriptor::{HeaderSpec, ParamSpec, RouteDescriptor};
use super::path::{is_nested, path_variables, split_nested, NameSegment};
use crate::entity::extensions_of;
use crate::ir::{CollectionFormat, Parameter, ParameterLocation, Schema, SchemaType};
use crate::resolve::BuildContext;

/// Build the parameters of a route.
///
/// Returns the synthesized body schema (an object aggregating every
/// body-bound parameter, if any) and the non-body parameters in declaration
/// order. `aliases` renames non-body parameters on output.
pub fn build_params(
    route: &RouteDescriptor,
    aliases: &IndexMap<String, String>,
    cx: &mut BuildContext<'_>,
) -> (Option<Schema>, Vec<Parameter>) {
    let mut builder = ParamBuilder {
        path_vars: path_variables(&route.path),
        aliases,
        bucket: IndexMap::new(),
        body: Schema::object(),
    };

    for (name, header) in &route.headers {
        builder.add_header(name, header, cx);
    }

    if route.params.keys().any(|name| is_nested(name)) {
        builder.build_nested(&route.params, cx);
    } else {
        builder.build_flat(&route.params, cx);
    }

    builder.finish()
}

struct ParamBuilder<'r> {
    path_vars: Vec<String>,
    aliases: &'r IndexMap<String, String>,
    /// Keyed by (location, output name): a later parameter replaces an
    /// earlier one only within the same location.
    bucket: IndexMap<(ParameterLocation, String), Parameter>,
    body: Schema,
}

impl ParamBuilder<'_> {
    fn build_flat(&mut self, params: &IndexMap<String, ParamSpec>, cx: &mut BuildContext<'_>) {
        for (name, spec) in params {
            if spec.documentation.hidden {
                debug!("skipping hidden parameter '{name}'");
                continue;
            }
            let schema = param_schema(spec, cx);
            let location = self.resolve_location(name, spec, &schema);
            if location == ParameterLocation::Body {
                let required = spec.required.unwrap_or(false);
                self.body.add_property(
                    name,
                    schema.with_description(spec.description()),
                    required,
                );
            } else {
                self.push(name, location, spec, schema);
            }
        }
    }

    fn build_nested(&mut self, params: &IndexMap<String, ParamSpec>, cx: &mut BuildContext<'_>) {
        // Roots are resolved first so children declared ahead of them still
        // follow their location.
        let mut hidden_roots: Vec<String> = Vec::new();
        let mut roots: IndexMap<String, (ParameterLocation, Schema)> = IndexMap::new();
        for (name, spec) in params {
            let segments = split_nested(name);
            if segments.len() > 1 {
                continue;
            }
            let root = segments[0].name.clone();
            if spec.documentation.hidden {
                hidden_roots.push(root);
                continue;
            }
            let schema = param_schema(spec, cx);
            let location = self.resolve_location(&root, spec, &schema);
            roots.insert(root, (location, schema));
        }
        let root_locations: IndexMap<String, ParameterLocation> = roots
            .iter()
            .map(|(root, (location, _))| (root.clone(), *location))
            .collect();

        for (name, spec) in params {
            let segments = split_nested(name);
            let root = &segments[0].name;
            if spec.documentation.hidden || hidden_roots.contains(root) {
                debug!("skipping hidden parameter '{name}'");
                continue;
            }

            let (location, schema) = if segments.len() == 1 {
                match roots.swap_remove(root) {
                    Some(resolved) => resolved,
                    None => continue,
                }
            } else {
                let schema = param_schema(spec, cx);
                let location = match root_locations.get(root) {
                    Some(location) => *location,
                    None => self.resolve_location(name, spec, &schema),
                };
                (location, schema)
            };

            if location != ParameterLocation::Body {
                self.push(name, location, spec, schema);
                continue;
            }
            let required = spec.required.unwrap_or(false);
            insert_nested(
                &mut self.body,
                &segments,
                schema.with_description(spec.description()),
                required,
            );
        }
    }

    fn add_header(&mut self, name: &str, header: &HeaderSpec, cx: &mut BuildContext<'_>) {
        let schema = header
            .header_type
            .as_ref()
            .map(|token| cx.resolve_or_default(token))
            .unwrap_or_else(Schema::string);
        let parameter = Parameter {
            name: name.to_string(),
            location: ParameterLocation::Header,
            required: header.required,
            schema,
            description: header.description.clone(),
            collection_format: None,
            example: None,
            extensions: IndexMap::new(),
        };
        self.insert(parameter);
    }

    /// Path variables first, then the declared location, then the default:
    /// files travel in the body, everything else in the query.
    fn resolve_location(&self, name: &str, spec: &ParamSpec, schema: &Schema) -> ParameterLocation {
        if self.path_vars.iter().any(|var| var == name) {
            return ParameterLocation::Path;
        }
        if let Some(hint) = spec.documentation.param_type.as_deref() {
            match ParameterLocation::parse(hint) {
                Some(location) => return location,
                None => warn!("unknown location '{hint}' for parameter '{name}', using default"),
            }
        }
        if schema.is_type(SchemaType::File) {
            ParameterLocation::Body
        } else {
            ParameterLocation::Query
        }
    }

    fn push(&mut self, name: &str, location: ParameterLocation, spec: &ParamSpec, schema: Schema) {
        let doc = &spec.documentation;
        let collection_format = doc.collection_format.as_deref().and_then(|hint| {
            let parsed = CollectionFormat::parse(hint);
            if parsed.is_none() {
                warn!("unknown collection format '{hint}' for parameter '{name}'");
            }
            parsed
        });
        let parameter = Parameter {
            name: self.alias(name),
            location,
            required: location == ParameterLocation::Path || spec.required.unwrap_or(false),
            schema,
            description: spec.description(),
            collection_format,
            example: doc.example.clone(),
            extensions: extensions_of(&doc.extra),
        };
        self.insert(parameter);
    }

    fn insert(&mut self, parameter: Parameter) {
        self.bucket
            .insert((parameter.location, parameter.name.clone()), parameter);
    }

    fn alias(&self, name: &str) -> String {
        self.aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Undeclared path variables are added as required string parameters
    /// ahead of everything else.
    fn finish(self) -> (Option<Schema>, Vec<Parameter>) {
        let mut parameters: Vec<Parameter> = Vec::new();
        for var in &self.path_vars {
            let name = self.alias(var);
            if self
                .bucket
                .contains_key(&(ParameterLocation::Path, name.clone()))
            {
                continue;
            }
            debug!("path variable '{var}' is not declared, adding it as a string");
            parameters.push(Parameter {
                name,
                location: ParameterLocation::Path,
                required: true,
                schema: Schema::string(),
                description: None,
                collection_format: None,
                example: None,
                extensions: IndexMap::new(),
            });
        }
        parameters.extend(self.bucket.into_values());

        let body = if self.body.properties.is_empty() {
            None
        } else {
            Some(self.body)
        };
        (body, parameters)
    }
}

fn param_schema(spec: &ParamSpec, cx: &mut BuildContext<'_>) -> Schema {
    let mut schema = match spec.param_type {
        Some(ref token) => cx.resolve_or_default(token),
        None => Schema::string(),
    };
    if !spec.values.is_empty() {
        match schema.items.as_deref_mut() {
            Some(items) => items.enum_values = spec.values.clone(),
            None => schema.enum_values = spec.values.clone(),
        }
    }
    if spec.default.is_some() {
        schema.default_value = spec.default.clone();
    }
    schema
}

/// Place `leaf` at the position named by `segments` inside `container`,
/// creating intermediate objects (or arrays of objects) as needed.
fn insert_nested(container: &mut Schema, segments: &[NameSegment], leaf: Schema, required: bool) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    if rest.is_empty() {
        let leaf = if head.is_array && !leaf.is_type(SchemaType::Array) {
            Schema::array(leaf)
        } else {
            leaf
        };
        // A parent declared after its children keeps the children.
        let declared_late = container
            .properties
            .get(&head.name)
            .is_some_and(has_children);
        if !declared_late {
            container.add_property(&head.name, leaf, required);
            return;
        }
        if let Some(existing) = container.properties.get_mut(&head.name) {
            if leaf.description.is_some() {
                existing.description = leaf.description;
            }
        }
        if required {
            container.required.insert(head.name.clone());
        }
        return;
    }

    let node = container
        .properties
        .entry(head.name.clone())
        .or_insert_with(Schema::object);
    if head.is_array && !node.is_type(SchemaType::Array) {
        *node = Schema::array(Schema::object()).with_description(node.description.take());
    }

    let target = if node.is_type(SchemaType::Array) {
        let items = node.items.get_or_insert_with(|| Box::new(Schema::object()));
        if !items.is_type(SchemaType::Object) {
            **items = Schema::object();
        }
        items.as_mut()
    } else {
        if !node.is_type(SchemaType::Object) {
            *node = Schema::object().with_description(node.description.take());
        }
        node
    };
    insert_nested(target, rest, leaf, required);
}

fn has_children(schema: &Schema) -> bool {
    !schema.properties.is_empty()
        || schema
            .items
            .as_deref()
            .is_some_and(|items| !items.properties.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityCatalog, EntityDef, ExposedField};
    use crate::ir::HttpMethod;
    use crate::resolve::ResolverRegistry;

    fn build(route: &RouteDescriptor) -> (Option<Schema>, Vec<Parameter>) {
        build_with_aliases(route, &IndexMap::new())
    }

    fn build_with_aliases(
        route: &RouteDescriptor,
        aliases: &IndexMap<String, String>,
    ) -> (Option<Schema>, Vec<Parameter>) {
        let registry = ResolverRegistry::new();
        let mut entities = EntityCatalog::new();
        entities.register(EntityDef::new(
            "Address",
            vec![ExposedField::typed("zip", "String")],
        ));
        let mut cx = BuildContext::new(&registry, &entities);
        build_params(route, aliases, &mut cx)
    }

    #[test]
    fn test_flat_body_aggregation() {
        let route = RouteDescriptor::new(HttpMethod::Post, "/people")
            .param("name", ParamSpec::typed("String").required().located("body"))
            .param("age", ParamSpec::typed("Integer").optional().located("body"));
        let (body, params) = build(&route);
        let body = body.unwrap();
        assert!(params.is_empty());
        assert!(body.is_type(SchemaType::Object));
        assert_eq!(body.properties.keys().collect::<Vec<_>>(), vec!["name", "age"]);
        assert_eq!(body.required.iter().collect::<Vec<_>>(), vec!["name"]);
        assert!(body.properties["age"].is_type(SchemaType::Integer));
    }

    #[test]
    fn test_path_variable_wins_over_declared_location() {
        let route = RouteDescriptor::new(HttpMethod::Get, "/items/:id")
            .param("id", ParamSpec::typed("Integer").located("query"));
        let (body, params) = build(&route);
        assert!(body.is_none());
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].location, ParameterLocation::Path);
        assert!(params[0].required);
    }

    #[test]
    fn test_defaults_for_incomplete_declarations() {
        let route = RouteDescriptor::new(HttpMethod::Get, "/search")
            .param("q", ParamSpec::default())
            .param("page", ParamSpec::typed("Integer").located("cookie"));
        let (_, params) = build(&route);
        assert_eq!(params[0].name, "q");
        assert_eq!(params[0].location, ParameterLocation::Query);
        assert!(!params[0].required);
        assert_eq!(params[0].schema, Schema::string());
        assert_eq!(params[1].location, ParameterLocation::Query);
    }

    #[test]
    fn test_file_defaults_to_body() {
        let route = RouteDescriptor::new(HttpMethod::Post, "/uploads")
            .param("upload", ParamSpec::typed("File").required());
        let (body, params) = build(&route);
        assert!(params.is_empty());
        assert!(body.unwrap().properties["upload"].is_type(SchemaType::File));
    }

    #[test]
    fn test_hidden_parameters_are_skipped() {
        let route = RouteDescriptor::new(HttpMethod::Get, "/items")
            .param("debug", ParamSpec::typed("Boolean").hidden())
            .param("limit", ParamSpec::typed("Integer"));
        let (_, params) = build(&route);
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "limit");
    }

    #[test]
    fn test_collection_format_and_aliases() {
        let route = RouteDescriptor::new(HttpMethod::Get, "/items/:item_id")
            .param("item_id", ParamSpec::typed("Integer"))
            .param("tags", ParamSpec::typed("[String]").collection_format("multi"));
        let mut aliases = IndexMap::new();
        aliases.insert("item_id".to_string(), "id".to_string());
        let (_, params) = build_with_aliases(&route, &aliases);

        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "id");
        assert_eq!(params[1].collection_format, Some(CollectionFormat::Multi));
        assert!(params[1].schema.is_type(SchemaType::Array));
    }

    #[test]
    fn test_duplicate_names_only_collide_within_a_location() {
        let mut route = RouteDescriptor::new(HttpMethod::Get, "/items")
            .param("token", ParamSpec::typed("String").located("query"))
            .param("api_token", ParamSpec::typed("Integer").located("header"));
        route.headers.insert(
            "token".to_string(),
            HeaderSpec {
                description: Some("auth".to_string()),
                header_type: None,
                required: true,
            },
        );
        let mut aliases = IndexMap::new();
        aliases.insert("api_token".to_string(), "token".to_string());
        let (_, params) = build_with_aliases(&route, &aliases);

        assert_eq!(params.len(), 2);
        let header = &params[0];
        assert_eq!(header.location, ParameterLocation::Header);
        assert!(header.schema.is_type(SchemaType::Integer));
        assert_eq!(params[1].location, ParameterLocation::Query);
        assert_eq!(params[1].name, "token");
    }

    #[test]
    fn test_undeclared_path_variables_are_added() {
        let route = RouteDescriptor::new(HttpMethod::Get, "/orgs/:org/items")
            .param("limit", ParamSpec::typed("Integer"));
        let (_, params) = build(&route);
        assert_eq!(params[0].name, "org");
        assert_eq!(params[0].location, ParameterLocation::Path);
        assert!(params[0].required);
        assert_eq!(params[1].name, "limit");
    }

    #[test]
    fn test_nested_params_build_object_tree() {
        let route = RouteDescriptor::new(HttpMethod::Post, "/users")
            .param("user", ParamSpec::typed("Hash").required().located("body"))
            .param("user[name]", ParamSpec::typed("String").required())
            .param("user[address][zip]", ParamSpec::typed("String"))
            .param("user[address][city]", ParamSpec::typed("String").required());
        let (body, params) = build(&route);
        assert!(params.is_empty());

        let body = body.unwrap();
        assert_eq!(body.required.iter().collect::<Vec<_>>(), vec!["user"]);
        let user = &body.properties["user"];
        assert!(user.is_type(SchemaType::Object));
        assert_eq!(user.properties.keys().collect::<Vec<_>>(), vec!["name", "address"]);
        assert_eq!(user.required.iter().collect::<Vec<_>>(), vec!["name"]);
        let address = &user.properties["address"];
        assert_eq!(address.properties.keys().collect::<Vec<_>>(), vec!["zip", "city"]);
        assert_eq!(address.required.iter().collect::<Vec<_>>(), vec!["city"]);
    }

    #[test]
    fn test_nested_children_declared_before_root() {
        let route = RouteDescriptor::new(HttpMethod::Post, "/users")
            .param("user[name]", ParamSpec::typed("String").required())
            .param("user", ParamSpec::typed("Hash").required().located("body"));
        let (body, params) = build(&route);
        assert!(params.is_empty());

        let body = body.unwrap();
        assert_eq!(body.required.iter().collect::<Vec<_>>(), vec!["user"]);
        let user = &body.properties["user"];
        assert!(user.is_type(SchemaType::Object));
        assert!(user.properties["name"].is_type(SchemaType::String));
        assert_eq!(user.required.iter().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn test_hidden_root_hides_nested_children() {
        let route = RouteDescriptor::new(HttpMethod::Post, "/users")
            .param("user", ParamSpec::typed("Hash").located("body").hidden())
            .param("user[name]", ParamSpec::typed("String"))
            .param("user[role]", ParamSpec::typed("String").located("query"))
            .param("note", ParamSpec::typed("String").located("body"));
        let (body, params) = build(&route);
        assert!(params.is_empty());
        let body = body.unwrap();
        assert_eq!(body.properties.keys().collect::<Vec<_>>(), vec!["note"]);
    }

    #[test]
    fn test_nested_array_branches() {
        let route = RouteDescriptor::new(HttpMethod::Post, "/orders")
            .param("lines", ParamSpec::typed("Array[JSON]").located("body"))
            .param("lines[sku]", ParamSpec::typed("String").required())
            .param("notes[][text]", ParamSpec::typed("String").located("body"));
        let (body, _) = build(&route);
        let body = body.unwrap();

        let lines = &body.properties["lines"];
        assert!(lines.is_type(SchemaType::Array));
        let line = lines.items.as_deref().unwrap();
        assert!(line.properties["sku"].is_type(SchemaType::String));
        assert_eq!(line.required.iter().collect::<Vec<_>>(), vec!["sku"]);

        let notes = &body.properties["notes"];
        assert!(notes.is_type(SchemaType::Array));
        assert!(notes.items.as_deref().unwrap().properties.contains_key("text"));
    }

    #[test]
    fn test_nested_non_body_params_stay_flat() {
        let route = RouteDescriptor::new(HttpMethod::Get, "/items")
            .param("filter[name]", ParamSpec::typed("String"))
            .param("filter[kind]", ParamSpec::typed("String"));
        let (body, params) = build(&route);
        assert!(body.is_none());
        let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["filter[name]", "filter[kind]"]);
    }

    #[test]
    fn test_entity_typed_body_param_is_named() {
        let route = RouteDescriptor::new(HttpMethod::Put, "/profile")
            .param("address", ParamSpec::typed("Address").located("body"));
        let (body, _) = build(&route);
        let address = &body.unwrap().properties["address"];
        assert_eq!(address.canonical_name.as_deref(), Some("Address"));
    }

    #[test]
    fn test_values_and_default() {
        let mut spec = ParamSpec::typed("String");
        spec.values = vec![serde_json::json!("asc"), serde_json::json!("desc")];
        spec.default = Some(serde_json::json!("asc"));
        let route = RouteDescriptor::new(HttpMethod::Get, "/items").param("order", spec);
        let (_, params) = build(&route);
        assert_eq!(params[0].schema.enum_values.len(), 2);
        assert_eq!(params[0].schema.default_value, Some(serde_json::json!("asc")));
    }
}
