use log::{debug, warn};

use super::{ExposedField, FieldDocumentation};
use crate::ir::{Schema, SchemaType};
use crate::resolve::{BuildContext, TypeToken, VisitState};

/// Introspect the entity registered as `name` into a schema.
///
/// The first visit returns the full named schema and records it in the
/// build's definitions. Any later visit, including a cyclic one made while
/// the entity is still being walked, returns a reference stub.
pub fn build_entity_schema(name: &str, cx: &mut BuildContext<'_>) -> Schema {
    if cx.visit_state(name) != VisitState::Unvisited {
        debug!("entity '{name}' already visited, emitting reference");
        return Schema::reference(name);
    }

    let Some(entity) = cx.entities().get(name) else {
        warn!("entity '{name}' is not registered, resolving it as a plain type");
        return cx.resolve_or_default(&TypeToken::named(name));
    };

    cx.begin(name);
    let mut schema = Schema::named_object(name);
    expose_fields(entity.fields(), &mut schema, cx);
    cx.complete(name, schema.clone());
    schema
}

/// Add the properties of `fields` to `target`, in declaration order.
fn expose_fields(fields: &[ExposedField], target: &mut Schema, cx: &mut BuildContext<'_>) {
    for field in fields {
        if field.merge {
            if let Some(merged) = merged_schema(field, cx) {
                target.merge_properties(&merged);
                continue;
            }
            warn!(
                "field '{}' is marked merge but has no nested structure",
                field.name
            );
        }

        let doc = &field.documentation;
        let mut property = field_schema(field, cx);
        apply_documentation(&mut property, doc);

        let required = if field.condition.is_some() {
            property.nullable = true;
            false
        } else {
            doc.required
        };
        target.add_property(field.key(), property, required);
    }
}

/// The sub-structure a merge field splices in. An entity still being walked
/// cannot be merged into itself, so it contributes nothing.
fn merged_schema(field: &ExposedField, cx: &mut BuildContext<'_>) -> Option<Schema> {
    if let Some(entity) = entity_reference(field, cx) {
        return match cx.visit_state(entity) {
            VisitState::InProgress => {
                warn!("cannot merge '{entity}' while it is being introspected");
                Some(Schema::object())
            }
            VisitState::Complete => cx.definition(entity).cloned(),
            VisitState::Unvisited => Some(build_entity_schema(entity, cx)),
        };
    }

    if field.nested.is_empty() {
        return None;
    }
    let mut inline = Schema::object();
    expose_fields(&field.nested, &mut inline, cx);
    Some(inline)
}

fn field_schema(field: &ExposedField, cx: &mut BuildContext<'_>) -> Schema {
    let declared = field
        .documentation
        .field_type
        .as_ref()
        .or(field.field_type.as_ref());

    let base = if let Some(entity) = field.using.as_deref() {
        build_entity_schema(entity, cx)
    } else if !field.nested.is_empty() {
        let mut inline = Schema::object();
        expose_fields(&field.nested, &mut inline, cx);
        inline
    } else if let Some(token) = declared {
        cx.resolve_or_default(token)
    } else {
        debug!("field '{}' declares no type, using string", field.name);
        Schema::string()
    };

    let is_array = field.is_array || field.documentation.is_array;
    if is_array && !base.is_type(SchemaType::Array) {
        Schema::array(base)
    } else {
        base
    }
}

/// The entity a field presents, either through `using` or a declared type
/// naming a registered entity.
fn entity_reference<'f>(field: &'f ExposedField, cx: &BuildContext<'_>) -> Option<&'f str> {
    if let Some(using) = field.using.as_deref() {
        return Some(using);
    }
    match field
        .documentation
        .field_type
        .as_ref()
        .or(field.field_type.as_ref())
    {
        Some(TypeToken::Named(name)) if cx.entities().contains(name) => Some(name.as_str()),
        _ => None,
    }
}

fn apply_documentation(property: &mut Schema, doc: &FieldDocumentation) {
    if doc.desc.is_some() {
        property.description = doc.desc.clone();
    }
    if doc.nullable {
        property.nullable = true;
    }
    if let Some(ref format) = doc.format {
        property.format = Some(format.clone());
    }
    if !doc.values.is_empty() {
        match property.items.as_deref_mut() {
            Some(items) => items.enum_values = doc.values.clone(),
            None => property.enum_values = doc.values.clone(),
        }
    }
    if doc.example.is_some() {
        property.example = doc.example.clone();
    }
    if doc.default.is_some() {
        property.default_value = doc.default.clone();
    }
    property.extensions.extend(doc.extensions());
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::entity::{EntityCatalog, EntityDef};
    use crate::resolve::ResolverRegistry;

    /// Build `name` in a fresh context, returning the schema and the final
    /// visit state of every catalog entity.
    fn build(catalog: &EntityCatalog, name: &str) -> (Schema, Vec<(String, VisitState)>) {
        let registry = ResolverRegistry::new();
        let mut cx = BuildContext::new(&registry, catalog);
        let schema = build_entity_schema(name, &mut cx);
        let states = catalog
            .names()
            .map(|n| (n.to_string(), cx.visit_state(n)))
            .collect();
        (schema, states)
    }

    #[test]
    fn test_self_reference_terminates_with_stub() {
        let mut catalog = EntityCatalog::new();
        catalog.register(EntityDef::new(
            "Node",
            vec![
                ExposedField::typed("id", "Integer").required(),
                ExposedField::entity("children", "Node").array(),
            ],
        ));

        let (schema, states) = build(&catalog, "Node");
        assert_eq!(schema.canonical_name.as_deref(), Some("Node"));
        let children = &schema.properties["children"];
        assert!(children.is_type(SchemaType::Array));
        let items = children.items.as_deref().unwrap();
        assert!(items.is_reference_stub());
        assert_eq!(items.canonical_name.as_deref(), Some("Node"));
        assert_eq!(states, vec![("Node".to_string(), VisitState::Complete)]);
    }

    #[test]
    fn test_mutual_reference_terminates() {
        let mut catalog = EntityCatalog::new();
        catalog.register(EntityDef::new(
            "Author",
            vec![ExposedField::typed("books", "[Book]")],
        ));
        catalog.register(EntityDef::new(
            "Book",
            vec![ExposedField::entity("author", "Author")],
        ));

        let (schema, states) = build(&catalog, "Author");
        let book = schema.properties["books"].items.as_deref().unwrap();
        assert_eq!(book.canonical_name.as_deref(), Some("Book"));
        assert!(!book.is_reference_stub());
        assert!(book.properties["author"].is_reference_stub());
        assert!(states.iter().all(|(_, s)| *s == VisitState::Complete));
    }

    #[test]
    fn test_completed_entity_is_referenced_not_rebuilt() {
        let mut catalog = EntityCatalog::new();
        catalog.register(EntityDef::new("Tag", vec![ExposedField::typed("label", "String")]));
        let registry = ResolverRegistry::new();
        let mut cx = BuildContext::new(&registry, &catalog);

        let first = build_entity_schema("Tag", &mut cx);
        let second = build_entity_schema("Tag", &mut cx);
        assert!(!first.is_reference_stub());
        assert!(second.is_reference_stub());
        assert_eq!(cx.definition("Tag"), Some(&first));
    }

    #[test]
    fn test_alias_is_property_key() {
        let mut catalog = EntityCatalog::new();
        catalog.register(EntityDef::new(
            "User",
            vec![ExposedField::typed("internal_name", "String").alias("displayName")],
        ));
        let (schema, _) = build(&catalog, "User");
        assert!(schema.properties.contains_key("displayName"));
        assert!(!schema.properties.contains_key("internal_name"));
    }

    #[test]
    fn test_conditional_field_is_nullable_and_optional() {
        let mut catalog = EntityCatalog::new();
        catalog.register(EntityDef::new(
            "Account",
            vec![
                ExposedField::typed("id", "Integer").required(),
                ExposedField::typed("secret", "String")
                    .required()
                    .when("admin")
                    .extension("x-internal", json!(true)),
            ],
        ));
        let (schema, _) = build(&catalog, "Account");
        let secret = &schema.properties["secret"];
        assert!(secret.nullable);
        assert_eq!(secret.extensions["x-internal"], json!(true));
        assert_eq!(schema.required.iter().collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn test_merge_splices_properties() {
        let mut catalog = EntityCatalog::new();
        catalog.register(EntityDef::new(
            "Address",
            vec![
                ExposedField::typed("street", "String").required(),
                ExposedField::typed("zip", "String"),
            ],
        ));
        catalog.register(EntityDef::new(
            "Person",
            vec![
                ExposedField::typed("name", "String"),
                ExposedField::entity("address", "Address").merged(),
            ],
        ));
        let (schema, _) = build(&catalog, "Person");
        assert_eq!(
            schema.properties.keys().collect::<Vec<_>>(),
            vec!["name", "street", "zip"]
        );
        assert!(!schema.properties.contains_key("address"));
        assert_eq!(schema.required.iter().collect::<Vec<_>>(), vec!["street"]);
    }

    #[test]
    fn test_merge_of_completed_entity_uses_full_definition() {
        let mut catalog = EntityCatalog::new();
        catalog.register(EntityDef::new(
            "Audit",
            vec![ExposedField::typed("created_at", "DateTime")],
        ));
        catalog.register(EntityDef::new(
            "Post",
            vec![
                ExposedField::entity("audit", "Audit"),
                ExposedField::entity("flat", "Audit").merged(),
            ],
        ));
        let (schema, _) = build(&catalog, "Post");
        assert!(schema.properties["audit"].canonical_name.is_some());
        assert!(schema.properties.contains_key("created_at"));
    }

    #[test]
    fn test_self_merge_contributes_nothing() {
        let mut catalog = EntityCatalog::new();
        catalog.register(EntityDef::new(
            "Loop",
            vec![
                ExposedField::typed("id", "Integer"),
                ExposedField::entity("again", "Loop").merged(),
            ],
        ));
        let (schema, _) = build(&catalog, "Loop");
        assert_eq!(schema.properties.keys().collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn test_inline_nested_block() {
        let mut catalog = EntityCatalog::new();
        catalog.register(EntityDef::new(
            "Order",
            vec![
                ExposedField::inline(
                    "shipping",
                    vec![ExposedField::typed("city", "String").required()],
                ),
                ExposedField::inline("meta", vec![ExposedField::typed("source", "String")])
                    .merged(),
            ],
        ));
        let (schema, _) = build(&catalog, "Order");
        let shipping = &schema.properties["shipping"];
        assert!(shipping.canonical_name.is_none());
        assert!(shipping.is_type(SchemaType::Object));
        assert_eq!(shipping.required.iter().collect::<Vec<_>>(), vec!["city"]);
        assert!(schema.properties.contains_key("source"));
        assert!(!schema.properties.contains_key("meta"));
    }

    #[test]
    fn test_special_character_keys_are_preserved() {
        let mut catalog = EntityCatalog::new();
        catalog.register(EntityDef::new(
            "Odd",
            vec![
                ExposedField::typed("is_valid?", "Boolean"),
                ExposedField::typed("$ref-like", "String"),
            ],
        ));
        let (schema, _) = build(&catalog, "Odd");
        assert_eq!(
            schema.properties.keys().collect::<Vec<_>>(),
            vec!["is_valid?", "$ref-like"]
        );
    }

    #[test]
    fn test_documentation_type_and_values() {
        let mut field = ExposedField::new("status");
        field.documentation.field_type = Some(TypeToken::named("String"));
        field.documentation.values = vec![json!("open"), json!("closed")];
        field.documentation.example = Some(json!("open"));
        let mut tags = ExposedField::typed("tags", "String").array();
        tags.documentation.values = vec![json!("a")];

        let mut catalog = EntityCatalog::new();
        catalog.register(EntityDef::new("Ticket", vec![field, tags]));
        let (schema, _) = build(&catalog, "Ticket");

        let status = &schema.properties["status"];
        assert!(status.is_type(SchemaType::String));
        assert_eq!(status.enum_values, vec![json!("open"), json!("closed")]);
        assert_eq!(status.example, Some(json!("open")));

        let tags = &schema.properties["tags"];
        assert!(tags.is_type(SchemaType::Array));
        assert_eq!(tags.items.as_deref().unwrap().enum_values, vec![json!("a")]);
    }

    #[test]
    fn test_untyped_field_defaults_to_string() {
        let mut catalog = EntityCatalog::new();
        catalog.register(EntityDef::new("Bare", vec![ExposedField::new("note")]));
        let (schema, _) = build(&catalog, "Bare");
        assert_eq!(schema.properties["note"], Schema::string());
    }
}
