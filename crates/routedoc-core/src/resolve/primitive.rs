use super::context::BuildContext;
use super::token::TypeToken;
use super::TypeResolver;
use crate::ir::{Schema, SchemaType};

/// Maps primitive type names onto schemas. Handles every token, falling back
/// to `string` for names it cannot reduce to a known primitive.
pub struct PrimitiveResolver;

impl TypeResolver for PrimitiveResolver {
    fn name(&self) -> &str {
        "primitive"
    }

    fn handles(&self, _token: &TypeToken, _cx: &BuildContext<'_>) -> bool {
        true
    }

    fn build_schema(&self, token: &TypeToken, cx: &mut BuildContext<'_>) -> Schema {
        match token {
            TypeToken::Named(name) => resolve_primitive_name(name),
            TypeToken::ArrayOf(inner) => Schema::array(self.build_schema(inner, cx)),
            TypeToken::OneOf(variants) => Schema::one_of(
                variants
                    .iter()
                    .map(|v| self.build_schema(v, cx))
                    .collect(),
            ),
        }
    }
}

/// Resolve a name, trying its last namespace segment when the full name is
/// not a known primitive (`Grape::API::Boolean` -> `Boolean`).
pub fn resolve_primitive_name(name: &str) -> Schema {
    if let Some(schema) = primitive_schema(name) {
        return schema;
    }
    name.rsplit("::")
        .next()
        .filter(|last| *last != name)
        .and_then(primitive_schema)
        .unwrap_or_else(Schema::string)
}

/// Fixed table of known primitive names, matched case-insensitively.
pub fn primitive_schema(name: &str) -> Option<Schema> {
    let schema = match name.trim().to_ascii_lowercase().as_str() {
        "string" | "symbol" | "str" => Schema::string(),
        "integer" | "int" => Schema::of(SchemaType::Integer),
        "int32" => Schema::with_format(SchemaType::Integer, "int32"),
        "long" | "int64" => Schema::with_format(SchemaType::Integer, "int64"),
        "number" | "numeric" => Schema::of(SchemaType::Number),
        "float" => Schema::with_format(SchemaType::Number, "float"),
        "double" | "bigdecimal" | "decimal" => Schema::with_format(SchemaType::Number, "double"),
        "boolean" | "bool" | "trueclass" | "falseclass" => Schema::of(SchemaType::Boolean),
        "date" => Schema::with_format(SchemaType::String, "date"),
        "date-time" | "datetime" | "time" => Schema::with_format(SchemaType::String, "date-time"),
        "object" | "hash" | "json" => Schema::object(),
        "array" => Schema::array(Schema::string()),
        "file" | "uploadedfile" => Schema::of(SchemaType::File),
        format @ ("byte" | "binary" | "password" | "uuid" | "email" | "uri") => {
            Schema::with_format(SchemaType::String, format)
        }
        _ => return None,
    };
    Some(schema)
}
