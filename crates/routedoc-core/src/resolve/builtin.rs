use super::context::BuildContext;
use super::token::TypeToken;
use super::TypeResolver;
use crate::entity::introspect::build_entity_schema;
use crate::ir::Schema;

/// Resolves `[T]` tokens into an array of whatever `T` resolves to.
pub struct ArrayResolver;

impl TypeResolver for ArrayResolver {
    fn name(&self) -> &str {
        "array"
    }

    fn handles(&self, token: &TypeToken, _cx: &BuildContext<'_>) -> bool {
        matches!(token, TypeToken::ArrayOf(_))
    }

    fn build_schema(&self, token: &TypeToken, cx: &mut BuildContext<'_>) -> Schema {
        match token {
            TypeToken::ArrayOf(inner) => Schema::array(cx.resolve_or_default(inner)),
            _ => Schema::array(Schema::string()),
        }
    }
}

/// Resolves multi-type tokens into a schema holding one variant per
/// declared type. Variants keep declaration order and are not deduplicated.
pub struct OneOfResolver;

impl TypeResolver for OneOfResolver {
    fn name(&self) -> &str {
        "one_of"
    }

    fn handles(&self, token: &TypeToken, _cx: &BuildContext<'_>) -> bool {
        matches!(token, TypeToken::OneOf(_))
    }

    fn build_schema(&self, token: &TypeToken, cx: &mut BuildContext<'_>) -> Schema {
        match token {
            TypeToken::OneOf(variants) => {
                Schema::one_of(variants.iter().map(|v| cx.resolve_or_default(v)).collect())
            }
            _ => Schema::string(),
        }
    }
}

/// Resolves names registered in the build's entity catalog by introspecting
/// the entity.
pub struct EntityResolver;

impl TypeResolver for EntityResolver {
    fn name(&self) -> &str {
        "entity"
    }

    fn handles(&self, token: &TypeToken, cx: &BuildContext<'_>) -> bool {
        matches!(token, TypeToken::Named(name) if cx.entities().contains(name))
    }

    fn build_schema(&self, token: &TypeToken, cx: &mut BuildContext<'_>) -> Schema {
        match token {
            TypeToken::Named(name) => build_entity_schema(name, cx),
            _ => Schema::string(),
        }
    }
}
