//! Payload entities: named, field-enumerable types that introspect into
//! reusable schemas.

pub mod introspect;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::resolve::TypeToken;

/// A payload type whose fields can be enumerated.
///
/// `name` is the entity's stable identity within a build; it keys cycle
/// detection and becomes the canonical name of the resulting schema.
pub trait Entity: Send + Sync {
    fn name(&self) -> &str;

    fn fields(&self) -> &[ExposedField];
}

/// One exposed field of an entity.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExposedField {
    pub name: String,
    /// Output name, used as the property key instead of `name`.
    #[serde(default, rename = "as")]
    pub alias: Option<String>,
    #[serde(default, rename = "type")]
    pub field_type: Option<TypeToken>,
    /// Name of the entity that presents this field.
    #[serde(default)]
    pub using: Option<String>,
    #[serde(default)]
    pub is_array: bool,
    /// Splice the sub-structure's properties into the parent.
    #[serde(default)]
    pub merge: bool,
    /// Inclusion predicate. Any predicate makes the field optional output.
    #[serde(default, rename = "if")]
    pub condition: Option<String>,
    #[serde(default)]
    pub documentation: FieldDocumentation,
    /// Inline exposures, for fields presented as an anonymous object.
    #[serde(default)]
    pub nested: Vec<ExposedField>,
}

impl ExposedField {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn typed(name: &str, field_type: &str) -> Self {
        Self {
            field_type: Some(TypeToken::parse(field_type)),
            ..Self::new(name)
        }
    }

    pub fn entity(name: &str, entity: &str) -> Self {
        Self {
            using: Some(entity.to_string()),
            ..Self::new(name)
        }
    }

    pub fn inline(name: &str, nested: Vec<ExposedField>) -> Self {
        Self {
            nested,
            ..Self::new(name)
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    pub fn merged(mut self) -> Self {
        self.merge = true;
        self
    }

    pub fn when(mut self, condition: &str) -> Self {
        self.condition = Some(condition.to_string());
        self
    }

    pub fn required(mut self) -> Self {
        self.documentation.required = true;
        self
    }

    pub fn describe(mut self, desc: &str) -> Self {
        self.documentation.desc = Some(desc.to_string());
        self
    }

    pub fn extension(mut self, key: &str, value: Value) -> Self {
        self.documentation.extra.insert(key.to_string(), value);
        self
    }

    /// The key this field is presented under.
    pub fn key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Documentation metadata attached to an exposed field.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FieldDocumentation {
    /// Overrides the field's declared type.
    #[serde(default, rename = "type")]
    pub field_type: Option<TypeToken>,
    #[serde(default, alias = "description")]
    pub desc: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub values: Vec<Value>,
    #[serde(default)]
    pub example: Option<Value>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub format: Option<String>,
    /// Everything else; `x-` keys among these are vendor extensions.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl FieldDocumentation {
    pub fn extensions(&self) -> IndexMap<String, Value> {
        extensions_of(&self.extra)
    }
}

/// Keep only vendor-extension (`x-`) keys, in their declared order.
pub fn extensions_of(map: &IndexMap<String, Value>) -> IndexMap<String, Value> {
    map.iter()
        .filter(|(key, _)| key.starts_with("x-"))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// A declaratively described entity.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntityDef {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<ExposedField>,
}

impl EntityDef {
    pub fn new(name: &str, fields: Vec<ExposedField>) -> Self {
        Self {
            name: name.to_string(),
            fields,
        }
    }
}

impl Entity for EntityDef {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> &[ExposedField] {
        &self.fields
    }
}

/// Entities available to a build, looked up by name. Entities refer to each
/// other by name, so cyclic graphs need no shared ownership.
#[derive(Default)]
pub struct EntityCatalog {
    entities: IndexMap<String, Box<dyn Entity>>,
}

impl EntityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity, replacing any entity with the same name.
    pub fn register<E: Entity + 'static>(&mut self, entity: E) {
        self.register_boxed(Box::new(entity));
    }

    pub fn register_boxed(&mut self, entity: Box<dyn Entity>) {
        self.entities.insert(entity.name().to_string(), entity);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Entity> {
        self.entities.get(name).map(|e| e.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
