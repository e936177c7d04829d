use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

/// The primitive kind of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    File,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
            SchemaType::Boolean => "boolean",
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::File => "file",
        }
    }
}

/// A version-agnostic schema node.
///
/// Nodes carrying a `canonical_name` are reusable types: exporters emit them
/// once as a definition and refer to every occurrence through `$ref`. A node
/// holding nothing but a canonical name is a reference stub, produced when an
/// entity is reached again while (or after) it is being introspected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub canonical_name: Option<String>,
    pub schema_type: Option<SchemaType>,
    pub format: Option<String>,
    pub properties: IndexMap<String, Schema>,
    pub required: IndexSet<String>,
    pub items: Option<Box<Schema>>,
    /// Alternative single-type schemas for a value admitting several types.
    pub one_of: Vec<Schema>,
    pub description: Option<String>,
    pub nullable: bool,
    pub enum_values: Vec<Value>,
    pub default_value: Option<Value>,
    pub example: Option<Value>,
    pub extensions: IndexMap<String, Value>,
}

impl Schema {
    pub fn of(schema_type: SchemaType) -> Self {
        if schema_type == SchemaType::Array {
            return Self::array(Self::string());
        }
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    pub fn with_format(schema_type: SchemaType, format: &str) -> Self {
        Self {
            format: Some(format.to_string()),
            ..Self::of(schema_type)
        }
    }

    pub fn string() -> Self {
        Self::of(SchemaType::String)
    }

    pub fn object() -> Self {
        Self::of(SchemaType::Object)
    }

    pub fn array(items: Schema) -> Self {
        Self {
            schema_type: Some(SchemaType::Array),
            items: Some(Box::new(items)),
            ..Self::default()
        }
    }

    /// A schema admitting any of `variants`, kept in declaration order.
    pub fn one_of(variants: Vec<Schema>) -> Self {
        Self {
            one_of: variants,
            ..Self::default()
        }
    }

    /// A named object to be filled with properties.
    pub fn named_object(canonical_name: &str) -> Self {
        Self {
            canonical_name: Some(canonical_name.to_string()),
            ..Self::object()
        }
    }

    /// A stub that only points at a canonical name.
    pub fn reference(canonical_name: &str) -> Self {
        Self {
            canonical_name: Some(canonical_name.to_string()),
            ..Self::default()
        }
    }

    pub fn is_reference_stub(&self) -> bool {
        self.canonical_name.is_some() && self.schema_type.is_none() && self.one_of.is_empty()
    }

    pub fn is_type(&self, schema_type: SchemaType) -> bool {
        self.schema_type == Some(schema_type)
    }

    /// Add or replace a property, recording it as required when asked to.
    pub fn add_property(&mut self, name: &str, schema: Schema, required: bool) {
        self.properties.insert(name.to_string(), schema);
        if required {
            self.required.insert(name.to_string());
        } else {
            self.required.shift_remove(name);
        }
    }

    /// Splice the top-level properties and required entries of `other` into `self`.
    pub fn merge_properties(&mut self, other: &Schema) {
        for (name, prop) in &other.properties {
            self.properties.insert(name.clone(), prop.clone());
        }
        for name in &other.required {
            self.required.insert(name.clone());
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        if description.is_some() {
            self.description = description;
        }
        self
    }
}
