use std::collections::HashMap;

use indexmap::IndexMap;
use log::debug;

use super::token::TypeToken;
use super::ResolverRegistry;
use crate::entity::EntityCatalog;
use crate::ir::Schema;

/// Introspection progress of one entity within a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    Unvisited,
    InProgress,
    Complete,
}

/// Mutable state of a single build run.
///
/// Holds the visit state of every entity touched so far and the full schema
/// of every entity that finished introspection. A context is created per run
/// and never shared.
pub struct BuildContext<'a> {
    resolvers: &'a ResolverRegistry,
    entities: &'a EntityCatalog,
    states: HashMap<String, VisitState>,
    definitions: IndexMap<String, Schema>,
}

impl<'a> BuildContext<'a> {
    pub fn new(resolvers: &'a ResolverRegistry, entities: &'a EntityCatalog) -> Self {
        Self {
            resolvers,
            entities,
            states: HashMap::new(),
            definitions: IndexMap::new(),
        }
    }

    pub fn resolvers(&self) -> &'a ResolverRegistry {
        self.resolvers
    }

    pub fn entities(&self) -> &'a EntityCatalog {
        self.entities
    }

    /// Run the resolver chain on `token`.
    pub fn resolve(&mut self, token: &TypeToken) -> Option<Schema> {
        let resolvers = self.resolvers;
        resolvers.resolve(token, self)
    }

    /// Run the resolver chain, falling back to a string schema on a miss.
    pub fn resolve_or_default(&mut self, token: &TypeToken) -> Schema {
        self.resolve(token).unwrap_or_else(|| {
            debug!("no resolver for type '{token}', using string");
            Schema::string()
        })
    }

    pub fn visit_state(&self, name: &str) -> VisitState {
        self.states
            .get(name)
            .copied()
            .unwrap_or(VisitState::Unvisited)
    }

    pub(crate) fn begin(&mut self, name: &str) {
        self.states.insert(name.to_string(), VisitState::InProgress);
    }

    pub(crate) fn complete(&mut self, name: &str, schema: Schema) {
        self.states.insert(name.to_string(), VisitState::Complete);
        self.definitions.insert(name.to_string(), schema);
    }

    /// Full schema of a completed entity.
    pub fn definition(&self, name: &str) -> Option<&Schema> {
        self.definitions.get(name)
    }

    pub fn into_definitions(self) -> IndexMap<String, Schema> {
        self.definitions
    }
}
