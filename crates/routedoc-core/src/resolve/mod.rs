//! Type resolution: an ordered chain of strategies turning [`TypeToken`]s
//! into schema nodes. The first resolver that handles a token wins.

pub mod builtin;
pub mod context;
pub mod primitive;
pub mod token;

use log::debug;

use crate::error::ConfigError;
use crate::ir::Schema;

pub use builtin::{ArrayResolver, EntityResolver, OneOfResolver};
pub use context::{BuildContext, VisitState};
pub use primitive::PrimitiveResolver;
pub use token::TypeToken;

/// A strategy converting some type tokens into schemas.
///
/// Resolvers are identified by [`TypeResolver::name`]; the registry uses the
/// name for ordering and to keep registration idempotent.
pub trait TypeResolver: Send + Sync {
    fn name(&self) -> &str;

    fn handles(&self, token: &TypeToken, cx: &BuildContext<'_>) -> bool;

    fn build_schema(&self, token: &TypeToken, cx: &mut BuildContext<'_>) -> Schema;
}

/// Where a resolver is inserted into the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position<'a> {
    Front,
    Back,
    Before(&'a str),
    After(&'a str),
}

/// Ordered resolver chain.
pub struct ResolverRegistry {
    resolvers: Vec<Box<dyn TypeResolver>>,
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverRegistry {
    /// The built-in chain: `array`, `one_of`, `entity`, `primitive`.
    pub fn new() -> Self {
        Self {
            resolvers: vec![
                Box::new(ArrayResolver),
                Box::new(OneOfResolver),
                Box::new(EntityResolver),
                Box::new(PrimitiveResolver),
            ],
        }
    }

    /// A chain with no resolvers at all; every lookup misses.
    pub fn empty() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// Insert `resolver` at `position`. Registering a name that is already
    /// present leaves the chain untouched.
    pub fn register(
        &mut self,
        resolver: Box<dyn TypeResolver>,
        position: Position<'_>,
    ) -> Result<(), ConfigError> {
        if self.contains(resolver.name()) {
            debug!("resolver '{}' already registered", resolver.name());
            return Ok(());
        }
        let index = match position {
            Position::Front => 0,
            Position::Back => self.resolvers.len(),
            Position::Before(anchor) => self.index_of(anchor)?,
            Position::After(anchor) => self.index_of(anchor)? + 1,
        };
        self.resolvers.insert(index, resolver);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Option<Box<dyn TypeResolver>> {
        let index = self.resolvers.iter().position(|r| r.name() == name)?;
        Some(self.resolvers.remove(index))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolvers.iter().any(|r| r.name() == name)
    }

    /// Resolver names in chain order.
    pub fn names(&self) -> Vec<&str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    /// Resolve `token` with the first resolver that handles it. `None` means
    /// no resolver matched; callers fall back instead of failing.
    pub fn resolve(&self, token: &TypeToken, cx: &mut BuildContext<'_>) -> Option<Schema> {
        let resolver = self.resolvers.iter().find(|r| r.handles(token, cx))?;
        Some(resolver.build_schema(token, cx))
    }

    fn index_of(&self, name: &str) -> Result<usize, ConfigError> {
        self.resolvers
            .iter()
            .position(|r| r.name() == name)
            .ok_or_else(|| ConfigError::UnknownResolver(name.to_string()))
    }
}
