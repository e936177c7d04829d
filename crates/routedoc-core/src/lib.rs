//! Route descriptors in, OpenAPI documents out.
//!
//! Routes are built into a version-agnostic IR ([`ir::Api`]) through an
//! ordered chain of type resolvers and an entity introspector, then rendered
//! by the exporter registered for the requested version (2.0, 3.0 or 3.1).

pub mod config;
pub mod entity;
pub mod error;
pub mod export;
pub mod generator;
pub mod ir;
pub mod manifest;
pub mod resolve;
pub mod route;

pub use generator::Generator;
