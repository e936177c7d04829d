//! Route manifests: a serialized list of route descriptors plus the entities
//! they refer to, as produced by whatever scanned the host application.

use indexmap::IndexSet;
use serde::Deserialize;

use crate::entity::EntityDef;
use crate::error::ManifestError;
use crate::generator::Generator;
use crate::route::RouteDescriptor;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub routes: Vec<RouteDescriptor>,
    #[serde(default)]
    pub entities: Vec<EntityDef>,
}

/// Parse a manifest from YAML.
pub fn from_yaml(input: &str) -> Result<Manifest, ManifestError> {
    let manifest: Manifest = serde_yaml_ng::from_str(input)?;
    validate(&manifest)?;
    Ok(manifest)
}

/// Parse a manifest from JSON.
pub fn from_json(input: &str) -> Result<Manifest, ManifestError> {
    let manifest: Manifest = serde_json::from_str(input)?;
    validate(&manifest)?;
    Ok(manifest)
}

fn validate(manifest: &Manifest) -> Result<(), ManifestError> {
    let mut names = IndexSet::new();
    for entity in &manifest.entities {
        if !names.insert(entity.name.as_str()) {
            return Err(ManifestError::DuplicateEntity(entity.name.clone()));
        }
    }
    Ok(())
}

impl Manifest {
    /// Hand the entities over to `generator`, keeping the routes.
    pub fn register_entities(&mut self, generator: &mut Generator) {
        for entity in self.entities.drain(..) {
            generator.register_entity(entity);
        }
    }
}
