use indexmap::IndexMap;
use serde_json::Value;

use super::operations::{HttpMethod, Operation};
use super::schemas::Schema;

/// Root of the intermediate representation. One per generation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Api {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    pub host: Option<String>,
    pub base_path: Option<String>,
    pub schemes: Vec<String>,
    pub tags: Vec<Tag>,
    pub paths: Vec<Path>,
    /// Security scheme objects, passed through to the document verbatim.
    pub security_schemes: IndexMap<String, Value>,
    /// Full schemas of every named type, keyed by canonical name.
    pub definitions: IndexMap<String, Schema>,
}

impl Api {
    pub fn new(title: &str, version: &str) -> Self {
        Self {
            title: title.to_string(),
            version: version.to_string(),
            ..Self::default()
        }
    }

    /// Get the path item for `template`, creating it at the end if missing.
    pub fn path_mut(&mut self, template: &str) -> &mut Path {
        let index = match self.paths.iter().position(|p| p.template == template) {
            Some(index) => index,
            None => {
                self.paths.push(Path::new(template));
                self.paths.len() - 1
            }
        };
        &mut self.paths[index]
    }

    pub fn path(&self, template: &str) -> Option<&Path> {
        self.paths.iter().find(|p| p.template == template)
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.paths.iter().flat_map(|p| p.operations.values())
    }
}

/// A URL template and the operations mounted on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub template: String,
    pub operations: IndexMap<HttpMethod, Operation>,
}

impl Path {
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
            operations: IndexMap::new(),
        }
    }
}

/// Tag definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_mut_reuses_existing_template() {
        let mut api = Api::new("Test", "1.0");
        api.path_mut("/items")
            .operations
            .insert(HttpMethod::Get, Operation::new(HttpMethod::Get));
        api.path_mut("/items/{id}");
        api.path_mut("/items")
            .operations
            .insert(HttpMethod::Post, Operation::new(HttpMethod::Post));

        assert_eq!(api.paths.len(), 2);
        assert_eq!(api.paths[0].operations.len(), 2);
        assert_eq!(api.operations().count(), 2);
    }
}
