use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::entity::extensions_of;
use crate::ir::{HttpMethod, SecurityRequirement};
use crate::resolve::TypeToken;

/// A normalized route, as handed over by whatever extracted it from the host
/// framework.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteDescriptor {
    pub path: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub params: IndexMap<String, ParamSpec>,
    /// Request headers declared at route level.
    #[serde(default)]
    pub headers: IndexMap<String, HeaderSpec>,
    /// Payload type of the success response.
    #[serde(default)]
    pub entity: Option<TypeToken>,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default)]
    pub default_status: Option<u16>,
    #[serde(default)]
    pub success_message: Option<String>,
    /// Additional (typically failure) responses.
    #[serde(default)]
    pub responses: Vec<ResponseSpec>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub body_description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub security: Vec<SecurityRequirement>,
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub consumes: Vec<String>,
    #[serde(default)]
    pub produces: Vec<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl RouteDescriptor {
    pub fn new(method: HttpMethod, path: &str) -> Self {
        Self {
            path: path.to_string(),
            method,
            params: IndexMap::new(),
            headers: IndexMap::new(),
            entity: None,
            is_array: false,
            default_status: None,
            success_message: None,
            responses: Vec::new(),
            summary: None,
            description: None,
            body_description: None,
            tags: Vec::new(),
            deprecated: false,
            hidden: false,
            security: Vec::new(),
            operation_id: None,
            consumes: Vec::new(),
            produces: Vec::new(),
            extra: IndexMap::new(),
        }
    }

    pub fn param(mut self, name: &str, spec: ParamSpec) -> Self {
        self.params.insert(name.to_string(), spec);
        self
    }

    pub fn entity(mut self, entity: &str) -> Self {
        self.entity = Some(TypeToken::parse(entity));
        self
    }

    pub fn response(mut self, response: ResponseSpec) -> Self {
        self.responses.push(response);
        self
    }

    pub fn extensions(&self) -> IndexMap<String, Value> {
        extensions_of(&self.extra)
    }

    /// Whether any visible parameter is declared as a form field.
    pub fn declares_form(&self) -> bool {
        self.params
            .values()
            .any(|spec| !spec.documentation.hidden && spec.is_form())
    }
}

/// A declared request parameter.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ParamSpec {
    #[serde(default, rename = "type")]
    pub param_type: Option<TypeToken>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default, alias = "description")]
    pub desc: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub values: Vec<Value>,
    #[serde(default)]
    pub documentation: ParamDocumentation,
}

impl ParamSpec {
    pub fn typed(param_type: &str) -> Self {
        Self {
            param_type: Some(TypeToken::parse(param_type)),
            ..Self::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = Some(true);
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = Some(false);
        self
    }

    pub fn located(mut self, location: &str) -> Self {
        self.documentation.param_type = Some(location.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.documentation.hidden = true;
        self
    }

    pub fn describe(mut self, desc: &str) -> Self {
        self.desc = Some(desc.to_string());
        self
    }

    pub fn collection_format(mut self, format: &str) -> Self {
        self.documentation.collection_format = Some(format.to_string());
        self
    }

    pub fn description(&self) -> Option<String> {
        self.desc.clone().or_else(|| self.documentation.desc.clone())
    }

    pub fn is_form(&self) -> bool {
        self.documentation
            .param_type
            .as_deref()
            .is_some_and(|hint| {
                matches!(hint.to_ascii_lowercase().as_str(), "formdata" | "form")
            })
    }
}

/// Documentation metadata of a parameter.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ParamDocumentation {
    /// Declared location: `path`, `query`, `header`, `body` or `formData`.
    #[serde(default, alias = "in")]
    pub param_type: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub collection_format: Option<String>,
    #[serde(default, alias = "description")]
    pub desc: Option<String>,
    #[serde(default)]
    pub example: Option<Value>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// A request or response header declaration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HeaderSpec {
    #[serde(default, alias = "desc")]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub header_type: Option<TypeToken>,
    #[serde(default)]
    pub required: bool,
}

/// A status code, given either as a number or as `default`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawCode")]
pub struct ResponseCode(pub String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCode {
    Number(u16),
    Text(String),
}

impl From<RawCode> for ResponseCode {
    fn from(raw: RawCode) -> Self {
        match raw {
            RawCode::Number(n) => ResponseCode(n.to_string()),
            RawCode::Text(s) => ResponseCode(s),
        }
    }
}

impl From<u16> for ResponseCode {
    fn from(code: u16) -> Self {
        ResponseCode(code.to_string())
    }
}

/// A declared response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseSpec {
    pub code: ResponseCode,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub model: Option<TypeToken>,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default)]
    pub headers: IndexMap<String, HeaderSpec>,
    #[serde(default)]
    pub examples: Option<Value>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl ResponseSpec {
    pub fn new(code: impl Into<ResponseCode>, message: &str) -> Self {
        Self {
            code: code.into(),
            message: Some(message.to_string()),
            model: None,
            is_array: false,
            headers: IndexMap::new(),
            examples: None,
            extra: IndexMap::new(),
        }
    }

    pub fn model(mut self, model: &str) -> Self {
        self.model = Some(TypeToken::parse(model));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_route() {
        let yaml = r#"
path: /items/:id
method: get
summary: Fetch an item
entity: Item
x-rate-limit: 10
params:
  id:
    type: [String, Integer]
    required: true
  fields:
    type: "[String]"
    documentation:
      in: query
      collection_format: multi
      x-example-note: comma free
responses:
  - code: 404
    message: Not found
  - code: default
    message: Unexpected
    model: Error
"#;
        let route: RouteDescriptor = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(route.method, HttpMethod::Get);
        assert_eq!(route.entity, Some(TypeToken::named("Item")));
        assert_eq!(
            route.params["id"].param_type,
            Some(TypeToken::OneOf(vec![
                TypeToken::named("String"),
                TypeToken::named("Integer")
            ]))
        );
        let fields = &route.params["fields"].documentation;
        assert_eq!(fields.param_type.as_deref(), Some("query"));
        assert_eq!(fields.collection_format.as_deref(), Some("multi"));
        assert!(fields.extra.contains_key("x-example-note"));
        assert_eq!(route.responses[0].code, ResponseCode("404".to_string()));
        assert_eq!(route.responses[1].code, ResponseCode("default".to_string()));
        assert_eq!(route.extensions().len(), 1);
    }
}
