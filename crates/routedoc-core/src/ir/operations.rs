use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use super::schemas::Schema;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Trace => "TRACE",
        }
    }

    /// Lowercase form, used as the path item key.
    pub fn key(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Trace => "trace",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "OPTIONS" => Ok(HttpMethod::Options),
            "HEAD" => Ok(HttpMethod::Head),
            "TRACE" => Ok(HttpMethod::Trace),
            other => Err(format!("unknown HTTP method: {other}")),
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Parameter location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Body => "body",
        }
    }

    /// Parse a declared location hint. Form locations collapse into the body.
    pub fn parse(hint: &str) -> Option<Self> {
        match hint.to_ascii_lowercase().as_str() {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "body" | "formdata" | "form" => Some(ParameterLocation::Body),
            _ => None,
        }
    }
}

/// How an array-valued parameter is serialized on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionFormat {
    Csv,
    Ssv,
    Tsv,
    Pipes,
    Multi,
}

impl CollectionFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionFormat::Csv => "csv",
            CollectionFormat::Ssv => "ssv",
            CollectionFormat::Tsv => "tsv",
            CollectionFormat::Pipes => "pipes",
            CollectionFormat::Multi => "multi",
        }
    }

    pub fn parse(hint: &str) -> Option<Self> {
        match hint.to_ascii_lowercase().as_str() {
            "csv" => Some(CollectionFormat::Csv),
            "ssv" => Some(CollectionFormat::Ssv),
            "tsv" => Some(CollectionFormat::Tsv),
            "pipes" => Some(CollectionFormat::Pipes),
            "multi" => Some(CollectionFormat::Multi),
            _ => None,
        }
    }
}

/// A path/query/header parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Schema,
    pub description: Option<String>,
    pub collection_format: Option<CollectionFormat>,
    pub example: Option<Value>,
    pub extensions: IndexMap<String, Value>,
}

/// One content type of a request body.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaType {
    pub mime: String,
    pub schema: Schema,
    pub example: Option<Value>,
}

/// The single request body of an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    pub description: Option<String>,
    pub required: bool,
    pub content: Vec<MediaType>,
}

/// A response header.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub description: Option<String>,
    pub schema: Schema,
}

/// A response keyed by its status code.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub code: String,
    pub description: String,
    pub schema: Option<Schema>,
    pub headers: IndexMap<String, Header>,
    pub examples: Option<Value>,
    pub extensions: IndexMap<String, Value>,
}

/// Scheme name to required scopes.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// A single HTTP operation on a path.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub method: HttpMethod,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    pub tags: Vec<String>,
    pub security: Vec<SecurityRequirement>,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    pub responses: IndexMap<String, Response>,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    pub extensions: IndexMap<String, Value>,
}

impl Operation {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            operation_id: None,
            summary: None,
            description: None,
            deprecated: false,
            tags: Vec::new(),
            security: Vec::new(),
            parameters: Vec::new(),
            request_body: None,
            responses: IndexMap::new(),
            consumes: Vec::new(),
            produces: Vec::new(),
            extensions: IndexMap::new(),
        }
    }

    /// Insert a response, keeping the mapping ordered by status code.
    pub fn insert_response(&mut self, response: Response) {
        self.responses.insert(response.code.clone(), response);
        self.responses
            .sort_by(|a, _, b, _| status_rank(a).cmp(&status_rank(b)));
    }
}

/// Normalize a status code: trimmed, `default` lowercased.
pub fn normalize_status(code: &str) -> String {
    let trimmed = code.trim();
    if trimmed.eq_ignore_ascii_case("default") {
        "default".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Numeric codes ascending, everything else after them.
fn status_rank(code: &str) -> (u8, u16) {
    match code.parse::<u16>() {
        Ok(n) => (0, n),
        Err(_) => (1, 0),
    }
}
