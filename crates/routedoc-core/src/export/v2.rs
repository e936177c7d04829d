use serde_json::{Map, Value};

use super::walk::insert_some;
use super::{BodyPlacement, Exporter, RenderedHeader, RenderedMedia};
use crate::ir::{Api, Operation, Parameter, RequestBody, Response};

/// Swagger 2.0.
///
/// No `oneOf`: multi-type schemas keep their first declared type. Request
/// bodies become a single `in: body` parameter, or `formData` parameters
/// when the body carries files or is form encoded.
pub struct SwaggerExporter;

impl Exporter for SwaggerExporter {
    fn version(&self) -> &'static str {
        "2.0"
    }

    fn header(&self, api: &Api) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert("swagger".into(), self.version().into());
        doc.insert("info".into(), info(api));
        insert_some(&mut doc, "host", api.host.clone());
        insert_some(&mut doc, "basePath", api.base_path.clone());
        if !api.schemes.is_empty() {
            doc.insert("schemes".into(), api.schemes.clone().into());
        }
        doc
    }

    fn ref_prefix(&self) -> &'static str {
        "#/definitions/"
    }

    fn finish(
        &self,
        doc: &mut Map<String, Value>,
        definitions: Map<String, Value>,
        security_schemes: Map<String, Value>,
    ) {
        if !definitions.is_empty() {
            doc.insert("definitions".into(), Value::Object(definitions));
        }
        if !security_schemes.is_empty() {
            doc.insert("securityDefinitions".into(), Value::Object(security_schemes));
        }
    }

    fn nullable(&self, schema: &mut Map<String, Value>) {
        schema.insert("x-nullable".into(), Value::Bool(true));
    }

    fn supports_one_of(&self) -> bool {
        false
    }

    fn file_schema(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("type".into(), "file".into());
        out
    }

    fn parameter(&self, param: &Parameter, schema: Value) -> Option<Map<String, Value>> {
        let mut out = Map::new();
        out.insert("name".into(), param.name.clone().into());
        out.insert("in".into(), param.location.as_str().into());
        insert_some(&mut out, "description", param.description.clone());
        out.insert("required".into(), param.required.into());
        out.insert("schema".into(), schema);
        insert_some(
            &mut out,
            "collectionFormat",
            param.collection_format.map(|format| format.as_str()),
        );
        insert_some(&mut out, "x-example", param.example.clone());
        Some(out)
    }

    fn request_body(&self, body: &RequestBody, content: Vec<RenderedMedia>) -> BodyPlacement {
        let Some(media) = content.into_iter().next() else {
            return BodyPlacement::Parameters(Vec::new());
        };
        if is_form(&media.mime) || has_file_property(&media.schema) {
            return BodyPlacement::Parameters(form_parameters(&media.schema));
        }

        let mut out = Map::new();
        out.insert("name".into(), "body".into());
        out.insert("in".into(), "body".into());
        insert_some(&mut out, "description", body.description.clone());
        out.insert("required".into(), body.required.into());
        out.insert("schema".into(), media.schema);
        BodyPlacement::Parameters(vec![Value::Object(out)])
    }

    fn response(
        &self,
        response: &Response,
        schema: Option<Value>,
        headers: Vec<(String, RenderedHeader)>,
        produces: &[String],
    ) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("description".into(), response.description.clone().into());
        insert_some(&mut out, "schema", schema);
        if !headers.is_empty() {
            let headers = headers
                .into_iter()
                .map(|(name, header)| {
                    let mut rendered = Map::new();
                    insert_some(&mut rendered, "description", header.description);
                    flatten_into(&mut rendered, header.schema);
                    (name, Value::Object(rendered))
                })
                .collect();
            out.insert("headers".into(), Value::Object(headers));
        }
        if let (Some(examples), Some(mime)) = (&response.examples, produces.first()) {
            let mut by_mime = Map::new();
            by_mime.insert(mime.clone(), examples.clone());
            out.insert("examples".into(), Value::Object(by_mime));
        }
        out
    }

    fn operation_media(&self, op: &Operation, out: &mut Map<String, Value>) {
        if !op.consumes.is_empty() {
            out.insert("consumes".into(), op.consumes.clone().into());
        }
        if !op.produces.is_empty() {
            out.insert("produces".into(), op.produces.clone().into());
        }
    }
}

pub(crate) fn info(api: &Api) -> Value {
    let mut info = Map::new();
    info.insert("title".into(), api.title.clone().into());
    insert_some(&mut info, "description", api.description.clone());
    info.insert("version".into(), api.version.clone().into());
    Value::Object(info)
}

fn is_form(mime: &str) -> bool {
    matches!(
        mime,
        "multipart/form-data" | "application/x-www-form-urlencoded"
    )
}

fn has_file_property(schema: &Value) -> bool {
    schema
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|props| {
            props
                .values()
                .any(|prop| prop.get("type").and_then(Value::as_str) == Some("file"))
        })
}

/// One `formData` parameter per top-level property of the body object.
fn form_parameters(schema: &Value) -> Vec<Value> {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };

    properties
        .iter()
        .map(|(name, prop)| {
            let mut out = Map::new();
            out.insert("name".into(), name.clone().into());
            out.insert("in".into(), "formData".into());
            out.insert("required".into(), required.contains(&name.as_str()).into());
            flatten_into(&mut out, prop.clone());
            Value::Object(out)
        })
        .collect()
}

fn flatten_into(out: &mut Map<String, Value>, schema: Value) {
    if let Value::Object(fields) = schema {
        for (key, value) in fields {
            out.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::export;
    use crate::ir::{
        CollectionFormat, Header, HttpMethod, MediaType, ParameterLocation, Schema, SchemaType,
    };
    use indexmap::IndexMap;
    use serde_json::json;

    fn param(name: &str, location: ParameterLocation, schema: Schema) -> Parameter {
        Parameter {
            name: name.to_string(),
            location,
            required: location == ParameterLocation::Path,
            schema,
            description: None,
            collection_format: None,
            example: None,
            extensions: IndexMap::new(),
        }
    }

    fn response(code: &str, schema: Option<Schema>) -> Response {
        Response {
            code: code.to_string(),
            description: "OK".to_string(),
            schema,
            headers: IndexMap::new(),
            examples: None,
            extensions: IndexMap::new(),
        }
    }

    fn document(op: Operation) -> Value {
        let mut api = Api::new("Shop", "2.1");
        api.host = Some("api.example.com".to_string());
        api.base_path = Some("/v1".to_string());
        api.schemes = vec!["https".to_string()];
        api.path_mut("/items/{id}").operations.insert(op.method, op);
        export(&api, &SwaggerExporter).unwrap()
    }

    #[test]
    fn test_header() {
        let doc = document(Operation::new(HttpMethod::Get));
        assert_eq!(doc["swagger"], json!("2.0"));
        assert_eq!(doc["info"], json!({"title": "Shop", "version": "2.1"}));
        assert_eq!(doc["host"], json!("api.example.com"));
        assert_eq!(doc["basePath"], json!("/v1"));
        assert_eq!(doc["schemes"], json!(["https"]));
        assert!(doc.get("definitions").is_none());
    }

    #[test]
    fn test_multi_type_keeps_first() {
        let mut op = Operation::new(HttpMethod::Get);
        op.parameters.push(param(
            "id",
            ParameterLocation::Path,
            Schema::one_of(vec![Schema::string(), Schema::of(SchemaType::Integer)]),
        ));
        let doc = document(op);
        let rendered = &doc["paths"]["/items/{id}"]["get"]["parameters"][0];
        assert_eq!(rendered["in"], json!("path"));
        assert_eq!(rendered["required"], json!(true));
        assert_eq!(rendered["schema"], json!({"type": "string"}));
    }

    #[test]
    fn test_collection_format_and_nullable() {
        let mut op = Operation::new(HttpMethod::Get);
        let mut tags = param("tags", ParameterLocation::Query, Schema::array(Schema::string()));
        tags.collection_format = Some(CollectionFormat::Multi);
        op.parameters.push(tags);
        let mut since = Schema::with_format(SchemaType::String, "date");
        since.nullable = true;
        op.parameters.push(param("since", ParameterLocation::Query, since));

        let doc = document(op);
        let params = &doc["paths"]["/items/{id}"]["get"]["parameters"];
        assert_eq!(params[0]["collectionFormat"], json!("multi"));
        assert_eq!(
            params[1]["schema"],
            json!({"type": "string", "format": "date", "x-nullable": true})
        );
    }

    #[test]
    fn test_body_parameter() {
        let mut op = Operation::new(HttpMethod::Put);
        let mut schema = Schema::object();
        schema.add_property("name", Schema::string(), true);
        op.request_body = Some(RequestBody {
            description: Some("Item".to_string()),
            required: true,
            content: vec![MediaType {
                mime: "application/json".to_string(),
                schema,
                example: None,
            }],
        });
        let doc = document(op);
        let body = &doc["paths"]["/items/{id}"]["put"]["parameters"][0];
        assert_eq!(body["in"], json!("body"));
        assert_eq!(body["name"], json!("body"));
        assert_eq!(body["required"], json!(true));
        assert_eq!(body["schema"]["required"], json!(["name"]));
    }

    #[test]
    fn test_file_body_becomes_form_data() {
        let mut op = Operation::new(HttpMethod::Post);
        let mut schema = Schema::object();
        schema.add_property("upload", Schema::of(SchemaType::File), true);
        schema.add_property("note", Schema::string(), false);
        op.request_body = Some(RequestBody {
            description: None,
            required: true,
            content: vec![MediaType {
                mime: "application/json".to_string(),
                schema,
                example: None,
            }],
        });
        let doc = document(op);
        let params = &doc["paths"]["/items/{id}"]["post"]["parameters"];
        assert_eq!(
            params[0],
            json!({"name": "upload", "in": "formData", "required": true, "type": "file"})
        );
        assert_eq!(params[1]["required"], json!(false));
    }

    #[test]
    fn test_response_with_headers_and_examples() {
        let mut op = Operation::new(HttpMethod::Get);
        op.produces = vec!["application/json".to_string()];
        let mut ok = response("200", Some(Schema::string()));
        ok.headers.insert(
            "X-Rate-Limit".to_string(),
            Header {
                description: Some("Calls left".to_string()),
                schema: Schema::of(SchemaType::Integer),
            },
        );
        ok.examples = Some(json!("hello"));
        op.insert_response(ok);

        let doc = document(op);
        let rendered = &doc["paths"]["/items/{id}"]["get"];
        assert_eq!(rendered["produces"], json!(["application/json"]));
        let ok = &rendered["responses"]["200"];
        assert_eq!(ok["schema"], json!({"type": "string"}));
        assert_eq!(
            ok["headers"]["X-Rate-Limit"],
            json!({"description": "Calls left", "type": "integer"})
        );
        assert_eq!(ok["examples"], json!({"application/json": "hello"}));
    }
}
