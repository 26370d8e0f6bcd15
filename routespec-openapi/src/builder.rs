use axum::http::Method;
use routespec_core::config::SpecConfig;
use routespec_core::meta::RouteDoc;
use routespec_core::model::ModelRef;
use routespec_core::schema::{component_ref, openapi_schema, SchemaRegistry};
use routespec_core::types::{
    status_description, RequestBody, ResponseModel, ResponseSpec, APPLICATION_JSON, MULTIPART_FORM_DATA,
    OCTET_STREAM,
};
use serde_json::{json, Map, Value};

/// Collect the component schemas of every model the routes reference.
pub fn collect_schemas<'a>(routes: impl IntoIterator<Item = &'a RouteDoc>) -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    for route in routes {
        for model in route.models() {
            registry.register_model(model);
        }
    }
    registry
}

/// Convert a snake_case identifier to lower camel case (`get_user` → `getUser`).
pub fn camelize(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    let mut upper = false;
    for c in id.chars() {
        if c == '_' && !out.is_empty() {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    let mut chars = out.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => out,
    }
}

/// Whether routes with this method are documented.
fn documented(method: &Method) -> bool {
    *method != Method::HEAD && *method != Method::OPTIONS
}

/// Build the OpenAPI JSON document from config and route metadata.
pub fn build_spec(config: &SpecConfig, routes: &[RouteDoc]) -> Value {
    let routes: Vec<&RouteDoc> = routes.iter().filter(|r| documented(&r.method)).collect();

    let mut paths: Map<String, Value> = Map::new();
    let mut parameter_components: Map<String, Value> = Map::new();
    let mut tag_names: Vec<&str> = Vec::new();

    for route in &routes {
        for tag in &route.tags {
            if !tag_names.contains(&tag.as_str()) {
                tag_names.push(tag.as_str());
            }
        }

        let operation = build_operation(config, route, &mut parameter_components);
        let path_entry = paths.entry(route.path.clone()).or_insert_with(|| json!({}));
        if let Some(obj) = path_entry.as_object_mut() {
            obj.insert(route.method.as_str().to_lowercase(), Value::Object(operation));
        }
    }

    let mut info = config.info.clone();
    info.insert("title".into(), json!(config.title));
    info.insert("version".into(), json!(config.version));

    let mut tags: Vec<Value> = tag_names
        .iter()
        .map(|name| {
            config
                .tags
                .iter()
                .find(|tag| tag.name == *name)
                .map(|tag| tag.to_json())
                .unwrap_or_else(|| json!({ "name": name }))
        })
        .collect();
    tags.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

    let schemas = collect_schemas(routes.iter().copied());

    let mut components: Map<String, Value> = Map::new();
    components.insert("schemas".into(), Value::Object(schemas.into_components()));
    if !parameter_components.is_empty() {
        components.insert("parameters".into(), Value::Object(parameter_components));
    }
    if let Some(ref schemes) = config.security_schemes {
        components.insert("securitySchemes".into(), schemes.clone());
    }

    let mut spec: Map<String, Value> = Map::new();
    spec.insert("openapi".into(), json!(config.openapi_version));
    spec.insert("info".into(), Value::Object(info));
    spec.insert("tags".into(), Value::Array(tags));
    spec.insert("paths".into(), Value::Object(paths));
    spec.insert("components".into(), Value::Object(components));
    if let Some(ref servers) = config.servers {
        spec.insert("servers".into(), servers.clone());
    }
    if let Some(ref security) = config.security {
        spec.insert("security".into(), security.clone());
    }
    Value::Object(spec)
}

fn build_operation(config: &SpecConfig, route: &RouteDoc, parameter_components: &mut Map<String, Value>) -> Map<String, Value> {
    let mut operation: Map<String, Value> = Map::new();

    let summary = route
        .summary
        .clone()
        .unwrap_or_else(|| format!("{} <{}>", route.operation_id, route.method.as_str()));
    operation.insert("summary".into(), json!(summary));
    operation.insert("operationId".into(), json!(camelize(&route.operation_id)));
    operation.insert("description".into(), json!(route.description.clone().unwrap_or_default()));
    operation.insert("tags".into(), json!(route.tags));

    // Parameters: path variables first, then query, header and cookie models
    let mut parameters: Vec<Value> = route
        .path_params
        .iter()
        .map(|p| {
            json!({
                "name": p.name,
                "in": "path",
                "required": true,
                "schema": p.schema,
            })
        })
        .collect();

    let slots = [(&route.query, "query"), (&route.headers, "header"), (&route.cookies, "cookie")];
    for (model, location) in slots {
        let Some(model) = model else { continue };
        if config.inline_definitions {
            parameters.extend(inline_parameters(model, location));
        } else {
            parameter_components.insert(
                model.name().to_string(),
                json!({
                    "name": model.name(),
                    "in": location,
                    "schema": component_ref(model.name()),
                }),
            );
            parameters.push(json!({ "$ref": format!("#/components/parameters/{}", model.name()) }));
        }
    }
    operation.insert("parameters".into(), Value::Array(parameters));

    operation.insert("responses".into(), Value::Object(build_responses(config, route)));

    if route.deprecated {
        operation.insert("deprecated".into(), json!(true));
    }

    for (key, value) in &route.extensions {
        operation.insert(key.clone(), value.clone());
    }

    if let Some(ref body) = route.body {
        operation.insert("requestBody".into(), build_request_body(body));
    }

    operation
}

/// One parameter per model property, `required` taken from the model.
fn inline_parameters(model: &ModelRef, location: &str) -> Vec<Value> {
    let schema = openapi_schema(&model.schema());
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| {
            properties
                .iter()
                .map(|(name, property)| {
                    json!({
                        "name": name,
                        "in": location,
                        "schema": property,
                        "required": required.contains(&name.as_str()),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn response_schema(declared: &ResponseModel) -> Value {
    let reference = component_ref(declared.model.name());
    if declared.is_list {
        json!({ "type": "array", "items": reference })
    } else {
        reference
    }
}

fn build_responses(config: &SpecConfig, route: &RouteDoc) -> Map<String, Value> {
    let mut responses: Map<String, Value> = Map::new();

    match &route.responses {
        ResponseSpec::Json(declared) => {
            for status in declared.bare_codes() {
                responses.insert(
                    status.as_u16().to_string(),
                    json!({ "description": status_description(*status) }),
                );
            }
            for (status, model) in declared.model_codes() {
                responses.insert(
                    status.as_u16().to_string(),
                    json!({
                        "description": status_description(*status),
                        "content": { APPLICATION_JSON: { "schema": response_schema(model) } }
                    }),
                );
            }
        }
        ResponseSpec::File(file) => {
            responses.insert(
                "200".into(),
                json!({
                    "description": "OK",
                    "content": { file.content_type.clone(): { "schema": { "type": "string", "format": "binary" } } }
                }),
            );
            responses.insert("404".into(), json!({ "description": "Not Found" }));
        }
    }

    let code = config.validation_error_code.to_string();
    if route.has_model() && !responses.contains_key(&code) {
        responses.insert(code, json!({ "description": "Validation Error" }));
    }

    responses
}

fn build_request_body(body: &RequestBody) -> Value {
    match body {
        RequestBody::Single(request) => {
            let schema = match (&request.model, request.content_type.as_str()) {
                (_, OCTET_STREAM) | (None, _) => json!({ "type": "string", "format": request.encoding }),
                (Some(model), _) => component_ref(model.name()),
            };
            json!({ "content": { request.content_type.clone(): { "schema": schema } } })
        }
        RequestBody::Multipart(multipart) => {
            let mut properties = multipart
                .model
                .as_ref()
                .and_then(|model| {
                    model
                        .schema()
                        .get("properties")
                        .and_then(Value::as_object)
                        .cloned()
                })
                .unwrap_or_default();
            properties.insert(
                multipart.file_key.clone(),
                json!({ "type": "string", "format": multipart.encoding }),
            );
            let schema = openapi_schema(&json!({ "type": "object", "properties": properties }));
            json!({ "content": { MULTIPART_FORM_DATA: { "schema": schema } } })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camelize_operation_ids() {
        assert_eq!(camelize("get_user"), "getUser");
        assert_eq!(camelize("lone_post"), "lonePost");
        assert_eq!(camelize("Predict"), "predict");
        assert_eq!(camelize("demo.handlers.get_user"), "demo.handlers.getUser");
        assert_eq!(camelize("_private"), "_private");
    }
}
