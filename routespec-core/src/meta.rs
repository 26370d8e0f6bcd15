use axum::http::Method;
use serde_json::{Map, Value};

use crate::config::OperationIdType;
use crate::model::ModelRef;
use crate::types::{RequestBody, ResponseSpec};

// ── Metadata types ──────────────────────────────────────────────────────────

/// Everything the document builder needs to know about one route.
#[derive(Debug, Clone)]
pub struct RouteDoc {
    /// Documented path, prefix included (`/api/user/{name}`).
    pub path: String,
    pub method: Method,
    pub operation_id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub deprecated: bool,
    pub extensions: Map<String, Value>,
    pub path_params: Vec<PathParam>,
    pub query: Option<ModelRef>,
    pub headers: Option<ModelRef>,
    pub cookies: Option<ModelRef>,
    pub body: Option<RequestBody>,
    pub responses: ResponseSpec,
}

/// A documented path variable.
#[derive(Debug, Clone, PartialEq)]
pub struct PathParam {
    pub name: String,
    pub schema: Value,
}

impl RouteDoc {
    /// Whether any request slot or the response carries a model.
    pub fn has_model(&self) -> bool {
        self.query.is_some()
            || self.headers.is_some()
            || self.cookies.is_some()
            || self.body.as_ref().is_some_and(|body| body.model().is_some())
            || self.responses.has_model()
    }

    /// All models this route references, request side first.
    pub fn models(&self) -> Vec<&ModelRef> {
        let mut models: Vec<&ModelRef> = [&self.query, &self.headers, &self.cookies]
            .into_iter()
            .filter_map(Option::as_ref)
            .collect();
        if let Some(model) = self.body.as_ref().and_then(RequestBody::model) {
            models.push(model);
        }
        models.extend(self.responses.models());
        models
    }
}

// ── Operation ids ───────────────────────────────────────────────────────────

/// Derive an operation id from a handler's type name.
///
/// Closures have no usable name; they fall back to method and path
/// (`get_api_user_name`).
pub fn operation_id_for(type_name: &str, kind: OperationIdType, method: &Method, path: &str) -> String {
    let last = type_name.rsplit("::").next().unwrap_or(type_name);
    if last.contains('{') || last.contains('<') || last.is_empty() {
        return fallback_operation_id(method, path);
    }
    match kind {
        OperationIdType::FunctionName => last.to_string(),
        OperationIdType::FullPath => type_name.replace("::", "."),
    }
}

fn fallback_operation_id(method: &Method, path: &str) -> String {
    let mut id = method.as_str().to_ascii_lowercase();
    for segment in path.split(|c: char| !c.is_ascii_alphanumeric()).filter(|s| !s.is_empty()) {
        id.push('_');
        id.push_str(segment);
    }
    id
}
