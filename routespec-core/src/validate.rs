use std::sync::Arc;

use axum::http::Method;
use axum::response::Response as HttpResponse;
use serde_json::{Map, Value};

use crate::converter::ConverterRegistry;
use crate::error::{SpecError, ValidationError};
use crate::hooks::{AfterHook, BeforeHook, RequestHead};
use crate::meta::{PathParam, RouteDoc};
use crate::model::{Model, ModelRef};
use crate::rule::ParsedRule;
use crate::types::{Request, RequestBody, ResponseSpec};

/// Declaration of one route: what it accepts, what it returns, how it is documented.
///
/// ```ignore
/// Validate::new(Response::new().model::<Resp>(StatusCode::OK))
///     .query::<Query>()
///     .json::<Data>()
///     .tags(["api"])
///     .doc("Predict\n\nRuns the model on the given input.")
/// ```
#[derive(Clone)]
pub struct Validate {
    pub(crate) query: Option<ModelRef>,
    pub(crate) body: Option<RequestBody>,
    pub(crate) headers: Option<ModelRef>,
    pub(crate) cookies: Option<ModelRef>,
    pub(crate) resp: ResponseSpec,
    pub(crate) tags: Vec<String>,
    pub(crate) deprecated: bool,
    pub(crate) before: Option<BeforeHook>,
    pub(crate) after: Option<AfterHook>,
    pub(crate) extensions: Map<String, Value>,
    pub(crate) summary: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) operation_id: Option<String>,
}

impl Validate {
    pub fn new(resp: impl Into<ResponseSpec>) -> Self {
        Self {
            query: None,
            body: None,
            headers: None,
            cookies: None,
            resp: resp.into(),
            tags: Vec::new(),
            deprecated: false,
            before: None,
            after: None,
            extensions: Map::new(),
            summary: None,
            description: None,
            operation_id: None,
        }
    }

    pub fn query<T: Model>(mut self) -> Self {
        self.query = Some(ModelRef::of::<T>());
        self
    }

    /// Any request body: [`Request`] or [`MultipartFormRequest`](crate::types::MultipartFormRequest).
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Shorthand for a JSON body of `T`.
    pub fn json<T: Model>(self) -> Self {
        self.body(Request::json::<T>())
    }

    pub fn headers<T: Model>(mut self) -> Self {
        self.headers = Some(ModelRef::of::<T>());
        self
    }

    pub fn cookies<T: Model>(mut self) -> Self {
        self.cookies = Some(ModelRef::of::<T>());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Replace the spec-wide before hook for this route.
    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RequestHead, Option<&mut HttpResponse>, Option<&ValidationError>) + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(hook));
        self
    }

    /// Replace the spec-wide after hook for this route.
    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RequestHead, &mut HttpResponse, Option<&ValidationError>) + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(hook));
        self
    }

    /// Add a vendor extension to the operation. Keys must start with `x-`.
    pub fn extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<Self, SpecError> {
        let key = key.into();
        if !key.starts_with("x-") {
            return Err(SpecError::InvalidExtension(key));
        }
        self.extensions.insert(key, value.into());
        Ok(self)
    }

    /// Set summary and description from a doc text.
    ///
    /// The first line is the summary, the rest (trimmed) the description.
    pub fn doc(mut self, text: &str) -> Self {
        let text = text.trim();
        let (summary, rest) = text.split_once('\n').unwrap_or((text, ""));
        let summary = summary.trim();
        let rest = rest.trim();
        if !summary.is_empty() {
            self.summary = Some(summary.to_string());
        }
        if !rest.is_empty() {
            self.description = Some(rest.to_string());
        }
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    /// Whether any request slot or the response carries a model.
    pub fn has_model(&self) -> bool {
        self.query.is_some()
            || self.headers.is_some()
            || self.cookies.is_some()
            || self.body.as_ref().is_some_and(|body| body.model().is_some())
            || self.resp.has_model()
    }

    pub fn response(&self) -> &ResponseSpec {
        &self.resp
    }

    /// Build the document entry for this declaration mounted at `rule`.
    ///
    /// `operation_id` is used unless one was set explicitly.
    pub fn route_doc(
        &self,
        rule: &ParsedRule,
        prefix: &str,
        method: Method,
        operation_id: String,
        converters: &ConverterRegistry,
    ) -> RouteDoc {
        let path_params = rule
            .variables
            .iter()
            .map(|var| PathParam {
                name: var.name.clone(),
                schema: converters.schema(var),
            })
            .collect();

        RouteDoc {
            path: format!("{prefix}{}", rule.openapi_path),
            method,
            operation_id: self.operation_id.clone().unwrap_or(operation_id),
            summary: self.summary.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            deprecated: self.deprecated,
            extensions: self.extensions.clone(),
            path_params,
            query: self.query.clone(),
            headers: self.headers.clone(),
            cookies: self.cookies.clone(),
            body: self.body.clone(),
            responses: self.resp.clone(),
        }
    }
}

impl std::fmt::Debug for Validate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validate")
            .field("query", &self.query)
            .field("body", &self.body)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .field("resp", &self.resp)
            .field("tags", &self.tags)
            .field("deprecated", &self.deprecated)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::parse_rule;
    use crate::types::{MultipartFormRequest, Response};
    use axum::http::StatusCode;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Query {
        order: Option<i32>,
    }

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Data {
        name: String,
    }

    crate::impl_model!(Query, Data);

    #[test]
    fn extension_keys_need_prefix() {
        let validate = Validate::new(Response::new());
        assert!(validate.clone().extension("x-internal", true).is_ok());
        let err = validate.extension("internal", true).unwrap_err();
        assert_eq!(err, SpecError::InvalidExtension("internal".into()));
    }

    #[test]
    fn doc_splits_summary_and_description() {
        let validate = Validate::new(Response::new()).doc("  Summary line\n\n   More details\n  here.  ");
        assert_eq!(validate.summary.as_deref(), Some("Summary line"));
        assert_eq!(validate.description.as_deref(), Some("More details\n  here."));

        let validate = Validate::new(Response::new()).doc("Only a summary");
        assert!(validate.description.is_none());
    }

    #[test]
    fn has_model_checks_all_slots() {
        let bare = Validate::new(Response::new().code(StatusCode::OK));
        assert!(!bare.has_model());
        assert!(bare.clone().query::<Query>().has_model());
        assert!(bare.clone().json::<Data>().has_model());
        assert!(!bare.clone().body(MultipartFormRequest::new()).has_model());
        assert!(Validate::new(Response::new().model::<Data>(StatusCode::OK)).has_model());
    }

    #[test]
    fn route_doc_collects_everything() {
        let rule = parse_rule("/user/<int(min=1):uid>").unwrap();
        let validate = Validate::new(Response::new().model::<Data>(StatusCode::OK))
            .query::<Query>()
            .tags(["api", "user"])
            .deprecated()
            .operation_id("readUser");
        let doc = validate.route_doc(&rule, "/v1", Method::GET, "get_user".into(), &ConverterRegistry::new());

        assert_eq!(doc.path, "/v1/user/{uid}");
        assert_eq!(doc.operation_id, "readUser");
        assert_eq!(doc.tags, vec!["api", "user"]);
        assert!(doc.deprecated);
        assert_eq!(doc.path_params[0].schema["minimum"], 1);
        assert_eq!(doc.models().len(), 2);
    }
}
