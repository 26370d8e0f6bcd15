use std::any::Any;
use std::convert::Infallible;
use std::sync::{Arc, RwLock};

use axum::body::Body;
use axum::extract::{FromRequest, FromRequestParts, Multipart, RawPathParams, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use axum::Json;
use bytes::Bytes;
use http_body_util::LengthLimitError;
use serde_json::{json, Value};

use crate::config::SpecConfig;
use crate::context::RequestContext;
use crate::converter::ConverterRegistry;
use crate::error::{error_response, ErrorDetail, Location, ValidationError};
use crate::hooks::{AfterHook, BeforeHook, RequestHead};
use crate::layers::gzip_request_bodies;
use crate::model::ModelRef;
use crate::multipart::{MultipartFields, UploadedFile};
use crate::params::{coerce_params, header_pairs, parse_cookies, parse_query_string};
use crate::rule::{ParsedRule, PathVariable};
use crate::types::{ResponseSpec, APPLICATION_JSON, FORM_URLENCODED, MULTIPART_FORM_DATA};
use crate::validate::Validate;

/// Configuration shared between a `Spec` and the routes it validates.
pub type SharedConfig = Arc<RwLock<SpecConfig>>;

type Erased = Arc<dyn Any + Send + Sync>;

/// A model together with its cached root schema.
#[derive(Debug, Clone)]
struct Slot {
    model: ModelRef,
    schema: Value,
}

impl Slot {
    fn new(model: &ModelRef) -> Self {
        Self {
            model: model.clone(),
            schema: model.schema(),
        }
    }

    fn decode(&self, location: Location, value: Value) -> Result<Erased, ValidationError> {
        self.model
            .decode(value)
            .map_err(|errors| ValidationError::new(location, self.model.name(), errors))
    }

    fn decode_pairs(&self, location: Location, pairs: &[(String, String)]) -> Result<Erased, ValidationError> {
        self.decode(location, Value::Object(coerce_params(pairs, &self.schema)))
    }
}

/// Per-route validation state, shared by every request to that route.
pub struct RouteValidator {
    rule: String,
    variables: Vec<PathVariable>,
    converters: ConverterRegistry,
    query: Option<Slot>,
    body: Option<Slot>,
    headers: Option<Slot>,
    cookies: Option<Slot>,
    resp: ResponseSpec,
    before: BeforeHook,
    after: AfterHook,
    config: SharedConfig,
}

impl RouteValidator {
    /// Build the validator for `validate` mounted at `rule`.
    ///
    /// The hooks are used unless the declaration carries its own.
    pub fn new(
        validate: &Validate,
        rule: &ParsedRule,
        converters: ConverterRegistry,
        config: SharedConfig,
        before: BeforeHook,
        after: AfterHook,
    ) -> Self {
        Self {
            rule: rule.rule.clone(),
            variables: rule.variables.clone(),
            converters,
            query: validate.query.as_ref().map(Slot::new),
            body: validate.body.as_ref().and_then(|body| body.model()).map(Slot::new),
            headers: validate.headers.as_ref().map(Slot::new),
            cookies: validate.cookies.as_ref().map(Slot::new),
            resp: validate.resp.clone(),
            before: validate.before.clone().unwrap_or(before),
            after: validate.after.clone().unwrap_or(after),
            config,
        }
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    fn settings(&self) -> (StatusCode, usize) {
        let config = self.config.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        (config.validation_status(), config.body_limit)
    }

    /// Whether every path variable matches its converter.
    fn path_matches(&self, params: &RawPathParams) -> bool {
        params.iter().all(|(name, raw)| {
            self.variables
                .iter()
                .find(|var| var.name == name)
                .map_or(true, |var| self.converters.accepts(var, raw))
        })
    }

    /// Validate every declared slot, filling `context` on success.
    async fn validate_inputs(
        &self,
        parts: &Parts,
        body: Option<&Bytes>,
        context: &mut RequestContext,
    ) -> Result<(), ValidationError> {
        if let Some(slot) = &self.query {
            let pairs = parse_query_string(parts.uri.query());
            context.query = Some(slot.decode_pairs(Location::Query, &pairs)?);
        }

        if let (Some(slot), Some(bytes)) = (&self.body, body) {
            let (value, files) = read_body(parts, bytes, slot).await?;
            context.body = Some(slot.decode(Location::Body, value)?);
            context.files = Arc::new(files);
        }

        if let Some(slot) = &self.headers {
            context.headers = Some(slot.decode_pairs(Location::Header, &header_pairs(&parts.headers))?);
        }

        if let Some(slot) = &self.cookies {
            context.cookies = Some(slot.decode_pairs(Location::Cookie, &parse_cookies(&parts.headers))?);
        }

        Ok(())
    }

    /// Check a handler response against the model declared for its status.
    ///
    /// Returns the (possibly replaced) response and the error, if any.
    async fn check_response(&self, response: Response) -> (Response, Option<ValidationError>) {
        let ResponseSpec::Json(declared) = &self.resp else {
            return (response, None);
        };
        if !declared.validates() {
            return (response, None);
        }
        let Some(expected) = declared.find_model(response.status()) else {
            return (response, None);
        };

        let (parts, body) = response.into_parts();
        let bytes = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(rule = %self.rule, error = %e, "failed to buffer response body");
                return (
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to read response body"),
                    None,
                );
            }
        };

        let value: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        let checked = if expected.is_list {
            expected.model.check_list(value)
        } else {
            expected.model.decode(value).map(|_| ())
        };

        match checked {
            Ok(()) => (Response::from_parts(parts, Body::from(bytes)), None),
            Err(errors) => {
                let error = ValidationError::new(Location::Response, expected.model.name(), errors);
                let response = (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "response validation error" })),
                )
                    .into_response();
                (response, Some(error))
            }
        }
    }
}

impl std::fmt::Debug for RouteValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteValidator")
            .field("rule", &self.rule)
            .field("query", &self.query.as_ref().map(|s| s.model.name()))
            .field("body", &self.body.as_ref().map(|s| s.model.name()))
            .field("headers", &self.headers.as_ref().map(|s| s.model.name()))
            .field("cookies", &self.cookies.as_ref().map(|s| s.model.name()))
            .finish_non_exhaustive()
    }
}

/// Decode the buffered body according to the request's content type.
async fn read_body(parts: &Parts, bytes: &Bytes, slot: &Slot) -> Result<(Value, Vec<UploadedFile>), ValidationError> {
    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.contains(APPLICATION_JSON) {
        let value = serde_json::from_slice::<Value>(bytes)
            .ok()
            .filter(is_truthy)
            .unwrap_or_else(|| json!({}));
        return Ok((value, Vec::new()));
    }

    if content_type.contains(MULTIPART_FORM_DATA) {
        let mut request = Request::new(Body::from(bytes.clone()));
        if let Some(value) = parts.headers.get(CONTENT_TYPE) {
            request.headers_mut().insert(CONTENT_TYPE, value.clone());
        }
        let multipart_error = |message: String| {
            ValidationError::new(
                Location::Body,
                slot.model.name(),
                vec![ErrorDetail {
                    loc: Vec::new(),
                    msg: message,
                    kind: "multipart_error".to_string(),
                    input: Value::Null,
                }],
            )
        };
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|rejection| multipart_error(rejection.body_text()))?;
        let fields = MultipartFields::read(multipart)
            .await
            .map_err(|e| multipart_error(e.to_string()))?;
        return Ok((fields.to_body(&slot.schema), fields.files));
    }

    if content_type.contains(FORM_URLENCODED) {
        let pairs: Vec<(String, String)> = form_urlencoded::parse(bytes)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        return Ok((Value::Object(coerce_params(&pairs, &slot.schema)), Vec::new()));
    }

    if bytes.is_empty() {
        return Ok((json!({}), Vec::new()));
    }
    let value = serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()));
    Ok((value, Vec::new()))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
    }
}

/// Middleware validating one route.
///
/// Path variables that fail their converter produce a 404. Query, body,
/// headers and cookies are then decoded in that order; the first failure
/// is returned with the configured validation status. The handler response
/// is checked against the model declared for its status code.
pub async fn validate_request(
    State(validator): State<Arc<RouteValidator>>,
    request: Request,
    next: Next,
) -> Response {
    let (status, limit) = validator.settings();
    let (mut parts, body) = request.into_parts();

    if !validator.variables.is_empty() {
        if let Ok(params) = RawPathParams::from_request_parts(&mut parts, &()).await {
            if !validator.path_matches(&params) {
                return StatusCode::NOT_FOUND.into_response();
            }
        }
    }

    let (body, buffered) = if validator.body.is_some() {
        match axum::body::to_bytes(body, limit).await {
            Ok(bytes) => (None, Some(bytes)),
            Err(e) => {
                tracing::debug!(rule = %validator.rule, error = %e, "failed to buffer request body");
                return unreadable_body(&e);
            }
        }
    } else {
        (Some(body), None)
    };

    let head = RequestHead::from_parts(&parts);
    let mut context = RequestContext::default();

    if let Err(error) = validator
        .validate_inputs(&parts, buffered.as_ref(), &mut context)
        .await
    {
        let mut response = error.clone().into_response_with(status);
        (validator.before)(&head, Some(&mut response), Some(&error));
        return response;
    }
    (validator.before)(&head, None, None);

    parts.extensions.insert(context);
    let body = match (body, buffered) {
        (Some(body), _) => body,
        (None, Some(bytes)) => Body::from(bytes),
        (None, None) => Body::empty(),
    };

    let response = next.run(Request::from_parts(parts, body)).await;
    let (mut response, error) = validator.check_response(response).await;
    (validator.after)(&head, &mut response, error.as_ref());
    response
}

fn unreadable_body(err: &axum::Error) -> Response {
    let over_limit = std::error::Error::source(err).is_some_and(|source| source.is::<LengthLimitError>());
    if over_limit {
        error_response(StatusCode::PAYLOAD_TOO_LARGE, "request body exceeds the configured limit")
    } else {
        error_response(StatusCode::BAD_REQUEST, "request body could not be read")
    }
}

/// Wrap a method router with validation for `validator`'s route.
///
/// Gzip-encoded bodies are inflated before validation sees them.
pub fn validated<S>(method_router: MethodRouter<S>, validator: Arc<RouteValidator>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    method_router
        .layer::<_, Infallible>(axum::middleware::from_fn_with_state(validator, validate_request))
        .layer(gzip_request_bodies())
}
