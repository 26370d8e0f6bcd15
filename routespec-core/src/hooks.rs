use std::sync::Arc;

use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;

use crate::error::ValidationError;

/// What hooks can see of the incoming request.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestHead {
    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
        }
    }
}

/// Runs after request validation, before the handler.
///
/// On failure the hook receives the error response (which it may modify)
/// and the error. On success both are `None`.
pub type BeforeHook =
    Arc<dyn Fn(&RequestHead, Option<&mut Response>, Option<&ValidationError>) + Send + Sync>;

/// Runs after the handler and response validation.
///
/// The error is set when the response did not match its declared model; the
/// response is then the 500 that replaced it.
pub type AfterHook = Arc<dyn Fn(&RequestHead, &mut Response, Option<&ValidationError>) + Send + Sync>;

/// Logs request validation failures.
pub fn default_before_handler(
    head: &RequestHead,
    _response: Option<&mut Response>,
    error: Option<&ValidationError>,
) {
    if let Some(error) = error {
        tracing::info!(
            method = %head.method,
            path = %head.uri.path(),
            location = %error.location,
            model = %error.model,
            errors = %error.to_json(),
            "Validation Error"
        );
    }
}

/// Logs response validation failures.
pub fn default_after_handler(head: &RequestHead, _response: &mut Response, error: Option<&ValidationError>) {
    if let Some(error) = error {
        tracing::info!(
            method = %head.method,
            path = %head.uri.path(),
            model = %error.model,
            errors = %error.to_json(),
            "500 Response Validation Error"
        );
    }
}

pub fn default_before() -> BeforeHook {
    Arc::new(default_before_handler)
}

pub fn default_after() -> AfterHook {
    Arc::new(default_after_handler)
}
