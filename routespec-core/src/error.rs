use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use serde_path_to_error::Segment;

/// Helper to create a JSON error response with a standard `{ "error": message }` body.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, Json(body)).into_response()
}

// ── Declaration-time errors ────────────────────────────────

/// Errors raised while declaring routes or loading configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecError {
    /// Vendor extension keys must start with `x-`.
    InvalidExtension(String),
    /// The route rule could not be parsed.
    InvalidRule { rule: String, reason: String },
    /// A path variable appears more than once in the same rule.
    DuplicateVariable { rule: String, variable: String },
    /// The HTTP method cannot be routed by axum.
    UnsupportedMethod(String),
    /// Configuration could not be read or parsed.
    Config(String),
}

impl std::fmt::Display for SpecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecError::InvalidExtension(key) => {
                write!(f, "vendor extensions must begin with 'x-', got '{key}'")
            }
            SpecError::InvalidRule { rule, reason } => {
                write!(f, "malformed url rule '{rule}': {reason}")
            }
            SpecError::DuplicateVariable { rule, variable } => {
                write!(f, "variable name '{variable}' used twice in '{rule}'")
            }
            SpecError::UnsupportedMethod(method) => write!(f, "unsupported HTTP method: {method}"),
            SpecError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for SpecError {}

// ── Request-time validation errors ─────────────────────────

/// Which part of the exchange failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Query,
    Body,
    Header,
    Cookie,
    Response,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Location::Query => "query",
            Location::Body => "body",
            Location::Header => "header",
            Location::Cookie => "cookie",
            Location::Response => "response",
        };
        f.write_str(name)
    }
}

/// A single failed constraint, shaped like `{loc, msg, type, input}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDetail {
    pub loc: Vec<Value>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub input: Value,
}

impl ErrorDetail {
    /// Classify a decoding error, located by the path serde was at when it failed.
    ///
    /// Missing and unknown fields are reported on the field itself, inside
    /// whichever nested object was being read.
    pub fn from_serde(err: &serde_path_to_error::Error<serde_json::Error>, input: &Value) -> Self {
        let message = err.inner().to_string();
        let mut loc: Vec<Value> = err
            .path()
            .iter()
            .filter_map(|segment| match segment {
                Segment::Seq { index } => Some(Value::from(*index as u64)),
                Segment::Map { key } => Some(Value::String(key.clone())),
                Segment::Enum { .. } | Segment::Unknown => None,
            })
            .collect();

        let (kind, msg) = if message.starts_with("missing field") {
            ("missing", "Field required".to_string())
        } else if message.starts_with("unknown field") {
            ("extra_forbidden", "Extra inputs are not permitted".to_string())
        } else if message.starts_with("unknown variant") {
            ("enum", message.clone())
        } else if message.starts_with("invalid type") {
            ("type_error", message.clone())
        } else {
            ("value_error", message.clone())
        };

        if matches!(kind, "missing" | "extra_forbidden") {
            if let Some(field) = backticked(&message) {
                if loc.last().and_then(Value::as_str) != Some(field) {
                    loc.push(Value::String(field.to_string()));
                }
            }
        }

        Self {
            loc,
            msg,
            kind: kind.to_string(),
            input: input.clone(),
        }
    }

    /// Flatten a garde report into one detail per failed rule.
    ///
    /// garde renders paths as `items[1].name`; indices become numbers.
    pub fn from_garde(report: &garde::Report, input: &Value) -> Vec<Self> {
        report
            .iter()
            .map(|(path, error)| Self {
                loc: garde_loc(&path.to_string()),
                msg: error.message().to_string(),
                kind: "value_error".to_string(),
                input: input.clone(),
            })
            .collect()
    }
}

fn garde_loc(path: &str) -> Vec<Value> {
    let mut loc = Vec::new();
    for part in path.split('.') {
        let mut pieces = part.split('[');
        if let Some(key) = pieces.next().filter(|key| !key.is_empty()) {
            loc.push(Value::String(key.to_string()));
        }
        for index in pieces {
            let index = index.trim_end_matches(']');
            loc.push(match index.parse::<u64>() {
                Ok(n) => Value::from(n),
                Err(_) => Value::String(index.to_string()),
            });
        }
    }
    loc
}

fn backticked(message: &str) -> Option<&str> {
    let start = message.find('`')? + 1;
    let len = message[start..].find('`')?;
    Some(&message[start..start + len])
}

/// A request or response failed validation against its declared model.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub location: Location,
    pub model: String,
    pub errors: Vec<ErrorDetail>,
}

impl ValidationError {
    pub fn new(location: Location, model: impl Into<String>, errors: Vec<ErrorDetail>) -> Self {
        Self {
            location,
            model: model.into(),
            errors,
        }
    }

    /// The error list as sent to clients.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.errors).unwrap_or(Value::Array(Vec::new()))
    }

    /// Render as a JSON response with the given status code.
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self.to_json())).into_response()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} validation failed for {}: {} errors",
            self.location,
            self.model,
            self.errors.len()
        )
    }
}

impl std::error::Error for ValidationError {}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        self.into_response_with(StatusCode::UNPROCESSABLE_ENTITY)
    }
}

// ── Extractor errors ───────────────────────────────────────

/// Rejection of the validated-context extractors.
#[derive(Debug)]
pub enum ContextError {
    /// The route was not declared with this slot, or was not validated.
    Missing { slot: &'static str, type_name: &'static str },
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextError::Missing { slot, type_name } => {
                write!(f, "no validated {slot} of type {type_name} in request context")
            }
        }
    }
}

impl std::error::Error for ContextError {}

impl IntoResponse for ContextError {
    fn into_response(self) -> Response {
        error_response(StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
    }
}
