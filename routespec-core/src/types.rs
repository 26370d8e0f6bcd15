use axum::http::StatusCode;

use crate::model::{Model, ModelRef};

pub const APPLICATION_JSON: &str = "application/json";
pub const OCTET_STREAM: &str = "application/octet-stream";
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

// ── Request bodies ─────────────────────────────────────────

/// A single-content-type request body declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub content_type: String,
    pub model: Option<ModelRef>,
    pub encoding: String,
}

impl Request {
    /// A model-less body of the given content type.
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            model: None,
            encoding: "binary".to_string(),
        }
    }

    /// A JSON body decoded into `T`.
    pub fn json<T: Model>() -> Self {
        Self::new(APPLICATION_JSON).with_model::<T>()
    }

    /// An urlencoded form decoded into `T`.
    pub fn form<T: Model>() -> Self {
        Self::new(FORM_URLENCODED).with_model::<T>()
    }

    /// A raw binary upload.
    pub fn octet_stream() -> Self {
        Self::new(OCTET_STREAM)
    }

    pub fn with_model<T: Model>(mut self) -> Self {
        self.model = Some(ModelRef::of::<T>());
        self
    }

    /// Format advertised for binary bodies (`binary`, `base64`, ...).
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }
}

/// A `multipart/form-data` body: model fields plus one file part.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartFormRequest {
    pub model: Option<ModelRef>,
    pub file_key: String,
    pub encoding: String,
}

impl MultipartFormRequest {
    pub fn new() -> Self {
        Self {
            model: None,
            file_key: "file".to_string(),
            encoding: "binary".to_string(),
        }
    }

    pub fn with_model<T: Model>(mut self) -> Self {
        self.model = Some(ModelRef::of::<T>());
        self
    }

    pub fn file_key(mut self, key: impl Into<String>) -> Self {
        self.file_key = key.into();
        self
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }
}

impl Default for MultipartFormRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Any declared request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Single(Request),
    Multipart(MultipartFormRequest),
}

impl RequestBody {
    pub fn content_type(&self) -> &str {
        match self {
            RequestBody::Single(req) => &req.content_type,
            RequestBody::Multipart(_) => MULTIPART_FORM_DATA,
        }
    }

    pub fn model(&self) -> Option<&ModelRef> {
        match self {
            RequestBody::Single(req) => req.model.as_ref(),
            RequestBody::Multipart(req) => req.model.as_ref(),
        }
    }
}

impl From<Request> for RequestBody {
    fn from(req: Request) -> Self {
        RequestBody::Single(req)
    }
}

impl From<MultipartFormRequest> for RequestBody {
    fn from(req: MultipartFormRequest) -> Self {
        RequestBody::Multipart(req)
    }
}

// ── Responses ──────────────────────────────────────────────

/// The model attached to one status code.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseModel {
    pub model: ModelRef,
    pub is_list: bool,
}

/// Declared JSON responses, keyed by status code.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    codes: Vec<StatusCode>,
    models: Vec<(StatusCode, ResponseModel)>,
    validate: bool,
}

impl Response {
    pub fn new() -> Self {
        Self {
            codes: Vec::new(),
            models: Vec::new(),
            validate: true,
        }
    }

    /// Declare a status code without a body model.
    pub fn code(mut self, status: StatusCode) -> Self {
        if !self.codes.contains(&status) {
            self.codes.push(status);
        }
        self
    }

    /// Declare a status code whose body is a `T`.
    pub fn model<T: Model>(self, status: StatusCode) -> Self {
        self.insert_model(status, ModelRef::of::<T>(), false)
    }

    /// Declare a status code whose body is a JSON array of `T`.
    pub fn list<T: Model>(self, status: StatusCode) -> Self {
        self.insert_model(status, ModelRef::of::<T>(), true)
    }

    /// Turn response body validation on or off.
    pub fn validate(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    fn insert_model(mut self, status: StatusCode, model: ModelRef, is_list: bool) -> Self {
        self.models.retain(|(code, _)| *code != status);
        self.models.push((status, ResponseModel { model, is_list }));
        self
    }

    pub fn has_model(&self) -> bool {
        !self.models.is_empty()
    }

    pub fn validates(&self) -> bool {
        self.validate
    }

    /// The model declared for `status`, if any.
    pub fn find_model(&self, status: StatusCode) -> Option<&ResponseModel> {
        self.models
            .iter()
            .find(|(code, _)| *code == status)
            .map(|(_, model)| model)
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelRef> {
        self.models.iter().map(|(_, m)| &m.model)
    }

    /// Codes declared without a model.
    pub fn bare_codes(&self) -> &[StatusCode] {
        &self.codes
    }

    pub fn model_codes(&self) -> &[(StatusCode, ResponseModel)] {
        &self.models
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

/// A binary download.
#[derive(Debug, Clone, PartialEq)]
pub struct FileResponse {
    pub content_type: String,
}

impl FileResponse {
    pub fn new() -> Self {
        Self {
            content_type: OCTET_STREAM.to_string(),
        }
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

impl Default for FileResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Any declared response set.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseSpec {
    Json(Response),
    File(FileResponse),
}

impl ResponseSpec {
    pub fn has_model(&self) -> bool {
        match self {
            ResponseSpec::Json(resp) => resp.has_model(),
            ResponseSpec::File(_) => false,
        }
    }

    pub fn models(&self) -> Vec<&ModelRef> {
        match self {
            ResponseSpec::Json(resp) => resp.models().collect(),
            ResponseSpec::File(_) => Vec::new(),
        }
    }
}

impl From<Response> for ResponseSpec {
    fn from(resp: Response) -> Self {
        ResponseSpec::Json(resp)
    }
}

impl From<FileResponse> for ResponseSpec {
    fn from(resp: FileResponse) -> Self {
        ResponseSpec::File(resp)
    }
}

// ── Status descriptions ────────────────────────────────────

/// Human description of a status code, as shown in the document.
pub fn status_description(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        306 => "(Unused)",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request-URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Requested Range Not Satisfiable",
        417 => "Expectation Failed",
        418 => "I'm a teapot",
        421 => "Misdirected Request",
        422 => "Unprocessable Entity",
        423 => "Locked",
        424 => "Failed Dependency",
        425 => "Too Early",
        426 => "Upgrade Required",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        451 => "Unavailable For Legal Reasons",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        506 => "Variant Also negotiates",
        507 => "Insufficient Storage",
        508 => "Loop Detected",
        511 => "Network Authentication Required",
        _ => status.canonical_reason().unwrap_or("Response"),
    }
}
