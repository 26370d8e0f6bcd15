use bytes::Bytes;
use serde_json::{Map, Value};

use axum::extract::Multipart;

use crate::params::coerce_params;
use crate::types::APPLICATION_JSON;

#[derive(Debug)]
pub enum MultipartError {
    /// The body is not a readable multipart stream.
    Rejected(String),
    /// A part stopped mid-stream or a text part was not UTF-8.
    Part(String),
    /// A part declared as `application/json` did not contain JSON.
    InvalidJson { field: String, message: String },
}

impl std::fmt::Display for MultipartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(msg) => write!(f, "multipart error: {msg}"),
            Self::Part(msg) => write!(f, "unreadable form part: {msg}"),
            Self::InvalidJson { field, message } => {
                write!(f, "field '{field}' is not valid JSON: {message}")
            }
        }
    }
}

impl std::error::Error for MultipartError {}

/// One uploaded file part.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// All parts of a multipart form, sorted into JSON parts, text fields and files.
#[derive(Debug, Default)]
pub struct MultipartFields {
    /// Parts sent with an `application/json` content type, decoded.
    pub json: Map<String, Value>,
    /// Text fields in arrival order. Multiple values per key are kept.
    pub text: Vec<(String, String)>,
    /// Every other part that carried a file name.
    pub files: Vec<UploadedFile>,
}

impl MultipartFields {
    /// Drain `form` part by part.
    pub async fn read(mut form: Multipart) -> Result<Self, MultipartError> {
        let mut fields = MultipartFields::default();

        loop {
            let part = match form.next_field().await {
                Ok(Some(part)) => part,
                Ok(None) => break,
                Err(err) => return Err(MultipartError::Rejected(err.to_string())),
            };
            let key = part.name().map(str::to_owned).unwrap_or_default();
            let file_name = part.file_name().map(str::to_owned);
            let mime = part.content_type().map(str::to_owned);
            let data = part.bytes().await.map_err(|err| MultipartError::Part(err.to_string()))?;

            match (mime.as_deref(), file_name) {
                (Some(ct), _) if ct.starts_with(APPLICATION_JSON) => {
                    let value = serde_json::from_slice(&data).map_err(|err| MultipartError::InvalidJson {
                        field: key.clone(),
                        message: err.to_string(),
                    })?;
                    fields.json.insert(key, value);
                }
                (_, Some(file_name)) => fields.files.push(UploadedFile {
                    name: key,
                    file_name: Some(file_name),
                    content_type: mime,
                    data,
                }),
                (_, None) => {
                    let text = std::str::from_utf8(&data).map_err(|err| MultipartError::Part(err.to_string()))?;
                    fields.text.push((key, text.to_owned()));
                }
            }
        }

        Ok(fields)
    }

    /// Merge JSON parts and text fields into one body object.
    ///
    /// Text fields are coerced against `schema` and win over JSON parts of
    /// the same name.
    pub fn to_body(&self, schema: &Value) -> Value {
        let mut body = self.json.clone();
        body.extend(coerce_params(&self.text, schema));
        Value::Object(body)
    }
}
