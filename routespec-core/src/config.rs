use std::path::Path;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SpecError;

/// Which documentation page `/{path}` lands on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocsUi {
    #[default]
    Redoc,
    Swagger,
}

impl DocsUi {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocsUi::Redoc => "redoc",
            DocsUi::Swagger => "swagger",
        }
    }
}

/// How operation ids are derived from handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationIdType {
    /// Last path segment of the handler's type name (`get_users`).
    #[default]
    FunctionName,
    /// Full type path of the handler (`my_app::users::get_users`).
    FullPath,
}

/// A document-level tag with its description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TagInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            extra: Map::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({ "name": self.name }))
    }
}

/// Settings for one `Spec`.
///
/// All fields have defaults, so a YAML file only needs the keys it changes:
///
/// ```yaml
/// title: Test API
/// version: "1.0"
/// validation_error_code: 400
/// tags:
///   - name: lone
///     description: a lone api
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecConfig {
    /// Mount point of the documentation routes.
    pub path: String,
    pub filename: String,
    pub openapi_version: String,
    pub ui: DocsUi,
    /// Status returned when request validation fails.
    pub validation_error_code: u16,
    pub title: String,
    pub version: String,
    /// Extra `info` fields; `title` and `version` above always win.
    pub info: Map<String, Value>,
    pub tags: Vec<TagInfo>,
    pub servers: Option<Value>,
    pub security: Option<Value>,
    pub security_schemes: Option<Value>,
    pub operation_id_type: OperationIdType,
    /// Inline query/header/cookie parameters instead of referencing components.
    pub inline_definitions: bool,
    /// Maximum request body size buffered for validation.
    pub body_limit: usize,
}

impl Default for SpecConfig {
    fn default() -> Self {
        Self {
            path: "apidoc".to_string(),
            filename: "openapi.json".to_string(),
            openapi_version: "3.1.0".to_string(),
            ui: DocsUi::Redoc,
            validation_error_code: 422,
            title: "Service API Document".to_string(),
            version: "0.1".to_string(),
            info: Map::new(),
            tags: Vec::new(),
            servers: None,
            security: None,
            security_schemes: None,
            operation_id_type: OperationIdType::FunctionName,
            inline_definitions: true,
            body_limit: 2 * 1024 * 1024,
        }
    }
}

impl SpecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document, keeping defaults for missing keys.
    pub fn from_yaml_str(content: &str) -> Result<Self, SpecError> {
        let config: SpecConfig =
            serde_yaml::from_str(content).map_err(|e| SpecError::Config(e.to_string()))?;
        config.check()?;
        tracing::info!(title = %config.title, path = %config.path, "loaded spec config");
        Ok(config)
    }

    /// Load a YAML file, see [`SpecConfig::from_yaml_str`].
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, SpecError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| SpecError::Config(e.to_string()))?;
        Self::from_yaml_str(&content)
    }

    fn check(&self) -> Result<(), SpecError> {
        if StatusCode::from_u16(self.validation_error_code).is_err() {
            return Err(SpecError::Config(format!(
                "invalid validation_error_code: {}",
                self.validation_error_code
            )));
        }
        Ok(())
    }

    /// URL of the JSON document, relative to the spec's prefix.
    pub fn spec_url(&self) -> String {
        format!("/{}/{}", self.path, self.filename)
    }

    pub fn validation_status(&self) -> StatusCode {
        StatusCode::from_u16(self.validation_error_code).unwrap_or(StatusCode::UNPROCESSABLE_ENTITY)
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into().trim_matches('/').to_string();
        self
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn openapi_version(mut self, version: impl Into<String>) -> Self {
        self.openapi_version = version.into();
        self
    }

    pub fn ui(mut self, ui: DocsUi) -> Self {
        self.ui = ui;
        self
    }

    pub fn validation_error_code(mut self, status: StatusCode) -> Self {
        self.validation_error_code = status.as_u16();
        self
    }

    pub fn info(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }

    pub fn tag(mut self, tag: TagInfo) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn servers(mut self, servers: Value) -> Self {
        self.servers = Some(servers);
        self
    }

    pub fn security(mut self, security: Value) -> Self {
        self.security = Some(security);
        self
    }

    pub fn security_schemes(mut self, schemes: Value) -> Self {
        self.security_schemes = Some(schemes);
        self
    }

    pub fn operation_id_type(mut self, kind: OperationIdType) -> Self {
        self.operation_id_type = kind;
        self
    }

    pub fn inline_definitions(mut self, inline: bool) -> Self {
        self.inline_definitions = inline;
        self
    }

    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}
