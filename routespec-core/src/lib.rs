pub mod config;
pub mod context;
pub mod converter;
pub mod error;
pub mod hooks;
pub mod layers;
pub mod meta;
pub mod middleware;
pub mod model;
pub mod multipart;
pub mod params;
pub mod rule;
pub mod schema;
pub mod types;
pub mod validate;

pub use config::{DocsUi, OperationIdType, SpecConfig, TagInfo};
pub use context::{RequestContext, UploadedFiles, ValidBody, ValidCookies, ValidHeaders, ValidQuery};
pub use converter::{ConverterRegistry, EnumConverter, PathConverter};
pub use error::{error_response, ContextError, ErrorDetail, Location, SpecError, ValidationError};
pub use hooks::{default_after, default_before, AfterHook, BeforeHook, RequestHead};
pub use layers::{default_trace, gzip_request_bodies, init_tracing};
pub use meta::{operation_id_for, PathParam, RouteDoc};
pub use middleware::{validate_request, validated, RouteValidator, SharedConfig};
pub use model::{Model, ModelRef};
pub use multipart::UploadedFile;
pub use params::parse_multi_dict;
pub use rule::{parse_rule, ConverterArgs, ParsedRule, PathVariable};
pub use schema::SchemaRegistry;
pub use types::{
    status_description, FileResponse, MultipartFormRequest, Request, RequestBody, Response,
    ResponseSpec,
};
pub use validate::Validate;

pub use garde;
pub use schemars;
