//! Routespec: declarative request/response validation and OpenAPI
//! documentation for axum routes.
//!
//! Routes are declared with a [`Validate`] describing their query, body,
//! headers, cookies and responses. Requests are validated before the
//! handler runs, the validated values are handed over through extractors
//! such as [`ValidQuery`] and [`ValidBody`], and every declaration feeds
//! an OpenAPI 3 document served next to the API.
//!
//! ```ignore
//! use routespec::prelude::*;
//!
//! let spec = Spec::new(SpecConfig::new().title("Pets"));
//! let app = spec
//!     .router()
//!     .get("/pets/<int:id>", get_pet, Validate::new(Response::new().model::<Pet>(StatusCode::OK)))?
//!     .with_docs();
//! ```

pub extern crate routespec_core;
pub extern crate routespec_openapi;

mod router;
mod spec;

pub use router::SpecRouter;
pub use spec::Spec;

pub use routespec_core::*;
pub use routespec_openapi::{build_spec, camelize, collect_schemas, doc_routes, SpecSource};

/// Import everything needed to declare routes with `use routespec::prelude::*`.
pub mod prelude {
    pub use crate::router::SpecRouter;
    pub use crate::spec::Spec;
    pub use axum::http::{Method, StatusCode};
    pub use routespec_core::{
        init_tracing, DocsUi, EnumConverter, FileResponse, Model, MultipartFormRequest, OperationIdType,
        PathConverter, Request, RequestContext, Response, SpecConfig, SpecError, TagInfo, UploadedFiles,
        Validate, ValidBody, ValidCookies, ValidHeaders, ValidQuery, ValidationError,
    };
}
