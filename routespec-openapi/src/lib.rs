mod builder;
mod handlers;

pub use builder::{build_spec, camelize, collect_schemas};
pub use handlers::{doc_routes, SpecSource};
