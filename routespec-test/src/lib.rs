mod app;
mod multipart;

pub use app::{gzip, json_pointer, resolve_path, TestApp, TestRequest, TestResponse};
pub use multipart::MultipartBody;
