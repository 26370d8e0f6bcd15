use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG`, or by
/// `info,routespec=debug,tower_http=debug` when the variable is unset.
/// Only the first call installs anything.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,routespec=debug,tower_http=debug"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Request/response spans for the whole service.
pub fn default_trace() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
}

/// Inflates `Content-Encoding: gzip` request bodies before validation reads them.
pub fn gzip_request_bodies() -> RequestDecompressionLayer {
    RequestDecompressionLayer::new()
}
