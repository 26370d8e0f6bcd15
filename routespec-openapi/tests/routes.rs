use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use http::{HeaderMap, Request, StatusCode};
use http_body_util::BodyExt;
use routespec_core::config::{DocsUi, SpecConfig};
use routespec_openapi::{build_spec, doc_routes, SpecSource};
use serde_json::{json, Value};
use tower::ServiceExt;

// ── Helpers ─────────────────────────────────────────────────────────────────

struct StaticSource(Arc<Value>);

impl SpecSource for StaticSource {
    fn document(&self) -> Arc<Value> {
        self.0.clone()
    }
}

fn source(config: &SpecConfig) -> Arc<dyn SpecSource> {
    Arc::new(StaticSource(Arc::new(build_spec(config, &[]))))
}

fn router(config: &SpecConfig, prefix: &str) -> Router {
    doc_routes::<()>(config, prefix, source(config))
}

struct Fetched {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl Fetched {
    fn header(&self, name: &str) -> &str {
        self.headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or_default()
    }
}

async fn fetch(router: Router, uri: &str) -> Fetched {
    let response = router
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes();
    Fetched {
        status: parts.status,
        headers: parts.headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

// ── Document ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn document_is_served_as_json() {
    let config = SpecConfig::new().title("Test API");
    let page = fetch(router(&config, ""), "/apidoc/openapi.json").await;

    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.header("content-type"), "application/json");
    let doc: Value = serde_json::from_str(&page.body).unwrap();
    assert_eq!(doc["openapi"], "3.1.0");
    assert_eq!(doc["info"]["title"], "Test API");
    assert_eq!(doc["paths"], json!({}));
}

#[tokio::test]
async fn docs_path_and_filename_are_configurable() {
    let config = SpecConfig::new().path("docs").filename("spec.json");
    assert_eq!(fetch(router(&config, ""), "/docs/spec.json").await.status, StatusCode::OK);
    assert_eq!(
        fetch(router(&config, ""), "/apidoc/openapi.json").await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn docs_live_under_the_prefix() {
    let config = SpecConfig::new();
    assert_eq!(fetch(router(&config, "/v1"), "/v1/apidoc/openapi.json").await.status, StatusCode::OK);

    let page = fetch(router(&config, "/v1"), "/v1/apidoc/redoc").await;
    assert!(page.body.contains("spec-url='/v1/apidoc/openapi.json'"));
}

// ── Pages ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn redoc_page() {
    let config = SpecConfig::new().title("Test API");
    let page = fetch(router(&config, ""), "/apidoc/redoc").await;

    assert_eq!(page.status, StatusCode::OK);
    assert!(page.header("content-type").starts_with("text/html"));
    assert!(page.body.contains("<title>Test API</title>"));
    assert!(page.body.contains("spec-url='/apidoc/openapi.json'"));
    assert!(page.body.contains("redoc.standalone.js"));
}

#[tokio::test]
async fn swagger_page() {
    let config = SpecConfig::new().title("Test API");
    let page = fetch(router(&config, ""), "/apidoc/swagger").await;

    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("<title>Test API</title>"));
    assert!(page.body.contains("spec-url='/apidoc/openapi.json'"));
    assert!(page.body.contains("swagger-ui-bundle.js"));
    assert!(page.body.contains(r##"dom_id: "#swagger-ui""##));
}

#[tokio::test]
async fn title_is_escaped() {
    let config = SpecConfig::new().title("<Pets & Co>");
    let page = fetch(router(&config, ""), "/apidoc/redoc").await;
    assert!(page.body.contains("<title>&lt;Pets &amp; Co&gt;</title>"));
}

#[tokio::test]
async fn landing_redirects_to_configured_ui() {
    let page = fetch(router(&SpecConfig::new(), ""), "/apidoc").await;
    assert_eq!(page.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(page.header("location"), "/apidoc/redoc");

    let config = SpecConfig::new().ui(DocsUi::Swagger);
    let page = fetch(router(&config, ""), "/apidoc").await;
    assert_eq!(page.header("location"), "/apidoc/swagger");
}
