use std::sync::Arc;

use axum::response::{Html, IntoResponse, Redirect};
use axum::routing::get;
use axum::Router;
use routespec_core::config::{DocsUi, SpecConfig};
use serde_json::Value;

/// Anything that can hand out the current OpenAPI document.
pub trait SpecSource: Send + Sync + 'static {
    fn document(&self) -> Arc<Value>;
}

struct DocsState {
    source: Arc<dyn SpecSource>,
    spec_url: String,
}

impl DocsState {
    fn title(&self) -> String {
        self.source
            .document()
            .get("info")
            .and_then(|info| info.get("title"))
            .and_then(Value::as_str)
            .unwrap_or("API Document")
            .to_string()
    }

    fn page(&self, ui: DocsUi) -> Html<String> {
        let template = match ui {
            DocsUi::Redoc => REDOC_HTML,
            DocsUi::Swagger => SWAGGER_HTML,
        };
        Html(
            template
                .replace("__TITLE__", &escape_html(&self.title()))
                .replace("__SPEC_URL__", &escape_html(&self.spec_url)),
        )
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&#39;")
        .replace('"', "&quot;")
}

/// Build an `axum::Router` serving the document and its UI pages.
///
/// With the default config and an empty prefix this serves
/// `/apidoc/openapi.json`, `/apidoc/redoc`, `/apidoc/swagger` and redirects
/// `/apidoc` to the configured UI.
pub fn doc_routes<S>(config: &SpecConfig, prefix: &str, source: Arc<dyn SpecSource>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let base = format!("{}/{}", prefix.trim_end_matches('/'), config.path);
    let spec_url = format!("{}{}", prefix.trim_end_matches('/'), config.spec_url());
    let landing = format!("{base}/{}", config.ui.as_str());
    let state = Arc::new(DocsState {
        source,
        spec_url: spec_url.clone(),
    });

    tracing::debug!(spec_url = %spec_url, docs = %base, "serving API documentation");

    let json_state = state.clone();
    let redoc_state = state.clone();
    let swagger_state = state;

    Router::<S>::new()
        .route(
            &spec_url,
            get(move || {
                let document = json_state.source.document();
                async move {
                    let json = serde_json::to_string(&*document).unwrap_or_else(|_| "{}".to_string());
                    ([("content-type", "application/json")], json).into_response()
                }
            }),
        )
        .route(
            &format!("{base}/redoc"),
            get(move || {
                let page = redoc_state.page(DocsUi::Redoc);
                async move { page }
            }),
        )
        .route(
            &format!("{base}/swagger"),
            get(move || {
                let page = swagger_state.page(DocsUi::Swagger);
                async move { page }
            }),
        )
        .route(
            &base,
            get(move || {
                let landing = landing.clone();
                async move { Redirect::temporary(&landing) }
            }),
        )
}

const REDOC_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>__TITLE__</title>
    <meta charset="utf-8"/>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <link href="https://fonts.googleapis.com/css?family=Montserrat:300,400,700|Roboto:300,400,700" rel="stylesheet">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <redoc spec-url='__SPEC_URL__'></redoc>
    <script src="https://cdn.jsdelivr.net/npm/redoc@latest/bundles/redoc.standalone.js"></script>
</body>
</html>"#;

const SWAGGER_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <title>__TITLE__</title>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <link rel="stylesheet" type="text/css" href="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui.css">
    <style>
        html { box-sizing: border-box; overflow-y: scroll; }
        body { margin: 0; background: #fafafa; }
    </style>
</head>
<body>
    <div id="swagger-ui" spec-url='__SPEC_URL__'></div>
    <script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function () {
            window.ui = SwaggerUIBundle({
                url: document.getElementById("swagger-ui").getAttribute("spec-url"),
                dom_id: "#swagger-ui",
                deepLinking: true,
                presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>"##;
