use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use routespec::prelude::*;
use routespec::{default_trace, impl_model, impl_validated_model};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize, JsonSchema)]
struct PredictQuery {
    #[serde(default = "default_text")]
    text: String,
}

fn default_text() -> String {
    "default query strings".to_string()
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, garde::Validate)]
struct Prediction {
    #[garde(skip)]
    label: i64,
    #[garde(range(min = 0.0, max = 1.0))]
    score: f64,
}

/// Prediction request.
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(example = example_data())]
struct Data {
    uid: String,
    #[serde(default = "default_limit")]
    limit: i64,
    vip: bool,
}

fn default_limit() -> i64 {
    5
}

fn example_data() -> serde_json::Value {
    json!({ "uid": "very_important_user", "limit": 10, "vip": true })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
enum Language {
    #[serde(rename = "en-US")]
    En,
    #[serde(rename = "zh-CN")]
    Zh,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct LangHeader {
    lang: Language,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SessionCookie {
    key: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct UploadMeta {
    label: String,
}

impl_model!(PredictQuery, Data, LangHeader, SessionCookie, UploadMeta);
impl_validated_model!(Prediction);

async fn predict(
    Path((source, target)): Path<(String, String)>,
    ValidQuery(query): ValidQuery<PredictQuery>,
    ValidBody(data): ValidBody<Data>,
) -> Result<Json<Prediction>, StatusCode> {
    tracing::info!(%source, %target, ?query, ?data, "predict");
    if source == target {
        return Err(StatusCode::FORBIDDEN);
    }
    let prediction = Prediction {
        label: query.text.len() as i64 % 10,
        score: (data.limit.clamp(0, 100) as f64) / 100.0,
    };
    Ok(Json(prediction))
}

async fn with_code_header(
    ValidHeaders(headers): ValidHeaders<LangHeader>,
    ValidCookies(cookies): ValidCookies<SessionCookie>,
) -> impl IntoResponse {
    (
        StatusCode::NON_AUTHORITATIVE_INFORMATION,
        [("x", "233")],
        Json(json!({ "language": headers.lang, "key": cookies.key })),
    )
}

async fn upload(ValidBody(meta): ValidBody<UploadMeta>, files: UploadedFiles) -> Json<serde_json::Value> {
    let sizes: Vec<_> = files
        .iter()
        .map(|file| json!({ "name": file.name, "file_name": file.file_name, "size": file.len() }))
        .collect();
    Json(json!({ "label": meta.label, "files": sizes }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let spec = Spec::new(
        SpecConfig::new()
            .title("Demo Service")
            .tag(TagInfo::new("model").with_description("prediction")),
    );

    let router = spec
        .router::<()>()
        .post(
            "/api/predict/<string(length=2):source>/<string(length=2):target>",
            predict,
            Validate::new(Response::new().code(StatusCode::FORBIDDEN).model::<Prediction>(StatusCode::OK))
                .query::<PredictQuery>()
                .json::<Data>()
                .tags(["model"])
                .doc(
                    "predict demo

                    demo for query, data and resp",
                ),
        )?
        .post(
            "/api/header",
            with_code_header,
            Validate::new(Response::new().code(StatusCode::NON_AUTHORITATIVE_INFORMATION))
                .headers::<LangHeader>()
                .cookies::<SessionCookie>()
                .tags(["test", "demo"])
                .doc("demo for JSON with status code and header"),
        )?
        .post(
            "/api/upload",
            upload,
            Validate::new(Response::new().code(StatusCode::OK))
                .body(MultipartFormRequest::new().with_model::<UploadMeta>().file_key("file"))
                .tags(["demo"]),
        )?
        .with_docs()
        .layer(default_trace());

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
    tracing::info!(address = %listener.local_addr()?, docs = "/apidoc", "demo listening");
    axum::serve(listener, router).await?;
    Ok(())
}
