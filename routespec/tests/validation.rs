use std::collections::BTreeSet;

use axum::extract::Path;
use axum::http::{HeaderValue, StatusCode};
use axum::Json;
use routespec::prelude::*;
use routespec::{impl_model, impl_validated_model};
use routespec_test::{MultipartBody, TestApp};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

// ── Models ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema, garde::Validate)]
struct Query {
    #[garde(range(min = 0, max = 1))]
    order: Option<u8>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct QueryParams {
    name: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[allow(dead_code)]
struct User {
    name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[allow(dead_code)]
struct Users {
    data: Vec<User>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct JsonBody {
    name: String,
    limit: i64,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[allow(dead_code)]
struct Resp {
    name: String,
    score: Vec<i64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[allow(dead_code)]
enum Language {
    #[serde(rename = "en-US")]
    En,
    #[serde(rename = "zh-CN")]
    Zh,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[allow(dead_code)]
struct Headers {
    lang: Language,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct Cookies {
    #[serde(rename = "pub")]
    public: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[allow(dead_code)]
struct DemoModel {
    uid: i64,
    limit: i64,
    name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[allow(dead_code)]
struct FileData {
    #[serde(rename = "type")]
    kind: String,
    created_at: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[allow(dead_code)]
struct FileName {
    file_name: String,
    data: Option<FileData>,
}

impl_model!(QueryParams, User, Users, JsonBody, Resp, Headers, Cookies, DemoModel, FileName);
impl_validated_model!(Query);

// ── Handlers ────────────────────────────────────────────────────────────────

async fn ping() -> Json<Value> {
    Json(json!({ "name": "Test", "score": [10] }))
}

async fn get_users(ValidQuery(query): ValidQuery<QueryParams>) -> Json<Value> {
    let allowed: BTreeSet<&str> = ["james", "annabel", "bethany"].into_iter().collect();
    let requested: BTreeSet<&str> = query.name.iter().flatten().map(String::as_str).collect();
    let data: Vec<Value> = allowed
        .intersection(&requested)
        .map(|name| json!({ "name": name }))
        .collect();
    Json(json!({ "data": data }))
}

async fn user_score(
    Path(_name): Path<String>,
    ValidQuery(query): ValidQuery<Query>,
    ValidBody(body): ValidBody<JsonBody>,
    ValidCookies(cookies): ValidCookies<Cookies>,
) -> Json<Value> {
    assert_eq!(cookies.public, "abcdefg");
    let mut score: Vec<i64> = (0..5).map(|i| (i * 7) % (body.limit + 1)).collect();
    score.sort();
    if query.order == Some(1) {
        score.reverse();
    }
    Json(json!({ "name": body.name, "score": score }))
}

async fn group_score(Path(name): Path<String>) -> Json<Value> {
    Json(json!({ "name": name, "score": ["a", "b", "c", "d", "e"] }))
}

async fn upload_file(ValidBody(body): ValidBody<FileName>, files: UploadedFiles) -> Json<Value> {
    assert!(!files.is_empty());
    Json(json!({ "uid": 1, "limit": 2, "name": body.file_name }))
}

async fn create(ValidBody(body): ValidBody<DemoModel>) -> Json<Value> {
    Json(json!({ "name": body.name }))
}

async fn item(Path(id): Path<i64>) -> Json<Value> {
    Json(json!({ "id": id }))
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn build(code: StatusCode) -> (Spec, TestApp) {
    let spec = Spec::new(SpecConfig::new().title("Test API").validation_error_code(code))
        .with_before(|_, response, error| {
            if let (Some(response), Some(_)) = (response, error) {
                response
                    .headers_mut()
                    .insert("x-error", HeaderValue::from_static("Validation Error"));
            }
        })
        .with_after(|_, response, _| {
            response
                .headers_mut()
                .insert("x-validation", HeaderValue::from_static("Pass"));
        });

    let router = spec
        .router::<()>()
        .get(
            "/ping",
            ping,
            Validate::new(Response::new().model::<Resp>(StatusCode::OK))
                .headers::<Headers>()
                .tags(["test", "health"]),
        )
        .unwrap()
        .get(
            "/api/user",
            get_users,
            Validate::new(
                Response::new()
                    .model::<Users>(StatusCode::OK)
                    .code(StatusCode::UNAUTHORIZED),
            )
            .query::<QueryParams>(),
        )
        .unwrap()
        .post(
            "/api/user/<name>",
            user_score,
            Validate::new(
                Response::new()
                    .model::<Resp>(StatusCode::OK)
                    .code(StatusCode::UNAUTHORIZED),
            )
            .query::<Query>()
            .json::<JsonBody>()
            .cookies::<Cookies>()
            .tags(["api", "test"])
            .after(|_, response, _| {
                response.headers_mut().insert("x-api", HeaderValue::from_static("OK"));
            }),
        )
        .unwrap()
        .get(
            "/api/group/<name>",
            group_score,
            Validate::new(
                Response::new()
                    .model::<Resp>(StatusCode::OK)
                    .code(StatusCode::UNAUTHORIZED)
                    .validate(false),
            )
            .tags(["api", "test"]),
        )
        .unwrap()
        .post(
            "/api/file",
            upload_file,
            Validate::new(Response::new().model::<DemoModel>(StatusCode::OK))
                .body(MultipartFormRequest::new().with_model::<FileName>()),
        )
        .unwrap()
        .get(
            "/items/<int(min=1):id>",
            item,
            Validate::new(Response::new().code(StatusCode::OK)),
        )
        .unwrap()
        .with_docs();

    (spec, TestApp::new(router))
}

fn app(code: StatusCode) -> TestApp {
    build(code).1
}

fn strict_app() -> TestApp {
    let spec = Spec::new(SpecConfig::new());
    let router = spec
        .router::<()>()
        .post(
            "/create",
            create,
            Validate::new(
                Response::new()
                    .model::<Resp>(StatusCode::OK)
                    .code(StatusCode::UNAUTHORIZED),
            )
            .json::<DemoModel>(),
        )
        .unwrap()
        .into_router();
    TestApp::new(router)
}

fn score(resp: &routespec_test::TestResponse) -> Vec<i64> {
    resp.json_path("score")
}

// ── Request validation ──────────────────────────────────────────────────────

#[tokio::test]
async fn missing_header_is_rejected() {
    let app = app(StatusCode::UNPROCESSABLE_ENTITY);
    let resp = app
        .get("/ping")
        .send()
        .await
        .assert_unprocessable()
        .assert_validation_error(&["lang"])
        .assert_json_path("[0].type", "missing");
    assert_eq!(resp.header("x-error"), Some("Validation Error"));
    assert_eq!(resp.header("x-validation"), None);
}

#[tokio::test]
async fn valid_header_passes() {
    let app = app(StatusCode::UNPROCESSABLE_ENTITY);
    let resp = app.get("/ping").header("lang", "en-US").send().await.assert_ok();
    assert_eq!(resp.json::<Value>(), json!({ "name": "Test", "score": [10] }));
    assert_eq!(resp.header("x-error"), None);
    assert_eq!(resp.header("x-validation"), Some("Pass"));

    let resp = app
        .get("/ping")
        .header("lang", "en-US")
        .header("content-type", "application/json")
        .send()
        .await
        .assert_ok();
    assert_eq!(resp.header("x-validation"), Some("Pass"));
}

#[tokio::test]
async fn invalid_header_value_is_rejected() {
    let app = app(StatusCode::UNPROCESSABLE_ENTITY);
    app.get("/ping")
        .header("lang", "fr-FR")
        .send()
        .await
        .assert_unprocessable()
        .assert_json_path("[0].type", "enum");
}

#[tokio::test]
async fn empty_body_is_rejected() {
    let app = app(StatusCode::UNPROCESSABLE_ENTITY);
    let resp = app.post("/api/user/flask").send().await.assert_unprocessable();
    assert_eq!(resp.header("x-error"), Some("Validation Error"));
}

#[tokio::test]
async fn json_body_query_and_cookies() {
    let app = app(StatusCode::UNPROCESSABLE_ENTITY);
    let body = json!({ "name": "flask", "limit": 10 });

    let resp = app
        .post("/api/user/flask")
        .query(&[("order", "1")])
        .cookie("pub", "abcdefg")
        .json(&body)
        .send()
        .await
        .assert_ok()
        .assert_json_path("name", "flask");
    assert_eq!(resp.header("x-validation"), None);
    assert_eq!(resp.header("x-api"), Some("OK"));
    let mut sorted = score(&resp);
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(score(&resp), sorted);

    let resp = app
        .post("/api/user/flask?order=0")
        .cookie("pub", "abcdefg")
        .json(&body)
        .send()
        .await
        .assert_ok();
    let mut sorted = score(&resp);
    sorted.sort();
    assert_eq!(score(&resp), sorted);

    app.post("/api/user/flask")
        .cookie("pub", "abcdefg")
        .json(&body)
        .send()
        .await
        .assert_ok();
}

#[tokio::test]
async fn query_constraint_violation() {
    let app = app(StatusCode::UNPROCESSABLE_ENTITY);
    app.post("/api/user/flask?order=7")
        .cookie("pub", "abcdefg")
        .json(&json!({ "name": "flask", "limit": 10 }))
        .send()
        .await
        .assert_unprocessable()
        .assert_validation_error(&["order"]);
}

#[tokio::test]
async fn missing_cookie_is_rejected() {
    let app = app(StatusCode::UNPROCESSABLE_ENTITY);
    app.post("/api/user/flask")
        .json(&json!({ "name": "flask", "limit": 10 }))
        .send()
        .await
        .assert_unprocessable()
        .assert_validation_error(&["pub"]);
}

#[tokio::test]
async fn alternative_validation_code() {
    let app = app(StatusCode::BAD_REQUEST);
    let resp = app.get("/ping").send().await.assert_bad_request();
    assert_eq!(resp.header("x-error"), Some("Validation Error"));

    let resp = app.post("/api/user/flask").send().await.assert_bad_request();
    assert_eq!(resp.header("x-error"), Some("Validation Error"));
}

#[tokio::test]
async fn config_update_changes_validation_code() {
    let (spec, app) = build(StatusCode::UNPROCESSABLE_ENTITY);
    app.get("/ping").send().await.assert_unprocessable();

    spec.update_config(|config| config.validation_error_code = 400);
    app.get("/ping").send().await.assert_bad_request();
}

#[tokio::test]
async fn config_survives_a_panicking_update() {
    let (spec, app) = build(StatusCode::BAD_REQUEST);
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        spec.update_config(|config| {
            config.body_limit = 32;
            panic!("update aborted");
        })
    }));
    assert!(outcome.is_err());

    app.get("/ping").send().await.assert_bad_request();
    app.post("/api/user/flask?order=0")
        .cookie("pub", "abcdefg")
        .json(&json!({ "name": "a name well past the thirty-two byte limit", "limit": 10 }))
        .send()
        .await
        .assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn repeated_query_params_become_a_list() {
    let app = app(StatusCode::UNPROCESSABLE_ENTITY);
    let resp = app
        .get("/api/user?name=james&name=bethany&name=claire")
        .send()
        .await
        .assert_ok()
        .assert_json_path("data.len()", 2);
    assert_eq!(
        resp.json_path::<Value>("data"),
        json!([{ "name": "bethany" }, { "name": "james" }])
    );

    app.get("/api/user?name=james")
        .send()
        .await
        .assert_ok()
        .assert_json_path("data[0].name", "james");
}

// ── Bodies ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn form_body_is_decoded() {
    let app = app(StatusCode::UNPROCESSABLE_ENTITY);
    app.post("/api/user/flask")
        .cookie("pub", "abcdefg")
        .form(&[("name", "form"), ("limit", "3")])
        .send()
        .await
        .assert_ok()
        .assert_json_path("name", "form");
}

#[tokio::test]
async fn gzip_body_is_inflated() {
    let app = app(StatusCode::UNPROCESSABLE_ENTITY);
    app.post("/api/user/flask?order=0")
        .cookie("pub", "abcdefg")
        .json(&json!({ "name": "flask", "limit": 10 }))
        .gzip()
        .send()
        .await
        .assert_ok()
        .assert_json_path("name", "flask");
}

#[tokio::test]
async fn gzip_body_failure_reports_missing_field() {
    let app = app(StatusCode::BAD_REQUEST);
    let resp = app
        .post("/api/user/flask?order=0")
        .cookie("pub", "abcdefg")
        .json(&json!({ "name": "flask" }))
        .gzip()
        .send()
        .await
        .assert_bad_request();
    assert_eq!(
        resp.json::<Value>(),
        json!([{
            "input": { "name": "flask" },
            "loc": ["limit"],
            "msg": "Field required",
            "type": "missing"
        }])
    );
}

#[tokio::test]
async fn corrupt_gzip_body_is_a_bad_request() {
    let app = app(StatusCode::UNPROCESSABLE_ENTITY);
    app.post("/api/user/flask?order=0")
        .cookie("pub", "abcdefg")
        .header("content-type", "application/json")
        .header("content-encoding", "gzip")
        .body("not gzip")
        .send()
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let (spec, app) = build(StatusCode::UNPROCESSABLE_ENTITY);
    spec.update_config(|config| config.body_limit = 32);

    app.post("/api/user/flask?order=0")
        .cookie("pub", "abcdefg")
        .json(&json!({ "name": "a name well past the thirty-two byte limit", "limit": 10 }))
        .send()
        .await
        .assert_status(StatusCode::PAYLOAD_TOO_LARGE);

    app.post("/api/user/flask?order=0")
        .cookie("pub", "abcdefg")
        .json(&json!({ "name": "f", "limit": 1 }))
        .send()
        .await
        .assert_ok();
}

#[tokio::test]
async fn multipart_with_json_part() {
    let app = app(StatusCode::UNPROCESSABLE_ENTITY);
    let form = MultipartBody::new()
        .file("file", "test.jpg", "image/jpeg", b"abcde")
        .text("file_name", "another_test.jpg")
        .json("data", &json!({ "type": "foo", "created_at": "2024-01-01" }));
    app.post("/api/file")
        .multipart(form)
        .send()
        .await
        .assert_ok()
        .assert_json_path("name", "another_test.jpg");
}

#[tokio::test]
async fn multipart_with_json_text_field() {
    let app = app(StatusCode::UNPROCESSABLE_ENTITY);
    let form = MultipartBody::new()
        .file("file", "test.jpg", "image/jpeg", b"abcde")
        .text("file_name", "another_test.jpg")
        .text("data", r#"{"type": "foo", "created_at": "2024-01-01"}"#);
    app.post("/api/file")
        .multipart(form)
        .send()
        .await
        .assert_ok()
        .assert_json_path("name", "another_test.jpg");
}

#[tokio::test]
async fn multipart_missing_field() {
    let app = app(StatusCode::UNPROCESSABLE_ENTITY);
    let form = MultipartBody::new().file("file", "test.jpg", "image/jpeg", b"abcde");
    app.post("/api/file")
        .multipart(form)
        .send()
        .await
        .assert_unprocessable()
        .assert_validation_error(&["file_name"]);
}

// ── Responses ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn skipped_response_validation() {
    let app = app(StatusCode::UNPROCESSABLE_ENTITY);
    app.get("/api/group/test")
        .send()
        .await
        .assert_ok()
        .assert_json_path("name", "test")
        .assert_json_path("score", json!(["a", "b", "c", "d", "e"]));
}

#[tokio::test]
async fn default_hooks_and_invalid_response() {
    let app = strict_app();
    app.post("/create").send().await.assert_unprocessable();

    app.post("/create")
        .json(&json!({ "uid": 1, "limit": 1, "name": "name" }))
        .send()
        .await
        .assert_server_error()
        .assert_json_path("message", "response validation error");
}

// ── Paths ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn path_converter_rejects_with_404() {
    let app = app(StatusCode::UNPROCESSABLE_ENTITY);
    app.get("/items/3").send().await.assert_ok().assert_json_path("id", 3);
    app.get("/items/0").send().await.assert_not_found();
    app.get("/items/abc").send().await.assert_not_found();
}

#[tokio::test]
async fn custom_converter_rejects_with_404() {
    let spec = Spec::new(SpecConfig::new()).converter("color", EnumConverter::new(["red", "blue"]));
    let router = spec
        .router::<()>()
        .get(
            "/paint/<color:color>",
            |Path(color): Path<String>| async move { color },
            Validate::new(Response::new().code(StatusCode::OK)),
        )
        .unwrap()
        .into_router();
    let app = TestApp::new(router);

    let resp = app.get("/paint/red").send().await.assert_ok();
    assert_eq!(resp.text(), "red");
    app.get("/paint/green").send().await.assert_not_found();
}

// ── Prefixed specs ──────────────────────────────────────────────────────────

#[tokio::test]
async fn prefixed_spec_mounts_routes_and_docs() {
    let spec = Spec::new(SpecConfig::new().title("Root"));
    let child = spec.for_prefix("/blueprint", |config| config.title("Blueprint"));

    let root = spec
        .router::<()>()
        .get("/ping", ping, Validate::new(Response::new().code(StatusCode::OK)))
        .unwrap()
        .with_docs();
    let nested = child
        .router::<()>()
        .get(
            "/test",
            ping,
            Validate::new(Response::new().model::<Resp>(StatusCode::OK)).headers::<Headers>(),
        )
        .unwrap()
        .with_docs();
    let app = TestApp::new(root.merge(nested));

    app.get("/blueprint/test")
        .header("lang", "zh-CN")
        .send()
        .await
        .assert_ok();
    app.get("/blueprint/test").send().await.assert_unprocessable();

    app.get("/blueprint/apidoc/openapi.json")
        .send()
        .await
        .assert_ok()
        .assert_json_path("info.title", "Blueprint")
        .assert_json_path_fn("paths", |paths| paths.get("/blueprint/test").is_some() && paths.get("/ping").is_none());
    app.get("/apidoc/openapi.json")
        .send()
        .await
        .assert_ok()
        .assert_json_path("info.title", "Root")
        .assert_json_path_fn("paths", |paths| paths.get("/ping").is_some() && paths.get("/blueprint/test").is_none());
}

// ── Documentation ───────────────────────────────────────────────────────────

#[tokio::test]
async fn served_document_matches_spec() {
    let (spec, app) = build(StatusCode::UNPROCESSABLE_ENTITY);
    let resp = app.get("/apidoc/openapi.json").send().await.assert_ok();
    assert_eq!(resp.json::<Value>(), *spec.spec());

    let resp = app.get("/apidoc/redoc").send().await.assert_ok();
    assert!(resp.text().contains("spec-url='/apidoc/openapi.json'"));
    assert!(resp.text().contains("<title>Test API</title>"));

    app.get("/apidoc/swagger").send().await.assert_ok();
}
