use axum::body::Body;
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, IntoHeaderName, ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE, COOKIE};
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tower::util::ServiceExt;
use tower_http::compression::predicate::SizeAbove;
use tower_http::compression::CompressionLayer;

use crate::multipart::MultipartBody;

/// Drives an axum `Router` in-process, one `oneshot` call per request.
///
/// ```ignore
/// let app = TestApp::new(router);
/// app.post("/api/user/flask")
///     .cookie("pub", "abcdefg")
///     .json(&json!({ "name": "flask", "limit": 10 }))
///     .send()
///     .await
///     .assert_ok();
/// ```
pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub fn get(&self, path: &str) -> TestRequest<'_> {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> TestRequest<'_> {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> TestRequest<'_> {
        self.request(Method::PUT, path)
    }

    pub fn patch(&self, path: &str) -> TestRequest<'_> {
        self.request(Method::PATCH, path)
    }

    pub fn delete(&self, path: &str) -> TestRequest<'_> {
        self.request(Method::DELETE, path)
    }

    pub fn request(&self, method: Method, path: &str) -> TestRequest<'_> {
        TestRequest::new(self, method, path)
    }
}

/// Gzip-compress `data` by running it through tower-http's compression layer.
pub async fn gzip(data: &[u8]) -> Vec<u8> {
    let payload = Bytes::copy_from_slice(data);
    let router: Router = Router::new()
        .route(
            "/",
            get(move || {
                let payload = payload.clone();
                async move { payload }
            }),
        )
        .layer(CompressionLayer::new().gzip(true).compress_when(SizeAbove::new(0)));

    let request = Request::builder()
        .uri("/")
        .header(ACCEPT_ENCODING, "gzip")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get(CONTENT_ENCODING).map(|v| v.as_bytes()),
        Some(&b"gzip"[..]),
        "payload was not compressed"
    );
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

/// A request under construction; nothing is sent until [`TestRequest::send`].
pub struct TestRequest<'a> {
    app: &'a TestApp,
    method: Method,
    path: String,
    headers: HeaderMap,
    cookies: Vec<String>,
    body: Option<Vec<u8>>,
    gzip: bool,
}

impl<'a> TestRequest<'a> {
    fn new(app: &'a TestApp, method: Method, path: &str) -> Self {
        Self {
            app,
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            body: None,
            gzip: false,
        }
    }

    pub fn header(mut self, name: impl IntoHeaderName, value: impl AsRef<str>) -> Self {
        self.headers.insert(name, value.as_ref().parse().unwrap());
        self
    }

    /// Add a cookie. Repeated calls are joined into one `Cookie` header.
    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push(format!("{name}={value}"));
        self
    }

    /// Append query pairs to the path. Repeated keys are kept.
    pub fn query(mut self, pairs: &[(&str, &str)]) -> Self {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        let separator = if self.path.contains('?') { '&' } else { '?' };
        self.path = format!("{}{separator}{encoded}", self.path);
        self
    }

    /// JSON body with `Content-Type: application/json`.
    pub fn json(mut self, body: &impl Serialize) -> Self {
        self.body = Some(serde_json::to_vec(body).unwrap());
        self.headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
        self
    }

    /// Set an `application/x-www-form-urlencoded` body.
    pub fn form(mut self, pairs: &[(&str, &str)]) -> Self {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.body = Some(encoded.into_bytes());
        self.headers
            .insert(CONTENT_TYPE, "application/x-www-form-urlencoded".parse().unwrap());
        self
    }

    /// Set a `multipart/form-data` body.
    pub fn multipart(mut self, form: MultipartBody) -> Self {
        self.headers.insert(CONTENT_TYPE, form.content_type().parse().unwrap());
        self.body = Some(form.into_bytes());
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Gzip the body when sending and mark it with `Content-Encoding: gzip`.
    pub fn gzip(mut self) -> Self {
        self.gzip = true;
        self
    }

    /// Dispatch through the router and buffer the whole response.
    pub async fn send(mut self) -> TestResponse {
        let body = match self.body {
            Some(b) if self.gzip => {
                self.headers.insert(CONTENT_ENCODING, "gzip".parse().unwrap());
                Body::from(gzip(&b).await)
            }
            Some(b) => Body::from(b),
            None => Body::empty(),
        };

        if !self.cookies.is_empty() {
            self.headers.insert(COOKIE, self.cookies.join("; ").parse().unwrap());
        }

        let mut request = Request::builder()
            .method(self.method)
            .uri(&self.path)
            .body(body)
            .unwrap();
        request.headers_mut().extend(self.headers);

        let response = self.app.router.clone().oneshot(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let body = body.collect().await.unwrap().to_bytes();
        let (status, headers) = (parts.status, parts.headers);

        TestResponse { status, headers, body }
    }
}

// ─── JSON paths ───

/// Translate a dotted path (`data[0].name`, `items.len()`) into a JSON
/// pointer plus a flag telling whether the length of the target is wanted.
///
/// A leading index (`[0].loc`) addresses the root array.
pub fn json_pointer(path: &str) -> (String, bool) {
    let (path, want_len) = match path.strip_suffix("len()") {
        Some(rest) => (rest.trim_end_matches('.'), true),
        None => (path, false),
    };
    let mut pointer = String::new();
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let (field, indices) = segment.split_at(segment.find('[').unwrap_or(segment.len()));
        if !field.is_empty() {
            pointer.push('/');
            pointer.push_str(&field.replace('~', "~0").replace('/', "~1"));
        }
        for index in indices.split(['[', ']']).filter(|s| !s.is_empty()) {
            pointer.push('/');
            pointer.push_str(index);
        }
    }
    (pointer, want_len)
}

/// Resolve a dotted path against `root`; missing entries resolve to `null`.
pub fn resolve_path(root: &Value, path: &str) -> Value {
    let (pointer, want_len) = json_pointer(path);
    let target = root.pointer(&pointer).cloned().unwrap_or(Value::Null);
    if !want_len {
        return target;
    }
    match &target {
        Value::Array(items) => Value::from(items.len()),
        Value::Object(map) => Value::from(map.len()),
        Value::String(text) => Value::from(text.len()),
        other => panic!("len() of non-collection at \"{path}\": {other}"),
    }
}

// ─── TestResponse ───

/// A buffered response with assertion helpers.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn assert_ok(self) -> Self {
        self.assert_status(StatusCode::OK)
    }

    pub fn assert_bad_request(self) -> Self {
        self.assert_status(StatusCode::BAD_REQUEST)
    }

    pub fn assert_not_found(self) -> Self {
        self.assert_status(StatusCode::NOT_FOUND)
    }

    pub fn assert_unprocessable(self) -> Self {
        self.assert_status(StatusCode::UNPROCESSABLE_ENTITY)
    }

    pub fn assert_server_error(self) -> Self {
        self.assert_status(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Panics with the body text when the status differs.
    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(self.status, expected, "unexpected status, body: {}", self.text());
        self
    }

    /// Assert that `path` (see [`json_pointer`]) holds `expected`.
    ///
    /// ```ignore
    /// resp.assert_json_path("data[0].name", "james")
    ///     .assert_json_path("data.len()", 2);
    /// ```
    pub fn assert_json_path(self, path: &str, expected: impl Into<Value>) -> Self {
        let root: Value = self.json();
        let expected = expected.into();
        let actual = resolve_path(&root, path);
        assert_eq!(actual, expected, "at \"{path}\" in {root}");
        self
    }

    pub fn assert_json_path_fn(self, path: &str, predicate: impl FnOnce(&Value) -> bool) -> Self {
        let root: Value = self.json();
        let actual = resolve_path(&root, path);
        assert!(predicate(&actual), "predicate failed at \"{path}\": {actual}");
        self
    }

    /// Assert the body is a validation error list whose first entry sits at `loc`.
    pub fn assert_validation_error(self, loc: &[&str]) -> Self {
        let root: Value = self.json();
        let first = resolve_path(&root, "[0]");
        assert!(
            first.get("msg").is_some() && first.get("type").is_some(),
            "not a validation error list: {root}"
        );
        assert_eq!(first["loc"], serde_json::json!(loc), "unexpected error location in {root}");
        self
    }

    /// Deserialize the value found at `path`.
    pub fn json_path<T: DeserializeOwned>(&self, path: &str) -> T {
        let value = resolve_path(&self.json(), path);
        serde_json::from_value(value.clone()).unwrap_or_else(|e| panic!("bad value at \"{path}\": {e} ({value})"))
    }

    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        let name: HeaderName = name.as_ref().parse().ok()?;
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| panic!("body is not JSON ({e}): {}", self.text()))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dotted_paths_become_pointers() {
        assert_eq!(json_pointer("data[0].name"), ("/data/0/name".to_string(), false));
        assert_eq!(json_pointer("[0].loc"), ("/0/loc".to_string(), false));
        assert_eq!(json_pointer("data.len()"), ("/data".to_string(), true));
        assert_eq!(json_pointer("len()"), (String::new(), true));
    }

    #[test]
    fn resolves_values_and_lengths() {
        let root = json!({ "data": [{ "name": "james" }, { "name": "bethany" }] });
        assert_eq!(resolve_path(&root, "data[1].name"), json!("bethany"));
        assert_eq!(resolve_path(&root, "data.len()"), json!(2));
        assert_eq!(resolve_path(&root, "missing"), Value::Null);
    }
}
