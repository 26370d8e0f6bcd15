use serde::Serialize;

/// A `multipart/form-data` body under construction.
///
/// ```ignore
/// let form = MultipartBody::new()
///     .text("name", "demo")
///     .json("meta", &json!({"limit": 5}))
///     .file("file", "data.csv", "text/csv", "a,b\n1,2\n");
/// app.post("/upload").multipart(form).send().await;
/// ```
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: format!("routespec-{}", uuid::Uuid::new_v4().simple()),
            body: Vec::new(),
        }
    }

    /// A plain text field.
    pub fn text(self, name: &str, value: impl AsRef<str>) -> Self {
        self.part(name, None, None, value.as_ref().as_bytes())
    }

    /// A field whose content is JSON, sent with `Content-Type: application/json`.
    pub fn json(self, name: &str, value: &impl Serialize) -> Self {
        let data = serde_json::to_vec(value).unwrap();
        self.part(name, None, Some("application/json"), &data)
    }

    /// A file field.
    pub fn file(self, name: &str, file_name: &str, content_type: &str, data: impl AsRef<[u8]>) -> Self {
        self.part(name, Some(file_name), Some(content_type), data.as_ref())
    }

    fn part(mut self, name: &str, file_name: Option<&str>, content_type: Option<&str>, data: &[u8]) -> Self {
        let mut head = format!("--{}\r\nContent-Disposition: form-data; name=\"{name}\"", self.boundary);
        if let Some(file_name) = file_name {
            head.push_str(&format!("; filename=\"{file_name}\""));
        }
        head.push_str("\r\n");
        if let Some(content_type) = content_type {
            head.push_str(&format!("Content-Type: {content_type}\r\n"));
        }
        head.push_str("\r\n");
        self.body.extend_from_slice(head.as_bytes());
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// The finished body, closing boundary included.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.body.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}
