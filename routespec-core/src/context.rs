use std::any::Any;
use std::ops::Deref;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ContextError;
use crate::multipart::UploadedFile;

type Erased = Arc<dyn Any + Send + Sync>;

/// Validated inputs of the current request.
///
/// Inserted into the request extensions by the validation middleware; read
/// through the `Valid*` extractors.
#[derive(Clone, Default)]
pub struct RequestContext {
    pub query: Option<Erased>,
    pub body: Option<Erased>,
    pub headers: Option<Erased>,
    pub cookies: Option<Erased>,
    pub files: Arc<Vec<UploadedFile>>,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("query", &self.query.is_some())
            .field("body", &self.body.is_some())
            .field("headers", &self.headers.is_some())
            .field("cookies", &self.cookies.is_some())
            .field("files", &self.files.len())
            .finish()
    }
}

macro_rules! context_extractor {
    ($(#[$doc:meta])* $name:ident, $field:ident, $slot:literal) => {
        $(#[$doc])*
        pub struct $name<T>(pub Arc<T>);

        impl<T> Deref for $name<T> {
            type Target = T;

            fn deref(&self) -> &T {
                &self.0
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                Self(self.0.clone())
            }
        }

        impl<T, S> FromRequestParts<S> for $name<T>
        where
            T: Send + Sync + 'static,
            S: Send + Sync,
        {
            type Rejection = ContextError;

            async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
                parts
                    .extensions
                    .get::<RequestContext>()
                    .and_then(|ctx| ctx.$field.clone())
                    .and_then(|value| value.downcast::<T>().ok())
                    .map($name)
                    .ok_or(ContextError::Missing {
                        slot: $slot,
                        type_name: std::any::type_name::<T>(),
                    })
            }
        }
    };
}

context_extractor!(
    /// The validated query model.
    ValidQuery, query, "query"
);
context_extractor!(
    /// The validated body model (JSON, form or multipart).
    ValidBody, body, "body"
);
context_extractor!(
    /// The validated headers model.
    ValidHeaders, headers, "headers"
);
context_extractor!(
    /// The validated cookies model.
    ValidCookies, cookies, "cookies"
);

/// Files of a validated multipart body.
#[derive(Debug, Clone, Default)]
pub struct UploadedFiles(pub Arc<Vec<UploadedFile>>);

impl UploadedFiles {
    /// First file sent under the given field name.
    pub fn get(&self, name: &str) -> Option<&UploadedFile> {
        self.0.iter().find(|file| file.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UploadedFile> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S> FromRequestParts<S> for UploadedFiles
where
    S: Send + Sync,
{
    type Rejection = ContextError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .map(|ctx| UploadedFiles(ctx.files.clone()))
            .ok_or(ContextError::Missing {
                slot: "files",
                type_name: "UploadedFiles",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[derive(Debug, PartialEq)]
    struct Query {
        page: u32,
    }

    #[tokio::test]
    async fn extractor_reads_context() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        parts.extensions.insert(RequestContext {
            query: Some(Arc::new(Query { page: 2 })),
            ..Default::default()
        });

        let ValidQuery(query) = ValidQuery::<Query>::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(query.page, 2);
    }

    #[tokio::test]
    async fn missing_slot_is_rejected() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        parts.extensions.insert(RequestContext::default());

        let err = ValidBody::<Query>::from_request_parts(&mut parts, &()).await.err().unwrap();
        assert!(err.to_string().starts_with("no validated body"));
    }

    #[tokio::test]
    async fn wrong_type_is_rejected() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        parts.extensions.insert(RequestContext {
            query: Some(Arc::new(5u8)),
            ..Default::default()
        });
        assert!(ValidQuery::<Query>::from_request_parts(&mut parts, &()).await.is_err());
    }
}
