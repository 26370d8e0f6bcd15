use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use axum::response::Response;
use axum::Router;
use routespec_core::config::SpecConfig;
use routespec_core::converter::{ConverterRegistry, PathConverter};
use routespec_core::error::ValidationError;
use routespec_core::hooks::{default_after, default_before, AfterHook, BeforeHook, RequestHead};
use routespec_core::meta::RouteDoc;
use routespec_core::middleware::SharedConfig;
use routespec_openapi::{build_spec, doc_routes, SpecSource};
use serde_json::Value;

use crate::router::SpecRouter;

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct SpecInner {
    prefix: String,
    config: SharedConfig,
    before: RwLock<BeforeHook>,
    after: RwLock<AfterHook>,
    converters: RwLock<ConverterRegistry>,
    routes: RwLock<Vec<RouteDoc>>,
    document: RwLock<Option<Arc<Value>>>,
}

/// One documented API: its configuration, hooks, converters and routes.
///
/// Cloning is cheap; clones share state.
///
/// ```ignore
/// let spec = Spec::new(SpecConfig::new().title("Demo"));
/// let router = SpecRouter::new(&spec)
///     .route("/ping", Method::GET, ping, Validate::new(Response::new().code(StatusCode::OK)))?
///     .into_router();
/// let app = spec.register(router);
/// ```
#[derive(Clone)]
pub struct Spec {
    inner: Arc<SpecInner>,
}

impl Spec {
    pub fn new(config: SpecConfig) -> Self {
        Self::build(String::new(), config, default_before(), default_after(), ConverterRegistry::new())
    }

    fn build(
        prefix: String,
        config: SpecConfig,
        before: BeforeHook,
        after: AfterHook,
        converters: ConverterRegistry,
    ) -> Self {
        Self {
            inner: Arc::new(SpecInner {
                prefix,
                config: Arc::new(RwLock::new(config)),
                before: RwLock::new(before),
                after: RwLock::new(after),
                converters: RwLock::new(converters),
                routes: RwLock::new(Vec::new()),
                document: RwLock::new(None),
            }),
        }
    }

    /// Replace the default before hook for routes registered afterwards.
    pub fn with_before<F>(self, hook: F) -> Self
    where
        F: Fn(&RequestHead, Option<&mut Response>, Option<&ValidationError>) + Send + Sync + 'static,
    {
        *write(&self.inner.before) = Arc::new(hook);
        self
    }

    /// Replace the default after hook for routes registered afterwards.
    pub fn with_after<F>(self, hook: F) -> Self
    where
        F: Fn(&RequestHead, &mut Response, Option<&ValidationError>) + Send + Sync + 'static,
    {
        *write(&self.inner.after) = Arc::new(hook);
        self
    }

    /// Register a custom path converter under `name` (used as `<name:var>`).
    pub fn converter(self, name: impl Into<String>, converter: impl PathConverter + 'static) -> Self {
        write(&self.inner.converters).register(name, converter);
        self
    }

    /// A child spec documenting routes mounted under `prefix`.
    ///
    /// The child starts from this spec's config (adjusted by `configure`),
    /// hooks and converters, but documents only its own routes and serves
    /// its documentation under `{prefix}/{path}`.
    pub fn for_prefix(&self, prefix: &str, configure: impl FnOnce(SpecConfig) -> SpecConfig) -> Spec {
        let prefix = format!("{}/{}", self.inner.prefix, prefix.trim_matches('/'));
        let config = configure(self.config());
        tracing::debug!(prefix = %prefix, title = %config.title, "created prefixed spec");
        Self::build(
            prefix,
            config,
            self.before_hook(),
            self.after_hook(),
            read(&self.inner.converters).clone(),
        )
    }

    /// Path prefix of every route of this spec (empty for a root spec).
    pub fn prefix(&self) -> &str {
        &self.inner.prefix
    }

    /// A snapshot of the current configuration.
    pub fn config(&self) -> SpecConfig {
        read(&self.inner.config).clone()
    }

    /// Change the configuration. Takes effect for validation immediately and
    /// for the document on its next build.
    pub fn update_config(&self, update: impl FnOnce(&mut SpecConfig)) {
        {
            let mut config = write(&self.inner.config);
            update(&mut config);
            tracing::info!(title = %config.title, path = %config.path, "spec config updated");
        }
        self.invalidate();
    }

    /// The OpenAPI document, built on first use and cached until a route
    /// registers or the config changes.
    pub fn spec(&self) -> Arc<Value> {
        if let Some(document) = read(&self.inner.document).as_ref() {
            return document.clone();
        }
        let document = {
            let config = read(&self.inner.config);
            let routes = read(&self.inner.routes);
            Arc::new(build_spec(&config, &routes))
        };
        *write(&self.inner.document) = Some(document.clone());
        document
    }

    /// Route metadata collected so far.
    pub fn routes(&self) -> Vec<RouteDoc> {
        read(&self.inner.routes).clone()
    }

    /// A route builder bound to this spec.
    pub fn router<S>(&self) -> SpecRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        SpecRouter::new(self)
    }

    /// Merge the documentation routes into `router`.
    pub fn register<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let config = self.config();
        let source: Arc<dyn SpecSource> = Arc::new(self.clone());
        router.merge(doc_routes(&config, &self.inner.prefix, source))
    }

    pub(crate) fn shared_config(&self) -> SharedConfig {
        self.inner.config.clone()
    }

    pub(crate) fn before_hook(&self) -> BeforeHook {
        read(&self.inner.before).clone()
    }

    pub(crate) fn after_hook(&self) -> AfterHook {
        read(&self.inner.after).clone()
    }

    pub(crate) fn converters(&self) -> ConverterRegistry {
        read(&self.inner.converters).clone()
    }

    pub(crate) fn add_route(&self, doc: RouteDoc) {
        write(&self.inner.routes).push(doc);
        self.invalidate();
    }

    fn invalidate(&self) {
        *write(&self.inner.document) = None;
    }
}

impl SpecSource for Spec {
    fn document(&self) -> Arc<Value> {
        self.spec()
    }
}

impl std::fmt::Debug for Spec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spec")
            .field("prefix", &self.inner.prefix)
            .field("config", &self.config())
            .field("routes", &read(&self.inner.routes).len())
            .finish_non_exhaustive()
    }
}
