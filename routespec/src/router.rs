use std::sync::Arc;

use axum::handler::Handler;
use axum::http::Method;
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::Router;
use routespec_core::error::SpecError;
use routespec_core::meta::operation_id_for;
use routespec_core::middleware::{validated, RouteValidator};
use routespec_core::rule::parse_rule;
use routespec_core::validate::Validate;

use crate::spec::Spec;

/// Collects validated, documented routes for one [`Spec`].
///
/// Rules use `<converter(args):name>` variables; each route is mounted at
/// the spec prefix plus the rule, wrapped in request validation, and its
/// metadata is added to the spec document.
pub struct SpecRouter<S = ()> {
    spec: Spec,
    router: Router<S>,
}

impl<S> SpecRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(spec: &Spec) -> Self {
        Self {
            spec: spec.clone(),
            router: Router::new(),
        }
    }

    /// Register `handler` for `method` at `rule`, validated by `validate`.
    pub fn route<H, T>(mut self, rule: &str, method: Method, handler: H, validate: Validate) -> Result<Self, SpecError>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        let parsed = parse_rule(rule)?;
        let filter =
            MethodFilter::try_from(method.clone()).map_err(|_| SpecError::UnsupportedMethod(method.to_string()))?;

        let config = self.spec.shared_config();
        let id_kind = self.spec.config().operation_id_type;
        let converters = self.spec.converters();

        let validator = Arc::new(RouteValidator::new(
            &validate,
            &parsed,
            converters.clone(),
            config,
            self.spec.before_hook(),
            self.spec.after_hook(),
        ));
        let mount = format!("{}{}", self.spec.prefix(), parsed.axum_path);
        self.router = self.router.route(&mount, validated(on(filter, handler), validator));

        let operation_id = operation_id_for(std::any::type_name::<H>(), id_kind, &method, &parsed.openapi_path);
        let doc = validate.route_doc(&parsed, self.spec.prefix(), method, operation_id, &converters);
        tracing::debug!(
            method = %doc.method,
            path = %doc.path,
            operation_id = %doc.operation_id,
            "registered route"
        );
        self.spec.add_route(doc);
        Ok(self)
    }

    pub fn get<H, T>(self, rule: &str, handler: H, validate: Validate) -> Result<Self, SpecError>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route(rule, Method::GET, handler, validate)
    }

    pub fn post<H, T>(self, rule: &str, handler: H, validate: Validate) -> Result<Self, SpecError>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route(rule, Method::POST, handler, validate)
    }

    pub fn put<H, T>(self, rule: &str, handler: H, validate: Validate) -> Result<Self, SpecError>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route(rule, Method::PUT, handler, validate)
    }

    pub fn patch<H, T>(self, rule: &str, handler: H, validate: Validate) -> Result<Self, SpecError>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route(rule, Method::PATCH, handler, validate)
    }

    pub fn delete<H, T>(self, rule: &str, handler: H, validate: Validate) -> Result<Self, SpecError>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.route(rule, Method::DELETE, handler, validate)
    }

    /// Mount a plain axum route under the spec prefix. It is neither
    /// validated nor documented.
    pub fn undocumented(mut self, path: &str, method_router: MethodRouter<S>) -> Self {
        let mount = format!("{}{}", self.spec.prefix(), path);
        self.router = self.router.route(&mount, method_router);
        self
    }

    pub fn spec(&self) -> &Spec {
        &self.spec
    }

    /// The routes collected so far, without the documentation endpoints.
    pub fn into_router(self) -> Router<S> {
        self.router
    }

    /// The routes collected so far plus the documentation endpoints.
    pub fn with_docs(self) -> Router<S> {
        self.spec.register(self.router)
    }
}
