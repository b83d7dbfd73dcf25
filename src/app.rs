//! Application wiring (§6 Registration surface): ties the DI container, lifecycle
//! orchestrator, dispatch assembler, and radix route index into one runnable unit.
//!
//! Grounded in the sibling example's `AppBuilder` (`builder.rs`: fluent registration
//! during a "configuring" phase, then a `build()`/`run()` split) adapted onto this
//! crate's explicit `CONFIGURING -> ... -> SERVING` state machine (§4.D) instead of a
//! type-level builder-phase split.

use std::sync::Arc;

use tracing::info;

use crate::assembler::{Assembler, ControllerMetadata};
use crate::cache::{CacheService, InMemoryCache};
use crate::config::TurboConfig;
use crate::context::{RawRequest, RequestContext};
use crate::di::{Container, RequestScope, Scope};
use crate::error::{DiError, LifecycleError, RouterError};
use crate::executor::{execute, normalise_error, normalise_ok, HttpResponse};
use crate::lifecycle::Lifecycle;
use crate::middleware::Middleware;
use crate::router::{ParamVec, Router};
use crate::validation::{NullValidator, Validator};

/// Collects registrations during `CONFIGURING`; produces an [`App`] once assembled.
pub struct AppBuilder {
    controllers: Vec<ControllerMetadata>,
    global_middleware: Vec<Arc<dyn Middleware>>,
    plugin_middleware: Vec<Arc<dyn Middleware>>,
    validator: Arc<dyn Validator>,
    container: Container,
    lifecycle: Lifecycle,
    config: TurboConfig,
}

impl AppBuilder {
    pub fn new(config: TurboConfig) -> Self {
        Self {
            controllers: Vec::new(),
            global_middleware: Vec::new(),
            plugin_middleware: Vec::new(),
            validator: Arc::new(NullValidator),
            container: Container::new(),
            lifecycle: Lifecycle::new(),
            config,
        }
    }

    pub fn with_controller(mut self, controller: ControllerMetadata) -> Self {
        self.controllers.push(controller);
        self
    }

    pub fn with_global_middleware(mut self, mw: Arc<dyn Middleware>) -> Self {
        self.global_middleware.push(mw);
        self
    }

    pub fn with_plugin_middleware(mut self, mw: Arc<dyn Middleware>) -> Self {
        self.plugin_middleware.push(mw);
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn register_value<T: std::any::Any + Send + Sync>(mut self, token: impl Into<String>, value: T) -> Result<Self, DiError> {
        self.container.register_value(token, value)?;
        Ok(self)
    }

    pub fn register_factory(
        mut self,
        token: impl Into<String>,
        dependencies: Vec<String>,
        scope: Scope,
        build: impl Fn(&[crate::di::AnyArc]) -> crate::di::AnyArc + Send + Sync + 'static,
    ) -> Result<Self, DiError> {
        self.container.register_factory(token, dependencies, scope, build)?;
        Ok(self)
    }

    pub fn on_init(
        self,
        name: impl Into<String>,
        priority: Option<i32>,
        hook: impl Fn() -> crate::lifecycle::BoxFuture<'static, Result<(), String>> + Send + Sync + 'static,
    ) -> Result<Self, LifecycleError> {
        self.lifecycle.on_init(name, priority, hook)?;
        Ok(self)
    }

    pub fn on_boot(
        self,
        name: impl Into<String>,
        priority: Option<i32>,
        hook: impl Fn() -> crate::lifecycle::BoxFuture<'static, Result<(), String>> + Send + Sync + 'static,
    ) -> Result<Self, LifecycleError> {
        self.lifecycle.on_boot(name, priority, hook)?;
        Ok(self)
    }

    pub fn on_shutdown(
        self,
        name: impl Into<String>,
        priority: Option<i32>,
        hook: impl Fn() -> crate::lifecycle::BoxFuture<'static, Result<(), String>> + Send + Sync + 'static,
    ) -> Result<Self, LifecycleError> {
        self.lifecycle.on_shutdown(name, priority, hook)?;
        Ok(self)
    }

    /// Compile the route table, register the default cache driver if enabled (§4.H:
    /// "a default in-memory driver with TTL eviction is always registered"), freeze
    /// the container for registration, and run INIT hooks.
    pub async fn build(mut self) -> Result<App, BuildError> {
        if self.config.cache.enabled && !self.container.has("cache") {
            self.container
                .register_value::<Arc<dyn CacheService>>("cache", Arc::new(InMemoryCache::new()))
                .map_err(BuildError::Di)?;
        }

        // Kept alongside the assembled router so the CORS edge can answer a preflight
        // for a path that has no terminal registered for `OPTIONS` itself (§4.G) —
        // per-route/controller middleware is only reachable once a route matches, but
        // the global/plugin edge is not.
        let mut edge_middleware = Vec::with_capacity(self.global_middleware.len() + self.plugin_middleware.len());
        edge_middleware.extend(self.global_middleware.iter().cloned());
        edge_middleware.extend(self.plugin_middleware.iter().cloned());

        let router = Assembler::new()
            .with_global_middleware(self.global_middleware)
            .with_plugin_middleware(self.plugin_middleware)
            .with_validator(self.validator)
            .assemble(self.controllers)
            .map_err(BuildError::Router)?;

        if !self.config.disable_startup_log {
            router.dump_routes();
        }

        self.container.close_for_registration();
        self.lifecycle.initialise().await.map_err(BuildError::Lifecycle)?;

        Ok(App { router, container: self.container, lifecycle: self.lifecycle, edge_middleware })
    }
}

#[derive(Debug)]
pub enum BuildError {
    Router(RouterError),
    Di(DiError),
    Lifecycle(LifecycleError),
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::Router(e) => write!(f, "{e}"),
            BuildError::Di(e) => write!(f, "{e}"),
            BuildError::Lifecycle(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for BuildError {}

/// A fully assembled, `READY`-state application. Call [`App::serve`] to transition
/// into `SERVING` and run BOOT hooks, then [`App::dispatch`] per request.
pub struct App {
    router: Router,
    container: Container,
    lifecycle: Lifecycle,
    /// Global ++ plugin middleware, kept outside any route's chain so the CORS edge
    /// can answer `OPTIONS` preflights for paths with no registered `OPTIONS` terminal.
    edge_middleware: Vec<Arc<dyn Middleware>>,
}

impl App {
    pub async fn serve(&self) -> Result<(), LifecycleError> {
        self.lifecycle.serve().await
    }

    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        self.lifecycle.shutdown().await
    }

    #[must_use]
    pub fn shutdown_requested(&self) -> Arc<std::sync::atomic::AtomicBool> {
        self.lifecycle.shutdown_requested()
    }

    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Match, build a request context, and run the middleware/handler chain. Requires
    /// `SERVING` (§4.D); dispatching outside that state is a caller bug, surfaced as a
    /// fixed 503 rather than panicking the transport loop.
    pub async fn dispatch(&self, raw: RawRequest) -> HttpResponse {
        if self.lifecycle.check_can_dispatch().is_err() {
            return HttpResponse {
                status: 503,
                headers: vec![("content-type".into(), "application/json".into())],
                body: br#"{"error":"service not serving"}"#.to_vec(),
            };
        }

        let method = raw.method.clone();
        let path = raw.url.split_once('?').map(|(p, _)| p).unwrap_or(&raw.url).to_string();

        let matched = self.router.route(&method, &path);

        // A preflight `OPTIONS` request commonly targets a path that only registers
        // e.g. `GET`/`POST` — no `OPTIONS` terminal exists to match, so the per-route
        // middleware chain (which may carry CORS) is unreachable. Answer it from the
        // global/plugin edge instead (§4.G: "on method = OPTIONS ... respond with a
        // preflight response") before falling back to a plain 404.
        if matched.is_none() && method == http::Method::OPTIONS {
            if let Some(response) = self.try_edge_cors_preflight(&raw, &path) {
                return response;
            }
        }

        let Some(matched) = matched else {
            return HttpResponse {
                status: 404,
                headers: vec![("content-type".into(), "application/json".into())],
                body: br#"{"error":"not found"}"#.to_vec(),
            };
        };

        let ctx = RequestContext::new(raw, path, matched.path_params.clone());
        let response = execute(&matched.route, &ctx).await;

        // HEAD is registered independently of GET (§9 Open Question, preserved
        // unresolved per source behaviour); when one is registered the response is
        // served as-is. A body-less HEAD convenience is intentionally not auto-derived.
        response
    }

    /// Run the edge middleware's `before` hooks against a synthetic, routeless context.
    /// Returns `Some` as soon as one short-circuits (a CORS preflight response, or a
    /// rejection), `None` if nothing in the chain reacts to this request.
    fn try_edge_cors_preflight(&self, raw: &RawRequest, path: &str) -> Option<HttpResponse> {
        let ctx = RequestContext::new(raw.clone(), path.to_string(), ParamVec::new());
        for mw in &self.edge_middleware {
            match mw.before(&ctx) {
                Ok(Some(result)) => return Some(normalise_ok(&ctx, result)),
                Ok(None) => continue,
                Err(e) => return Some(normalise_error(e)),
            }
        }
        None
    }

    /// Resolve a DI token scoped to `ctx`'s request-local map.
    pub fn resolve(&self, token: &str, ctx: &RequestContext) -> Result<crate::di::AnyArc, DiError> {
        let mut scope: RequestScope = std::mem::take(&mut *ctx.di_scope.borrow_mut());
        let result = self.container.get(token, Some(&mut scope));
        *ctx.di_scope.borrow_mut() = scope;
        result
    }

    pub fn route_table(&self) -> &[(http::Method, String, String)] {
        self.router.route_table()
    }
}

/// Waits on `shutdown_requested` and runs the shutdown sequence; intended to be spawned
/// alongside the transport's accept loop.
pub async fn run_until_shutdown(app: &App, poll_interval: std::time::Duration) -> Result<(), LifecycleError> {
    let flag = app.shutdown_requested();
    loop {
        if flag.load(std::sync::atomic::Ordering::SeqCst) {
            info!("shutdown requested, draining");
            return app.shutdown().await;
        }
        tokio::time::sleep(poll_interval).await;
    }
}
