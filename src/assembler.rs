//! Dispatch Assembler (§4.E): walks controller metadata, composes middleware chains,
//! compiles each route's handler, and inserts the result into the Radix Route Index.
//!
//! Grounded in the teacher's `Dispatcher` + `AppService` wiring (`dispatcher/core.rs`,
//! `server/service.rs`): controller metadata walking replaces the teacher's OpenAPI-path
//! walk, but the "classify into static / no-middleware / full-chain" registration
//! strategies mirror the teacher's distinction between a precomputed response and a
//! dispatched handler call.

use std::sync::Arc;

use http::Method;

use crate::compiler::compile;
use crate::error::RouterError;
use crate::middleware::Middleware;
use crate::route::{Classification, Handler, HandlerResult, ParamDescriptor, RouteDescriptor};
use crate::router::Router;
use crate::validation::{NullValidator, Validator};

/// One `(method, subpath) -> handler` registration on a controller.
pub struct RouteRegistration {
    pub method: Method,
    pub subpath: String,
    pub params: Vec<ParamDescriptor>,
    pub handler: Handler,
    pub classification: Classification,
    pub static_value: Option<HandlerResult>,
    pub middleware: Vec<Arc<dyn Middleware>>,
    pub handler_name: String,
}

/// A controller's base path, its own middleware, its routes, and any nested child
/// controllers (§4.E Input: "base path (with optional nested children)").
#[derive(Default)]
pub struct ControllerMetadata {
    pub base_path: String,
    pub middleware: Vec<Arc<dyn Middleware>>,
    pub routes: Vec<RouteRegistration>,
    pub children: Vec<ControllerMetadata>,
}

impl ControllerMetadata {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self { base_path: base_path.into(), ..Self::default() }
    }

    pub fn with_middleware(mut self, mw: Arc<dyn Middleware>) -> Self {
        self.middleware.push(mw);
        self
    }

    pub fn with_route(mut self, route: RouteRegistration) -> Self {
        self.routes.push(route);
        self
    }

    pub fn with_child(mut self, child: ControllerMetadata) -> Self {
        self.children.push(child);
        self
    }
}

fn join_path(parent: &str, child: &str) -> String {
    let mut joined = String::with_capacity(parent.len() + child.len() + 1);
    joined.push_str(parent.trim_end_matches('/'));
    if !child.is_empty() {
        joined.push('/');
        joined.push_str(child.trim_start_matches('/'));
    }
    joined
}

/// Assembles a route table from a set of top-level controllers (§4.E Process).
pub struct Assembler {
    global_middleware: Vec<Arc<dyn Middleware>>,
    plugin_middleware: Vec<Arc<dyn Middleware>>,
    validator: Arc<dyn Validator>,
}

impl Assembler {
    pub fn new() -> Self {
        Self { global_middleware: Vec::new(), plugin_middleware: Vec::new(), validator: Arc::new(NullValidator) }
    }

    pub fn with_global_middleware(mut self, mw: Vec<Arc<dyn Middleware>>) -> Self {
        self.global_middleware = mw;
        self
    }

    pub fn with_plugin_middleware(mut self, mw: Vec<Arc<dyn Middleware>>) -> Self {
        self.plugin_middleware = mw;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    /// Build the frozen route index. Fatal registration errors (ambiguity, wildcard
    /// misuse) surface as [`RouterError`] and abort startup (§7).
    pub fn assemble(&self, controllers: Vec<ControllerMetadata>) -> Result<Router, RouterError> {
        let mut router = Router::new();
        for controller in controllers {
            self.walk(&controller, "", &mut router)?;
        }
        Ok(router)
    }

    fn walk(&self, controller: &ControllerMetadata, parent_path: &str, router: &mut Router) -> Result<(), RouterError> {
        let base = join_path(parent_path, &controller.base_path);

        for route in &controller.routes {
            let pattern = join_path(&base, &route.subpath);

            // global ++ plugin ++ controller ++ method, order total and stable (§4.E).
            let mut chain = Vec::with_capacity(
                self.global_middleware.len() + self.plugin_middleware.len() + controller.middleware.len() + route.middleware.len(),
            );
            chain.extend(self.global_middleware.iter().cloned());
            chain.extend(self.plugin_middleware.iter().cloned());
            chain.extend(controller.middleware.iter().cloned());
            chain.extend(route.middleware.iter().cloned());

            let compiled = compile(
                route.params.clone(),
                route.classification,
                route.static_value.clone(),
                self.validator.clone(),
                route.handler.clone(),
            );

            router.insert(RouteDescriptor {
                method: route.method.clone(),
                pattern,
                params: route.params.clone(),
                handler: compiled.handler,
                middleware: chain,
                classification: compiled.classification,
                static_value: compiled.static_value,
                handler_name: route.handler_name.clone(),
            })?;
        }

        for child in &controller.children {
            self.walk(child, &base, router)?;
        }

        Ok(())
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{RawRequest, RequestContext};
    use crate::error::DispatchError;
    use crate::router::ParamVec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx(path: &str) -> RequestContext {
        RequestContext::new(
            RawRequest { method: Method::GET, url: path.to_string(), headers: Vec::new(), body: Vec::new() },
            path.to_string(),
            ParamVec::new(),
        )
    }

    fn text_route(method: Method, subpath: &str, name: &str) -> RouteRegistration {
        RouteRegistration {
            method,
            subpath: subpath.to_string(),
            params: Vec::new(),
            handler: Handler::Sync(Arc::new(|_ctx| Ok(HandlerResult::Text("ok".to_string())))),
            classification: Classification::Sync,
            static_value: None,
            middleware: Vec::new(),
            handler_name: name.to_string(),
        }
    }

    #[test]
    fn nested_controller_paths_are_concatenated() {
        let child = ControllerMetadata::new("/posts").with_route(text_route(Method::GET, "/:id", "get_post"));
        let parent = ControllerMetadata::new("/users").with_child(child);

        let router = Assembler::new().assemble(vec![parent]).unwrap();
        let matched = router.route(&Method::GET, "/users/posts/7").unwrap();
        assert_eq!(matched.route.handler_name, "get_post");
        assert_eq!(matched.get_path_param("id"), Some("7"));
    }

    #[test]
    fn middleware_chain_is_global_plugin_controller_method_in_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        struct Recorder(&'static str, Arc<std::sync::Mutex<Vec<&'static str>>>);
        impl Middleware for Recorder {
            fn before(&self, _ctx: &RequestContext) -> Result<Option<HandlerResult>, DispatchError> {
                self.1.lock().unwrap().push(self.0);
                Ok(None)
            }
        }

        let global: Arc<dyn Middleware> = Arc::new(Recorder("global", order.clone()));
        let plugin: Arc<dyn Middleware> = Arc::new(Recorder("plugin", order.clone()));
        let controller_mw: Arc<dyn Middleware> = Arc::new(Recorder("controller", order.clone()));
        let method_mw: Arc<dyn Middleware> = Arc::new(Recorder("method", order.clone()));

        let mut route = text_route(Method::GET, "/x", "h");
        route.middleware.push(method_mw);

        let controller = ControllerMetadata::new("/c").with_middleware(controller_mw).with_route(route);

        let router = Assembler::new()
            .with_global_middleware(vec![global])
            .with_plugin_middleware(vec![plugin])
            .assemble(vec![controller])
            .unwrap();

        let matched = router.route(&Method::GET, "/c/x").unwrap();
        for mw in &matched.route.middleware {
            mw.before(&ctx("/c/x")).unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec!["global", "plugin", "controller", "method"]);
    }

    #[test]
    fn static_route_skips_the_handler_counter() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let mut route = text_route(Method::GET, "/const", "constant");
        route.handler = Handler::Sync(Arc::new(move |_ctx| {
            calls2.fetch_add(1, Ordering::SeqCst);
            Ok(HandlerResult::Text("ignored".to_string()))
        }));
        route.classification = Classification::Static;
        route.static_value = Some(HandlerResult::Text("cached".to_string()));

        let controller = ControllerMetadata::new("").with_route(route);
        let router = Assembler::new().assemble(vec![controller]).unwrap();
        let matched = router.route(&Method::GET, "/const").unwrap();
        assert!(matched.route.static_value.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
