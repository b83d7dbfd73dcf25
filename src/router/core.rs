//! Router core — hot path for request routing (§4.A contract, grounded in the
//! teacher's `router/core.rs`: `ParamVec`, `RouteMatch`, the slow-match warning, and
//! `dump_routes`). The legacy regex fallback is dropped entirely; the radix tree is
//! the only matching strategy needed once it supports wildcards and normalisation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Method;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use super::radix::RadixRouter;
use crate::error::RouterError;
use crate::route::RouteDescriptor;

/// Stack-allocated parameter storage; avoids heap allocation for the common case of
/// a handful of path/query params per request.
pub const MAX_INLINE_PARAMS: usize = 8;
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of successfully matching a request to a route.
#[derive(Clone)]
pub struct RouteMatch {
    pub route: Arc<RouteDescriptor>,
    pub path_params: ParamVec,
    pub query_params: ParamVec,
}

impl RouteMatch {
    /// Last-write-wins: duplicate names at different depths return the innermost value.
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Compiled route table. Frozen once the application enters `SERVING` (§5).
#[derive(Clone)]
pub struct Router {
    radix: RadixRouter,
    patterns: Vec<(Method, String, String)>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            radix: RadixRouter::new(),
            patterns: Vec::new(),
        }
    }

    /// Insert one route. Fatal at registration time on ambiguity (§4.A Failure semantics).
    pub fn insert(&mut self, route: RouteDescriptor) -> Result<(), RouterError> {
        self.patterns.push((
            route.method.clone(),
            route.pattern.clone(),
            route.handler_name.clone(),
        ));
        self.radix.insert(route)
    }

    /// Startup diagnostics, grounded in the teacher's `Router::dump_routes`.
    pub fn dump_routes(&self) {
        info!(routes_count = self.patterns.len(), "route table");
        for (method, pattern, handler) in &self.patterns {
            info!(%method, %pattern, %handler, "route");
        }
    }

    pub fn route_table(&self) -> &[(Method, String, String)] {
        &self.patterns
    }

    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        debug!(%method, %path, "route match attempt");
        let start = Instant::now();
        let result = self.radix.find(method, path);
        let elapsed = start.elapsed();

        match result {
            Some((route, params)) => {
                if elapsed > Duration::from_millis(1) {
                    warn!(%method, %path, handler = %route.handler_name, duration_us = elapsed.as_micros(), "slow route match");
                } else {
                    debug!(%method, %path, handler = %route.handler_name, duration_us = elapsed.as_micros(), "route matched");
                }
                Some(RouteMatch {
                    route,
                    path_params: params,
                    query_params: ParamVec::new(),
                })
            }
            None => {
                debug!(%method, %path, duration_us = elapsed.as_micros(), "no route matched");
                None
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
