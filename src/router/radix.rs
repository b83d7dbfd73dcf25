//! Radix tree implementation for the Radix Route Index (§4.A).
//!
//! Extends the teacher's `RadixNode` (literal children `Vec`, single `param_children`
//! list keyed by parameter name) with a wildcard terminal child, ambiguous-insertion
//! rejection, and path normalisation — none of which the upstream router needed
//! because it only ever saw pre-normalised OpenAPI paths with `{param}` segments.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use http::Method;

use super::core::ParamVec;
use crate::error::RouterError;
use crate::route::RouteDescriptor;

/// Collapse consecutive `/`, ensure a leading `/`, strip a trailing `/` except for root.
/// `normalise(normalise(s)) == normalise(s)` for all `s` (testable property #1).
pub fn normalise(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    out.push('/');
    let mut prev_was_slash = true;
    for ch in path.chars() {
        if ch == '/' {
            if !prev_was_slash {
                out.push('/');
            }
            prev_was_slash = true;
        } else {
            out.push(ch);
            prev_was_slash = false;
        }
    }
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

fn segments_of(path: &str) -> Vec<&str> {
    path.trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Clone)]
struct RadixNode {
    segment: Cow<'static, str>,
    routes: HashMap<Method, Arc<RouteDescriptor>>,
    param_name: Option<Cow<'static, str>>,
    children: Vec<RadixNode>,
    param_child: Option<Box<RadixNode>>,
    wildcard_name: Option<Cow<'static, str>>,
    wildcard_routes: HashMap<Method, Arc<RouteDescriptor>>,
}

impl RadixNode {
    fn new(segment: Cow<'static, str>) -> Self {
        Self {
            segment,
            routes: HashMap::new(),
            param_name: None,
            children: Vec::new(),
            param_child: None,
            wildcard_name: None,
            wildcard_routes: HashMap::new(),
        }
    }

    fn new_param(param_name: Cow<'static, str>) -> Self {
        let mut n = Self::new(Cow::Borrowed(""));
        n.param_name = Some(param_name);
        n
    }

    fn insert(
        &mut self,
        segments: &[&str],
        method: Method,
        route: Arc<RouteDescriptor>,
    ) -> Result<(), RouterError> {
        if segments.is_empty() {
            if self.routes.contains_key(&method) {
                return Err(RouterError::AmbiguousRoute {
                    method: method.to_string(),
                    pattern: route.pattern.clone(),
                });
            }
            self.routes.insert(method, route);
            return Ok(());
        }

        let segment = segments[0];
        let remaining = &segments[1..];

        if let Some(name) = segment.strip_prefix('*') {
            if !remaining.is_empty() {
                return Err(RouterError::WildcardNotTerminal {
                    pattern: route.pattern.clone(),
                });
            }
            if let Some(existing) = &self.wildcard_name {
                if existing.as_ref() != name {
                    return Err(RouterError::AmbiguousRoute {
                        method: method.to_string(),
                        pattern: route.pattern.clone(),
                    });
                }
            } else {
                self.wildcard_name = Some(Cow::Owned(name.to_string()));
            }
            if self.wildcard_routes.contains_key(&method) {
                return Err(RouterError::AmbiguousRoute {
                    method: method.to_string(),
                    pattern: route.pattern.clone(),
                });
            }
            self.wildcard_routes.insert(method, route);
            return Ok(());
        }

        if let Some(name) = segment.strip_prefix(':') {
            match &mut self.param_child {
                Some(child) => {
                    // Two routes differing only in parameter name at the same depth
                    // are ambiguous (§3 Radix Node invariant).
                    if child.param_name.as_deref() != Some(name) {
                        return Err(RouterError::AmbiguousRoute {
                            method: method.to_string(),
                            pattern: route.pattern.clone(),
                        });
                    }
                    child.insert(remaining, method, route)
                }
                None => {
                    let mut new_child = RadixNode::new_param(Cow::Owned(name.to_string()));
                    new_child.insert(remaining, method, route)?;
                    self.param_child = Some(Box::new(new_child));
                    Ok(())
                }
            }
        } else {
            for child in &mut self.children {
                if child.segment == segment {
                    return child.insert(remaining, method, route);
                }
            }
            let mut new_child = RadixNode::new(Cow::Owned(segment.to_string()));
            new_child.insert(remaining, method, route)?;
            self.children.push(new_child);
            Ok(())
        }
    }

    /// Priority per node: (1) literal, (2) parametric, (3) wildcard (§4.A Algorithm).
    fn search(
        &self,
        segments: &[&str],
        method: &Method,
        params: &mut ParamVec,
    ) -> Option<Arc<RouteDescriptor>> {
        if segments.is_empty() {
            return self.routes.get(method).cloned();
        }

        let segment = segments[0];
        let remaining = &segments[1..];

        for child in &self.children {
            if child.segment == segment {
                if let Some(route) = child.search(remaining, method, params) {
                    return Some(route);
                }
            }
        }

        if let Some(child) = &self.param_child {
            if let Some(name) = &child.param_name {
                params.push((Arc::from(name.as_ref()), segment.to_string()));
                if let Some(route) = child.search(remaining, method, params) {
                    return Some(route);
                }
                params.pop();
            }
        }

        if let Some(name) = &self.wildcard_name {
            if let Some(route) = self.wildcard_routes.get(method) {
                let rest = segments.join("/");
                params.push((Arc::from(name.as_ref()), rest));
                return Some(route.clone());
            }
        }

        None
    }
}

/// Radix tree-based Route Index: `insert`/`find` per §4.A.
#[derive(Clone)]
pub struct RadixRouter {
    root: RadixNode,
}

impl RadixRouter {
    pub fn new() -> Self {
        Self {
            root: RadixNode::new(Cow::Borrowed("")),
        }
    }

    pub fn insert(&mut self, route: RouteDescriptor) -> Result<(), RouterError> {
        let normalised = normalise(&route.pattern);
        if normalised == "/" {
            return self.root.insert(&[], route.method.clone(), Arc::new(route));
        }
        let segments = segments_of(&normalised);
        let method = route.method.clone();
        self.root.insert(&segments, method, Arc::new(route))
    }

    pub fn find(&self, method: &Method, path: &str) -> Option<(Arc<RouteDescriptor>, ParamVec)> {
        let normalised = normalise(path);
        let segments = segments_of(&normalised);
        let mut params = ParamVec::new();
        let route = self.root.search(&segments, method, &mut params)?;
        Some((route, params))
    }
}

impl Default for RadixRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{Classification, Handler, HandlerResult};
    use std::sync::Arc as StdArc;

    fn get_param<'a>(params: &'a ParamVec, name: &str) -> Option<&'a str> {
        params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    fn route(method: Method, pattern: &str, handler_name: &str) -> RouteDescriptor {
        RouteDescriptor {
            method,
            pattern: pattern.to_string(),
            params: Vec::new(),
            handler: Handler::Sync(StdArc::new(|_ctx| {
                Ok(HandlerResult::Text("ok".to_string()))
            })),
            middleware: Vec::new(),
            classification: Classification::Sync,
            static_value: None,
            handler_name: handler_name.to_string(),
        }
    }

    #[test]
    fn normalise_is_idempotent() {
        for s in ["/a//b/", "a/b", "//", "/", "/a/b/c/"] {
            let once = normalise(s);
            let twice = normalise(&once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn literal_route_matches() {
        let mut r = RadixRouter::new();
        r.insert(route(Method::GET, "/health", "health")).unwrap();
        let (d, p) = r.find(&Method::GET, "/health").unwrap();
        assert_eq!(d.handler_name, "health");
        assert!(p.is_empty());
    }

    #[test]
    fn parametric_capture() {
        let mut r = RadixRouter::new();
        r.insert(route(Method::GET, "/users/:id/posts/:pid", "get_post"))
            .unwrap();
        let (d, p) = r.find(&Method::GET, "/users/42/posts/7").unwrap();
        assert_eq!(d.handler_name, "get_post");
        assert_eq!(get_param(&p, "id"), Some("42"));
        assert_eq!(get_param(&p, "pid"), Some("7"));
    }

    #[test]
    fn wildcard_capture() {
        let mut r = RadixRouter::new();
        r.insert(route(Method::GET, "/files/*rest", "serve_file"))
            .unwrap();
        let (d, p) = r.find(&Method::GET, "/files/a/b/c.txt").unwrap();
        assert_eq!(d.handler_name, "serve_file");
        assert_eq!(get_param(&p, "rest"), Some("a/b/c.txt"));
    }

    #[test]
    fn literal_has_priority_over_parametric() {
        let mut r = RadixRouter::new();
        r.insert(route(Method::GET, "/users/me", "current_user"))
            .unwrap();
        r.insert(route(Method::GET, "/users/:id", "get_user"))
            .unwrap();

        let (d1, _) = r.find(&Method::GET, "/users/me").unwrap();
        assert_eq!(d1.handler_name, "current_user");

        let (d2, p2) = r.find(&Method::GET, "/users/99").unwrap();
        assert_eq!(d2.handler_name, "get_user");
        assert_eq!(get_param(&p2, "id"), Some("99"));
    }

    #[test]
    fn method_not_matched_is_a_plain_miss() {
        let mut r = RadixRouter::new();
        r.insert(route(Method::GET, "/items", "get_items")).unwrap();
        assert!(r.find(&Method::POST, "/items").is_none());
    }

    #[test]
    fn no_match_is_none() {
        let mut r = RadixRouter::new();
        r.insert(route(Method::GET, "/users/:id", "get_user"))
            .unwrap();
        assert!(r.find(&Method::GET, "/posts/1").is_none());
    }

    #[test]
    fn divergent_param_names_at_same_depth_are_ambiguous() {
        let mut r = RadixRouter::new();
        r.insert(route(Method::GET, "/users/:id/posts", "a")).unwrap();
        let err = r
            .insert(route(Method::GET, "/users/:uid/comments", "b"))
            .unwrap_err();
        assert!(matches!(err, RouterError::AmbiguousRoute { .. }));
    }

    #[test]
    fn duplicate_method_and_pattern_is_ambiguous() {
        let mut r = RadixRouter::new();
        r.insert(route(Method::GET, "/items", "a")).unwrap();
        let err = r.insert(route(Method::GET, "/items", "b")).unwrap_err();
        assert!(matches!(err, RouterError::AmbiguousRoute { .. }));
    }

    #[test]
    fn wildcard_must_be_terminal() {
        let mut r = RadixRouter::new();
        let err = r
            .insert(route(Method::GET, "/files/*rest/more", "x"))
            .unwrap_err();
        assert!(matches!(err, RouterError::WildcardNotTerminal { .. }));
    }

    #[test]
    fn query_and_trailing_slash_are_normalised_away() {
        let mut r = RadixRouter::new();
        r.insert(route(Method::GET, "/items/", "get_items")).unwrap();
        let (d, _) = r.find(&Method::GET, "/items").unwrap();
        assert_eq!(d.handler_name, "get_items");
    }

    #[test]
    fn backtracking_preserves_outer_params() {
        let mut r = RadixRouter::new();
        r.insert(route(
            Method::GET,
            "/orgs/:org/teams/:team/stats",
            "team_stats",
        ))
        .unwrap();
        let (d, p) = r.find(&Method::GET, "/orgs/acme/teams/eng/stats").unwrap();
        assert_eq!(d.handler_name, "team_stats");
        assert_eq!(get_param(&p, "org"), Some("acme"));
        assert_eq!(get_param(&p, "team"), Some("eng"));
    }
}
