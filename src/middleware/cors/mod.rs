//! CORS edge (§4.G, §8 E6): preflight handling and origin validation, rewritten onto
//! `RequestContext`/`HandlerResult` from the teacher's `HandlerRequest`/`HandlerResponse`
//! pair. Per-route overrides are not modelled as a `handler_name`-keyed map inside one
//! shared instance (the teacher's `RouteCorsConfig`) because `RequestContext` carries no
//! handler identity; instead a route that needs different CORS behaviour is given its own
//! `CorsMiddleware` instance in its middleware chain by the assembler (§4.E).

mod builder;
mod error;

pub use builder::CorsMiddlewareBuilder;
pub use error::CorsConfigError;

use std::sync::Arc;
use std::time::Duration;

use http::Method;
use regex::Regex;
use tracing::warn;

use crate::context::RequestContext;
use crate::error::{DispatchError, HttpException};
use crate::middleware::Middleware;
use crate::route::{HandlerResult, RawResponse};

/// Origin validation strategy.
#[derive(Clone)]
pub enum OriginValidation {
    /// Exact string matching.
    Exact(Vec<String>),
    /// Allow all origins.
    Wildcard,
    /// Regex pattern matching.
    Regex(Vec<Regex>),
    /// Custom validation function.
    Custom(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl std::fmt::Debug for OriginValidation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OriginValidation::Exact(origins) => f.debug_tuple("Exact").field(origins).finish(),
            OriginValidation::Wildcard => write!(f, "Wildcard"),
            OriginValidation::Regex(patterns) => f
                .debug_tuple("Regex")
                .field(&patterns.iter().map(Regex::as_str).collect::<Vec<_>>())
                .finish(),
            OriginValidation::Custom(_) => write!(f, "Custom(<function>)"),
        }
    }
}

impl OriginValidation {
    fn is_allowed(&self, origin: &str) -> bool {
        match self {
            OriginValidation::Exact(origins) => origins.iter().any(|o| o == origin),
            OriginValidation::Wildcard => true,
            OriginValidation::Regex(patterns) => patterns.iter().any(|re| re.is_match(origin)),
            OriginValidation::Custom(validator) => validator(origin),
        }
    }

    fn is_wildcard(&self) -> bool {
        matches!(self, OriginValidation::Wildcard)
    }
}

/// Cross-origin edge middleware (§4.G). Validates the `Origin` header, answers
/// preflight `OPTIONS` requests, and stamps CORS response headers on the context for
/// every other request — same-origin requests are passed through untouched.
pub struct CorsMiddleware {
    origin_validation: OriginValidation,
    allowed_headers: Vec<String>,
    allowed_methods: Vec<Method>,
    allow_credentials: bool,
    expose_headers: Vec<String>,
    max_age: Option<u32>,
}

impl CorsMiddleware {
    /// # Panics
    /// Panics if `allow_credentials` is set together with a wildcard origin list —
    /// that combination is forbidden by the CORS specification and must be caught at
    /// registration time, not request time.
    #[must_use]
    pub fn new(
        allowed_origins: Vec<String>,
        allowed_headers: Vec<String>,
        allowed_methods: Vec<Method>,
        allow_credentials: bool,
        expose_headers: Vec<String>,
        max_age: Option<u32>,
    ) -> Self {
        let is_wildcard = allowed_origins.iter().any(|o| o == "*");
        assert!(
            !(allow_credentials && is_wildcard),
            "CORS: cannot combine allow_credentials with a wildcard origin"
        );
        let origin_validation = if is_wildcard {
            OriginValidation::Wildcard
        } else {
            OriginValidation::Exact(allowed_origins)
        };
        Self {
            origin_validation,
            allowed_headers,
            allowed_methods,
            allow_credentials,
            expose_headers,
            max_age,
        }
    }

    /// # Panics
    /// Panics if any pattern fails to compile, or on the wildcard/credentials
    /// combination (see [`CorsMiddleware::new`]).
    #[must_use]
    pub fn with_regex_patterns(
        origin_patterns: Vec<String>,
        allowed_headers: Vec<String>,
        allowed_methods: Vec<Method>,
        allow_credentials: bool,
        expose_headers: Vec<String>,
        max_age: Option<u32>,
    ) -> Self {
        assert!(
            !allow_credentials,
            "CORS: regex origin validation cannot be combined with allow_credentials"
        );
        let patterns = origin_patterns
            .iter()
            .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("invalid CORS origin pattern {p}: {e}")))
            .collect();
        Self {
            origin_validation: OriginValidation::Regex(patterns),
            allowed_headers,
            allowed_methods,
            allow_credentials,
            expose_headers,
            max_age,
        }
    }

    #[must_use]
    pub fn with_custom_validator(
        validator: Arc<dyn Fn(&str) -> bool + Send + Sync>,
        allowed_headers: Vec<String>,
        allowed_methods: Vec<Method>,
        allow_credentials: bool,
        expose_headers: Vec<String>,
        max_age: Option<u32>,
    ) -> Self {
        Self {
            origin_validation: OriginValidation::Custom(validator),
            allowed_headers,
            allowed_methods,
            allow_credentials,
            expose_headers,
            max_age,
        }
    }

    /// Permissive configuration for development/testing. Do not use in production.
    #[must_use]
    pub fn permissive() -> Self {
        Self::new(
            vec!["*".to_string()],
            vec!["*".to_string()],
            vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ],
            false,
            vec![],
            None,
        )
    }

    fn validate_origin(&self, origin: &str) -> Option<String> {
        if self.origin_validation.is_allowed(origin) {
            if self.origin_validation.is_wildcard() {
                Some("*".to_string())
            } else {
                Some(origin.to_string())
            }
        } else {
            None
        }
    }

    /// Same-origin requests skip CORS entirely (no `Origin` header processing needed).
    fn is_same_origin(&self, ctx: &RequestContext, origin: &str) -> bool {
        let Some(host) = ctx.header("host") else {
            return false;
        };
        let Some((_, rest)) = origin.split_once("://") else {
            return false;
        };
        let origin_host = rest.split(':').next().unwrap_or(rest);
        host.eq_ignore_ascii_case(origin_host) || host.eq_ignore_ascii_case(rest)
    }

    /// Validates a preflight request and builds the CORS response, or raises a 403
    /// when the requested method/headers fall outside the configured allow-lists.
    fn handle_preflight(&self, ctx: &RequestContext, origin: &str) -> Result<HandlerResult, DispatchError> {
        let requested_method = ctx
            .header("access-control-request-method")
            .ok_or_else(|| HttpException::bad_request("missing Access-Control-Request-Method"))?;
        let requested_method: Method = requested_method
            .parse()
            .map_err(|_| HttpException::bad_request("invalid Access-Control-Request-Method"))?;

        if !self.allowed_methods.contains(&requested_method) {
            warn!(%requested_method, "CORS preflight: method not allowed");
            return Err(HttpException::forbidden("method not allowed by CORS policy").into());
        }

        if let Some(headers_str) = ctx.header("access-control-request-headers") {
            let allow_all = self.allowed_headers.iter().any(|h| h == "*");
            if !allow_all {
                for header in headers_str.split(',').map(str::trim) {
                    if !self
                        .allowed_headers
                        .iter()
                        .any(|h| h.eq_ignore_ascii_case(header))
                    {
                        warn!(%header, "CORS preflight: header not allowed");
                        return Err(HttpException::forbidden("header not allowed by CORS policy").into());
                    }
                }
            }
        }

        let mut response = RawResponse::new(204, Vec::new());
        response = response.with_header("access-control-allow-origin", origin);
        response = response.with_header(
            "access-control-allow-methods",
            self.allowed_methods
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        );
        response = response.with_header("access-control-allow-headers", self.allowed_headers.join(", "));
        if self.allow_credentials {
            response = response.with_header("access-control-allow-credentials", "true");
        }
        if let Some(age) = self.max_age {
            response = response.with_header("access-control-max-age", age.to_string());
        }
        response = response.with_header("vary", "Origin");
        Ok(HandlerResult::Response(response))
    }
}

impl Middleware for CorsMiddleware {
    fn before(&self, ctx: &RequestContext) -> Result<Option<HandlerResult>, DispatchError> {
        let Some(origin) = ctx.header("origin").map(str::to_string) else {
            return Ok(None);
        };
        if self.is_same_origin(ctx, &origin) {
            return Ok(None);
        }

        let Some(allowed_origin) = self.validate_origin(&origin) else {
            warn!(%origin, "CORS: origin rejected");
            return Err(HttpException::forbidden("origin not allowed").into());
        };

        let is_preflight =
            ctx.method == Method::OPTIONS && ctx.header("access-control-request-method").is_some();
        if is_preflight {
            return self.handle_preflight(ctx, &allowed_origin).map(Some);
        }

        ctx.set_response_header("access-control-allow-origin", allowed_origin);
        if self.allow_credentials {
            ctx.set_response_header("access-control-allow-credentials", "true");
        }
        if !self.expose_headers.is_empty() {
            ctx.set_response_header("access-control-expose-headers", self.expose_headers.join(", "));
        }
        ctx.set_response_header("vary", "Origin");
        Ok(None)
    }

    fn after(&self, _ctx: &RequestContext, _result: &mut HandlerResult, _latency: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{RawRequest, RequestContext};
    use crate::router::ParamVec;

    fn ctx(origin: Option<&str>, host: &str, method: Method) -> RequestContext {
        let mut headers = vec![("host".to_string(), host.to_string())];
        if let Some(o) = origin {
            headers.push(("origin".to_string(), o.to_string()));
        }
        RequestContext::new(
            RawRequest {
                method: method.clone(),
                url: "/x".to_string(),
                headers,
                body: Vec::new(),
            },
            "/x".to_string(),
            ParamVec::new(),
        )
    }

    #[test]
    fn same_origin_is_passed_through() {
        let mw = CorsMiddleware::new(vec!["https://example.com".into()], vec![], vec![Method::GET], false, vec![], None);
        let c = ctx(Some("https://api.internal"), "api.internal", Method::GET);
        assert!(mw.before(&c).unwrap().is_none());
        assert!(c.response_headers().is_empty());
    }

    #[test]
    fn disallowed_origin_is_forbidden() {
        let mw = CorsMiddleware::new(vec!["https://example.com".into()], vec![], vec![Method::GET], false, vec![], None);
        let c = ctx(Some("https://evil.example"), "api.internal", Method::GET);
        let err = mw.before(&c).unwrap_err();
        assert!(matches!(err, DispatchError::Http(e) if e.status == 403));
    }

    #[test]
    fn allowed_origin_sets_response_headers() {
        let mw = CorsMiddleware::new(vec!["https://example.com".into()], vec![], vec![Method::GET], false, vec![], None);
        let c = ctx(Some("https://example.com"), "api.internal", Method::GET);
        assert!(mw.before(&c).unwrap().is_none());
        assert!(c
            .response_headers()
            .iter()
            .any(|(k, v)| k == "access-control-allow-origin" && v == "https://example.com"));
    }

    #[test]
    fn preflight_returns_204() {
        let mw = CorsMiddleware::new(
            vec!["https://example.com".into()],
            vec!["Content-Type".into()],
            vec![Method::GET, Method::POST],
            false,
            vec![],
            Some(3600),
        );
        let c = ctx(Some("https://example.com"), "api.internal", Method::OPTIONS);
        c.set_response_header("unused", "unused");
        let headers = vec![
            ("host".to_string(), "api.internal".to_string()),
            ("origin".to_string(), "https://example.com".to_string()),
            ("access-control-request-method".to_string(), "POST".to_string()),
        ];
        let c = RequestContext::new(
            RawRequest { method: Method::OPTIONS, url: "/x".to_string(), headers, body: Vec::new() },
            "/x".to_string(),
            ParamVec::new(),
        );
        match mw.before(&c).unwrap().unwrap() {
            HandlerResult::Response(r) => assert_eq!(r.status, 204),
            _ => panic!("expected a Response"),
        }
    }

    #[test]
    fn credentials_and_wildcard_panics() {
        let result = std::panic::catch_unwind(|| {
            CorsMiddleware::new(vec!["*".into()], vec![], vec![Method::GET], true, vec![], None)
        });
        assert!(result.is_err());
    }
}
