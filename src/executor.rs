//! Request Executor (§4.F): runs the middleware chain around a matched route, invokes
//! the compiled handler, and normalises the outcome into an HTTP response.
//!
//! Grounded in the teacher's `dispatcher/core.rs::dispatch` (coroutine send/receive
//! around a handler call, panic-caught, normalised into `HandlerResponse`) — the
//! coroutine channel hop is dropped since handlers here are plain `Fn`/async closures
//! running on the caller's executor, but the panic isolation and before/after ordering
//! are kept.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use serde_json::json;
use tracing::{error, warn};

use crate::context::RequestContext;
use crate::error::DispatchError;
use crate::route::{Handler, HandlerResult, RawResponse, RouteDescriptor};

/// A fully normalised HTTP response, ready for the transport to serialise.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Normalise a successful handler/middleware outcome into a response. Exposed at
/// `pub(crate)` so the CORS edge can normalise a preflight short-circuit that happens
/// before a route is matched (see `app::App::dispatch`).
pub(crate) fn normalise_ok(ctx: &RequestContext, result: HandlerResult) -> HttpResponse {
    let mut response = match result {
        HandlerResult::Response(raw) => raw,
        HandlerResult::Text(text) => RawResponse::new(200, text.into_bytes())
            .with_header("content-type", "text/plain; charset=utf-8"),
        HandlerResult::Json(value) => {
            let body = serde_json::to_vec(&value).unwrap_or_default();
            RawResponse::new(200, body).with_header("content-type", "application/json")
        }
    };
    if let Some(status) = ctx.status_override() {
        response.status = status;
    }
    for (name, value) in ctx.response_headers() {
        response.headers.push((name, value));
    }
    HttpResponse { status: response.status, headers: response.headers, body: response.body }
}

/// The fixed body for an unrecognised or panicking failure (§4.G, §7, testable
/// property #10).
const INTERNAL_ERROR_BODY: &[u8] = br#"{"statusCode":500,"message":"Internal Server Error"}"#;

/// Serialise an `HttpException` body. A plain string body is written unquoted
/// (testable property #10's literal-body wording); any other JSON value is written
/// as JSON.
fn serialise_exception_body(body: &serde_json::Value) -> Vec<u8> {
    match body.as_str() {
        Some(s) => s.as_bytes().to_vec(),
        None => serde_json::to_vec(body).unwrap_or_default(),
    }
}

/// Map a [`DispatchError`] to a response (§7 Error handling table). `Unknown` errors are
/// logged in full but only a fixed 500 body crosses the transport boundary.
pub(crate) fn normalise_error(err: DispatchError) -> HttpResponse {
    match err {
        DispatchError::Http(e) => {
            let body = serialise_exception_body(&e.body);
            HttpResponse { status: e.status, headers: vec![("content-type".into(), "application/json".into())], body }
        }
        DispatchError::Validation(e) => {
            let body = serde_json::to_vec(&json!({ "errors": e.errors })).unwrap_or_default();
            HttpResponse { status: 400, headers: vec![("content-type".into(), "application/json".into())], body }
        }
        DispatchError::Unknown(e) => {
            error!(error = %e, "unhandled error in request pipeline");
            HttpResponse {
                status: 500,
                headers: vec![("content-type".into(), "application/json".into())],
                body: INTERNAL_ERROR_BODY.to_vec(),
            }
        }
    }
}

fn panic_response() -> HttpResponse {
    HttpResponse {
        status: 500,
        headers: vec![("content-type".into(), "application/json".into())],
        body: INTERNAL_ERROR_BODY.to_vec(),
    }
}

/// Execute one request against an already-matched route (testable property #6: strict
/// before/after ordering with first-`Some` short-circuit).
pub async fn execute(route: &RouteDescriptor, ctx: &RequestContext) -> HttpResponse {
    let start = Instant::now();

    let mut short_circuited = None;
    for mw in &route.middleware {
        match mw.before(ctx) {
            Ok(Some(result)) => {
                short_circuited = Some(Ok(result));
                break;
            }
            Ok(None) => continue,
            Err(e) => {
                short_circuited = Some(Err(e));
                break;
            }
        }
    }

    let outcome: Result<HandlerResult, DispatchError> = match short_circuited {
        Some(outcome) => outcome,
        None => invoke_handler(route, ctx).await,
    };

    let mut result = match outcome {
        Ok(result) => result,
        Err(e) => {
            let response = normalise_error(e);
            run_after_hooks(route, ctx, &mut HandlerResult::Response(RawResponse::new(response.status, response.body.clone())), start.elapsed());
            return response;
        }
    };

    run_after_hooks(route, ctx, &mut result, start.elapsed());
    normalise_ok(ctx, result)
}

fn run_after_hooks(route: &RouteDescriptor, ctx: &RequestContext, result: &mut HandlerResult, latency: Duration) {
    for mw in route.middleware.iter().rev() {
        mw.after(ctx, result, latency);
    }
}

async fn invoke_handler(route: &RouteDescriptor, ctx: &RequestContext) -> Result<HandlerResult, DispatchError> {
    if let Some(value) = &route.static_value {
        return Ok(value.clone());
    }

    match &route.handler {
        Handler::Sync(f) => {
            let f = f.clone();
            match catch_unwind(AssertUnwindSafe(|| f(ctx))) {
                Ok(result) => result,
                Err(payload) => {
                    warn!(handler = %route.handler_name, "handler panicked");
                    drop(payload);
                    Ok(HandlerResult::Response(panic_response_as_raw()))
                }
            }
        }
        Handler::Async(f) => {
            let fut = f(ctx);
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => {
                    warn!(handler = %route.handler_name, "handler panicked");
                    drop(payload);
                    Ok(HandlerResult::Response(panic_response_as_raw()))
                }
            }
        }
    }
}

fn panic_response_as_raw() -> RawResponse {
    let r = panic_response();
    RawResponse { status: r.status, headers: r.headers, body: r.body }
}
