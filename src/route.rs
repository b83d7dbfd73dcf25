//! Route descriptors and the handler-result sum type (§3, §4.B, §9 of the design notes).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::Method;
use serde_json::Value;

use crate::context::RequestContext;
use crate::error::DispatchError;
use crate::middleware::Middleware;

/// Where a handler parameter's value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    Path(String),
    Query(String),
    Header(String),
    Body,
    FullContext,
    FullRequest,
}

/// One declared parameter of a handler, in argument-list order.
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    pub kind: ParamKind,
    pub position: usize,
    /// Name of a registered validator adapter to run the extracted value through.
    pub validation: Option<String>,
}

impl ParamDescriptor {
    pub fn new(kind: ParamKind, position: usize) -> Self {
        Self {
            kind,
            position,
            validation: None,
        }
    }

    pub fn with_validation(mut self, name: impl Into<String>) -> Self {
        self.validation = Some(name.into());
        self
    }
}

/// Compile-time dispatch-path tag produced by the handler compiler (§4.B).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Invoked once at compile time; the route is served the captured value forever.
    Static,
    Sync,
    Async,
}

/// What a handler hands back to the executor before response normalisation (§9: "Model
/// as a sum type `HandlerResult = Response | Text(string) | Json(value)`").
#[derive(Debug, Clone)]
pub enum HandlerResult {
    Response(RawResponse),
    Text(String),
    Json(Value),
}

/// A fully-formed response a handler may return directly, bypassing normalisation.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The compiled callable a route dispatches to. `Sync`/`Async` mirror §9's
/// "Callable = Sync(fn) | Async(fn)" variant; the executor picks a path at assembly
/// time rather than branching on every request.
#[derive(Clone)]
pub enum Handler {
    Sync(Arc<dyn Fn(&RequestContext) -> Result<HandlerResult, DispatchError> + Send + Sync>),
    Async(
        Arc<
            dyn Fn(&RequestContext) -> BoxFuture<'static, Result<HandlerResult, DispatchError>>
                + Send
                + Sync,
        >,
    ),
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Sync(_) => write!(f, "Handler::Sync(..)"),
            Handler::Async(_) => write!(f, "Handler::Async(..)"),
        }
    }
}

/// Immutable description of one registered route, produced by the Dispatch Assembler
/// and consumed by the Radix Route Index and Request Executor.
#[derive(Clone)]
pub struct RouteDescriptor {
    pub method: Method,
    /// Normalised pattern, e.g. `/users/:id/posts/*rest`.
    pub pattern: String,
    pub params: Vec<ParamDescriptor>,
    pub handler: Handler,
    pub middleware: Vec<Arc<dyn Middleware>>,
    pub classification: Classification,
    /// Present only when `classification == Static`; the precomputed result.
    pub static_value: Option<HandlerResult>,
    pub handler_name: String,
}

impl std::fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("classification", &self.classification)
            .field("handler_name", &self.handler_name)
            .finish()
    }
}
