//! Error taxonomy for the dispatch core.
//!
//! Registration-time errors (`RouterError`, `DiError`, `LifecycleError`) are fatal and
//! carry enough context to name the offending route/token/hook. Request-time errors
//! (`HttpException`, `ValidationException`) are caught by the executor and normalised
//! into an HTTP response; they never escape to the transport.

use serde_json::Value;
use thiserror::Error;

/// Fatal error raised while inserting or looking up routes in the radix index.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("route {method} {pattern} conflicts with an already-registered route at the same position")]
    AmbiguousRoute { method: String, pattern: String },

    #[error("a wildcard segment must be the final segment of pattern {pattern}")]
    WildcardNotTerminal { pattern: String },

    #[error("pattern {pattern} is empty after normalisation")]
    EmptyPattern { pattern: String },
}

/// Fatal error raised while registering providers or resolving the DI graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiError {
    #[error("no provider registered for token `{0}`")]
    MissingProvider(String),

    #[error("dependency cycle detected: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("provider for `{0}` cannot be registered once the application is SERVING")]
    RegistrationClosed(String),

    #[error("provider for `{0}` requires a request-local scope map, none was supplied")]
    MissingRequestScope(String),
}

/// Fatal error raised while running lifecycle hooks or transitioning state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("INIT hook `{hook}` failed: {message}")]
    InitHookFailed { hook: String, message: String },

    #[error("illegal transition from {from:?} to {to:?}")]
    IllegalTransition { from: String, to: String },

    #[error("operation `{operation}` is not legal in state {state:?}")]
    IllegalInState { operation: String, state: String },
}

/// A recognised, request-time HTTP error. Handlers and middleware return this to
/// short-circuit with a specific status and body rather than panicking.
#[derive(Debug, Clone)]
pub struct HttpException {
    pub status: u16,
    pub body: Value,
}

impl HttpException {
    pub fn new(status: u16, body: impl Into<Value>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, Value::String(message.into()))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, Value::String(message.into()))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, Value::String(message.into()))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, Value::String(message.into()))
    }
}

impl std::fmt::Display for HttpException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HttpException({}): {}", self.status, self.body)
    }
}

impl std::error::Error for HttpException {}

/// Field-level validation failure, always normalised to HTTP 400.
#[derive(Debug, Clone)]
pub struct ValidationException {
    pub errors: Vec<FieldError>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl ValidationException {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![FieldError {
            field: field.into(),
            message: message.into(),
        }])
    }
}

impl std::fmt::Display for ValidationException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "validation failed: {} error(s)", self.errors.len())
    }
}

impl std::error::Error for ValidationException {}

/// Anything a handler or middleware can fail with. The executor matches on this to
/// decide how to normalise the error into a response (see `executor::normalise_error`).
#[derive(Debug)]
pub enum DispatchError {
    Http(HttpException),
    Validation(ValidationException),
    /// Anything else — normalised to a fixed 500 body, original error logged.
    Unknown(Box<dyn std::error::Error + Send + Sync>),
}

impl From<HttpException> for DispatchError {
    fn from(e: HttpException) -> Self {
        DispatchError::Http(e)
    }
}

impl From<ValidationException> for DispatchError {
    fn from(e: ValidationException) -> Self {
        DispatchError::Validation(e)
    }
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Http(e) => write!(f, "{e}"),
            DispatchError::Validation(e) => write!(f, "{e}"),
            DispatchError::Unknown(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DispatchError {}
