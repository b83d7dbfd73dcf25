//! Middleware trait (§4.E/§4.F/§5): chain-of-responsibility over the request context,
//! adapted from the teacher's `Middleware` trait (`before`/`after` with short-circuit
//! via `Option<HandlerResponse>`) onto the async `RequestContext`/`HandlerResult` model.

use std::time::Duration;

use crate::context::RequestContext;
use crate::error::DispatchError;
use crate::route::HandlerResult;

/// Returning `Some` from `before` short-circuits the chain: no later middleware and
/// no handler runs (testable property #6).
pub trait Middleware: Send + Sync {
    fn before(&self, _ctx: &RequestContext) -> Result<Option<HandlerResult>, DispatchError> {
        Ok(None)
    }

    fn after(&self, _ctx: &RequestContext, _result: &mut HandlerResult, _latency: Duration) {}
}
