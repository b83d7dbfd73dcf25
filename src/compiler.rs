//! Handler Compiler (§4.B): classifies a route once at assembly time and, when any of
//! its declared parameters carry a validation schema, wraps the handler in a binding
//! step that extracts and validates those parameters before the handler body runs.
//!
//! Grounded in the teacher's `dispatcher/core.rs::register_handler` idiom of wrapping a
//! bare callable once at registration and never re-inspecting it per request — here the
//! "classify once, dispatch a fixed path forever" discipline is the same, but the
//! multi-argument extraction the original binding rule describes (`ctx.params[name]`,
//! `ctx.query[name]`, ...) is collapsed onto Rust's single `&RequestContext` handler
//! signature: a handler pulls its own parameters from the context, and the compiler's
//! job is limited to pre-validating the ones that declare a schema (§4.B Binding rule).

use std::sync::Arc;

use serde_json::Value;

use crate::context::RequestContext;
use crate::error::{DispatchError, HttpException};
use crate::route::{Classification, Handler, HandlerResult, ParamDescriptor, ParamKind};
use crate::validation::Validator;

/// Output of compiling one route: the callable to dispatch to and its classification.
pub struct CompiledHandler {
    pub handler: Handler,
    pub classification: Classification,
    /// Present only when `classification == Static`.
    pub static_value: Option<HandlerResult>,
}

fn extract_raw(ctx: &RequestContext, kind: &ParamKind) -> Result<Value, DispatchError> {
    Ok(match kind {
        ParamKind::Path(name) => Value::String(
            ctx.path_param(name)
                .ok_or_else(|| HttpException::bad_request(format!("missing path parameter `{name}`")))?
                .to_string(),
        ),
        ParamKind::Query(name) => ctx.query_param(name).map(Value::String).unwrap_or(Value::Null),
        ParamKind::Header(name) => ctx.header(name).map(|v| Value::String(v.to_string())).unwrap_or(Value::Null),
        ParamKind::Body => ctx.parse_body()?.unwrap_or(Value::Null),
        ParamKind::FullContext | ParamKind::FullRequest => Value::Null,
    })
}

/// Extract and validate every parameter that declares a schema, storing the validated
/// value on the context keyed by position (§4.B: "the validated value is bound
/// instead"). Parameters without a `validation` entry are left for the handler to pull
/// directly via `ctx.path_param`/`ctx.query_param`/etc.
fn bind_validated(
    ctx: &RequestContext,
    params: &[ParamDescriptor],
    validator: &dyn Validator,
) -> Result<(), DispatchError> {
    for param in params {
        let Some(schema) = &param.validation else { continue };
        let raw = extract_raw(ctx, &param.kind)?;
        let validated = validator.validate_or_throw(schema, raw)?;
        ctx.set_validated_param(param.position, validated);
    }
    Ok(())
}

/// Classify and compile one route's handler (§4.B Classification rule, Binding rule,
/// Determinism: "runs exactly once per route during assembly").
///
/// `params` with no `validation` entries produce an unmodified `handler`; mixing a
/// `Body` parameter into the descriptor list implies the compiled callable must be
/// async (§4.B: "body -> ... forces the compiled callable to be async"), so `Static`
/// is only valid when `params` is empty and `handler` is already `Handler::Sync`
/// wrapping a constant.
#[must_use]
pub fn compile(
    params: Vec<ParamDescriptor>,
    classification: Classification,
    static_value: Option<HandlerResult>,
    validator: Arc<dyn Validator>,
    handler: Handler,
) -> CompiledHandler {
    if classification == Classification::Static || params.iter().all(|p| p.validation.is_none()) {
        return CompiledHandler { handler, classification, static_value };
    }

    let handler = match handler {
        Handler::Sync(inner) => {
            let params = params.clone();
            let validator = validator.clone();
            Handler::Sync(Arc::new(move |ctx: &RequestContext| {
                bind_validated(ctx, &params, validator.as_ref())?;
                inner(ctx)
            }))
        }
        Handler::Async(inner) => {
            let params = params.clone();
            let validator = validator.clone();
            Handler::Async(Arc::new(move |ctx: &RequestContext| {
                if let Err(e) = bind_validated(ctx, &params, validator.as_ref()) {
                    return Box::pin(async move { Err(e) });
                }
                inner(ctx)
            }))
        }
    };

    CompiledHandler { handler, classification, static_value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RawRequest;
    use crate::router::ParamVec;
    use crate::validation::NullValidator;
    use http::Method;

    struct UppercaseValidator;
    impl Validator for UppercaseValidator {
        fn has_validation(&self, name: &str) -> bool {
            name == "uppercase"
        }
        fn validate(&self, name: &str, value: Value) -> Result<Value, Vec<crate::error::FieldError>> {
            if name != "uppercase" {
                return Ok(value);
            }
            match value.as_str() {
                Some(s) => Ok(Value::String(s.to_uppercase())),
                None => Err(vec![crate::error::FieldError { field: "id".into(), message: "not a string".into() }]),
            }
        }
    }

    fn ctx_with_path(name: &str, value: &str) -> RequestContext {
        let mut params = ParamVec::new();
        params.push((Arc::from(name), value.to_string()));
        RequestContext::new(
            RawRequest { method: Method::GET, url: "/x".to_string(), headers: Vec::new(), body: Vec::new() },
            "/x".to_string(),
            params,
        )
    }

    #[test]
    fn no_validation_leaves_handler_untouched() {
        let params = vec![ParamDescriptor::new(ParamKind::Path("id".to_string()), 0)];
        let handler = Handler::Sync(Arc::new(|_ctx| Ok(HandlerResult::Text("ok".to_string()))));
        let compiled = compile(params, Classification::Sync, None, Arc::new(NullValidator), handler);
        let c = ctx_with_path("id", "42");
        match compiled.handler {
            Handler::Sync(f) => {
                let result = f(&c).unwrap();
                assert!(matches!(result, HandlerResult::Text(s) if s == "ok"));
                assert!(c.validated_param(0).is_none());
            }
            _ => panic!("expected Sync"),
        }
    }

    #[test]
    fn validated_param_is_bound_before_handler_runs() {
        let params = vec![ParamDescriptor::new(ParamKind::Path("id".to_string()), 0).with_validation("uppercase")];
        let handler = Handler::Sync(Arc::new(|ctx: &RequestContext| {
            let v = ctx.validated_param(0).unwrap();
            Ok(HandlerResult::Text(v.as_str().unwrap().to_string()))
        }));
        let compiled = compile(params, Classification::Sync, None, Arc::new(UppercaseValidator), handler);
        let c = ctx_with_path("id", "abc");
        match compiled.handler {
            Handler::Sync(f) => {
                let result = f(&c).unwrap();
                assert!(matches!(result, HandlerResult::Text(s) if s == "ABC"));
            }
            _ => panic!("expected Sync"),
        }
    }
}
