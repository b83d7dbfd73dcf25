//! Middleware chain-of-responsibility (§4.E/§4.F/§4.G).
//!
//! A route's middleware chain is composed by the Dispatch Assembler as
//! `global ++ plugin ++ controller ++ method`, in that order; `before` hooks run
//! front-to-back and `after` hooks run back-to-front, with the first `Some` returned
//! from `before` short-circuiting the rest of the chain and the handler itself
//! (testable property #6).

mod core;
mod cors;

pub use core::Middleware;
pub use cors::{CorsConfigError, CorsMiddleware, CorsMiddlewareBuilder, OriginValidation};
