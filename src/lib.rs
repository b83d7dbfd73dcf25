//! # turbo-core
//!
//! The HTTP request-dispatch core of the Turbo framework: a radix/prefix-tree router
//! with parametric and wildcard segments, an ahead-of-time handler compiler, a
//! dependency-injection container with scoped resolution and cycle detection, a
//! lifecycle state machine (`CONFIGURING -> INITIALISING -> READY -> SERVING ->
//! DRAINING -> STOPPED`), a dispatch assembler that wires controller metadata into a
//! frozen route table, a request executor with strict middleware short-circuit, and a
//! CORS + exception-normalisation edge.
//!
//! The ORM, queue, scheduler, docs site, and concrete validator/cache backends are
//! external collaborators; this crate only implements the contracts they plug into
//! ([`validation::Validator`], [`cache::CacheService`]).
//!
//! ## Module map
//!
//! - [`router`] — Radix Route Index (method-indexed prefix tree)
//! - [`route`] — route descriptors, the `HandlerResult` sum type, the `Handler` callable
//! - [`compiler`] — Handler Compiler (classification + validated-parameter binding)
//! - [`di`] — DI Container (singleton / per-request / per-injection scopes, cycle detection)
//! - [`lifecycle`] — Lifecycle Orchestrator (state machine, hook registries, signals)
//! - [`assembler`] — Dispatch Assembler (controller metadata -> frozen route table)
//! - [`executor`] — Request Executor (middleware chain, panic isolation, normalisation)
//! - [`middleware`] — the `Middleware` trait and the CORS edge
//! - [`validation`] — the validator adapter contract
//! - [`cache`] — the cache driver contract plus a default in-memory implementation
//! - [`transport`] — the transport boundary trait plus an in-process test transport
//! - [`config`] — `TurboConfig`, loaded from env and an optional YAML overlay
//! - [`app`] — top-level wiring: `AppBuilder` / `App`
//! - [`context`] — per-request `RequestContext`
//! - [`error`] — the registration-time and request-time error taxonomies
//! - [`ids`] — ULID-backed request correlation IDs
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use http::Method;
//! use turbo_core::app::AppBuilder;
//! use turbo_core::assembler::{ControllerMetadata, RouteRegistration};
//! use turbo_core::config::TurboConfig;
//! use turbo_core::context::RawRequest;
//! use turbo_core::route::{Classification, Handler, HandlerResult};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let root = RouteRegistration {
//!     method: Method::GET,
//!     subpath: "/".to_string(),
//!     params: Vec::new(),
//!     handler: Handler::Sync(Arc::new(|_ctx| Ok(HandlerResult::Text("ok".to_string())))),
//!     classification: Classification::Sync,
//!     static_value: None,
//!     middleware: Vec::new(),
//!     handler_name: "root".to_string(),
//! };
//!
//! let app = AppBuilder::new(TurboConfig::from_env())
//!     .with_controller(ControllerMetadata::new("").with_route(root))
//!     .build()
//!     .await?;
//! app.serve().await?;
//!
//! let response = app
//!     .dispatch(RawRequest { method: Method::GET, url: "/".to_string(), headers: Vec::new(), body: Vec::new() })
//!     .await;
//! assert_eq!(response.status, 200);
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod assembler;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod context;
pub mod di;
pub mod error;
pub mod executor;
pub mod ids;
pub mod lifecycle;
pub mod middleware;
pub mod route;
pub mod router;
pub mod transport;
pub mod validation;

pub use app::{App, AppBuilder};
pub use context::RequestContext;
pub use error::DispatchError;
pub use ids::RequestId;
pub use route::{Handler, HandlerResult, RouteDescriptor};
pub use router::Router;
