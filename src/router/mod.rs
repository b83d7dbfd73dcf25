//! Radix Route Index (§4.A): method-indexed prefix tree over literal, `:param`, and
//! `*wildcard` path segments. `O(k)` matching where k is the path length, grounded in
//! the teacher's radix tree (`RadixNode`, `Cow`-backed segments, `ParamVec`).

mod core;
mod radix;

pub use core::{RouteMatch, Router, ParamVec, MAX_INLINE_PARAMS};
pub use radix::normalise;
