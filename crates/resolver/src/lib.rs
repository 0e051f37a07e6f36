//! # DacDoc Resolver
//!
//! Maps check identifiers to anchor states through a pluggable [`CheckEvaluator`].
//!
//! ```text
//! anchors (all documents)
//!     │
//!     ├──> distinct check ids
//!     │
//!     ├──> single-flight cache ── miss ──> evaluator (timeout, retry with backoff)
//!     │                                      └─> unknown / failure ─> Indeterminate
//!     │
//!     └──> ResolutionTable (id → state, fallbacks)
//! ```

mod error;
mod evaluator;
mod policy;
mod resolver;

pub use error::{EvaluationError, ResolverError, Result};
pub use evaluator::{CheckEvaluator, CommandEvaluator, StaticEvaluator};
pub use policy::ResolutionPolicy;
pub use resolver::{FallbackReason, Resolution, ResolutionFallback, ResolutionTable, Resolver};
