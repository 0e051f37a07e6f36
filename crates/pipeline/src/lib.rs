//! # DacDoc Pipeline
//!
//! Turns check placeholders in a documentation tree into status indicators.
//!
//! ```text
//! root ──> DocumentScanner ──> README files
//!                                  │
//!                         read + parse (bounded)
//!                                  │
//!                     anchors ──> Resolver (one batch, single flight)
//!                                  │
//!                        rewrite (bounded) ──> RunReport { outputs, changed, warnings }
//! ```
//!
//! Nothing is written back to disk here; the caller decides what to do with
//! [`RunReport::outputs`].

mod config;
mod error;
mod limits;
mod pipeline;
mod report;
mod scanner;
mod stats;

pub use config::{PipelineConfig, CONFIG_FILE_NAME};
pub use error::{ConfigError, DocumentError, ScanError};
pub use pipeline::Pipeline;
pub use report::{InspectReport, RunReport, Warning, WarningKind};
pub use scanner::{DocumentScanner, ScanOptions, ScanOutcome};
pub use stats::RunStats;
