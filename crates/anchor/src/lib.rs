//! # DacDoc Anchor
//!
//! Parsing and rewriting of check anchors embedded in Markdown.
//!
//! ## Marker forms
//!
//! ```text
//! [dacdoc:check-42]                               placeholder written by an author
//! ![dacdoc:check-42](dacdoc-resources/green.svg)  rendered indicator from an earlier run
//! ```
//!
//! Both forms parse to the same [`Anchor`]; the rewriter always emits the rendered form, so
//! running it again over its own output only swaps the image target.
//!
//! ## Example
//!
//! ```rust
//! use dacdoc_anchor::{AnchorParser, AnchorSyntax, Rewriter};
//! use dacdoc_protocol::{AnchorState, IndicatorSet};
//! use std::path::Path;
//!
//! let parser = AnchorParser::new(AnchorSyntax::default()).unwrap();
//! let text = "Build: [dacdoc:build]";
//! let mut parsed = parser.parse(text);
//! for anchor in &mut parsed.anchors {
//!     anchor.resolve(AnchorState::Passing).unwrap();
//! }
//!
//! let rewriter = Rewriter::new(AnchorSyntax::default(), IndicatorSet::default(), "dacdoc-resources");
//! let out = rewriter.rewrite(text, &parsed.anchors, Path::new("")).unwrap();
//! assert_eq!(out, "Build: ![dacdoc:build](dacdoc-resources/green.svg)");
//! ```

mod error;
mod model;
mod parser;
mod rewriter;
mod syntax;

pub use error::{AnchorError, Result, RewriteError};
pub use model::{Anchor, AnchorForm, Position, Span};
pub use parser::{AnchorParser, DiagnosticKind, ParseDiagnostic, ParsedDocument, Scan, ScanItem};
pub use rewriter::Rewriter;
pub use syntax::AnchorSyntax;
