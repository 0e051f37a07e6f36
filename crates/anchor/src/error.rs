use dacdoc_protocol::{AnchorState, CheckId, CheckIdError};
use thiserror::Error;

/// Result type for anchor operations
pub type Result<T> = std::result::Result<T, AnchorError>;

/// Errors raised while building or resolving anchors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnchorError {
    /// Check identifier failed validation
    #[error("Invalid check id: {0}")]
    InvalidCheckId(#[from] CheckIdError),

    /// Anchor syntax configuration is unusable
    #[error("Invalid anchor syntax: {0}")]
    InvalidSyntax(String),

    /// Anchor state may only be assigned once
    #[error("Anchor for check {check_id} is already resolved as {state:?}")]
    AlreadyResolved { check_id: CheckId, state: AnchorState },

    /// Resolution must move the anchor out of `Unresolved`
    #[error("Anchor for check {check_id} cannot be resolved to Unresolved")]
    UnresolvedAssignment { check_id: CheckId },
}

impl AnchorError {
    /// Create an invalid syntax error
    pub fn invalid_syntax(msg: impl Into<String>) -> Self {
        Self::InvalidSyntax(msg.into())
    }
}

/// Span corruption detected while rewriting one document.
///
/// Fatal for that document only; callers drop the document from their output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error("Span {start}..{end} is out of bounds for a document of {len} bytes")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("Span {start}..{end} does not fall on character boundaries")]
    NotCharBoundary { start: usize, end: usize },

    #[error("Span {start}..{end} overlaps or precedes the previous span ending at {previous_end}")]
    Overlap {
        start: usize,
        end: usize,
        previous_end: usize,
    },

    #[error("Text at {start}..{end} is not the marker for check {check_id}")]
    SpanMismatch {
        start: usize,
        end: usize,
        check_id: CheckId,
    },
}
