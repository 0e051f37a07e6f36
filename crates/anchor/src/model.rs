use crate::error::{AnchorError, Result};
use crate::syntax::AnchorSyntax;
use dacdoc_protocol::{AnchorState, CheckId};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Half-open byte range `[start, end)` within a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Line/column of a span start (both 1-indexed, column counted in chars)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Which marker form the anchor was parsed from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnchorForm {
    /// `[keyword:id]`, never rendered before
    Placeholder,

    /// `![keyword:id](target)`, written by an earlier run
    Rendered { target: String },
}

/// One placeholder occurrence in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    check_id: CheckId,
    span: Span,
    position: Position,
    form: AnchorForm,
    state: AnchorState,
}

impl Anchor {
    #[must_use]
    pub const fn new(check_id: CheckId, span: Span, position: Position, form: AnchorForm) -> Self {
        Self {
            check_id,
            span,
            position,
            form,
            state: AnchorState::Unresolved,
        }
    }

    #[must_use]
    pub const fn check_id(&self) -> &CheckId {
        &self.check_id
    }

    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }

    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    #[must_use]
    pub const fn form(&self) -> &AnchorForm {
        &self.form
    }

    #[must_use]
    pub const fn state(&self) -> AnchorState {
        self.state
    }

    #[must_use]
    pub const fn is_rendered(&self) -> bool {
        matches!(self.form, AnchorForm::Rendered { .. })
    }

    /// Assign the resolution state. Allowed exactly once.
    pub fn resolve(&mut self, state: AnchorState) -> Result<()> {
        if self.state.is_resolved() {
            return Err(AnchorError::AlreadyResolved {
                check_id: self.check_id.clone(),
                state: self.state,
            });
        }
        if !state.is_resolved() {
            return Err(AnchorError::UnresolvedAssignment {
                check_id: self.check_id.clone(),
            });
        }
        self.state = state;
        Ok(())
    }

    /// Whether `slice` is exactly the marker text this anchor was parsed from.
    #[must_use]
    pub fn matches(&self, slice: &str, syntax: &AnchorSyntax) -> bool {
        match &self.form {
            AnchorForm::Placeholder => slice == syntax.placeholder(&self.check_id),
            AnchorForm::Rendered { target } => slice == syntax.rendered(&self.check_id, target),
        }
    }
}
