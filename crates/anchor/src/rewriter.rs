use crate::error::RewriteError;
use crate::model::{Anchor, Span};
use crate::syntax::AnchorSyntax;
use dacdoc_protocol::{resource_href, AnchorState, IndicatorSet};
use std::path::Path;

/// Replaces anchor spans with indicator references.
///
/// Output is assembled from slices of the original text, so every span keeps referring to the
/// text it was parsed from no matter how long the replacements are. Bytes outside spans are
/// copied verbatim.
#[derive(Debug, Clone)]
pub struct Rewriter {
    syntax: AnchorSyntax,
    indicators: IndicatorSet,
    resource_dir: String,
}

impl Rewriter {
    pub fn new(
        syntax: AnchorSyntax,
        indicators: IndicatorSet,
        resource_dir: impl Into<String>,
    ) -> Self {
        Self {
            syntax,
            indicators,
            resource_dir: resource_dir.into(),
        }
    }

    /// Link target of the indicator for `state`, relative to `document_dir`
    #[must_use]
    pub fn href(&self, document_dir: &Path, state: AnchorState) -> String {
        let file_name = self.indicators.file_name(state.indicator());
        resource_href(document_dir, &self.resource_dir, file_name)
    }

    /// Render every anchor as `![keyword:id](href)`.
    ///
    /// `anchors` must be ordered by span start, as the parser yields them. `document_dir` is the
    /// document's directory relative to the tree root.
    pub fn rewrite(
        &self,
        text: &str,
        anchors: &[Anchor],
        document_dir: &Path,
    ) -> Result<String, RewriteError> {
        self.splice(text, anchors, |anchor| {
            if !anchor.state().is_resolved() {
                log::debug!(
                    "Rendering unresolved anchor {} as {}",
                    anchor.check_id(),
                    anchor.state().indicator()
                );
            }
            let href = self.href(document_dir, anchor.state());
            self.syntax.rendered(anchor.check_id(), &href)
        })
    }

    /// Turn every anchor back into its `[keyword:id]` placeholder.
    pub fn revert(&self, text: &str, anchors: &[Anchor]) -> Result<String, RewriteError> {
        self.splice(text, anchors, |anchor| self.syntax.placeholder(anchor.check_id()))
    }

    fn splice(
        &self,
        text: &str,
        anchors: &[Anchor],
        render: impl Fn(&Anchor) -> String,
    ) -> Result<String, RewriteError> {
        let mut out = String::with_capacity(text.len() + anchors.len() * 32);
        let mut cursor = 0;
        for anchor in anchors {
            self.check_span(text, anchor, cursor)?;
            let span = anchor.span();
            out.push_str(&text[cursor..span.start]);
            out.push_str(&render(anchor));
            cursor = span.end;
        }
        out.push_str(&text[cursor..]);
        Ok(out)
    }

    fn check_span(
        &self,
        text: &str,
        anchor: &Anchor,
        previous_end: usize,
    ) -> Result<(), RewriteError> {
        let Span { start, end } = anchor.span();
        if start > end || end > text.len() {
            return Err(RewriteError::OutOfBounds {
                start,
                end,
                len: text.len(),
            });
        }
        if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            return Err(RewriteError::NotCharBoundary { start, end });
        }
        if start < previous_end {
            return Err(RewriteError::Overlap {
                start,
                end,
                previous_end,
            });
        }
        if !anchor.matches(&text[start..end], &self.syntax) {
            return Err(RewriteError::SpanMismatch {
                start,
                end,
                check_id: anchor.check_id().clone(),
            });
        }
        Ok(())
    }
}
