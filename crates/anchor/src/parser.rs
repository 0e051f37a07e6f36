use crate::error::Result;
use crate::model::{Anchor, AnchorForm, Position, Span};
use crate::syntax::AnchorSyntax;
use dacdoc_protocol::{is_check_id_char, CheckId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

const EXCERPT_MAX_CHARS: usize = 48;

/// Why a marker-looking occurrence was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// `[keyword:]`
    EmptyIdentifier,

    /// A character outside the identifier charset before the closing bracket
    InvalidCharacter { found: char },

    /// Line or input ended before the closing bracket
    Unterminated,
}

/// Non-fatal syntax problem; the text at `span` is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseDiagnostic {
    pub kind: DiagnosticKind,
    pub span: Span,
    pub position: Position,
    pub excerpt: String,
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Position { line, column } = self.position;
        match &self.kind {
            DiagnosticKind::EmptyIdentifier => {
                write!(f, "{line}:{column}: empty check identifier in `{}`", self.excerpt)
            }
            DiagnosticKind::InvalidCharacter { found } => write!(
                f,
                "{line}:{column}: invalid character {found:?} in `{}`",
                self.excerpt
            ),
            DiagnosticKind::Unterminated => {
                write!(f, "{line}:{column}: unterminated marker `{}`", self.excerpt)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanItem {
    Anchor(Anchor),
    Diagnostic(ParseDiagnostic),
}

/// Anchors and diagnostics of one document, both ordered by position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub anchors: Vec<Anchor>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl ParsedDocument {
    #[must_use]
    pub fn check_ids(&self) -> BTreeSet<&CheckId> {
        self.anchors.iter().map(Anchor::check_id).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty() && self.diagnostics.is_empty()
    }
}

/// Finds anchors in Markdown text
#[derive(Debug, Clone)]
pub struct AnchorParser {
    syntax: AnchorSyntax,
    open: String,
}

impl AnchorParser {
    pub fn new(syntax: AnchorSyntax) -> Result<Self> {
        syntax.validate()?;
        let open = syntax.open_marker();
        Ok(Self { syntax, open })
    }

    /// Lazily walk `text`. The returned iterator is `Clone`, so a scan can be restarted from
    /// any point.
    #[must_use]
    pub fn scan<'a>(&'a self, text: &'a str) -> Scan<'a> {
        Scan::new(text, &self.open, self.syntax.skip_code_fences)
    }

    #[must_use]
    pub fn parse(&self, text: &str) -> ParsedDocument {
        let mut document = ParsedDocument::default();
        for item in self.scan(text) {
            match item {
                ScanItem::Anchor(anchor) => document.anchors.push(anchor),
                ScanItem::Diagnostic(diagnostic) => document.diagnostics.push(diagnostic),
            }
        }
        document
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fence {
    marker: u8,
    len: usize,
}

impl Fence {
    fn opening(line: &str) -> Option<Self> {
        let body = line.trim_start_matches(' ');
        if line.len() - body.len() > 3 {
            return None;
        }
        let marker = *body.as_bytes().first()?;
        if marker != b'`' && marker != b'~' {
            return None;
        }
        let len = body.bytes().take_while(|b| *b == marker).count();
        if len < 3 {
            return None;
        }
        // ```inline``` on one line is a code span, not a fence
        if marker == b'`' && body[len..].contains('`') {
            return None;
        }
        Some(Self { marker, len })
    }

    fn is_closed_by(self, line: &str) -> bool {
        let body = line.trim_start_matches(' ');
        if line.len() - body.len() > 3 {
            return false;
        }
        let len = body.bytes().take_while(|b| *b == self.marker).count();
        len >= self.len && body[len..].trim().is_empty()
    }
}

/// Lazy single-pass scan over one document.
///
/// Markers never span lines, so the scan works line by line: fences are tracked when a line
/// is entered and marker candidates are searched within the line only.
#[derive(Debug, Clone)]
pub struct Scan<'a> {
    text: &'a str,
    open: &'a str,
    skip_fences: bool,
    fence: Option<Fence>,
    next_line_start: usize,
    exhausted: bool,
    in_line: bool,
    line_no: usize,
    line_end: usize,
    cursor: usize,
    column_byte: usize,
    column_chars: usize,
}

impl<'a> Scan<'a> {
    fn new(text: &'a str, open: &'a str, skip_fences: bool) -> Self {
        Self {
            text,
            open,
            skip_fences,
            fence: None,
            next_line_start: 0,
            exhausted: false,
            in_line: false,
            line_no: 0,
            line_end: 0,
            cursor: 0,
            column_byte: 0,
            column_chars: 0,
        }
    }

    fn enter_next_line(&mut self) -> bool {
        loop {
            if self.exhausted {
                return false;
            }
            let start = self.next_line_start;
            let end = self.text[start..]
                .find('\n')
                .map_or(self.text.len(), |offset| start + offset);
            if end >= self.text.len() {
                self.exhausted = true;
            } else {
                self.next_line_start = end + 1;
            }
            self.line_no += 1;

            let line = &self.text[start..end];
            if self.skip_fences {
                if let Some(fence) = self.fence {
                    if fence.is_closed_by(line) {
                        self.fence = None;
                    }
                    continue;
                }
                if let Some(fence) = Fence::opening(line) {
                    self.fence = Some(fence);
                    continue;
                }
            }

            self.line_end = end;
            self.cursor = start;
            self.column_byte = start;
            self.column_chars = 0;
            self.in_line = true;
            return true;
        }
    }

    /// Position of `at`, which must not precede the last position computed on this line.
    fn position(&mut self, at: usize) -> Position {
        self.column_chars += self.text[self.column_byte..at].chars().count();
        self.column_byte = at;
        Position {
            line: self.line_no,
            column: self.column_chars + 1,
        }
    }

    fn candidate(&mut self, start: usize) -> ScanItem {
        let id_start = start + self.open.len();
        let rest = &self.text[id_start..self.line_end];
        let id_len = rest
            .find(|ch: char| !is_check_id_char(ch))
            .unwrap_or(rest.len());
        let id_end = id_start + id_len;

        let next = self.text[id_end..self.line_end].chars().next();
        let (kind, end) = match next {
            Some(']') => match CheckId::new(&self.text[id_start..id_end]) {
                Ok(check_id) => return ScanItem::Anchor(self.anchor(start, id_end + 1, check_id)),
                // charset is already enforced above, only emptiness is left
                Err(_) => (DiagnosticKind::EmptyIdentifier, id_end + 1),
            },
            None | Some('\r') => (DiagnosticKind::Unterminated, id_end),
            Some(found) => (DiagnosticKind::InvalidCharacter { found }, id_end),
        };

        let excerpt: String = self.text[start..self.line_end]
            .trim_end_matches('\r')
            .chars()
            .take(EXCERPT_MAX_CHARS)
            .collect();
        let position = self.position(start);
        self.cursor = id_start;

        ScanItem::Diagnostic(ParseDiagnostic {
            kind,
            span: Span::new(start, end),
            position,
            excerpt,
        })
    }

    fn anchor(&mut self, start: usize, close: usize, check_id: CheckId) -> Anchor {
        let (span, form) = match self.rendered_target(start, close) {
            Some((end, target)) => (Span::new(start - 1, end), AnchorForm::Rendered { target }),
            None => (Span::new(start, close), AnchorForm::Placeholder),
        };
        let position = self.position(span.start);
        self.cursor = span.end;
        Anchor::new(check_id, span, position, form)
    }

    /// `(target)` right after the closing bracket of a `!`-prefixed marker.
    ///
    /// Brackets end the target, so marker text inside the parentheses is never swallowed.
    fn rendered_target(&self, start: usize, close: usize) -> Option<(usize, String)> {
        if start == 0 || self.text.as_bytes()[start - 1] != b'!' {
            return None;
        }
        let rest = self.text[close..self.line_end].strip_prefix('(')?;
        let len = rest
            .find(|ch: char| matches!(ch, '(' | ')' | '[' | ']') || ch.is_whitespace())
            .unwrap_or(rest.len());
        if len == 0 || !rest[len..].starts_with(')') {
            return None;
        }
        Some((close + 1 + len + 1, rest[..len].to_string()))
    }
}

impl Iterator for Scan<'_> {
    type Item = ScanItem;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if !self.in_line {
                if !self.enter_next_line() {
                    return None;
                }
                continue;
            }

            match self.text[self.cursor..self.line_end].find(self.open) {
                Some(offset) => return Some(self.candidate(self.cursor + offset)),
                None => self.in_line = false,
            }
        }
    }
}
