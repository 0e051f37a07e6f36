use crate::stats::RunStats;
use dacdoc_anchor::{ParseDiagnostic, ParsedDocument};
use dacdoc_resolver::ResolutionFallback;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Something that went wrong without aborting the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WarningKind {
    /// Entry below the root could not be read during the scan
    ScanSkipped { message: String },

    /// Document could not be read or decoded; excluded from the output
    ReadFailed { message: String },

    /// Malformed marker, left untouched
    Diagnostic(ParseDiagnostic),

    /// Check resolved to indeterminate
    Fallback(ResolutionFallback),

    /// Span corruption while rewriting; document excluded from the output
    RewriteFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub path: Option<PathBuf>,
    pub kind: WarningKind,
}

impl Warning {
    pub(crate) fn new(path: Option<PathBuf>, kind: WarningKind) -> Self {
        let warning = Self { path, kind };
        log::warn!("{warning}");
        warning
    }

    /// Whether the affected document was dropped from the output
    #[must_use]
    pub const fn excludes_document(&self) -> bool {
        matches!(
            self.kind,
            WarningKind::ReadFailed { .. } | WarningKind::RewriteFailed { .. }
        )
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}: ", path.display())?;
        }
        match &self.kind {
            WarningKind::ScanSkipped { message } => write!(f, "skipped during scan: {message}"),
            WarningKind::ReadFailed { message } => write!(f, "{message}"),
            WarningKind::Diagnostic(diagnostic) => write!(f, "{diagnostic}"),
            WarningKind::Fallback(fallback) => write!(f, "{fallback}, rendered as indeterminate"),
            WarningKind::RewriteFailed { message } => write!(f, "{message}"),
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Canonical tree root
    pub root: PathBuf,

    /// New content for every successfully processed document
    pub outputs: BTreeMap<PathBuf, String>,

    /// Documents whose new content differs from what was read
    pub changed: BTreeSet<PathBuf>,

    pub warnings: Vec<Warning>,

    pub stats: RunStats,
}

/// Anchors and diagnostics per document, without resolution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InspectReport {
    pub root: PathBuf,
    pub documents: BTreeMap<PathBuf, ParsedDocument>,
    pub warnings: Vec<Warning>,
}

impl RunReport {
    /// `(path, content)` of documents that need to be written back
    pub fn changed_outputs(&self) -> impl Iterator<Item = (&PathBuf, &String)> {
        self.outputs
            .iter()
            .filter(|(path, _)| self.changed.contains(*path))
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.changed.is_empty() && self.warnings.is_empty()
    }
}
