use serde::{Deserialize, Serialize};

/// Statistics about one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Documents processed successfully
    pub documents: usize,

    /// Documents whose content changed
    pub changed: usize,

    /// Documents excluded because of a read or rewrite failure
    pub failed: usize,

    /// Anchors found across all documents
    pub anchors: usize,

    /// Malformed marker occurrences
    pub diagnostics: usize,

    /// Distinct check identifiers resolved
    pub checks: usize,

    /// Identifiers that fell back to indeterminate
    pub fallbacks: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,
}
