use crate::error::ScanError;
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which files count as documentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanOptions {
    /// Exact file names, compared case-insensitively
    pub file_names: Vec<String>,

    /// Extra extensions (without the dot) that qualify any file, e.g. `md`
    pub extensions: Vec<String>,

    /// Honour `.gitignore`, `.ignore` and git excludes
    pub respect_gitignore: bool,

    /// Descend into hidden files and directories
    pub include_hidden: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            file_names: vec!["README.md".to_string()],
            extensions: Vec::new(),
            respect_gitignore: true,
            include_hidden: false,
        }
    }
}

/// Result of a successful scan
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Canonical tree root
    pub root: PathBuf,

    /// Absolute, sorted, de-duplicated document paths
    pub files: Vec<PathBuf>,

    /// Entries that could not be read and were skipped
    pub skipped: Vec<String>,
}

/// Scanner for finding documentation files in a tree
pub struct DocumentScanner {
    root: PathBuf,
    options: ScanOptions,
    excluded: Vec<PathBuf>,
}

impl DocumentScanner {
    pub fn new(root: impl AsRef<Path>, options: ScanOptions) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            options,
            excluded: Vec::new(),
        }
    }

    /// Skip `dir` (relative to the root) and everything below it.
    #[must_use]
    pub fn exclude(mut self, dir: impl AsRef<Path>) -> Self {
        self.excluded.push(dir.as_ref().to_path_buf());
        self
    }

    /// Walk the tree. Only an unusable root is an error; unreadable entries below it are
    /// reported in [`ScanOutcome::skipped`].
    pub fn scan(&self) -> Result<ScanOutcome, ScanError> {
        let root = self.checked_root()?;

        let excluded: Vec<PathBuf> = self
            .excluded
            .iter()
            .map(|dir| normalize_relative(dir))
            .filter(|dir| !dir.as_os_str().is_empty())
            .collect();

        let respect = self.options.respect_gitignore;
        let mut builder = WalkBuilder::new(&root);
        builder
            .hidden(!self.options.include_hidden)
            .git_ignore(respect)
            .git_global(respect)
            .git_exclude(respect)
            .ignore(respect)
            .parents(respect)
            .require_git(false);

        let filter_root = root.clone();
        builder.filter_entry(move |entry| {
            !is_ignored_scope(entry.path(), &filter_root, &excluded)
        });

        let mut outcome = ScanOutcome {
            root: root.clone(),
            ..Default::default()
        };
        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }
                    let path = entry.path();
                    if self.is_document(path) {
                        outcome.files.push(path.to_path_buf());
                    } else {
                        log::trace!("Skipping non-document {}", path.display());
                    }
                }
                Err(e) => {
                    log::warn!("Failed to read entry: {e}");
                    outcome.skipped.push(e.to_string());
                }
            }
        }

        outcome.files.sort();
        outcome.files.dedup();
        log::info!(
            "Found {} documentation files under {}",
            outcome.files.len(),
            root.display()
        );
        Ok(outcome)
    }

    fn checked_root(&self) -> Result<PathBuf, ScanError> {
        let meta = std::fs::metadata(&self.root).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ScanError::NotFound(self.root.clone())
            } else {
                ScanError::Unreadable {
                    path: self.root.clone(),
                    source,
                }
            }
        })?;
        if !meta.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }

        let unreadable = |source| ScanError::Unreadable {
            path: self.root.clone(),
            source,
        };
        std::fs::read_dir(&self.root).map_err(unreadable)?;
        std::fs::canonicalize(&self.root).map_err(unreadable)
    }

    fn is_document(&self, path: &Path) -> bool {
        if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
            if self
                .options
                .file_names
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(file_name))
            {
                return true;
            }
        }

        if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
            return self
                .options
                .extensions
                .iter()
                .any(|candidate| candidate.trim_start_matches('.').eq_ignore_ascii_case(ext));
        }

        false
    }
}

fn normalize_relative(dir: &Path) -> PathBuf {
    dir.components()
        .filter(|component| matches!(component, std::path::Component::Normal(_)))
        .collect()
}

fn is_ignored_scope(path: &Path, root: &Path, excluded: &[PathBuf]) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    if excluded.iter().any(|dir| relative.starts_with(dir)) {
        return true;
    }
    relative.components().any(|component| match component {
        std::path::Component::Normal(name) => {
            let lowered = name.to_string_lossy().to_lowercase();
            IGNORED_SCOPES.iter().any(|ignored| *ignored == lowered)
        }
        _ => false,
    })
}

const IGNORED_SCOPES: &[&str] = &[
    // VCS
    ".git",
    ".hg",
    ".svn",
    // build output / dependencies
    "target",
    "node_modules",
];
