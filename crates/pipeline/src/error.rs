use dacdoc_anchor::{AnchorError, RewriteError};
use dacdoc_resolver::ResolverError;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal for the whole run: the tree root cannot be walked
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Root path does not exist: {0}")]
    NotFound(PathBuf),

    #[error("Root path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Root path is not readable: {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scan task failed: {0}")]
    TaskFailed(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Anchor syntax error: {0}")]
    AnchorError(#[from] AnchorError),

    #[error("Resolver error: {0}")]
    ResolverError(#[from] ResolverError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Fatal for a single document; the document is left out of the run's output
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to read document: {0}")]
    Read(#[from] std::io::Error),

    #[error("Document is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("Failed to resolve anchor: {0}")]
    Anchor(#[from] AnchorError),

    #[error("Failed to rewrite document: {0}")]
    Rewrite(#[from] RewriteError),
}
