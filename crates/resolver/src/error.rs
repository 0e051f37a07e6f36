use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResolverError>;

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid results file: {0}")]
    ResultsFormat(#[from] serde_json::Error),

    #[error("Invalid resolution policy: {0}")]
    InvalidPolicy(String),
}

/// Failure of the external check-evaluation capability itself.
///
/// A check that runs and fails is `CheckOutcome::Fail`, not an error.
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl EvaluationError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
