use crate::error::{ResolverError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_EVALUATION_CONCURRENCY: usize = 64;

/// Timeout, retry and fan-out settings for check evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolutionPolicy {
    /// Upper bound for one evaluator call
    pub timeout_ms: u64,

    /// Extra attempts after a failed or timed out call
    pub retries: u32,

    /// Delay before the first retry; doubled for every further retry
    pub backoff_ms: u64,

    /// Evaluator calls allowed in flight at once
    pub max_concurrency: usize,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            retries: 1,
            backoff_ms: 250,
            max_concurrency: 4,
        }
    }
}

impl ResolutionPolicy {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub const fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(ResolverError::InvalidPolicy(
                "timeout_ms must be > 0".to_string(),
            ));
        }
        if self.max_concurrency == 0 || self.max_concurrency > MAX_EVALUATION_CONCURRENCY {
            return Err(ResolverError::InvalidPolicy(format!(
                "max_concurrency must be within 1..={MAX_EVALUATION_CONCURRENCY}, got {}",
                self.max_concurrency
            )));
        }
        Ok(())
    }
}
