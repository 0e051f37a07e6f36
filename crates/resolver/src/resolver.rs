use crate::error::Result;
use crate::evaluator::CheckEvaluator;
use crate::policy::ResolutionPolicy;
use dacdoc_protocol::{AnchorState, CheckId, CheckOutcome};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{OnceCell, Semaphore};
use tokio::task::JoinSet;

/// Why an identifier fell back to `Indeterminate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackReason {
    UnknownCheck,
    TimedOut { after_ms: u64 },
    EvaluatorFailed { message: String },
}

/// Non-fatal, per-identifier resolution failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionFallback {
    pub check_id: CheckId,
    pub reason: FallbackReason,
    pub attempts: u32,
}

impl fmt::Display for ResolutionFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            FallbackReason::UnknownCheck => write!(f, "check {} is unknown", self.check_id),
            FallbackReason::TimedOut { after_ms } => write!(
                f,
                "check {} timed out after {after_ms} ms ({} attempts)",
                self.check_id, self.attempts
            ),
            FallbackReason::EvaluatorFailed { message } => write!(
                f,
                "check {} could not be evaluated ({} attempts): {message}",
                self.check_id, self.attempts
            ),
        }
    }
}

/// Final answer for one check identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub check_id: CheckId,
    pub state: AnchorState,
    pub attempts: u32,
    pub fallback: Option<ResolutionFallback>,
}

impl Resolution {
    fn resolved(check_id: CheckId, outcome: CheckOutcome, attempts: u32) -> Self {
        Self {
            check_id,
            state: outcome.state(),
            attempts,
            fallback: None,
        }
    }

    fn fallback(check_id: CheckId, reason: FallbackReason, attempts: u32) -> Self {
        Self {
            fallback: Some(ResolutionFallback {
                check_id: check_id.clone(),
                reason,
                attempts,
            }),
            check_id,
            state: AnchorState::Indeterminate,
            attempts,
        }
    }
}

/// Resolutions of a batch, keyed by identifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionTable {
    entries: BTreeMap<CheckId, Resolution>,
}

impl ResolutionTable {
    /// State for `check_id`; identifiers outside the batch are `Indeterminate`.
    #[must_use]
    pub fn state_for(&self, check_id: &CheckId) -> AnchorState {
        self.entries
            .get(check_id)
            .map_or(AnchorState::Indeterminate, |resolution| resolution.state)
    }

    #[must_use]
    pub fn get(&self, check_id: &CheckId) -> Option<&Resolution> {
        self.entries.get(check_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resolution> {
        self.entries.values()
    }

    pub fn fallbacks(&self) -> impl Iterator<Item = &ResolutionFallback> {
        self.entries
            .values()
            .filter_map(|resolution| resolution.fallback.as_ref())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolution engine.
///
/// Each identifier is evaluated at most once per resolver; concurrent requests for the same
/// identifier wait on the first one (single flight). Cloning shares the cache.
#[derive(Clone)]
pub struct Resolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    evaluator: Arc<dyn CheckEvaluator>,
    policy: ResolutionPolicy,
    cache: Mutex<HashMap<CheckId, Arc<OnceCell<Resolution>>>>,
    permits: Semaphore,
    evaluator_calls: AtomicUsize,
}

impl Resolver {
    pub fn new(evaluator: Arc<dyn CheckEvaluator>, policy: ResolutionPolicy) -> Result<Self> {
        policy.validate()?;
        let permits = Semaphore::new(policy.max_concurrency);
        Ok(Self {
            inner: Arc::new(ResolverInner {
                evaluator,
                policy,
                cache: Mutex::new(HashMap::new()),
                permits,
                evaluator_calls: AtomicUsize::new(0),
            }),
        })
    }

    /// Same evaluator and policy, empty cache
    #[must_use]
    pub fn fresh(&self) -> Self {
        Self {
            inner: Arc::new(ResolverInner {
                evaluator: self.inner.evaluator.clone(),
                policy: self.inner.policy.clone(),
                cache: Mutex::new(HashMap::new()),
                permits: Semaphore::new(self.inner.policy.max_concurrency),
                evaluator_calls: AtomicUsize::new(0),
            }),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &ResolutionPolicy {
        &self.inner.policy
    }

    /// Evaluator invocations so far, retries included
    #[must_use]
    pub fn evaluator_calls(&self) -> usize {
        self.inner.evaluator_calls.load(Ordering::Relaxed)
    }

    pub async fn resolve(&self, check_id: &CheckId) -> Resolution {
        let cell = {
            let mut cache = self
                .inner
                .cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            cache.entry(check_id.clone()).or_default().clone()
        };

        cell.get_or_init(|| self.evaluate_with_retry(check_id.clone()))
            .await
            .clone()
    }

    /// Resolve every distinct identifier of `check_ids` concurrently.
    pub async fn resolve_batch<'a>(
        &self,
        check_ids: impl IntoIterator<Item = &'a CheckId>,
    ) -> ResolutionTable {
        let unique: BTreeSet<CheckId> = check_ids.into_iter().cloned().collect();

        let mut tasks = JoinSet::new();
        for check_id in unique.iter().cloned() {
            let resolver = self.clone();
            tasks.spawn(async move { resolver.resolve(&check_id).await });
        }

        let mut table = ResolutionTable::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(resolution) => {
                    table
                        .entries
                        .insert(resolution.check_id.clone(), resolution);
                }
                Err(err) => log::warn!("Check resolution task failed: {err}"),
            }
        }

        // A panicking evaluator must not leave its identifier without an answer
        for check_id in unique {
            table.entries.entry(check_id.clone()).or_insert_with(|| {
                Resolution::fallback(
                    check_id,
                    FallbackReason::EvaluatorFailed {
                        message: "evaluation task aborted".to_string(),
                    },
                    1,
                )
            });
        }

        let fallbacks = table.fallbacks().count();
        log::info!(
            "Resolved {} checks ({} fell back to indeterminate)",
            table.len(),
            fallbacks
        );
        table
    }

    async fn evaluate_with_retry(&self, check_id: CheckId) -> Resolution {
        let policy = &self.inner.policy;
        let max_attempts = policy.max_attempts();
        let mut delay = policy.backoff();
        let mut reason = FallbackReason::UnknownCheck;

        for attempt in 1..=max_attempts {
            let result = {
                // the semaphore is never closed, so a permit is always granted
                let _permit = self.inner.permits.acquire().await.ok();
                self.inner.evaluator_calls.fetch_add(1, Ordering::Relaxed);
                tokio::time::timeout(policy.timeout(), self.inner.evaluator.evaluate(&check_id))
                    .await
            };

            match result {
                Ok(Ok(CheckOutcome::Unknown)) => {
                    log::debug!("Check {check_id} is unknown to the evaluator");
                    return Resolution::fallback(check_id, FallbackReason::UnknownCheck, attempt);
                }
                Ok(Ok(outcome)) => {
                    log::debug!("Check {check_id} resolved to {outcome:?}");
                    return Resolution::resolved(check_id, outcome, attempt);
                }
                Ok(Err(err)) => {
                    log::warn!("Check {check_id} attempt {attempt}/{max_attempts} failed: {err}");
                    reason = FallbackReason::EvaluatorFailed {
                        message: err.to_string(),
                    };
                }
                Err(_) => {
                    log::warn!(
                        "Check {check_id} attempt {attempt}/{max_attempts} timed out after {} ms",
                        policy.timeout_ms
                    );
                    reason = FallbackReason::TimedOut {
                        after_ms: policy.timeout_ms,
                    };
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
            }
        }

        Resolution::fallback(check_id, reason, max_attempts)
    }
}
