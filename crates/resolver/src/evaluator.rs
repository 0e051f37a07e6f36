use crate::error::{EvaluationError, Result};
use async_trait::async_trait;
use dacdoc_protocol::{CheckId, CheckOutcome};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// External capability that runs a check and reports its outcome.
///
/// Implementations return `CheckOutcome::Unknown` for identifiers they do not know and
/// reserve `Err` for failures of the capability itself (crash, launch failure, ...).
#[async_trait]
pub trait CheckEvaluator: Send + Sync {
    async fn evaluate(&self, check_id: &CheckId) -> std::result::Result<CheckOutcome, EvaluationError>;
}

/// Fixed table of outcomes, e.g. produced by an earlier test run
#[derive(Debug, Clone, Default)]
pub struct StaticEvaluator {
    outcomes: HashMap<CheckId, CheckOutcome>,
}

impl StaticEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, check_id: CheckId, outcome: CheckOutcome) -> Self {
        self.outcomes.insert(check_id, outcome);
        self
    }

    /// Parse a JSON object mapping check ids to `pass`/`fail`/`stale`/`unknown`.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let outcomes: HashMap<CheckId, CheckOutcome> = serde_json::from_str(raw)?;
        Ok(Self { outcomes })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::from_json_str(&raw)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl FromIterator<(CheckId, CheckOutcome)> for StaticEvaluator {
    fn from_iter<I: IntoIterator<Item = (CheckId, CheckOutcome)>>(iter: I) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}

#[async_trait]
impl CheckEvaluator for StaticEvaluator {
    async fn evaluate(&self, check_id: &CheckId) -> std::result::Result<CheckOutcome, EvaluationError> {
        Ok(self
            .outcomes
            .get(check_id)
            .copied()
            .unwrap_or(CheckOutcome::Unknown))
    }
}

/// Runs one shell command per check; exit status 0 passes, anything else fails.
#[derive(Debug, Clone)]
pub struct CommandEvaluator {
    commands: BTreeMap<CheckId, String>,
    working_dir: PathBuf,
}

impl CommandEvaluator {
    pub fn new(commands: BTreeMap<CheckId, String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            commands,
            working_dir: working_dir.into(),
        }
    }

    fn shell(command: &str) -> tokio::process::Command {
        #[cfg(windows)]
        let mut cmd = {
            let mut cmd = tokio::process::Command::new("cmd");
            cmd.arg("/C");
            cmd
        };
        #[cfg(not(windows))]
        let mut cmd = {
            let mut cmd = tokio::process::Command::new("sh");
            cmd.arg("-c");
            cmd
        };
        cmd.arg(command);
        cmd
    }
}

#[async_trait]
impl CheckEvaluator for CommandEvaluator {
    async fn evaluate(&self, check_id: &CheckId) -> std::result::Result<CheckOutcome, EvaluationError> {
        let Some(command) = self.commands.get(check_id) else {
            return Ok(CheckOutcome::Unknown);
        };

        log::debug!("Running check {check_id}: {command}");
        let output = Self::shell(command)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| EvaluationError::Launch {
                command: command.clone(),
                source,
            })?;

        if output.status.success() {
            return Ok(CheckOutcome::Pass);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        log::debug!(
            "Check {check_id} failed ({}): {}",
            output.status,
            stderr.trim()
        );
        Ok(CheckOutcome::Fail)
    }
}
