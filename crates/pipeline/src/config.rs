use crate::error::ConfigError;
use crate::limits::{document_concurrency, max_document_concurrency};
use crate::scanner::ScanOptions;
use dacdoc_anchor::AnchorSyntax;
use dacdoc_protocol::{CheckId, IndicatorSet};
use dacdoc_resolver::{CommandEvaluator, ResolutionPolicy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

/// Default name of the optional config file at the tree root
pub const CONFIG_FILE_NAME: &str = "dacdoc.toml";

/// Configuration of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Marker grammar
    pub syntax: AnchorSyntax,

    /// Directory holding the indicator assets, relative to the tree root
    pub resource_dir: String,

    /// Asset file names per indicator
    pub indicators: IndicatorSet,

    /// Which files are documentation
    pub scan: ScanOptions,

    /// Check evaluation timeout, retries and fan-out
    pub resolution: ResolutionPolicy,

    /// Documents processed at once (`None` → `DACDOC_CONCURRENCY` or available parallelism)
    pub concurrency: Option<usize>,

    /// Shell command per check identifier, run from the tree root
    pub checks: BTreeMap<CheckId, String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            syntax: AnchorSyntax::default(),
            resource_dir: "dacdoc-resources".to_string(),
            indicators: IndicatorSet::default(),
            scan: ScanOptions::default(),
            resolution: ResolutionPolicy::default(),
            concurrency: None,
            checks: BTreeMap::new(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// `root/dacdoc.toml` when present, defaults otherwise
    pub fn load_for_root(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            log::debug!("Loading config from {}", path.display());
            return Self::load(&path);
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.syntax.validate()?;
        self.resolution.validate()?;
        self.validate_resource_dir()?;
        self.validate_indicators()?;

        if self.scan.file_names.is_empty() && self.scan.extensions.is_empty() {
            return Err(ConfigError::invalid(
                "scan needs at least one file name or extension",
            ));
        }
        if let Some(concurrency) = self.concurrency {
            if concurrency == 0 || concurrency > max_document_concurrency() {
                return Err(ConfigError::invalid(format!(
                    "concurrency must be within 1..={}, got {concurrency}",
                    max_document_concurrency()
                )));
            }
        }
        Ok(())
    }

    fn validate_resource_dir(&self) -> Result<(), ConfigError> {
        let dir = self.resource_dir.trim();
        if dir.is_empty() {
            return Err(ConfigError::invalid("resource_dir must not be empty"));
        }
        if dir.contains(|ch: char| ch.is_whitespace() || ch == '(' || ch == ')') {
            return Err(ConfigError::invalid(format!(
                "resource_dir {dir:?} must not contain whitespace or parentheses"
            )));
        }
        let path = Path::new(dir);
        if path.is_absolute()
            || path
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
        {
            return Err(ConfigError::invalid(format!(
                "resource_dir {dir:?} must be a relative path inside the tree"
            )));
        }
        if !path.components().any(|c| matches!(c, Component::Normal(_))) {
            return Err(ConfigError::invalid(
                "resource_dir must name a subdirectory of the tree",
            ));
        }
        Ok(())
    }

    fn validate_indicators(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for (indicator, name) in self.indicators.iter() {
            let bad_char = |ch: char| {
                ch.is_whitespace() || matches!(ch, '(' | ')' | '/' | '\\')
            };
            if name.is_empty() || name.contains(bad_char) {
                return Err(ConfigError::invalid(format!(
                    "indicator file name for {indicator} ({name:?}) must be a plain non-empty file name"
                )));
            }
            if !seen.insert(name) {
                return Err(ConfigError::invalid(format!(
                    "indicator file name {name:?} is used twice"
                )));
            }
        }
        Ok(())
    }

    /// Resource directory under `root`
    #[must_use]
    pub fn resource_path(&self, root: &Path) -> PathBuf {
        root.join(self.resource_dir.trim())
    }

    #[must_use]
    pub fn effective_concurrency(&self) -> usize {
        document_concurrency(self.concurrency)
    }

    /// Evaluator running the `[checks]` commands from `working_dir`
    #[must_use]
    pub fn command_evaluator(&self, working_dir: &Path) -> CommandEvaluator {
        CommandEvaluator::new(self.checks.clone(), working_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_yields_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.syntax.keyword, "dacdoc");
        assert_eq!(config.indicators.green, "green.svg");
    }

    #[test]
    fn parses_full_file() {
        let raw = r#"
resource_dir = "docs/badges"
concurrency = 2

[syntax]
keyword = "MARKER"

[indicators]
green = "ok.png"

[scan]
file_names = ["README.md", "GUIDE.md"]
extensions = ["mdx"]

[resolution]
timeout_ms = 5000
retries = 2

[checks]
"check-42" = "cargo test --doc"
"#;
        let config = PipelineConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.resource_dir, "docs/badges");
        assert_eq!(config.syntax.keyword, "MARKER");
        assert!(config.syntax.skip_code_fences);
        assert_eq!(config.indicators.green, "ok.png");
        assert_eq!(config.indicators.red, "red.svg");
        assert_eq!(config.scan.extensions, vec!["mdx".to_string()]);
        assert_eq!(config.resolution.timeout_ms, 5000);
        assert_eq!(config.resolution.retries, 2);
        assert_eq!(config.resolution.backoff_ms, 250);
        assert_eq!(config.effective_concurrency(), 2);
        assert_eq!(
            config.checks.get(&CheckId::new("check-42").unwrap()),
            Some(&"cargo test --doc".to_string())
        );
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        assert!(PipelineConfig::from_toml_str("resource_directory = \"x\"").is_err());
        assert!(PipelineConfig::from_toml_str("resource_dir = \"../outside\"").is_err());
        assert!(PipelineConfig::from_toml_str("resource_dir = \"/abs\"").is_err());
        assert!(PipelineConfig::from_toml_str("resource_dir = \"my dir\"").is_err());
        assert!(PipelineConfig::from_toml_str("resource_dir = \".\"").is_err());
        assert!(PipelineConfig::from_toml_str("concurrency = 0").is_err());
        assert!(PipelineConfig::from_toml_str("[syntax]\nkeyword = \"a:b\"").is_err());
        assert!(PipelineConfig::from_toml_str("[indicators]\ngreen = \"red.svg\"").is_err());
        assert!(PipelineConfig::from_toml_str("[indicators]\ngreen = \"a b.svg\"").is_err());
        assert!(PipelineConfig::from_toml_str("[resolution]\ntimeout_ms = 0").is_err());
        assert!(PipelineConfig::from_toml_str("[checks]\n\"bad id\" = \"true\"").is_err());
        assert!(PipelineConfig::from_toml_str("[scan]\nfile_names = []").is_err());
    }

    #[test]
    fn load_for_root_falls_back_to_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config = PipelineConfig::load_for_root(temp.path()).unwrap();
        assert_eq!(config, PipelineConfig::default());

        std::fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "resource_dir = \"badges\"\n",
        )
        .unwrap();
        let config = PipelineConfig::load_for_root(temp.path()).unwrap();
        assert_eq!(config.resource_path(temp.path()), temp.path().join("badges"));
    }
}
