use crate::config::PipelineConfig;
use crate::error::{ConfigError, DocumentError, ScanError};
use crate::report::{InspectReport, RunReport, Warning, WarningKind};
use crate::scanner::{DocumentScanner, ScanOutcome};
use dacdoc_anchor::{Anchor, AnchorParser, ParsedDocument, Rewriter};
use dacdoc_resolver::{CheckEvaluator, ResolutionTable, Resolver};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};

/// Scans a documentation tree, resolves every anchor and renders new document content.
///
/// The pipeline never writes to the tree; callers persist [`RunReport::outputs`] themselves.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    config: PipelineConfig,
    parser: AnchorParser,
    rewriter: Rewriter,
    resolver: Resolver,
    permits: Semaphore,
}

struct LoadedDocument {
    path: PathBuf,
    /// Directory of the document relative to the tree root
    document_dir: PathBuf,
    text: String,
    parsed: ParsedDocument,
}

struct RenderedDocument {
    path: PathBuf,
    content: String,
    changed: bool,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        evaluator: Arc<dyn CheckEvaluator>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let parser = AnchorParser::new(config.syntax.clone())?;
        let rewriter = Rewriter::new(
            config.syntax.clone(),
            config.indicators.clone(),
            config.resource_dir.trim(),
        );
        let resolver = Resolver::new(evaluator, config.resolution.clone())?;
        let permits = Semaphore::new(config.effective_concurrency());

        Ok(Self {
            inner: Arc::new(PipelineInner {
                config,
                parser,
                rewriter,
                resolver,
                permits,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    /// Run the whole pipeline over `root`.
    ///
    /// Only an unusable root fails the run. Per-document failures drop that document from
    /// the outputs and show up in [`RunReport::warnings`].
    pub async fn run(&self, root: impl AsRef<Path>) -> Result<RunReport, ScanError> {
        let started = Instant::now();
        let scan = self.scan(root.as_ref()).await?;
        log::info!("Processing {} documents", scan.files.len());

        let mut report = RunReport {
            root: scan.root.clone(),
            ..Default::default()
        };
        report.warnings.extend(scan_warnings(&scan));

        let documents = self.load_documents(&scan, &mut report.warnings).await;
        for document in &documents {
            report.stats.anchors += document.parsed.anchors.len();
            report.stats.diagnostics += document.parsed.diagnostics.len();
        }

        let resolver = self.inner.resolver.fresh();
        let table = resolver
            .resolve_batch(
                documents
                    .iter()
                    .flat_map(|document| document.parsed.anchors.iter().map(Anchor::check_id)),
            )
            .await;
        report.stats.checks = table.len();
        for fallback in table.fallbacks() {
            report.stats.fallbacks += 1;
            report
                .warnings
                .push(Warning::new(None, WarningKind::Fallback(fallback.clone())));
        }

        let rendered = self
            .render_documents(documents, Arc::new(table), &mut report.warnings)
            .await;
        report.stats.failed = scan.files.len() - rendered.len();
        for document in rendered {
            if document.changed {
                report.changed.insert(document.path.clone());
            }
            report.outputs.insert(document.path, document.content);
        }

        report.stats.documents = report.outputs.len();
        report.stats.changed = report.changed.len();
        report.stats.time_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "Processed {} documents ({} changed, {} failed), {} anchors, {} checks, {} warnings in {} ms",
            report.stats.documents,
            report.stats.changed,
            report.stats.failed,
            report.stats.anchors,
            report.stats.checks,
            report.warnings.len(),
            report.stats.time_ms
        );
        Ok(report)
    }

    /// Scan and parse without resolving checks or rendering anything.
    pub async fn inspect(&self, root: impl AsRef<Path>) -> Result<InspectReport, ScanError> {
        let scan = self.scan(root.as_ref()).await?;
        let mut report = InspectReport {
            root: scan.root.clone(),
            ..Default::default()
        };
        report.warnings.extend(scan_warnings(&scan));

        for document in self.load_documents(&scan, &mut report.warnings).await {
            report.documents.insert(document.path, document.parsed);
        }
        Ok(report)
    }

    async fn scan(&self, root: &Path) -> Result<ScanOutcome, ScanError> {
        let config = &self.inner.config;
        let scanner = DocumentScanner::new(root, config.scan.clone())
            .exclude(config.resource_dir.trim());
        tokio::task::spawn_blocking(move || scanner.scan())
            .await
            .map_err(|e| ScanError::TaskFailed(e.to_string()))?
    }

    async fn load_documents(
        &self,
        scan: &ScanOutcome,
        warnings: &mut Vec<Warning>,
    ) -> Vec<LoadedDocument> {
        let mut tasks = JoinSet::new();
        let mut paths = HashMap::new();
        for path in &scan.files {
            let inner = self.inner.clone();
            let root = scan.root.clone();
            let owned = path.clone();
            let handle = tasks.spawn(async move {
                let _permit = inner.permits.acquire().await.ok();
                let result = inner.load(&root, &owned).await;
                (owned, result)
            });
            paths.insert(handle.id(), path.clone());
        }

        let results = join_documents(tasks, paths, warnings, |message| WarningKind::ReadFailed {
            message,
        })
        .await;

        let mut documents = Vec::with_capacity(results.len());
        for (path, result) in results {
            match result {
                Ok(document) => {
                    for diagnostic in &document.parsed.diagnostics {
                        warnings.push(Warning::new(
                            Some(path.clone()),
                            WarningKind::Diagnostic(diagnostic.clone()),
                        ));
                    }
                    documents.push(document);
                }
                Err(err) => warnings.push(document_warning(path, &err)),
            }
        }
        documents
    }

    async fn render_documents(
        &self,
        documents: Vec<LoadedDocument>,
        table: Arc<ResolutionTable>,
        warnings: &mut Vec<Warning>,
    ) -> Vec<RenderedDocument> {
        let mut tasks = JoinSet::new();
        let mut paths = HashMap::new();
        for document in documents {
            let inner = self.inner.clone();
            let table = table.clone();
            let path = document.path.clone();
            let handle = tasks.spawn(async move {
                let _permit = inner.permits.acquire().await.ok();
                let owned = document.path.clone();
                (owned, inner.render(document, &table))
            });
            paths.insert(handle.id(), path);
        }

        let results = join_documents(tasks, paths, warnings, |message| {
            WarningKind::RewriteFailed { message }
        })
        .await;

        let mut rendered = Vec::with_capacity(results.len());
        for (path, result) in results {
            match result {
                Ok(document) => rendered.push(document),
                Err(err) => warnings.push(document_warning(path, &err)),
            }
        }
        rendered
    }
}

impl PipelineInner {
    async fn load(&self, root: &Path, path: &Path) -> Result<LoadedDocument, DocumentError> {
        let bytes = tokio::fs::read(path).await?;
        let text = String::from_utf8(bytes)?;
        let parsed = self.parser.parse(&text);
        log::debug!(
            "Parsed {}: {} anchors, {} diagnostics",
            path.display(),
            parsed.anchors.len(),
            parsed.diagnostics.len()
        );

        let document_dir = path
            .strip_prefix(root)
            .ok()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(LoadedDocument {
            path: path.to_path_buf(),
            document_dir,
            text,
            parsed,
        })
    }

    fn render(
        &self,
        document: LoadedDocument,
        table: &ResolutionTable,
    ) -> Result<RenderedDocument, DocumentError> {
        let LoadedDocument {
            path,
            document_dir,
            text,
            parsed,
        } = document;

        let mut anchors = parsed.anchors;
        for anchor in &mut anchors {
            let state = table.state_for(anchor.check_id());
            anchor.resolve(state)?;
        }

        let content = self.rewriter.rewrite(&text, &anchors, &document_dir)?;
        let changed = content != text;
        Ok(RenderedDocument {
            path,
            content,
            changed,
        })
    }
}

/// Drain `tasks` and sort the results by path.
///
/// A task that panicked or was cancelled has no result, so it is reported against the path it
/// was spawned for.
async fn join_documents<T: Send + 'static>(
    mut tasks: JoinSet<(PathBuf, T)>,
    mut paths: HashMap<task::Id, PathBuf>,
    warnings: &mut Vec<Warning>,
    failure: fn(String) -> WarningKind,
) -> Vec<(PathBuf, T)> {
    let mut results = Vec::with_capacity(tasks.len());
    let mut failed = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(err) => failed.push((paths.remove(&err.id()), err.to_string())),
        }
    }
    results.sort_by(|a, b| a.0.cmp(&b.0));
    failed.sort();
    for (path, err) in failed {
        warnings.push(Warning::new(
            path,
            failure(format!("document task failed: {err}")),
        ));
    }
    results
}

fn scan_warnings(scan: &ScanOutcome) -> Vec<Warning> {
    scan.skipped
        .iter()
        .map(|message| {
            Warning::new(
                None,
                WarningKind::ScanSkipped {
                    message: message.clone(),
                },
            )
        })
        .collect()
}

fn document_warning(path: PathBuf, err: &DocumentError) -> Warning {
    let message = err.to_string();
    let kind = match err {
        DocumentError::Read(_) | DocumentError::Encoding(_) => WarningKind::ReadFailed { message },
        DocumentError::Anchor(_) | DocumentError::Rewrite(_) => {
            WarningKind::RewriteFailed { message }
        }
    };
    Warning::new(Some(path), kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn crashed_task_is_reported_against_its_document() {
        let mut tasks = JoinSet::new();
        let mut paths = HashMap::new();
        for name in ["a.md", "b.md"] {
            let path = PathBuf::from(name);
            let owned = path.clone();
            let handle = tasks.spawn(async move {
                let size: usize = if owned == Path::new("b.md") {
                    "not a number".parse().expect("render crashed")
                } else {
                    1
                };
                (owned, size)
            });
            paths.insert(handle.id(), path);
        }

        let mut warnings = Vec::new();
        let results = join_documents(tasks, paths, &mut warnings, |message| {
            WarningKind::RewriteFailed { message }
        })
        .await;

        assert_eq!(results, vec![(PathBuf::from("a.md"), 1)]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].path, Some(PathBuf::from("b.md")));
        assert!(warnings[0].excludes_document());
        assert!(warnings[0].to_string().contains("document task failed"));
    }
}
