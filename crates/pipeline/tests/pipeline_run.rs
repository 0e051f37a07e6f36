use async_trait::async_trait;
use dacdoc_anchor::{AnchorSyntax, DiagnosticKind};
use dacdoc_pipeline::{Pipeline, PipelineConfig, ScanError, WarningKind};
use dacdoc_protocol::{CheckId, CheckOutcome};
use dacdoc_resolver::{
    CheckEvaluator, EvaluationError, FallbackReason, ResolutionPolicy, StaticEvaluator,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

struct Counting {
    calls: AtomicUsize,
}

#[async_trait]
impl CheckEvaluator for Counting {
    async fn evaluate(&self, check_id: &CheckId) -> Result<CheckOutcome, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        match check_id.as_str() {
            "boom" => Err(EvaluationError::other("evaluator crashed")),
            "fail" => Ok(CheckOutcome::Fail),
            "stale" => Ok(CheckOutcome::Stale),
            "missing" => Ok(CheckOutcome::Unknown),
            _ => Ok(CheckOutcome::Pass),
        }
    }
}

fn id(raw: &str) -> CheckId {
    CheckId::new(raw).unwrap()
}

fn config() -> PipelineConfig {
    PipelineConfig {
        resolution: ResolutionPolicy {
            timeout_ms: 2_000,
            retries: 0,
            backoff_ms: 1,
            max_concurrency: 4,
        },
        concurrency: Some(2),
        ..Default::default()
    }
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn output<'a>(report: &'a dacdoc_pipeline::RunReport, relative: &str) -> &'a str {
    report
        .outputs
        .get(&report.root.join(relative))
        .map(String::as_str)
        .unwrap_or_else(|| panic!("no output for {relative}"))
}

fn static_pipeline(outcomes: &[(&str, CheckOutcome)]) -> Pipeline {
    let evaluator: StaticEvaluator = outcomes
        .iter()
        .map(|(raw, outcome)| (id(raw), *outcome))
        .collect();
    Pipeline::new(config(), Arc::new(evaluator)).unwrap()
}

#[tokio::test]
async fn passing_check_renders_green_in_place() {
    let temp = tempdir().unwrap();
    write(temp.path(), "README.md", "# Demo\n\nBuild: [dacdoc:build] ok\n");

    let pipeline = static_pipeline(&[("build", CheckOutcome::Pass)]);
    let report = pipeline.run(temp.path()).await.unwrap();

    assert_eq!(
        output(&report, "README.md"),
        "# Demo\n\nBuild: ![dacdoc:build](dacdoc-resources/green.svg) ok\n"
    );
    assert_eq!(report.changed.len(), 1);
    assert!(report.warnings.is_empty());
    assert_eq!(report.stats.documents, 1);
    assert_eq!(report.stats.anchors, 1);
    assert_eq!(report.stats.checks, 1);
    assert_eq!(report.stats.fallbacks, 0);
}

#[tokio::test]
async fn every_state_maps_to_its_indicator() {
    let temp = tempdir().unwrap();
    write(
        temp.path(),
        "README.md",
        "[dacdoc:a] [dacdoc:b] [dacdoc:c] [dacdoc:d]\n",
    );

    let pipeline = static_pipeline(&[
        ("a", CheckOutcome::Pass),
        ("b", CheckOutcome::Fail),
        ("c", CheckOutcome::Stale),
    ]);
    let report = pipeline.run(temp.path()).await.unwrap();

    assert_eq!(
        output(&report, "README.md"),
        "![dacdoc:a](dacdoc-resources/green.svg) ![dacdoc:b](dacdoc-resources/red.svg) \
         ![dacdoc:c](dacdoc-resources/orange.svg) ![dacdoc:d](dacdoc-resources/grey.svg)\n"
    );
    assert_eq!(report.stats.fallbacks, 1);
}

#[tokio::test]
async fn second_run_over_rendered_tree_changes_nothing() {
    let temp = tempdir().unwrap();
    write(temp.path(), "README.md", "Build: [dacdoc:build]\n");
    write(temp.path(), "docs/README.md", "Tests: [dacdoc:tests]\n");

    let pipeline = static_pipeline(&[
        ("build", CheckOutcome::Pass),
        ("tests", CheckOutcome::Fail),
    ]);
    let first = pipeline.run(temp.path()).await.unwrap();
    for (path, content) in first.changed_outputs() {
        fs::write(path, content).unwrap();
    }

    let second = pipeline.run(temp.path()).await.unwrap();
    assert!(second.changed.is_empty());
    assert!(second.is_clean());
    assert_eq!(first.outputs, second.outputs);
}

#[tokio::test]
async fn rerun_with_new_outcome_swaps_the_indicator() {
    let temp = tempdir().unwrap();
    write(
        temp.path(),
        "README.md",
        "Build: ![dacdoc:build](dacdoc-resources/green.svg)\n",
    );

    let pipeline = static_pipeline(&[("build", CheckOutcome::Fail)]);
    let report = pipeline.run(temp.path()).await.unwrap();
    assert_eq!(
        output(&report, "README.md"),
        "Build: ![dacdoc:build](dacdoc-resources/red.svg)\n"
    );
}

#[tokio::test]
async fn missing_root_fails_without_touching_anything() {
    let temp = tempdir().unwrap();
    let missing = temp.path().join("nope");

    let pipeline = static_pipeline(&[]);
    let err = pipeline.run(&missing).await.unwrap_err();
    assert!(matches!(err, ScanError::NotFound(path) if path == missing));
    assert!(!missing.exists());
}

#[tokio::test]
async fn malformed_marker_is_reported_and_left_alone() {
    let temp = tempdir().unwrap();
    write(temp.path(), "README.md", "A [dacdoc:] B [dacdoc:ok]\n");

    let pipeline = static_pipeline(&[("ok", CheckOutcome::Pass)]);
    let report = pipeline.run(temp.path()).await.unwrap();

    assert_eq!(
        output(&report, "README.md"),
        "A [dacdoc:] B ![dacdoc:ok](dacdoc-resources/green.svg)\n"
    );
    assert_eq!(report.warnings.len(), 1);
    let warning = &report.warnings[0];
    assert_eq!(warning.path.as_deref(), Some(report.root.join("README.md").as_path()));
    match &warning.kind {
        WarningKind::Diagnostic(diagnostic) => {
            assert_eq!(diagnostic.kind, DiagnosticKind::EmptyIdentifier);
            assert_eq!(diagnostic.position.line, 1);
        }
        other => panic!("unexpected warning {other:?}"),
    }
    assert!(!warning.excludes_document());
    assert_eq!(report.stats.diagnostics, 1);
}

#[tokio::test]
async fn shared_identifier_is_evaluated_once_per_run() {
    let temp = tempdir().unwrap();
    write(temp.path(), "README.md", "[dacdoc:shared] [dacdoc:shared]\n");
    write(temp.path(), "a/README.md", "[dacdoc:shared]\n[dacdoc:shared]\n");
    write(temp.path(), "b/README.md", "x [dacdoc:shared] y\n");

    let evaluator = Arc::new(Counting {
        calls: AtomicUsize::new(0),
    });
    let pipeline = Pipeline::new(config(), evaluator.clone()).unwrap();

    let report = pipeline.run(temp.path()).await.unwrap();
    assert_eq!(evaluator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.stats.anchors, 5);
    assert_eq!(report.stats.checks, 1);
    assert_eq!(report.changed.len(), 3);
    assert_eq!(output(&report, "b/README.md"), "x ![dacdoc:shared](../dacdoc-resources/green.svg) y\n");

    // Each run starts from an empty cache
    pipeline.run(temp.path()).await.unwrap();
    assert_eq!(evaluator.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unknown_and_failing_evaluations_fall_back_to_grey() {
    let temp = tempdir().unwrap();
    write(temp.path(), "README.md", "[dacdoc:missing] [dacdoc:boom] [dacdoc:ok]\n");

    let evaluator = Arc::new(Counting {
        calls: AtomicUsize::new(0),
    });
    let pipeline = Pipeline::new(config(), evaluator).unwrap();
    let report = pipeline.run(temp.path()).await.unwrap();

    assert_eq!(
        output(&report, "README.md"),
        "![dacdoc:missing](dacdoc-resources/grey.svg) ![dacdoc:boom](dacdoc-resources/grey.svg) \
         ![dacdoc:ok](dacdoc-resources/green.svg)\n"
    );

    let mut reasons: Vec<(String, FallbackReason)> = report
        .warnings
        .iter()
        .filter_map(|warning| match &warning.kind {
            WarningKind::Fallback(fallback) => {
                assert!(warning.path.is_none());
                Some((fallback.check_id.to_string(), fallback.reason.clone()))
            }
            _ => None,
        })
        .collect();
    reasons.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(reasons.len(), 2);
    assert_eq!(reasons[0].0, "boom");
    assert!(matches!(reasons[0].1, FallbackReason::EvaluatorFailed { .. }));
    assert_eq!(reasons[1], ("missing".to_string(), FallbackReason::UnknownCheck));
    assert_eq!(report.stats.fallbacks, 2);
}

#[tokio::test]
async fn undecodable_document_is_excluded_and_others_proceed() {
    let temp = tempdir().unwrap();
    write(temp.path(), "README.md", "[dacdoc:ok]\n");
    let broken = temp.path().join("broken/README.md");
    fs::create_dir_all(broken.parent().unwrap()).unwrap();
    fs::write(&broken, [b'[', 0xff, 0xfe, b']']).unwrap();

    let pipeline = static_pipeline(&[("ok", CheckOutcome::Pass)]);
    let report = pipeline.run(temp.path()).await.unwrap();

    let broken: PathBuf = report.root.join("broken/README.md");
    assert!(!report.outputs.contains_key(&broken));
    assert_eq!(report.outputs.len(), 1);
    assert_eq!(report.stats.failed, 1);

    let warning = report
        .warnings
        .iter()
        .find(|warning| warning.path.as_ref() == Some(&broken))
        .unwrap();
    assert!(matches!(warning.kind, WarningKind::ReadFailed { .. }));
    assert!(warning.excludes_document());
}

#[cfg(unix)]
#[tokio::test]
async fn unreadable_directory_becomes_a_scan_warning() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempdir().unwrap();
    write(temp.path(), "README.md", "[dacdoc:ok]\n");
    write(temp.path(), "private/README.md", "[dacdoc:hidden]\n");
    let private = temp.path().join("private");
    fs::set_permissions(&private, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&private).is_ok() {
        fs::set_permissions(&private, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let pipeline = static_pipeline(&[("ok", CheckOutcome::Pass)]);
    let report = pipeline.run(temp.path()).await;
    fs::set_permissions(&private, fs::Permissions::from_mode(0o755)).unwrap();

    let report = report.unwrap();
    assert_eq!(report.outputs.len(), 1);
    assert_eq!(
        output(&report, "README.md"),
        "![dacdoc:ok](dacdoc-resources/green.svg)\n"
    );
    let skipped: Vec<_> = report
        .warnings
        .iter()
        .filter(|warning| matches!(warning.kind, WarningKind::ScanSkipped { .. }))
        .collect();
    assert!(!skipped.is_empty());
    assert!(skipped.iter().all(|warning| warning.path.is_none()));
    assert!(!report.is_clean());
}

#[tokio::test]
async fn nested_documents_link_back_to_the_resource_dir() {
    let temp = tempdir().unwrap();
    write(temp.path(), "docs/guide/README.md", "[dacdoc:ok]");

    let pipeline = static_pipeline(&[("ok", CheckOutcome::Pass)]);
    let report = pipeline.run(temp.path()).await.unwrap();
    assert_eq!(
        output(&report, "docs/guide/README.md"),
        "![dacdoc:ok](../../dacdoc-resources/green.svg)"
    );
}

#[tokio::test]
async fn resource_dir_is_never_scanned() {
    let temp = tempdir().unwrap();
    write(temp.path(), "README.md", "plain\n");
    write(temp.path(), "dacdoc-resources/README.md", "[dacdoc:ok]\n");

    let pipeline = static_pipeline(&[("ok", CheckOutcome::Pass)]);
    let report = pipeline.run(temp.path()).await.unwrap();

    assert_eq!(report.outputs.len(), 1);
    assert_eq!(output(&report, "README.md"), "plain\n");
    assert!(report.changed.is_empty());
    assert!(report.is_clean());
}

#[tokio::test]
async fn inspect_lists_anchors_without_evaluating() {
    let temp = tempdir().unwrap();
    write(temp.path(), "README.md", "[dacdoc:one]\n```\n[dacdoc:fenced]\n```\n[dacdoc:two\n");

    let evaluator = Arc::new(Counting {
        calls: AtomicUsize::new(0),
    });
    let pipeline = Pipeline::new(config(), evaluator.clone()).unwrap();
    let report = pipeline.inspect(temp.path()).await.unwrap();

    let parsed = &report.documents[&report.root.join("README.md")];
    let ids: Vec<&str> = parsed.anchors.iter().map(|a| a.check_id().as_str()).collect();
    assert_eq!(ids, vec!["one"]);
    assert_eq!(parsed.diagnostics.len(), 1);
    assert_eq!(parsed.diagnostics[0].kind, DiagnosticKind::Unterminated);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(evaluator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn custom_keyword_and_resource_dir() {
    let temp = tempdir().unwrap();
    write(temp.path(), "README.md", "[check:ok] [dacdoc:ok]\n");

    let mut config = config();
    config.syntax = AnchorSyntax::with_keyword("check").unwrap();
    config.resource_dir = "assets/badges".to_string();
    let evaluator = StaticEvaluator::new().with(id("ok"), CheckOutcome::Pass);
    let pipeline = Pipeline::new(config, Arc::new(evaluator)).unwrap();

    let report = pipeline.run(temp.path()).await.unwrap();
    assert_eq!(
        output(&report, "README.md"),
        "![check:ok](assets/badges/green.svg) [dacdoc:ok]\n"
    );
}
