use dacdoc_anchor::AnchorForm;
use dacdoc_pipeline::{InspectReport, RunReport, RunStats, Warning};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// `path` relative to `root` with `/` separators, for display
pub fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[derive(Debug, Serialize)]
pub struct CompileOutput {
    pub root: PathBuf,
    pub written: Vec<String>,
    pub assets: Vec<String>,
    pub warnings: Vec<Warning>,
    pub stats: RunStats,
}

impl CompileOutput {
    pub fn new(report: &RunReport, written: &[PathBuf], assets: &[PathBuf]) -> Self {
        let root = &report.root;
        Self {
            root: root.clone(),
            written: written.iter().map(|p| display_path(root, p)).collect(),
            assets: assets.iter().map(|p| display_path(root, p)).collect(),
            warnings: report.warnings.clone(),
            stats: report.stats.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub root: PathBuf,
    pub clean: bool,
    /// Documents that a compile would rewrite
    pub outdated: Vec<String>,
    pub warnings: Vec<Warning>,
    pub stats: RunStats,
}

impl CheckOutput {
    pub fn new(report: &RunReport) -> Self {
        let root = &report.root;
        Self {
            root: root.clone(),
            clean: report.is_clean(),
            outdated: report.changed.iter().map(|p| display_path(root, p)).collect(),
            warnings: report.warnings.clone(),
            stats: report.stats.clone(),
        }
    }
}

/// One line per anchor and per diagnostic: `path:line:column<TAB>...`
pub fn render_listing(report: &InspectReport) -> String {
    let mut out = String::new();
    for (path, document) in &report.documents {
        let path = display_path(&report.root, path);
        for anchor in &document.anchors {
            let position = anchor.position();
            let form = match anchor.form() {
                AnchorForm::Placeholder => "placeholder".to_string(),
                AnchorForm::Rendered { target } => format!("rendered {target}"),
            };
            out.push_str(&format!(
                "{path}:{}:{}\t{}\t{form}\n",
                position.line,
                position.column,
                anchor.check_id()
            ));
        }
        for diagnostic in &document.diagnostics {
            out.push_str(&format!("{path}:{diagnostic}\n"));
        }
    }
    out
}

pub fn render_warnings(root: &Path, warnings: &[Warning]) -> String {
    let mut out = String::new();
    for warning in warnings {
        let mut warning = warning.clone();
        warning.path = warning.path.map(|path| PathBuf::from(display_path(root, &path)));
        out.push_str(&format!("warning: {warning}\n"));
    }
    out
}
