use crate::write::write_atomic;
use anyhow::{Context, Result};
use dacdoc_protocol::{Indicator, IndicatorSet};
use std::path::{Path, PathBuf};

const GREY_SVG: &str = include_str!("../assets/grey.svg");
const GREEN_SVG: &str = include_str!("../assets/green.svg");
const ORANGE_SVG: &str = include_str!("../assets/orange.svg");
const RED_SVG: &str = include_str!("../assets/red.svg");

/// Embedded picture for `indicator`
pub const fn asset(indicator: Indicator) -> &'static str {
    match indicator {
        Indicator::Grey => GREY_SVG,
        Indicator::Green => GREEN_SVG,
        Indicator::Orange => ORANGE_SVG,
        Indicator::Red => RED_SVG,
    }
}

/// Write the four indicator pictures into `dir`, creating it when missing and overwriting
/// existing files. Returns the written paths.
pub async fn provision(dir: &Path, indicators: &IndicatorSet) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create resource directory {}", dir.display()))?;

    let mut written = Vec::with_capacity(Indicator::ALL.len());
    for (indicator, file_name) in indicators.iter() {
        let path = dir.join(file_name);
        write_atomic(&path, asset(indicator)).await?;
        log::debug!("Provisioned {indicator} indicator at {}", path.display());
        written.push(path);
    }
    Ok(written)
}
