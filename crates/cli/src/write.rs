use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(OsString::new, OsString::from);
    name.push(".dacdoc.tmp");
    path.with_file_name(name)
}

/// Replace `path` with `contents` through a sibling temp file and a rename, so readers never
/// see a half-written file.
pub async fn write_atomic(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, contents)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    if let Err(err) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(err).with_context(|| format!("Failed to replace {}", path.display()));
    }
    Ok(())
}
