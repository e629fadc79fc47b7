use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use walkdir::WalkDir;

use crate::archive;
use crate::transfer::{TransferItem, normalize_relative};

fn is_zip(p: &Path) -> bool {
    p.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("zip"))
}

/// Build upload items from local sources.
///
/// - a file becomes one item named after the file
/// - a directory contributes its contents (not the container), recursively,
///   keeping paths relative to it
/// - with `extract_zip` and exactly one `.zip` source, the archive members
///   are uploaded instead, preserving their paths
pub fn collect_items(sources: &[PathBuf], extract_zip: bool) -> Result<Vec<TransferItem>> {
    if sources.is_empty() {
        return Err(anyhow!("upload needs at least one local source"));
    }
    if extract_zip
        && let [only] = sources
        && is_zip(only)
    {
        let bytes = std::fs::read(only).with_context(|| format!("cannot read {}", only.display()))?;
        let items = archive::extract(&bytes)?;
        tracing::debug!("extracted {} members from {}", items.len(), only.display());
        return Ok(items);
    }
    if extract_zip {
        tracing::warn!("--extract-zip needs exactly one .zip source; uploading files as-is");
    }

    let mut items = Vec::new();
    for src in sources {
        if src.is_dir() {
            collect_dir_items(src, &mut items)?;
        } else if src.is_file() {
            let name = src
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow!("source has no usable file name: {}", src.display()))?;
            let content =
                std::fs::read(src).with_context(|| format!("cannot read {}", src.display()))?;
            items.push(TransferItem::new(name, content));
        } else {
            return Err(anyhow!("source does not exist: {} (local)", src.display()));
        }
    }
    Ok(items)
}

fn collect_dir_items(root: &Path, items: &mut Vec<TransferItem>) -> Result<()> {
    // sorted so the upload order is stable across platforms
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("cannot walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel = path.strip_prefix(root).unwrap_or(path).to_string_lossy().replace('\\', "/");
        let Some(rel) = normalize_relative(&rel) else {
            continue;
        };
        let content =
            std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
        items.push(TransferItem::new(rel, content));
    }
    Ok(())
}
