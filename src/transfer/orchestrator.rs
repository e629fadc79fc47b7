use std::collections::HashSet;

use serde::Serialize;

use super::helpers::{cumulative_paths, join_remote, normalize_relative, parent_dir, remote_base};
use super::remote::RemoteConnection;
use super::selection::SelectionCriteria;
use crate::error::{SyncError, SyncResult};

/// One file headed for the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferItem {
    /// Forward-slash relative path under the remote base.
    pub relative_path: String,
    pub content: Vec<u8>,
}

impl TransferItem {
    pub fn new(relative_path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self { relative_path: relative_path.into(), content: content.into() }
    }
}

/// A fetched remote file, as it will appear in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub content: Vec<u8>,
}

/// The selected entries, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadResult {
    entries: Vec<ArchiveEntry>,
}

impl DownloadResult {
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.content.len() as u64).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<ArchiveEntry>> for DownloadResult {
    fn from(entries: Vec<ArchiveEntry>) -> Self {
        Self { entries }
    }
}

/// Remote paths written, in input order; rejected items are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub uploaded: Vec<String>,
}

/// Close the connection on every exit path. The operation's own error wins
/// over a failed close; a failed close after success is only logged.
fn finish<C: RemoteConnection, T>(mut conn: C, outcome: SyncResult<T>) -> SyncResult<T> {
    if let Err(e) = conn.close() {
        tracing::warn!("closing {} session failed: {}", conn.protocol(), e);
    }
    outcome
}

/// Names in `directory` that satisfy `criteria`, in listing order. Asks the
/// connection for a modification time only when a date filter is set, the
/// name already passed the prefix filter and the listing did not carry it.
pub fn select<C: RemoteConnection + ?Sized>(
    conn: &mut C,
    directory: &str,
    criteria: &SelectionCriteria,
) -> SyncResult<Vec<String>> {
    let listed = conn.list(directory)?;
    let total = listed.len();
    let mut selected = Vec::new();
    for entry in listed {
        if !criteria.matches_name(&entry.name) {
            continue;
        }
        if criteria.needs_modified_at() {
            let modified = match entry.modified_at {
                Some(t) => t,
                None => conn.modified_at(&entry.name, directory)?,
            };
            if !criteria.matches_date(modified) {
                continue;
            }
        }
        selected.push(entry.name);
    }
    tracing::debug!("selected {}/{} entries in {}", selected.len(), total, directory);
    if selected.is_empty() {
        return Err(SyncError::Selection { directory: directory.to_string() });
    }
    Ok(selected)
}

fn select_and_fetch<C: RemoteConnection>(
    conn: &mut C,
    directory: &str,
    criteria: &SelectionCriteria,
) -> SyncResult<DownloadResult> {
    let selected = select(conn, directory, criteria)?;
    let mut entries = Vec::with_capacity(selected.len());
    for name in selected {
        let content = conn.fetch(&name, directory)?;
        entries.push(ArchiveEntry { name, content });
    }
    Ok(entries.into())
}

/// List `directory`, keep the entries matching `criteria` and fetch them.
/// Fails with `SyncError::Selection` when nothing matches. Consumes and closes
/// the connection whatever the outcome.
pub fn download<C: RemoteConnection>(
    mut conn: C,
    directory: &str,
    criteria: &SelectionCriteria,
) -> SyncResult<DownloadResult> {
    let outcome = select_and_fetch(&mut conn, directory, criteria);
    if let Ok(ref res) = outcome {
        tracing::info!(
            "downloaded {} entries ({} bytes) from {}",
            res.len(),
            res.total_bytes(),
            directory
        );
    }
    finish(conn, outcome)
}

fn push_items<C: RemoteConnection>(
    conn: &mut C,
    remote_base_raw: &str,
    items: Vec<TransferItem>,
) -> SyncResult<UploadResult> {
    let base = remote_base(remote_base_raw);
    // directories known to exist in this run, ancestors included
    let mut ensured: HashSet<String> = HashSet::new();
    let mut uploaded = Vec::with_capacity(items.len());
    for item in items {
        let Some(rel) = normalize_relative(&item.relative_path) else {
            tracing::warn!("skipping unsafe upload path {:?}", item.relative_path);
            continue;
        };
        let remote_path = join_remote(&base, &rel);
        let dir = parent_dir(&remote_path);
        if dir != base && !ensured.contains(&dir) {
            conn.ensure_directory(&base, &dir)?;
            ensured.extend(cumulative_paths(&dir));
        }
        conn.store(&remote_path, &item.content)?;
        uploaded.push(remote_path);
    }
    Ok(UploadResult { uploaded })
}

/// Store every acceptable item under `remote_base`, creating intermediate
/// directories. Unsafe relative paths are skipped; a directory or store
/// failure aborts the rest of the batch without undoing earlier writes.
/// Consumes and closes the connection whatever the outcome.
pub fn upload<C: RemoteConnection>(
    mut conn: C,
    remote_base: &str,
    items: Vec<TransferItem>,
) -> SyncResult<UploadResult> {
    let requested = items.len();
    let outcome = push_items(&mut conn, remote_base, items);
    if let Ok(ref res) = outcome {
        tracing::info!(
            "uploaded {}/{} items under {}",
            res.uploaded.len(),
            requested,
            remote_base
        );
    }
    finish(conn, outcome)
}
