//! Zip packaging of downloads and zip extraction for uploads.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{SyncError, SyncResult};
use crate::transfer::{DownloadResult, TransferItem, normalize_relative};

/// Deflate every entry of `result` into an in-memory zip, in order.
pub fn pack(result: &DownloadResult) -> SyncResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for entry in result.entries() {
        writer
            .start_file(entry.name.as_str(), options)
            .map_err(|e| SyncError::Archive(format!("cannot add {}: {}", entry.name, e)))?;
        writer
            .write_all(&entry.content)
            .map_err(|e| SyncError::Archive(format!("cannot write {}: {}", entry.name, e)))?;
    }
    let cursor =
        writer.finish().map_err(|e| SyncError::Archive(format!("cannot finish zip: {}", e)))?;
    Ok(cursor.into_inner())
}

/// Turn the members of an uploaded zip into upload items, in archive order.
/// Directory members are dropped, and so is any member whose path is empty
/// or climbs out of the extraction root.
pub fn extract(bytes: &[u8]) -> SyncResult<Vec<TransferItem>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| SyncError::Archive(format!("failed to read zip archive: {}", e)))?;
    let mut items = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| SyncError::Archive(format!("failed to read zip entry {}: {}", i, e)))?;
        if file.is_dir() {
            continue;
        }
        let member = file.name().to_string();
        let Some(rel) = normalize_relative(&member) else {
            tracing::warn!("skipping zip member with unsafe path {:?}", member);
            continue;
        };
        let mut content = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut content)
            .map_err(|e| SyncError::Archive(format!("failed to extract {}: {}", member, e)))?;
        items.push(TransferItem::new(rel, content));
    }
    Ok(items)
}
