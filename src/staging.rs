use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::transfer::{DownloadResult, file_name, normalize_path};

/// Local staging area for downloads, rooted at the configured `staging_root`.
#[derive(Debug, Clone)]
pub struct Stager {
    root: PathBuf,
}

/// Last segment of a user-supplied destination label; never empty.
fn destination_label(destination: &str) -> String {
    let norm = normalize_path(destination.trim());
    let last = file_name(&norm);
    if last.is_empty() || last == "." || last == ".." || last == "/" {
        "download".to_string()
    } else {
        last.to_string()
    }
}

impl Stager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<root>/<basename(destination)>`
    pub fn stage_dir(&self, destination: &str) -> PathBuf {
        self.root.join(destination_label(destination))
    }

    /// `<root>/<basename(destination)>_archivos.zip`
    pub fn archive_path(&self, destination: &str) -> PathBuf {
        self.root.join(format!("{}_archivos.zip", destination_label(destination)))
    }

    /// Write each downloaded entry into the stage directory for `destination`.
    /// Entry names are single remote path segments; anything else is skipped.
    pub fn stage(&self, destination: &str, result: &DownloadResult) -> Result<Vec<PathBuf>> {
        let dir = self.stage_dir(destination);
        fs::create_dir_all(&dir)
            .with_context(|| format!("cannot create staging dir {}", dir.display()))?;
        let mut written = Vec::with_capacity(result.len());
        for entry in result.entries() {
            let name = Path::new(&entry.name);
            if name.file_name().map(|f| f != name.as_os_str()).unwrap_or(true) {
                tracing::warn!("not staging entry with unexpected name {:?}", entry.name);
                continue;
            }
            let path = dir.join(name);
            fs::write(&path, &entry.content)
                .with_context(|| format!("cannot write {}", path.display()))?;
            written.push(path);
        }
        tracing::debug!("staged {} files under {}", written.len(), dir.display());
        Ok(written)
    }

    /// Write the archive bytes to `<root>/<destination>_archivos.zip`, or to
    /// `output` when given.
    pub fn write_archive(
        &self,
        destination: &str,
        output: Option<&Path>,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let path = match output {
            Some(p) => p.to_path_buf(),
            None => self.archive_path(destination),
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        fs::write(&path, bytes).with_context(|| format!("cannot write {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::ArchiveEntry;

    #[test]
    fn paths_use_destination_basename() {
        let s = Stager::new("/srv/stage");
        assert_eq!(s.stage_dir("clients/acme"), PathBuf::from("/srv/stage/acme"));
        assert_eq!(s.stage_dir("../../etc"), PathBuf::from("/srv/stage/etc"));
        assert_eq!(s.archive_path("acme/"), PathBuf::from("/srv/stage/acme_archivos.zip"));
        assert_eq!(s.stage_dir(""), PathBuf::from("/srv/stage/download"));
    }

    #[test]
    fn stage_writes_plain_entries_and_skips_nested_names() {
        let tmp = tempfile::tempdir().unwrap();
        let s = Stager::new(tmp.path());
        let result = DownloadResult::from(vec![
            ArchiveEntry { name: "a.csv".into(), content: b"1,2\n".to_vec() },
            ArchiveEntry { name: "sub/x.csv".into(), content: b"nope".to_vec() },
        ]);

        let written = s.stage("clients/acme", &result).unwrap();
        let dir = tmp.path().join("acme");
        assert_eq!(written, vec![dir.join("a.csv")]);
        assert_eq!(fs::read(dir.join("a.csv")).unwrap(), b"1,2\n");
        assert!(!dir.join("sub").exists());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 1);
    }

    #[test]
    fn write_archive_defaults_under_root() {
        let tmp = tempfile::tempdir().unwrap();
        let s = Stager::new(tmp.path());
        let p = s.write_archive("acme", None, b"PK").unwrap();
        assert_eq!(p, tmp.path().join("acme_archivos.zip"));
        assert_eq!(fs::read(&p).unwrap(), b"PK");

        let custom = tmp.path().join("out/x.zip");
        let p2 = s.write_archive("acme", Some(&custom), b"PK2").unwrap();
        assert_eq!(p2, custom);
        assert_eq!(fs::read(&custom).unwrap(), b"PK2");
    }
}
