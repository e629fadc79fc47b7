use std::io::{Read, Write};
use std::path::Path;

use chrono::{Local, NaiveDateTime, TimeZone};

use super::helpers::join_remote;
use super::params::{ConnectionParameters, Protocol, Timeouts};
use super::remote::{DirOutcome, RemoteConnection, RemoteEntry, ensure_segments};
use super::session::connect_session;
use crate::error::{SyncError, SyncResult};

struct SftpInner {
    // declared first so the subsystem channel drops before the session
    sftp: ssh2::Sftp,
    sess: ssh2::Session,
}

/// SFTP variant: every call addresses its path directly, no session state
/// besides the open subsystem channel.
pub struct SftpConnection {
    addr: String,
    inner: Option<SftpInner>,
}

impl SftpConnection {
    pub fn open(params: &ConnectionParameters, timeouts: &Timeouts) -> SyncResult<Self> {
        let addr = params.addr();
        let sess = connect_session(params, timeouts)?;
        let sftp = sess
            .sftp()
            .map_err(|e| SyncError::connection(&addr, format!("SFTP subsystem failed: {}", e)))?;
        Ok(Self { addr, inner: Some(SftpInner { sftp, sess }) })
    }

    fn sftp(&self, path: &str) -> SyncResult<&ssh2::Sftp> {
        self.inner.as_ref().map(|i| &i.sftp).ok_or_else(|| SyncError::closed(path))
    }
}

// mtime is seconds since the epoch; present it in server-local wall time
fn local_time(secs: u64) -> Option<NaiveDateTime> {
    Local.timestamp_opt(secs as i64, 0).single().map(|dt| dt.naive_local())
}

/// 目录探测只需要 stat 与 mkdir
///
/// Only what `check_level` needs.
pub(crate) trait SftpDirOps {
    /// `Ok(true)` for a directory, `Ok(false)` for anything else that exists,
    /// `Err` when the path is missing or cannot be stat'ed.
    fn stat_is_dir(&self, p: &Path) -> Result<bool, String>;
    fn mkdir(&self, p: &Path, mode: i32) -> Result<(), String>;
}

impl SftpDirOps for ssh2::Sftp {
    fn stat_is_dir(&self, p: &Path) -> Result<bool, String> {
        self.stat(p).map(|st| st.is_dir()).map_err(|e| e.to_string())
    }

    fn mkdir(&self, p: &Path, mode: i32) -> Result<(), String> {
        ssh2::Sftp::mkdir(self, p, mode).map_err(|e| e.to_string())
    }
}

/// 单级目录探测
///
/// A directory is AlreadyPresent and a file is Refused. A missing level is
/// created; if mkdir fails, one more stat decides (another client may have
/// created it in the meantime).
fn check_level<S: SftpDirOps + ?Sized>(sftp: &S, level: &str) -> DirOutcome {
    let p = Path::new(level);
    match sftp.stat_is_dir(p) {
        Ok(true) => DirOutcome::AlreadyPresent,
        Ok(false) => DirOutcome::Refused("exists and is not a directory".to_string()),
        Err(_) => match sftp.mkdir(p, 0o755) {
            Ok(()) => DirOutcome::Created,
            Err(e) => match sftp.stat_is_dir(p) {
                Ok(true) => DirOutcome::AlreadyPresent,
                _ => DirOutcome::Refused(e),
            },
        },
    }
}

fn ensure_levels<S: SftpDirOps + ?Sized>(sftp: &S, base: &str, path: &str) -> SyncResult<()> {
    ensure_segments(base, path, |level| check_level(sftp, level))
}

impl RemoteConnection for SftpConnection {
    fn protocol(&self) -> Protocol {
        Protocol::Sftp
    }

    fn list(&mut self, directory: &str) -> SyncResult<Vec<RemoteEntry>> {
        let sftp = self.sftp(directory)?;
        let listed =
            sftp.readdir(Path::new(directory)).map_err(|e| SyncError::transfer(directory, e))?;
        let entries: Vec<RemoteEntry> = listed
            .into_iter()
            .filter_map(|(path, stat)| {
                let name = path.file_name()?.to_string_lossy().to_string();
                if name == "." || name == ".." {
                    return None;
                }
                Some(RemoteEntry::new(name, stat.mtime.and_then(local_time)))
            })
            .collect();
        tracing::debug!("[sftp] listed {} entries in {}", entries.len(), directory);
        Ok(entries)
    }

    fn modified_at(&mut self, entry: &str, directory: &str) -> SyncResult<NaiveDateTime> {
        let full = join_remote(directory, entry);
        let sftp = self.sftp(&full)?;
        let st = sftp.stat(Path::new(&full)).map_err(|e| SyncError::transfer(&full, e))?;
        st.mtime
            .and_then(local_time)
            .ok_or_else(|| SyncError::transfer(&full, "server reported no modification time"))
    }

    fn fetch(&mut self, entry: &str, directory: &str) -> SyncResult<Vec<u8>> {
        let full = join_remote(directory, entry);
        let sftp = self.sftp(&full)?;
        let mut file = sftp.open(Path::new(&full)).map_err(|e| SyncError::transfer(&full, e))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(|e| SyncError::transfer(&full, e))?;
        tracing::debug!("[sftp] fetched {} ({} bytes)", full, buf.len());
        Ok(buf)
    }

    fn ensure_directory(&mut self, base: &str, path: &str) -> SyncResult<()> {
        let sftp = self.sftp(path)?;
        ensure_levels(sftp, base, path)
    }

    fn store(&mut self, path: &str, content: &[u8]) -> SyncResult<()> {
        let sftp = self.sftp(path)?;
        let mut remote_f = sftp.create(Path::new(path)).map_err(|e| SyncError::transfer(path, e))?;
        remote_f.write_all(content).map_err(|e| SyncError::transfer(path, e))?;
        remote_f.flush().map_err(|e| SyncError::transfer(path, e))?;
        tracing::debug!("[sftp] stored {} ({} bytes)", path, content.len());
        Ok(())
    }

    fn close(&mut self) -> SyncResult<()> {
        let Some(SftpInner { sftp, sess }) = self.inner.take() else {
            return Ok(());
        };
        drop(sftp);
        let res = sess.disconnect(None, "closing", None);
        tracing::debug!("[sftp] closed session to {}", self.addr);
        res.map_err(|e| SyncError::connection(&self.addr, format!("disconnect failed: {}", e)))
    }
}

impl Drop for SftpConnection {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
