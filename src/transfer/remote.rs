use chrono::NaiveDateTime;

use super::ftps::FtpsConnection;
use super::helpers::cumulative_paths;
use super::params::{ConnectionParameters, Protocol, Timeouts};
use super::sftp::SftpConnection;
use crate::error::{SyncError, SyncResult};

/// One child of a listed remote directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Single path segment, never a nested path.
    pub name: String,
    /// Filled in when the listing carries it for free (SFTP readdir); `None`
    /// means the orchestrator has to ask via `modified_at`.
    pub modified_at: Option<NaiveDateTime>,
}

impl RemoteEntry {
    pub fn new(name: impl Into<String>, modified_at: Option<NaiveDateTime>) -> Self {
        Self { name: name.into(), modified_at }
    }
}

/// Result of trying to provide a single directory level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirOutcome {
    Created,
    AlreadyPresent,
    /// The server refused after an attempt; carries its reason.
    Refused(String),
}

/// Capability set shared by the SFTP and FTPS sessions. The orchestrator is
/// written against this trait only. Calls are blocking and must not be shared
/// across threads; after `close` every call fails with a transfer error.
pub trait RemoteConnection {
    fn protocol(&self) -> Protocol;

    /// Direct children of `directory`, as plain file names.
    fn list(&mut self, directory: &str) -> SyncResult<Vec<RemoteEntry>>;

    /// Server-local modification time, second precision.
    fn modified_at(&mut self, entry: &str, directory: &str) -> SyncResult<NaiveDateTime>;

    fn fetch(&mut self, entry: &str, directory: &str) -> SyncResult<Vec<u8>>;

    /// Create every missing level of `path` below `base`. `base` itself is
    /// expected to exist and is not checked. Existing levels are fine; a refusal
    /// is a `SyncError::Directory` naming the level that failed.
    fn ensure_directory(&mut self, base: &str, path: &str) -> SyncResult<()>;

    /// Write `content` to a fully-qualified path whose directory already exists.
    fn store(&mut self, path: &str, content: &[u8]) -> SyncResult<()>;

    /// Release session and transport. Idempotent.
    fn close(&mut self) -> SyncResult<()>;
}

impl<T: RemoteConnection + ?Sized> RemoteConnection for Box<T> {
    fn protocol(&self) -> Protocol {
        (**self).protocol()
    }
    fn list(&mut self, directory: &str) -> SyncResult<Vec<RemoteEntry>> {
        (**self).list(directory)
    }
    fn modified_at(&mut self, entry: &str, directory: &str) -> SyncResult<NaiveDateTime> {
        (**self).modified_at(entry, directory)
    }
    fn fetch(&mut self, entry: &str, directory: &str) -> SyncResult<Vec<u8>> {
        (**self).fetch(entry, directory)
    }
    fn ensure_directory(&mut self, base: &str, path: &str) -> SyncResult<()> {
        (**self).ensure_directory(base, path)
    }
    fn store(&mut self, path: &str, content: &[u8]) -> SyncResult<()> {
        (**self).store(path, content)
    }
    fn close(&mut self) -> SyncResult<()> {
        (**self).close()
    }
}

/// Open an authenticated session for `params.protocol`.
pub fn open(
    params: &ConnectionParameters,
    timeouts: &Timeouts,
) -> SyncResult<Box<dyn RemoteConnection>> {
    tracing::debug!("opening {} session to {}", params.protocol, params.addr());
    let conn: Box<dyn RemoteConnection> = match params.protocol {
        Protocol::Sftp => Box::new(SftpConnection::open(params, timeouts)?),
        Protocol::Ftps => Box::new(FtpsConnection::open(params, timeouts)?),
    };
    tracing::info!("connected to {} over {}", params.addr(), params.protocol);
    Ok(conn)
}

/// Walk `path` level by level, starting below `base`, and ask `check` to
/// provide each cumulative prefix. Both protocol variants build
/// `ensure_directory` on this loop; they differ only in how a single level is
/// checked. A `path` outside `base` is walked from its first segment.
pub fn ensure_segments<F>(base: &str, path: &str, mut check: F) -> SyncResult<()>
where
    F: FnMut(&str) -> DirOutcome,
{
    let known = cumulative_paths(base);
    let levels = cumulative_paths(path);
    let skip = if levels.starts_with(&known) { known.len() } else { 0 };
    for level in levels.into_iter().skip(skip) {
        match check(&level) {
            DirOutcome::Created => tracing::debug!("created remote directory {}", level),
            DirOutcome::AlreadyPresent => {}
            DirOutcome::Refused(reason) => {
                tracing::debug!("remote directory {} refused: {}", level, reason);
                return Err(SyncError::Directory { path: level, reason });
            }
        }
    }
    Ok(())
}
