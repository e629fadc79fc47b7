/// Errors surfaced by the transfer core, the archive helpers and the mail relay.
///
/// Every variant names the remote path, entry or attachment it concerns so the
/// caller can log and display it without extra context.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Transport, handshake or authentication failure while opening a session.
    #[error("connection to {addr} failed: {reason}")]
    Connection { addr: String, reason: String },
    /// Protocol name other than `sftp` / `ftps`.
    #[error("unsupported protocol '{0}' (expected sftp or ftps)")]
    UnsupportedProtocol(String),
    /// The download filter matched nothing.
    #[error("no entries in {directory} matched the selection criteria")]
    Selection { directory: String },
    /// A directory segment could not be created or entered.
    #[error("cannot create remote directory {path}: {reason}")]
    Directory { path: String, reason: String },
    /// A list/stat/fetch/store call failed after the target was validated.
    #[error("transfer failed for {path}: {reason}")]
    Transfer { path: String, reason: String },
    #[error("archive error: {0}")]
    Archive(String),
    #[error("mail error: {0}")]
    Mail(String),
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Coarse classification used by the CLI to pick exit codes and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    Selection,
    Directory,
    Transfer,
    Archive,
    Mail,
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Connection { .. } | SyncError::UnsupportedProtocol(_) => {
                ErrorKind::Connection
            }
            SyncError::Selection { .. } => ErrorKind::Selection,
            SyncError::Directory { .. } => ErrorKind::Directory,
            SyncError::Transfer { .. } => ErrorKind::Transfer,
            SyncError::Archive(_) => ErrorKind::Archive,
            SyncError::Mail(_) => ErrorKind::Mail,
        }
    }

    /// Process exit code for this failure. An empty selection is something the
    /// user can fix by widening the filter, so it gets its own code.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Selection => 2,
            ErrorKind::Connection => 3,
            ErrorKind::Directory | ErrorKind::Transfer => 4,
            ErrorKind::Archive | ErrorKind::Mail => 5,
        }
    }

    pub(crate) fn transfer(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        SyncError::Transfer { path: path.into(), reason: reason.to_string() }
    }

    pub(crate) fn connection(addr: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        SyncError::Connection { addr: addr.into(), reason: reason.to_string() }
    }

    pub(crate) fn closed(path: &str) -> Self {
        SyncError::transfer(path, "connection already closed")
    }
}
