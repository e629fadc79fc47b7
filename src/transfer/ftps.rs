use std::io::Cursor;

use chrono::NaiveDateTime;
use suppaftp::native_tls::TlsConnector;
use suppaftp::types::FileType;
use suppaftp::{NativeTlsConnector, NativeTlsFtpStream};

use super::helpers::{file_name, join_remote, parent_dir};
use super::params::{ConnectionParameters, Protocol, Timeouts};
use super::remote::{DirOutcome, RemoteConnection, RemoteEntry, ensure_segments};
use super::session::resolve_addr;
use crate::error::{SyncError, SyncResult};

/// FTPS variant (explicit TLS, protected data channel). The control session
/// keeps a current working directory, so listing/stat/fetch first change into
/// the requested directory, and ensure/store put the session back where it was
/// before returning, whether they succeed or not.
pub struct FtpsConnection {
    addr: String,
    stream: Option<NativeTlsFtpStream>,
    // directory the session was last moved into by list/stat/fetch
    current: Option<String>,
}

impl FtpsConnection {
    pub fn open(params: &ConnectionParameters, timeouts: &Timeouts) -> SyncResult<Self> {
        let addr = params.addr();
        let sock = resolve_addr(&addr)?;
        let plain = NativeTlsFtpStream::connect_timeout(sock, timeouts.connect)
            .map_err(|e| SyncError::connection(&addr, e))?;
        let _ = plain.get_ref().set_read_timeout(Some(timeouts.io));
        let _ = plain.get_ref().set_write_timeout(Some(timeouts.io));

        let connector = TlsConnector::new()
            .map_err(|e| SyncError::connection(&addr, format!("TLS setup failed: {}", e)))?;
        // AUTH TLS, then PBSZ 0 / PROT P for the data channel
        let mut stream = plain
            .into_secure(NativeTlsConnector::from(connector), &params.host)
            .map_err(|e| SyncError::connection(&addr, format!("TLS negotiation failed: {}", e)))?;
        stream.login(params.username.as_str(), params.password.as_str()).map_err(|e| {
            SyncError::connection(
                &addr,
                format!("authentication failed for {}: {}", params.username, e),
            )
        })?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| SyncError::connection(&addr, format!("cannot switch to binary: {}", e)))?;
        Ok(Self { addr, stream: Some(stream), current: None })
    }

    fn stream(&mut self, path: &str) -> SyncResult<&mut NativeTlsFtpStream> {
        self.stream.as_mut().ok_or_else(|| SyncError::closed(path))
    }

    /// Move the session into `directory` unless it is already there.
    fn enter(&mut self, directory: &str) -> SyncResult<&mut NativeTlsFtpStream> {
        let already = self.current.as_deref() == Some(directory);
        if !already {
            self.current = None;
            self.stream(directory)?.cwd(directory).map_err(|e| SyncError::transfer(directory, e))?;
            self.current = Some(directory.to_string());
        }
        self.stream(directory)
    }

    /// Run `op` with the session returned to its starting directory
    /// afterwards; see `restoring_cwd`.
    fn with_restored_cwd<T>(
        &mut self,
        path: &str,
        op: impl FnOnce(&mut NativeTlsFtpStream, &str) -> SyncResult<T>,
    ) -> SyncResult<T> {
        let stream = self.stream(path)?;
        let (outcome, back) = restoring_cwd(stream, path, op);
        if !back {
            // we no longer know where the session is
            self.current = None;
        }
        outcome
    }
}

/// 目录相关的 FTP 控制命令：PWD / CWD / MKD
///
/// Only what `check_level` and `restoring_cwd` need.
pub(crate) trait FtpDirOps {
    fn pwd(&mut self) -> Result<String, String>;
    fn cwd(&mut self, dir: &str) -> Result<(), String>;
    fn mkdir(&mut self, dir: &str) -> Result<(), String>;
}

impl FtpDirOps for NativeTlsFtpStream {
    fn pwd(&mut self) -> Result<String, String> {
        NativeTlsFtpStream::pwd(self).map_err(|e| e.to_string())
    }

    fn cwd(&mut self, dir: &str) -> Result<(), String> {
        NativeTlsFtpStream::cwd(self, dir).map_err(|e| e.to_string())
    }

    fn mkdir(&mut self, dir: &str) -> Result<(), String> {
        NativeTlsFtpStream::mkdir(self, dir).map_err(|e| e.to_string())
    }
}

/// Run `op` and return the session to the directory it started in, even when
/// `op` fails. A failed restore is reported only if `op` succeeded. The flag
/// is false when the session may have been left somewhere else.
fn restoring_cwd<S: FtpDirOps, T>(
    stream: &mut S,
    path: &str,
    op: impl FnOnce(&mut S, &str) -> SyncResult<T>,
) -> (SyncResult<T>, bool) {
    let origin = match stream.pwd() {
        Ok(o) => o,
        Err(e) => return (Err(SyncError::transfer(path, e)), true),
    };
    let outcome = op(stream, &origin);
    match (outcome, stream.cwd(&origin)) {
        (Ok(v), Ok(())) => (Ok(v), true),
        (Ok(_), Err(e)) => {
            let reason = format!("cannot return to {}: {}", origin, e);
            (Err(SyncError::transfer(&origin, reason)), false)
        }
        (Err(e), restored) => (Err(e), restored.is_ok()),
    }
}

/// 单级目录探测
///
/// Enter the level; otherwise create and enter it. A failed create followed
/// by a successful enter is AlreadyPresent. `level` is anchored at `origin`
/// so that entering one level does not shift the meaning of the next
/// relative one.
fn check_level<S: FtpDirOps + ?Sized>(stream: &mut S, origin: &str, level: &str) -> DirOutcome {
    let anchored;
    let level = if level.starts_with('/') {
        level
    } else {
        anchored = join_remote(origin, level);
        anchored.as_str()
    };
    if stream.cwd(level).is_ok() {
        return DirOutcome::AlreadyPresent;
    }
    match stream.mkdir(level) {
        Ok(()) => match stream.cwd(level) {
            Ok(()) => DirOutcome::Created,
            Err(e) => DirOutcome::Refused(format!("created but cannot enter: {}", e)),
        },
        Err(e) => {
            if stream.cwd(level).is_ok() {
                DirOutcome::AlreadyPresent
            } else {
                DirOutcome::Refused(e)
            }
        }
    }
}

fn ensure_levels<S: FtpDirOps + ?Sized>(
    stream: &mut S,
    origin: &str,
    base: &str,
    path: &str,
) -> SyncResult<()> {
    ensure_segments(base, path, |level| check_level(stream, origin, level))
}

impl RemoteConnection for FtpsConnection {
    fn protocol(&self) -> Protocol {
        Protocol::Ftps
    }

    fn list(&mut self, directory: &str) -> SyncResult<Vec<RemoteEntry>> {
        let stream = self.enter(directory)?;
        let names = stream.nlst(None).map_err(|e| SyncError::transfer(directory, e))?;
        // some servers answer NLST with paths; keep the last segment only
        let entries: Vec<RemoteEntry> = names
            .iter()
            .map(|n| file_name(n.trim_end_matches('/')).to_string())
            .filter(|n| !n.is_empty() && n != "." && n != "..")
            .map(|n| RemoteEntry::new(n, None))
            .collect();
        tracing::debug!("[ftps] listed {} entries in {}", entries.len(), directory);
        Ok(entries)
    }

    fn modified_at(&mut self, entry: &str, directory: &str) -> SyncResult<NaiveDateTime> {
        let stream = self.enter(directory)?;
        stream.mdtm(entry).map_err(|e| SyncError::transfer(join_remote(directory, entry), e))
    }

    fn fetch(&mut self, entry: &str, directory: &str) -> SyncResult<Vec<u8>> {
        let stream = self.enter(directory)?;
        let buf = stream
            .retr_as_buffer(entry)
            .map_err(|e| SyncError::transfer(join_remote(directory, entry), e))?
            .into_inner();
        tracing::debug!("[ftps] fetched {}/{} ({} bytes)", directory, entry, buf.len());
        Ok(buf)
    }

    fn ensure_directory(&mut self, base: &str, path: &str) -> SyncResult<()> {
        self.with_restored_cwd(path, |stream, origin| ensure_levels(stream, origin, base, path))
    }

    fn store(&mut self, path: &str, content: &[u8]) -> SyncResult<()> {
        let dir = parent_dir(path);
        let name = file_name(path).to_string();
        self.with_restored_cwd(path, |stream, _| {
            stream.cwd(&dir).map_err(|e| SyncError::transfer(path, e))?;
            let mut reader = Cursor::new(content);
            let written =
                stream.put_file(&name, &mut reader).map_err(|e| SyncError::transfer(path, e))?;
            tracing::debug!("[ftps] stored {} ({} bytes)", path, written);
            Ok(())
        })
    }

    fn close(&mut self) -> SyncResult<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        self.current = None;
        let res = stream.quit();
        tracing::debug!("[ftps] closed session to {}", self.addr);
        res.map_err(|e| SyncError::connection(&self.addr, format!("QUIT failed: {}", e)))
    }
}

impl Drop for FtpsConnection {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Control-channel stand-in: a working directory plus a set of existing
    /// directories. Paths are resolved against the working directory.
    struct FakeFtp {
        cwd: String,
        dirs: HashSet<String>,
        denied: HashSet<String>,
        // MKD fails but the directory is there afterwards
        racy: HashSet<String>,
        mkdirs: Vec<String>,
    }

    impl FakeFtp {
        fn at(cwd: &str, dirs: &[&str]) -> Self {
            FakeFtp {
                cwd: cwd.to_string(),
                dirs: dirs.iter().map(|d| d.to_string()).collect(),
                denied: HashSet::new(),
                racy: HashSet::new(),
                mkdirs: Vec::new(),
            }
        }

        fn resolve(&self, dir: &str) -> String {
            if dir.starts_with('/') { dir.to_string() } else { join_remote(&self.cwd, dir) }
        }
    }

    impl FtpDirOps for FakeFtp {
        fn pwd(&mut self) -> Result<String, String> {
            Ok(self.cwd.clone())
        }

        fn cwd(&mut self, dir: &str) -> Result<(), String> {
            let target = self.resolve(dir);
            if self.dirs.contains(&target) {
                self.cwd = target;
                Ok(())
            } else {
                Err(format!("550 {}: no such directory", target))
            }
        }

        fn mkdir(&mut self, dir: &str) -> Result<(), String> {
            let target = self.resolve(dir);
            self.mkdirs.push(target.clone());
            if self.racy.contains(&target) {
                self.dirs.insert(target);
                return Err("550 already exists".to_string());
            }
            if self.denied.contains(&target) {
                return Err("550 permission denied".to_string());
            }
            self.dirs.insert(target);
            Ok(())
        }
    }

    fn ensure(fake: &mut FakeFtp, base: &str, path: &str) -> (SyncResult<()>, bool) {
        restoring_cwd(fake, path, |s, origin| ensure_levels(s, origin, base, path))
    }

    #[test]
    fn failed_mkd_then_enterable_counts_as_present() {
        let mut fake = FakeFtp::at("/", &["/", "/in"]);
        fake.racy.insert("/in/a".into());
        assert_eq!(check_level(&mut fake, "/", "/in/a"), DirOutcome::AlreadyPresent);
        assert_eq!(fake.mkdirs, vec!["/in/a"]);
    }

    #[test]
    fn cwd_restored_after_refused_level() {
        let mut fake = FakeFtp::at("/home/u", &["/", "/home", "/home/u", "/in"]);
        fake.denied.insert("/in/locked".into());
        let (res, back) = ensure(&mut fake, "/in", "/in/locked/deep");
        match res {
            Err(SyncError::Directory { path, reason }) => {
                assert_eq!(path, "/in/locked");
                assert!(reason.contains("permission denied"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(back);
        assert_eq!(fake.cwd, "/home/u");
    }

    #[test]
    fn cwd_restored_after_success_and_relative_levels_anchor_at_start() {
        let mut fake = FakeFtp::at("/home/u", &["/", "/home", "/home/u"]);
        let (res, back) = ensure(&mut fake, ".", "./sub/x");
        res.unwrap();
        assert!(back);
        assert_eq!(fake.cwd, "/home/u");
        assert_eq!(fake.mkdirs, vec!["/home/u/sub", "/home/u/sub/x"]);
    }

    #[test]
    fn second_ensure_issues_no_mkd() {
        let mut fake = FakeFtp::at("/", &["/", "/in"]);
        ensure(&mut fake, "/in", "/in/a/b").0.unwrap();
        assert_eq!(fake.mkdirs.len(), 2);
        ensure(&mut fake, "/in", "/in/a/b").0.unwrap();
        assert_eq!(fake.mkdirs.len(), 2);
        assert_eq!(fake.cwd, "/");
    }

    #[test]
    fn failed_op_still_restores() {
        let mut fake = FakeFtp::at("/start", &["/", "/start", "/elsewhere"]);
        let (res, back) = restoring_cwd(&mut fake, "/elsewhere/f.txt", |s, _| {
            s.cwd("/elsewhere").map_err(|e| SyncError::transfer("/elsewhere", e))?;
            Err::<(), _>(SyncError::transfer("/elsewhere/f.txt", "disk full"))
        });
        assert!(res.is_err());
        assert!(back);
        assert_eq!(fake.cwd, "/start");
    }
}
