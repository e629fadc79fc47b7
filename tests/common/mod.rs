#![allow(dead_code)]
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use filebridge::transfer::{
    DirOutcome, Protocol, RemoteConnection, RemoteEntry, ensure_segments, join_remote,
};
use filebridge::{SyncError, SyncResult};

pub fn at(s: &str) -> NaiveDateTime {
    filebridge::transfer::parse_not_before(s).unwrap().unwrap()
}

/// Shared state behind a `MemoryRemote`; tests keep a handle to inspect it
/// after the orchestrator has consumed (and closed) the connection.
#[derive(Default)]
pub struct RemoteState {
    /// directory -> entries in listing order
    pub listings: BTreeMap<String, Vec<(String, NaiveDateTime, Vec<u8>)>>,
    pub dirs: BTreeSet<String>,
    pub refuse_dirs: HashSet<String>,
    pub fail_store: HashSet<String>,
    pub fail_fetch: HashSet<String>,
    /// written files: path -> content, plus write order
    pub stored: BTreeMap<String, Vec<u8>>,
    pub calls: Vec<String>,
    pub close_calls: usize,
    pub closed: bool,
}

impl RemoteState {
    pub fn count(&self, prefix: &str) -> usize {
        self.calls.iter().filter(|c| c.starts_with(prefix)).count()
    }
}

/// In-memory stand-in for a remote session. `mtime_in_listing` mimics SFTP
/// (readdir carries mtimes); without it, like FTPS, every date check costs a
/// `modified_at` call.
pub struct MemoryRemote {
    pub state: Arc<Mutex<RemoteState>>,
    pub mtime_in_listing: bool,
}

impl MemoryRemote {
    pub fn new(mtime_in_listing: bool) -> (Self, Arc<Mutex<RemoteState>>) {
        let state = Arc::new(Mutex::new(RemoteState::default()));
        (Self { state: state.clone(), mtime_in_listing }, state)
    }

    pub fn with_dir(self, dir: &str, files: &[(&str, &str, &str)]) -> Self {
        {
            let mut st = self.state.lock().unwrap();
            st.dirs.insert(dir.to_string());
            let list = st.listings.entry(dir.to_string()).or_default();
            for (name, when, content) in files {
                list.push((name.to_string(), at(when), content.as_bytes().to_vec()));
            }
        }
        self
    }

    fn guard(&self, call: String) -> SyncResult<std::sync::MutexGuard<'_, RemoteState>> {
        let mut st = self.state.lock().unwrap();
        if st.closed {
            let reason = "connection already closed".into();
            return Err(SyncError::Transfer { path: call, reason });
        }
        st.calls.push(call);
        Ok(st)
    }
}

impl RemoteConnection for MemoryRemote {
    fn protocol(&self) -> Protocol {
        if self.mtime_in_listing { Protocol::Sftp } else { Protocol::Ftps }
    }

    fn list(&mut self, directory: &str) -> SyncResult<Vec<RemoteEntry>> {
        let with_mtime = self.mtime_in_listing;
        let st = self.guard(format!("list {}", directory))?;
        let Some(list) = st.listings.get(directory) else {
            let reason = "no such directory".into();
            return Err(SyncError::Transfer { path: directory.into(), reason });
        };
        Ok(list
            .iter()
            .map(|(n, t, _)| RemoteEntry::new(n.clone(), with_mtime.then_some(*t)))
            .collect())
    }

    fn modified_at(&mut self, entry: &str, directory: &str) -> SyncResult<NaiveDateTime> {
        let st = self.guard(format!("mtime {}", join_remote(directory, entry)))?;
        st.listings
            .get(directory)
            .and_then(|l| l.iter().find(|(n, _, _)| n == entry))
            .map(|(_, t, _)| *t)
            .ok_or_else(|| SyncError::Transfer { path: entry.into(), reason: "not found".into() })
    }

    fn fetch(&mut self, entry: &str, directory: &str) -> SyncResult<Vec<u8>> {
        let st = self.guard(format!("fetch {}", join_remote(directory, entry)))?;
        if st.fail_fetch.contains(entry) {
            return Err(SyncError::Transfer { path: entry.into(), reason: "read failed".into() });
        }
        st.listings
            .get(directory)
            .and_then(|l| l.iter().find(|(n, _, _)| n == entry))
            .map(|(_, _, c)| c.clone())
            .ok_or_else(|| SyncError::Transfer { path: entry.into(), reason: "not found".into() })
    }

    fn ensure_directory(&mut self, base: &str, path: &str) -> SyncResult<()> {
        let mut st = self.guard(format!("ensure {}", path))?;
        let st = &mut *st;
        ensure_segments(base, path, |level| {
            if st.refuse_dirs.contains(level) {
                DirOutcome::Refused("permission denied".into())
            } else if st.dirs.insert(level.to_string()) {
                st.calls.push(format!("mkdir {}", level));
                DirOutcome::Created
            } else {
                DirOutcome::AlreadyPresent
            }
        })
    }

    fn store(&mut self, path: &str, content: &[u8]) -> SyncResult<()> {
        let mut st = self.guard(format!("store {}", path))?;
        if st.fail_store.contains(path) {
            return Err(SyncError::Transfer { path: path.into(), reason: "disk full".into() });
        }
        st.stored.insert(path.to_string(), content.to_vec());
        Ok(())
    }

    fn close(&mut self) -> SyncResult<()> {
        let mut st = self.state.lock().unwrap();
        st.close_calls += 1;
        st.closed = true;
        Ok(())
    }
}
