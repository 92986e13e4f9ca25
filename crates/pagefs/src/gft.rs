// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Global file table: which opener holds which file in which mode.
//!
//! At most one opener may hold a file for writing. Readers are never
//! checked against writers, and a reader never blocks.

use crate::error::{Error, Result};
use diagnostics::log_debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

/// Access mode recorded for an opener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccessMode {
    Read,
    Write,
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::Read => write!(f, "reading"),
            AccessMode::Write => write!(f, "writing"),
        }
    }
}

impl std::str::FromStr for AccessMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" => Ok(AccessMode::Read),
            "w" => Ok(AccessMode::Write),
            other => Err(Error::invalid_command(format!("unknown open mode '{other}'"))),
        }
    }
}

/// Stable identity of an execution context that opens files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpenerId(pub usize);

impl std::fmt::Display for OpenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Holders = HashMap<OpenerId, AccessMode>;

#[derive(Default)]
struct TableInner {
    entries: Mutex<HashMap<PathBuf, Holders>>,
    released: Notify,
}

/// Shared handle to the global file table.
#[derive(Clone, Default)]
pub struct FileTable {
    inner: Arc<TableInner>,
}

impl FileTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `opener` on `path`.
    ///
    /// A write registration waits until no other opener holds `path` for
    /// writing. With a `timeout` the wait fails with `LockTimeout`.
    pub async fn register(&self, path: &Path, opener: OpenerId, mode: AccessMode, timeout: Option<Duration>) -> Result<()> {
        let wait = self.register_when_free(path, opener, mode);
        match timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| Error::lock_timeout(path))?,
            None => wait.await,
        }
    }

    async fn register_when_free(&self, path: &Path, opener: OpenerId, mode: AccessMode) -> Result<()> {
        let file = path.display().to_string();
        let id = opener.0;
        loop {
            // Created before the check so a release between the check and
            // the await still wakes us.
            let released = self.inner.released.notified();
            {
                let mut entries = self.inner.entries.lock().await;
                let holders = entries.get(path);
                if holders.is_some_and(|h| h.contains_key(&opener)) {
                    return Err(Error::already_open(path));
                }
                let writer_present = holders.is_some_and(|h| h.values().any(|m| *m == AccessMode::Write));
                if mode == AccessMode::Read || !writer_present {
                    _ = entries.entry(path.to_path_buf()).or_default().insert(opener, mode);
                    log_debug!("Opener {id} registered on {file}", id: id, file: file);
                    return Ok(());
                }
            }
            log_debug!("Opener {id} waiting for writer on {file}", id: id, file: file);
            released.await;
        }
    }

    /// Removes `opener` from `path`, dropping the entry once nobody holds it.
    pub async fn release(&self, path: &Path, opener: OpenerId) -> Result<AccessMode> {
        let mode = {
            let mut entries = self.inner.entries.lock().await;
            let holders = entries.get_mut(path).ok_or_else(|| Error::not_open(path))?;
            let mode = holders.remove(&opener).ok_or_else(|| Error::not_open(path))?;
            if holders.is_empty() {
                _ = entries.remove(path);
            }
            mode
        };
        let file = path.display().to_string();
        let id = opener.0;
        log_debug!("Opener {id} released {file}", id: id, file: file);
        self.inner.released.notify_waiters();
        Ok(mode)
    }

    pub async fn mode_of(&self, path: &Path, opener: OpenerId) -> Option<AccessMode> {
        let entries = self.inner.entries.lock().await;
        entries.get(path).and_then(|h| h.get(&opener)).copied()
    }

    /// Fails unless `opener` holds `path` in exactly the `needed` mode.
    pub async fn check(&self, path: &Path, opener: OpenerId, needed: AccessMode) -> Result<()> {
        match self.mode_of(path, opener).await {
            None => Err(Error::not_open(path)),
            Some(mode) if mode == needed => Ok(()),
            Some(_) => Err(Error::permission_denied(path, needed)),
        }
    }

    /// Current holders of `path`, ordered by opener id.
    pub async fn holders(&self, path: &Path) -> Vec<(OpenerId, AccessMode)> {
        let entries = self.inner.entries.lock().await;
        let mut holders: Vec<_> = entries
            .get(path)
            .map(|h| h.iter().map(|(o, m)| (*o, *m)).collect())
            .unwrap_or_default();
        holders.sort();
        holders
    }

    /// Whether any opener currently holds `path`.
    pub async fn is_tracked(&self, path: &Path) -> bool {
        self.inner.entries.lock().await.contains_key(path)
    }

    /// The smallest held path at or below `prefix`, if any.
    pub async fn first_held_under(&self, prefix: &Path) -> Option<PathBuf> {
        let entries = self.inner.entries.lock().await;
        entries.keys().filter(|p| p.starts_with(prefix)).min().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: OpenerId = OpenerId(1);
    const B: OpenerId = OpenerId(2);

    #[tokio::test]
    async fn test_double_open_rejected() {
        let table = FileTable::new();
        let p = Path::new("/f");
        table.register(p, A, AccessMode::Read, None).await.unwrap();
        let err = table.register(p, A, AccessMode::Write, None).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyOpen(_)));
    }

    #[tokio::test]
    async fn test_readers_ignore_writer() {
        let table = FileTable::new();
        let p = Path::new("/f");
        table.register(p, A, AccessMode::Write, None).await.unwrap();
        table.register(p, B, AccessMode::Read, None).await.unwrap();
        assert_eq!(
            table.holders(p).await,
            vec![(A, AccessMode::Write), (B, AccessMode::Read)]
        );
    }

    #[tokio::test]
    async fn test_second_writer_times_out() {
        let table = FileTable::new();
        let p = Path::new("/f");
        table.register(p, A, AccessMode::Write, None).await.unwrap();
        let err = table
            .register(p, B, AccessMode::Write, Some(Duration::from_millis(20)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LockTimeout(_)));
        assert_eq!(table.holders(p).await, vec![(A, AccessMode::Write)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_second_writer_wakes_on_release() {
        let table = FileTable::new();
        let p = PathBuf::from("/f");
        table.register(&p, A, AccessMode::Write, None).await.unwrap();

        let waiter = {
            let table = table.clone();
            let p = p.clone();
            tokio::spawn(async move { table.register(&p, B, AccessMode::Write, None).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        table.release(&p, A).await.unwrap();
        waiter.await.unwrap().unwrap();
        assert_eq!(table.holders(&p).await, vec![(B, AccessMode::Write)]);
    }

    #[tokio::test]
    async fn test_release_drops_empty_entry() {
        let table = FileTable::new();
        let p = Path::new("/f");
        table.register(p, A, AccessMode::Read, None).await.unwrap();
        assert!(table.is_tracked(p).await);
        assert_eq!(table.release(p, A).await.unwrap(), AccessMode::Read);
        assert!(!table.is_tracked(p).await);
        assert!(matches!(table.release(p, A).await, Err(Error::NotOpen(_))));
    }

    #[tokio::test]
    async fn test_check_permissions() {
        let table = FileTable::new();
        let p = Path::new("/f");
        assert!(matches!(table.check(p, A, AccessMode::Read).await, Err(Error::NotOpen(_))));
        table.register(p, A, AccessMode::Write, None).await.unwrap();
        table.check(p, A, AccessMode::Write).await.unwrap();
        assert!(matches!(
            table.check(p, A, AccessMode::Read).await,
            Err(Error::PermissionDenied { needed: AccessMode::Read, .. })
        ));
    }

    #[tokio::test]
    async fn test_first_held_under() {
        let table = FileTable::new();
        table.register(Path::new("/a/b/f"), A, AccessMode::Read, None).await.unwrap();
        table.register(Path::new("/a/c"), B, AccessMode::Write, None).await.unwrap();
        assert_eq!(table.first_held_under(Path::new("/a")).await, Some(PathBuf::from("/a/b/f")));
        assert_eq!(table.first_held_under(Path::new("/a/c")).await, Some(PathBuf::from("/a/c")));
        assert_eq!(table.first_held_under(Path::new("/ab")).await, None);
        assert_eq!(table.first_held_under(Path::new("/z")).await, None);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("r".parse::<AccessMode>().unwrap(), AccessMode::Read);
        assert_eq!("w".parse::<AccessMode>().unwrap(), AccessMode::Write);
        assert!("rw".parse::<AccessMode>().is_err());
    }
}
