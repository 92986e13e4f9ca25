// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::error::*;
use crate::fs::{CloseOutcome, FileSystem};
use crate::gft::{AccessMode, OpenerId};
use crate::path::{resolve, Resolved, ROOT};
use crate::session::Session;
use std::path::{Path, PathBuf};

/// Context for operations within a specific directory.
///
/// Every path argument is resolved against this context's current
/// directory. Each worker owns its own `WD`, so changing directory in one
/// worker never moves another.
#[derive(Clone, Debug)]
pub struct WD {
    fs: FileSystem,
    cwd: PathBuf,
}

impl WD {
    pub(crate) fn new(fs: FileSystem) -> Self {
        Self {
            fs,
            cwd: PathBuf::from(ROOT),
        }
    }

    pub fn fs(&self) -> &FileSystem {
        &self.fs
    }

    pub fn pwd(&self) -> &Path {
        &self.cwd
    }

    pub fn resolve<P: AsRef<Path>>(&self, path: P) -> Result<Resolved> {
        resolve(path, &self.cwd)
    }

    /// Changes the current directory, returning the new absolute path.
    pub async fn chdir<P: AsRef<Path>>(&mut self, path: P) -> Result<PathBuf> {
        let target = self.resolve(path)?;
        self.cwd = self.fs.require_dir(&target).await?;
        Ok(self.cwd.clone())
    }

    pub async fn mkdir<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        self.fs.mkdir(&self.resolve(path)?).await
    }

    /// Creates an empty file.
    pub async fn create<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        self.fs.create(&self.resolve(path)?).await
    }

    pub async fn delete<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        self.fs.delete(&self.resolve(path)?).await
    }

    /// Moves or renames a node, overwriting an existing destination.
    pub async fn rename<P: AsRef<Path>, Q: AsRef<Path>>(&self, src: P, dst: Q) -> Result<PathBuf> {
        let src = self.resolve(src)?;
        let dst = self.resolve(dst)?;
        self.fs.rename(&src, &dst).await
    }

    pub async fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        match self.resolve(path) {
            Ok(target) => self.fs.exists(&target.absolute).await,
            Err(_) => false,
        }
    }

    /// Opens a file for `opener`. A write open waits while another opener
    /// holds the file for writing.
    pub async fn open<P: AsRef<Path>>(&self, path: P, opener: OpenerId, mode: AccessMode) -> Result<Session> {
        self.fs.open(&self.resolve(path)?, opener, mode).await
    }

    /// Commits the session's edits and releases its file table entry.
    pub async fn close(&self, session: Session) -> Result<CloseOutcome> {
        self.fs.close(session).await
    }

    /// Committed contents of a file, bypassing sessions.
    pub async fn read_committed<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        self.fs.contents(&self.resolve(path)?.absolute).await
    }
}
