// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Per-opener working copies of file contents.
//!
//! Edits only touch the working copy. Nothing reaches the shared file
//! until the session is closed through its working directory.

use crate::error::Result;
use crate::gft::{AccessMode, FileTable, OpenerId};
use crate::node::NodeID;
use std::path::{Path, PathBuf};

/// An open file: a snapshot taken at open plus the opener's edits.
pub struct Session {
    opener: OpenerId,
    path: PathBuf,
    node: NodeID,
    mode: AccessMode,
    snapshot: String,
    working: String,
    table: FileTable,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("opener", &self.opener)
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

impl Session {
    pub(crate) fn new(opener: OpenerId, path: PathBuf, node: NodeID, mode: AccessMode, contents: String, table: FileTable) -> Self {
        Self {
            opener,
            path,
            node,
            mode,
            working: contents.clone(),
            snapshot: contents,
            table,
        }
    }

    pub fn opener(&self) -> OpenerId {
        self.opener
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn node(&self) -> NodeID {
        self.node
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// True when the working copy no longer matches the contents seen at open.
    pub fn is_dirty(&self) -> bool {
        self.working != self.snapshot
    }

    pub(crate) fn working(&self) -> &str {
        &self.working
    }

    async fn require(&self, needed: AccessMode) -> Result<()> {
        self.table.check(&self.path, self.opener, needed).await
    }

    pub async fn read(&self) -> Result<String> {
        self.require(AccessMode::Read).await?;
        Ok(self.working.clone())
    }

    pub async fn read_from(&self, start: usize, size: usize) -> Result<String> {
        self.require(AccessMode::Read).await?;
        Ok(edit::slice(&self.working, start, size))
    }

    pub async fn append(&mut self, text: &str) -> Result<()> {
        self.require(AccessMode::Write).await?;
        self.working.push_str(text);
        Ok(())
    }

    pub async fn write_at(&mut self, pos: usize, text: &str) -> Result<()> {
        self.require(AccessMode::Write).await?;
        self.working = edit::write_at(&self.working, pos, text);
        Ok(())
    }

    pub async fn move_range(&mut self, start: usize, size: usize, target: usize) -> Result<()> {
        self.require(AccessMode::Write).await?;
        self.working = edit::move_range(&self.working, start, size, target)?;
        Ok(())
    }

    pub async fn truncate(&mut self, size: usize) -> Result<()> {
        self.require(AccessMode::Write).await?;
        self.working = edit::truncate(&self.working, size);
        Ok(())
    }
}

/// Pure text edits. Offsets count characters and clamp to the content.
pub mod edit {
    use crate::error::{Error, Result};

    fn byte_offset(s: &str, chars: usize) -> usize {
        s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
    }

    /// `size` characters starting at `start`; empty past the end.
    pub fn slice(s: &str, start: usize, size: usize) -> String {
        let from = byte_offset(s, start);
        let to = byte_offset(s, start.saturating_add(size));
        s[from..to].to_string()
    }

    /// Overwrites from `pos`, keeping anything beyond `pos + len(text)`.
    pub fn write_at(s: &str, pos: usize, text: &str) -> String {
        let head = byte_offset(s, pos);
        let tail = byte_offset(s, pos.saturating_add(text.chars().count()));
        let mut out = String::with_capacity(head + text.len() + (s.len() - tail));
        out.push_str(&s[..head]);
        out.push_str(text);
        out.push_str(&s[tail..]);
        out
    }

    /// Removes `[start, start + size)` and reinserts it at `target` of the
    /// shortened string. `target` past the end appends.
    pub fn move_range(s: &str, start: usize, size: usize, target: usize) -> Result<String> {
        let len = s.chars().count();
        if start > len {
            return Err(Error::malformed_range(start, len));
        }
        let from = byte_offset(s, start);
        let to = byte_offset(s, start.saturating_add(size));
        let segment = &s[from..to];

        let mut rest = String::with_capacity(s.len());
        rest.push_str(&s[..from]);
        rest.push_str(&s[to..]);

        let at = byte_offset(&rest, target);
        rest.insert_str(at, segment);
        Ok(rest)
    }

    pub fn truncate(s: &str, size: usize) -> String {
        s[..byte_offset(s, size)].to_string()
    }

}
