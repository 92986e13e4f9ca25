// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::FsConfig;
use crate::error::*;
use crate::frames::FramePool;
use crate::gft::{AccessMode, FileTable, OpenerId};
use crate::node::*;
use crate::path::Resolved;
use crate::session::Session;
use crate::snapshot::Snapshot;
use crate::tree::Namespace;
use crate::tree_format::format_namespace;
use crate::wd::WD;
use diagnostics::{log_error, log_info, log_warn};

/// Namespace and frame pool, always mutated together under one lock.
struct State {
    tree: Namespace,
    frames: FramePool,
}

struct Inner {
    state: Mutex<State>,
    table: FileTable,
    config: FsConfig,
}

/// Shared file system handle. Clones refer to the same namespace, frame
/// pool and file table.
#[derive(Clone)]
pub struct FileSystem {
    inner: Arc<Inner>,
}

/// Result of a successful close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The working copy was written back and frames reallocated
    Saved,
    /// Nothing to write back
    Unchanged,
}

/// One line of the memory map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryMapEntry {
    pub path: PathBuf,
    pub frames: Vec<usize>,
    pub size: usize,
}

impl std::fmt::Display for MemoryMapEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:?} {}", self.path.display(), self.frames, self.size)
    }
}

impl FileSystem {
    pub fn new(config: FsConfig) -> Result<Self> {
        config.validate()?;
        let frames = FramePool::new(config.frame_count, config.frame_size);
        Ok(Self::from_parts(config, Namespace::new(), frames))
    }

    fn from_parts(config: FsConfig, tree: Namespace, frames: FramePool) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State { tree, frames }),
                table: FileTable::new(),
                config,
            }),
        }
    }

    /// Returns a working directory context positioned at the root
    pub fn root(&self) -> WD {
        WD::new(self.clone())
    }

    pub fn config(&self) -> &FsConfig {
        &self.inner.config
    }

    pub fn file_table(&self) -> &FileTable {
        &self.inner.table
    }

    pub(crate) async fn mkdir(&self, target: &Resolved) -> Result<PathBuf> {
        let mut state = self.inner.state.lock().await;
        state.tree.insert(target, NodeKind::Directory)?;
        let path = target.absolute.display().to_string();
        log_info!("Created directory {path}", path: path);
        Ok(target.absolute.clone())
    }

    pub(crate) async fn create(&self, target: &Resolved) -> Result<PathBuf> {
        let mut state = self.inner.state.lock().await;
        let State { tree, frames } = &mut *state;
        let id = tree.insert(target, NodeKind::File(FileData::default()))?;
        let file = tree
            .get_mut(id)
            .and_then(Node::as_file_mut)
            .ok_or_else(|| Error::inconsistent("created file vanished"))?;
        frames.allocate(&target.absolute, file.pages_mut(), 0)?;
        let path = target.absolute.display().to_string();
        log_info!("Created file {path}", path: path);
        Ok(target.absolute.clone())
    }

    /// Removes a node and its subtree, returning every frame it held.
    pub(crate) async fn delete(&self, target: &Resolved) -> Result<PathBuf> {
        let mut state = self.inner.state.lock().await;
        let State { tree, frames } = &mut *state;
        let id = tree
            .lookup(&target.absolute)
            .ok_or_else(|| Error::not_found(&target.absolute))?;
        let released = release_subtree(tree, frames, id)?;
        let path = target.absolute.display().to_string();
        log_info!("Deleted {path}, released {released} frames", path: path, released: released);
        Ok(target.absolute.clone())
    }

    /// Moves `src` to `dst`, overwriting whatever `dst` named before.
    ///
    /// Fails with `InUse` while any opener holds a path at or below `src`,
    /// or at or below an existing `dst`.
    pub(crate) async fn rename(&self, src: &Resolved, dst: &Resolved) -> Result<PathBuf> {
        let mut state = self.inner.state.lock().await;
        let State { tree, frames } = &mut *state;

        let src_id = tree.lookup(&src.absolute).ok_or_else(|| Error::not_found(&src.absolute))?;
        if src_id.is_root() {
            return Err(Error::immutable(&src.absolute));
        }
        let parent_id = tree.lookup(&dst.parent).ok_or_else(|| Error::missing_parent(&dst.parent))?;
        if !tree.get(parent_id).is_some_and(Node::is_dir) {
            return Err(Error::not_a_directory(&dst.parent));
        }
        if dst.absolute == src.absolute {
            return Ok(dst.absolute.clone());
        }
        if dst.absolute.starts_with(&src.absolute) {
            return Err(Error::move_into_self(&src.absolute));
        }
        if src.absolute.starts_with(&dst.absolute) {
            return Err(Error::overwrite_ancestor(&dst.absolute));
        }
        // Sessions and file table entries are keyed by path.
        let table = &self.inner.table;
        if let Some(held) = table.first_held_under(&src.absolute).await {
            return Err(Error::in_use(held));
        }
        if let Some(existing) = tree.lookup(&dst.absolute) {
            if let Some(held) = table.first_held_under(&dst.absolute).await {
                return Err(Error::in_use(held));
            }
            _ = release_subtree(tree, frames, existing)?;
        }
        let new_path = tree.relocate(src_id, parent_id, &dst.name)?;

        let from = src.absolute.display().to_string();
        let to = new_path.display().to_string();
        log_info!("Moved {from} to {to}", from: from, to: to);
        Ok(new_path)
    }

    pub(crate) async fn require_dir(&self, target: &Resolved) -> Result<PathBuf> {
        let state = self.inner.state.lock().await;
        match state.tree.node_at(&target.absolute) {
            None => Err(Error::not_found(&target.absolute)),
            Some(node) if !node.is_dir() => Err(Error::not_a_directory(&target.absolute)),
            Some(node) => Ok(node.path().to_path_buf()),
        }
    }

    pub async fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.inner.state.lock().await.tree.contains(path)
    }

    /// Committed contents of the file at an absolute path.
    pub async fn contents<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        let state = self.inner.state.lock().await;
        Ok(committed_file(&state.tree, path.as_ref())?.contents().to_string())
    }

    /// Frames held by the file at an absolute path.
    pub async fn pages<P: AsRef<Path>>(&self, path: P) -> Result<Vec<usize>> {
        let state = self.inner.state.lock().await;
        Ok(committed_file(&state.tree, path.as_ref())?.pages().to_vec())
    }

    pub async fn occupied_frames(&self) -> usize {
        self.inner.state.lock().await.frames.occupied()
    }

    pub async fn node_count(&self) -> usize {
        self.inner.state.lock().await.tree.len()
    }

    /// Tree dump of the whole namespace.
    pub async fn print(&self) -> String {
        format_namespace(&self.inner.state.lock().await.tree)
    }

    /// Every file holding at least one frame, ordered by path.
    pub async fn memory_map(&self) -> Vec<MemoryMapEntry> {
        let state = self.inner.state.lock().await;
        state
            .tree
            .files()
            .into_iter()
            .filter_map(|node| {
                let file = node.as_file()?;
                (!file.pages().is_empty()).then(|| MemoryMapEntry {
                    path: node.path().to_path_buf(),
                    frames: file.pages().to_vec(),
                    size: file.size(),
                })
            })
            .collect()
    }

    /// Cross-checks file frame lists against the pool.
    pub async fn check_invariants(&self) -> Result<()> {
        let state = self.inner.state.lock().await;
        state.tree.check_frames(&state.frames)
    }

    /// Registers `opener` in the file table and snapshots the file's
    /// committed contents into a new session.
    pub(crate) async fn open(&self, target: &Resolved, opener: OpenerId, mode: AccessMode) -> Result<Session> {
        {
            let state = self.inner.state.lock().await;
            _ = committed_file(&state.tree, &target.absolute)?;
        }

        let table = &self.inner.table;
        table
            .register(&target.absolute, opener, mode, self.inner.config.open_timeout)
            .await?;

        // The file may have been deleted while we waited for a writer.
        let found = {
            let state = self.inner.state.lock().await;
            state.tree.node_at(&target.absolute).and_then(|node| {
                node.as_file().map(|file| (node.id(), file.contents().to_string()))
            })
        };
        match found {
            Some((id, contents)) => Ok(Session::new(
                opener,
                target.absolute.clone(),
                id,
                mode,
                contents,
                table.clone(),
            )),
            None => {
                _ = table.release(&target.absolute, opener).await?;
                Err(Error::not_found(&target.absolute))
            }
        }
    }

    /// Commits a dirty write session, then deregisters it from the file
    /// table. The opener is deregistered even when the commit fails.
    pub(crate) async fn close(&self, session: Session) -> Result<CloseOutcome> {
        let outcome = if session.mode() == AccessMode::Write && session.is_dirty() {
            self.commit(&session).await.map(|()| CloseOutcome::Saved)
        } else {
            Ok(CloseOutcome::Unchanged)
        };

        if let Err(err) = self.inner.table.release(session.path(), session.opener()).await {
            let message = err.to_string();
            log_error!("Session without file table entry: {message}", message: message);
            return Err(Error::inconsistent(format!(
                "session for {} missing from file table",
                session.path().display()
            )));
        }
        outcome
    }

    async fn commit(&self, session: &Session) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        let State { tree, frames } = &mut *state;
        let node = tree
            .get_mut(session.node())
            .ok_or_else(|| Error::not_found(session.path()))?;
        let Node { path, kind, .. } = node;
        let NodeKind::File(file) = kind else {
            return Err(Error::not_a_file(&*path));
        };

        let size = session.working().len();
        let held = file.pages().len();
        if !frames.can_allocate(held, size) {
            let required = frames.frames_required(size);
            let available = frames.available_for(held);
            let file_path = path.display().to_string();
            log_warn!(
                "Rejected commit to {file_path}: {required} frames required, {available} available",
                file_path: file_path,
                required: required,
                available: available
            );
            return Err(Error::insufficient_frames(session.path(), required, available));
        }
        frames.allocate(&*path, file.pages_mut(), size)?;
        file.set_contents(session.working().to_string());
        Ok(())
    }

    pub async fn snapshot(&self) -> Snapshot {
        let state = self.inner.state.lock().await;
        Snapshot::capture(&self.inner.config, &state.tree, &state.frames)
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let (config, tree, frames) = snapshot.into_parts()?;
        Ok(Self::from_parts(config, tree, frames))
    }

    /// Writes a snapshot of the whole file system to a host file.
    pub async fn save<P: AsRef<Path>>(&self, dst: P) -> Result<()> {
        let bytes = self.snapshot().await.to_json()?;
        tokio::fs::write(dst.as_ref(), bytes).await?;
        let path = dst.as_ref().display().to_string();
        log_info!("Saved snapshot to {path}", path: path);
        Ok(())
    }

    /// Loads a file system from a snapshot written by [`FileSystem::save`].
    pub async fn restore<P: AsRef<Path>>(src: P) -> Result<Self> {
        Self::from_snapshot(Snapshot::load(src).await?)
    }
}

fn committed_file<'a>(tree: &'a Namespace, path: &Path) -> Result<&'a FileData> {
    tree.node_at(path)
        .ok_or_else(|| Error::not_found(path))?
        .as_file()
        .ok_or_else(|| Error::not_a_file(path))
}

fn release_subtree(tree: &mut Namespace, frames: &mut FramePool, id: NodeID) -> Result<usize> {
    let mut released = 0;
    for mut node in tree.remove(id)? {
        if let Some(file) = node.as_file_mut() {
            let pages = file.take_pages();
            released += pages.len();
            frames.release(&pages);
        }
    }
    Ok(released)
}

impl std::fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FileSystem{{}}")
    }
}

impl PartialEq<FileSystem> for FileSystem {
    fn eq(&self, other: &FileSystem) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
