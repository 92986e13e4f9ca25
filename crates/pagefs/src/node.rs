// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

pub const ROOT_ID: NodeID = NodeID(0);

/// Unique identifier for a node in the namespace arena.
///
/// Identifiers are never reused, so a stale id held by an open session
/// cannot alias a node created after the original was deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeID(u64);

impl std::fmt::Display for NodeID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

impl NodeID {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_root(self) -> bool {
        self == ROOT_ID
    }
}

/// Committed state of a file: its contents and the frames backing them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileData {
    contents: String,
    pages: Vec<usize>,
}

impl FileData {
    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Size in bytes, always derived from the contents.
    pub fn size(&self) -> usize {
        self.contents.len()
    }

    pub fn pages(&self) -> &[usize] {
        &self.pages
    }

    pub(crate) fn set_contents(&mut self, contents: String) {
        self.contents = contents;
    }

    pub(crate) fn pages_mut(&mut self) -> &mut Vec<usize> {
        &mut self.pages
    }

    pub(crate) fn take_pages(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.pages)
    }
}

/// Type of node (directory or file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    Directory,
    File(FileData),
}

/// A namespace entry. Equality and hashing are by absolute path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub(crate) id: NodeID,
    pub(crate) name: String,
    pub(crate) path: PathBuf,
    pub(crate) parent: Option<NodeID>,
    pub(crate) children: BTreeMap<String, NodeID>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new(id: NodeID, name: String, path: PathBuf, parent: Option<NodeID>, kind: NodeKind) -> Self {
        Self {
            id,
            name,
            path,
            parent,
            children: BTreeMap::new(),
            kind,
        }
    }

    pub fn id(&self) -> NodeID {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parent(&self) -> Option<NodeID> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    pub fn as_file(&self) -> Option<&FileData> {
        match &self.kind {
            NodeKind::File(f) => Some(f),
            NodeKind::Directory => None,
        }
    }

    pub(crate) fn as_file_mut(&mut self) -> Option<&mut FileData> {
        match &mut self.kind {
            NodeKind::File(f) => Some(f),
            NodeKind::Directory => None,
        }
    }

    /// Child ids ordered by name.
    pub fn children(&self) -> impl Iterator<Item = NodeID> + '_ {
        self.children.values().copied()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}
