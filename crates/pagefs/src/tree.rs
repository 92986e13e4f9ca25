// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Path-keyed namespace arena.
//!
//! Nodes live in an id-indexed arena with a separate path index. The
//! namespace has no locking of its own: the owning file system serializes
//! every structural mutation behind one lock.

use crate::error::{Error, Result};
use crate::frames::FramePool;
use crate::node::*;
use crate::path::{rebase, Resolved, ROOT};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub struct Namespace {
    nodes: HashMap<NodeID, Node>,
    paths: HashMap<PathBuf, NodeID>,
    next_id: u64,
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace {
    pub fn new() -> Self {
        let root = Node::new(ROOT_ID, ROOT.to_string(), PathBuf::from(ROOT), None, NodeKind::Directory);
        let mut nodes = HashMap::new();
        let mut paths = HashMap::new();
        paths.insert(root.path.clone(), ROOT_ID);
        nodes.insert(ROOT_ID, root);
        Self {
            nodes,
            paths,
            next_id: ROOT_ID.as_u64() + 1,
        }
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn lookup<P: AsRef<Path>>(&self, path: P) -> Option<NodeID> {
        self.paths.get(path.as_ref()).copied()
    }

    pub fn contains<P: AsRef<Path>>(&self, path: P) -> bool {
        self.paths.contains_key(path.as_ref())
    }

    pub fn get(&self, id: NodeID) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeID) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn node_at<P: AsRef<Path>>(&self, path: P) -> Option<&Node> {
        self.lookup(path).and_then(|id| self.get(id))
    }

    pub fn root(&self) -> Option<&Node> {
        self.get(ROOT_ID)
    }

    /// Inserts a new node at `target`.
    ///
    /// Fails with `DuplicateEntry` when the path is taken and
    /// `MissingParent` when the enclosing directory does not exist.
    pub fn insert(&mut self, target: &Resolved, kind: NodeKind) -> Result<NodeID> {
        if self.contains(&target.absolute) {
            return Err(Error::duplicate_entry(&target.absolute));
        }
        let parent_id = self
            .lookup(&target.parent)
            .ok_or_else(|| Error::missing_parent(&target.parent))?;

        let id = NodeID::new(self.next_id);
        let parent = self
            .nodes
            .get_mut(&parent_id)
            .ok_or_else(|| Error::inconsistent(format!("path index points at missing node {parent_id}")))?;
        if !parent.is_dir() {
            return Err(Error::not_a_directory(&target.parent));
        }
        parent.children.insert(target.name.clone(), id);
        self.next_id += 1;

        let node = Node::new(id, target.name.clone(), target.absolute.clone(), Some(parent_id), kind);
        self.paths.insert(node.path.clone(), id);
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Ids of `id` and all its descendants, parents before children.
    pub fn subtree(&self, id: NodeID) -> Vec<NodeID> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get(&next) {
                out.push(next);
                stack.extend(node.children.values().rev().copied());
            }
        }
        out
    }

    /// Detaches and returns `id` and its whole subtree.
    pub fn remove(&mut self, id: NodeID) -> Result<Vec<Node>> {
        if id.is_root() {
            return Err(Error::immutable(ROOT));
        }
        let (parent, name) = {
            let node = self.get(id).ok_or_else(|| Error::inconsistent(format!("no node {id}")))?;
            (node.parent, node.name.clone())
        };
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            _ = parent.children.remove(&name);
        }

        let mut removed = Vec::new();
        for child in self.subtree(id) {
            if let Some(node) = self.nodes.remove(&child) {
                _ = self.paths.remove(&node.path);
                removed.push(node);
            }
        }
        Ok(removed)
    }

    /// Moves `id` under `new_parent` as `new_name`, rewriting the path of
    /// every node in the moved subtree.
    pub fn relocate(&mut self, id: NodeID, new_parent: NodeID, new_name: &str) -> Result<PathBuf> {
        if id.is_root() {
            return Err(Error::immutable(ROOT));
        }
        let parent_path = self
            .get(new_parent)
            .filter(|p| p.is_dir())
            .map(|p| p.path.clone())
            .ok_or_else(|| Error::inconsistent(format!("relocation target {new_parent} is not a directory")))?;
        let new_path = parent_path.join(new_name);

        let (old_parent, old_name, old_path) = {
            let node = self.get(id).ok_or_else(|| Error::inconsistent(format!("no node {id}")))?;
            (node.parent, node.name.clone(), node.path.clone())
        };
        if new_path.starts_with(&old_path) && new_path != old_path {
            return Err(Error::move_into_self(&old_path));
        }

        if let Some(parent) = old_parent.and_then(|p| self.nodes.get_mut(&p)) {
            _ = parent.children.remove(&old_name);
        }
        if let Some(parent) = self.nodes.get_mut(&new_parent) {
            parent.children.insert(new_name.to_string(), id);
        }

        let moved = self.subtree(id);
        for child in &moved {
            if let Some(node) = self.nodes.get(child) {
                _ = self.paths.remove(&node.path);
            }
        }
        for child in moved {
            if let Some(node) = self.nodes.get_mut(&child) {
                if let Some(path) = rebase(&node.path, &old_path, &new_path) {
                    node.path = path;
                }
                self.paths.insert(node.path.clone(), child);
            }
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.name = new_name.to_string();
            node.parent = Some(new_parent);
        }
        Ok(new_path)
    }

    /// All file nodes, ordered by path.
    pub fn files(&self) -> Vec<&Node> {
        let mut files: Vec<&Node> = self.nodes.values().filter(|n| !n.is_dir()).collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Verifies that every file holds exactly `frames_required(size)`
    /// frames, that no frame is shared, and that the pool agrees.
    pub fn check_frames(&self, pool: &FramePool) -> Result<()> {
        let mut seen = HashSet::new();
        for node in self.files() {
            let Some(file) = node.as_file() else { continue };
            if file.pages().len() != pool.frames_required(file.size()) {
                return Err(Error::inconsistent(format!(
                    "{} holds {} frames for {} bytes",
                    node.path.display(),
                    file.pages().len(),
                    file.size()
                )));
            }
            for &frame in file.pages() {
                if !seen.insert(frame) || !pool.is_occupied(frame) {
                    return Err(Error::inconsistent(format!(
                        "frame {frame} of {} is shared or not marked occupied",
                        node.path.display()
                    )));
                }
            }
        }
        if seen.len() != pool.occupied() {
            return Err(Error::inconsistent(format!(
                "{} frames occupied but {} owned by files",
                pool.occupied(),
                seen.len()
            )));
        }
        Ok(())
    }

    /// Nodes in parent-before-child order, for snapshots.
    pub(crate) fn to_nodes(&self) -> Vec<Node> {
        self.subtree(ROOT_ID)
            .into_iter()
            .filter_map(|id| self.nodes.get(&id).cloned())
            .collect()
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Rebuilds a namespace from snapshot nodes, validating the links.
    pub(crate) fn from_nodes(nodes: Vec<Node>, next_id: u64) -> Result<Self> {
        let mut ns = Self {
            nodes: HashMap::new(),
            paths: HashMap::new(),
            next_id,
        };
        for node in nodes {
            if node.id.as_u64() >= next_id {
                return Err(Error::inconsistent(format!("node id {} beyond allocator", node.id)));
            }
            if ns.paths.insert(node.path.clone(), node.id).is_some() {
                return Err(Error::duplicate_entry(&node.path));
            }
            _ = ns.nodes.insert(node.id, node);
        }
        let root_ok = ns.get(ROOT_ID).is_some_and(|r| r.is_dir() && r.path == Path::new(ROOT));
        if !root_ok {
            return Err(Error::inconsistent("snapshot has no root directory"));
        }
        for node in ns.nodes.values() {
            for (name, child) in &node.children {
                let linked = ns
                    .get(*child)
                    .is_some_and(|c| c.parent == Some(node.id) && &c.name == name && c.path == node.path.join(name));
                if !linked {
                    return Err(Error::inconsistent(format!(
                        "child {name} of {} is not linked back",
                        node.path.display()
                    )));
                }
            }
        }
        if ns.subtree(ROOT_ID).len() != ns.len() {
            return Err(Error::inconsistent("snapshot contains unreachable nodes"));
        }
        Ok(ns)
    }
}
