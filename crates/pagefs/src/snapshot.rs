// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Whole-file-system snapshots.
//!
//! The format is serde JSON of the namespace nodes, the frame pool and the
//! configuration. Open sessions and file-table entries are not captured.

use crate::config::FsConfig;
use crate::error::{Error, Result};
use crate::frames::FramePool;
use crate::node::Node;
use crate::tree::Namespace;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub config: FsConfig,
    pub next_id: u64,
    pub nodes: Vec<Node>,
    pub frames: FramePool,
}

impl Snapshot {
    pub(crate) fn capture(config: &FsConfig, tree: &Namespace, frames: &FramePool) -> Self {
        Self {
            config: config.clone(),
            next_id: tree.next_id(),
            nodes: tree.to_nodes(),
            frames: frames.clone(),
        }
    }

    /// Rebuilds and cross-checks the namespace and frame pool.
    pub(crate) fn into_parts(self) -> Result<(FsConfig, Namespace, FramePool)> {
        self.config.validate()?;
        if self.frames.len() != self.config.frame_count || self.frames.frame_size() != self.config.frame_size {
            return Err(Error::inconsistent("snapshot frame pool does not match its configuration"));
        }
        let tree = Namespace::from_nodes(self.nodes, self.next_id)?;
        tree.check_frames(&self.frames)?;
        Ok((self.config, tree, self.frames))
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Reads a snapshot written by [`crate::FileSystem::save`].
    pub async fn load<P: AsRef<std::path::Path>>(src: P) -> Result<Self> {
        let bytes = tokio::fs::read(src.as_ref()).await?;
        Self::from_json(&bytes)
    }
}
