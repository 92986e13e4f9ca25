// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use diagnostics::log_info;
use pagefs::{FileSystem, FsConfig, Snapshot};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "pagefs")]
pub struct Cli {
    /// Command scripts, one worker each. Prompts for names when omitted
    pub scripts: Vec<PathBuf>,

    /// Number of frames in the pool
    #[arg(long, default_value_t = pagefs::config::DEFAULT_FRAME_COUNT, conflicts_with = "restore")]
    pub frames: usize,

    /// Size of one frame in bytes
    #[arg(long, default_value_t = pagefs::config::DEFAULT_FRAME_SIZE, conflicts_with = "restore")]
    pub frame_size: usize,

    /// Give up waiting for a writer after this many milliseconds
    #[arg(long)]
    pub open_timeout_ms: Option<u64>,

    /// Start from a snapshot written by `save`; the pool sizing comes from
    /// the snapshot
    #[arg(long)]
    pub restore: Option<PathBuf>,

    /// Directory for the output_thread<N>.txt files
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,
}

impl Cli {
    pub fn config(&self) -> FsConfig {
        FsConfig::default()
            .with_frame_count(self.frames)
            .with_frame_size(self.frame_size)
            .with_open_timeout(self.open_timeout())
    }

    pub fn open_timeout(&self) -> Option<Duration> {
        self.open_timeout_ms.map(Duration::from_millis)
    }

    /// Builds the shared file system. A restored snapshot keeps its own
    /// pool sizing; a timeout given on the command line replaces the
    /// snapshot's.
    pub async fn file_system(&self) -> Result<FileSystem> {
        let Some(src) = &self.restore else {
            return Ok(FileSystem::new(self.config())?);
        };
        let path = src.display().to_string();
        log_info!("Restoring file system from {path}", path: path);
        let mut snapshot = Snapshot::load(src).await?;
        if let Some(timeout) = self.open_timeout() {
            snapshot.config.open_timeout = Some(timeout);
        }
        Ok(FileSystem::from_snapshot(snapshot)?)
    }
}
