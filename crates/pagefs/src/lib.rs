// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! PageFS - an in-memory hierarchical file system over a fixed pool of
//! equally sized storage frames.
//!
//! Files are opened into per-opener sessions that edit a private working
//! copy; changes are committed to the shared namespace and frame pool when
//! the session is closed. At most one opener may hold a file for writing.
//!
//! Set the PAGEFS_LOG environment variable to control logging:
//! - PAGEFS_LOG=off (default) - silent
//! - PAGEFS_LOG=info - structural changes
//! - PAGEFS_LOG=debug - frame and lock traffic

/// Runtime configuration
pub mod config;

// Error types
pub mod error;

/// Fixed-size frame pool with first-fit allocation
pub mod frames;

pub mod fs;

/// Global file table and the access gate
pub mod gft;

/// Line-oriented command interpreter
pub mod interpreter;

pub mod node;
pub mod path;

/// Per-opener working copies
pub mod session;

pub mod snapshot;
pub mod tree;
pub mod tree_format;
pub mod wd;

pub use config::FsConfig;
pub use error::{Error, Result};
pub use frames::FramePool;
pub use fs::{CloseOutcome, FileSystem, MemoryMapEntry};
pub use gft::{AccessMode, FileTable, OpenerId};
pub use interpreter::{Command, Interpreter, Parsed, RunSummary};
pub use node::{Node, NodeID, NodeKind};
pub use session::Session;
pub use snapshot::Snapshot;
pub use wd::WD;

#[cfg(test)]
mod tests;
