// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use crate::gft::AccessMode;

pub type Result<T> = std::result::Result<T, Error>;

/// Represents errors that can occur in file system operations.
///
/// Every variant except `Inconsistent`, `Io` and `Snapshot` is an expected
/// outcome of user input and is rendered verbatim to the worker's output.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Duplicate entry: {}", .0.display())]
    DuplicateEntry(PathBuf),

    #[error("No such parent directory: {}", .0.display())]
    MissingParent(PathBuf),

    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("{} must be closed before opening it again", .0.display())]
    AlreadyOpen(PathBuf),

    #[error("{} is not open", .0.display())]
    NotOpen(PathBuf),

    #[error("Thread does not have {needed} permission for {}", .path.display())]
    PermissionDenied { path: PathBuf, needed: AccessMode },

    #[error("Not enough frames available to save changes made to {}", .path.display())]
    InsufficientFrames {
        path: PathBuf,
        required: usize,
        available: usize,
    },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Start {start} larger than contents of length {len}")]
    MalformedRange { start: usize, len: usize },

    #[error("Timed out waiting for writer on {}", .0.display())]
    LockTimeout(PathBuf),

    #[error("Immutable path: {}", .0.display())]
    Immutable(PathBuf),

    #[error("Cannot move a directory into itself: {}", .0.display())]
    MoveIntoSelf(PathBuf),

    #[error("Cannot overwrite an ancestor of the source: {}", .0.display())]
    OverwriteAncestor(PathBuf),

    #[error("{} is open and cannot be moved or replaced", .0.display())]
    InUse(PathBuf),

    #[error("Path is empty")]
    EmptyPath,

    #[error("Path prefix not supported: {}", .0.display())]
    PrefixNotSupported(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Inconsistent file system state: {0}")]
    Inconsistent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl Error {
    pub fn duplicate_entry<P: AsRef<Path>>(path: P) -> Self {
        Error::DuplicateEntry(path.as_ref().to_path_buf())
    }

    pub fn missing_parent<P: AsRef<Path>>(path: P) -> Self {
        Error::MissingParent(path.as_ref().to_path_buf())
    }

    pub fn not_found<P: AsRef<Path>>(path: P) -> Self {
        Error::NotFound(path.as_ref().to_path_buf())
    }

    pub fn not_a_directory<P: AsRef<Path>>(path: P) -> Self {
        Error::NotADirectory(path.as_ref().to_path_buf())
    }

    pub fn not_a_file<P: AsRef<Path>>(path: P) -> Self {
        Error::NotAFile(path.as_ref().to_path_buf())
    }

    pub fn already_open<P: AsRef<Path>>(path: P) -> Self {
        Error::AlreadyOpen(path.as_ref().to_path_buf())
    }

    pub fn not_open<P: AsRef<Path>>(path: P) -> Self {
        Error::NotOpen(path.as_ref().to_path_buf())
    }

    pub fn permission_denied<P: AsRef<Path>>(path: P, needed: AccessMode) -> Self {
        Error::PermissionDenied {
            path: path.as_ref().to_path_buf(),
            needed,
        }
    }

    pub fn insufficient_frames<P: AsRef<Path>>(path: P, required: usize, available: usize) -> Self {
        Error::InsufficientFrames {
            path: path.as_ref().to_path_buf(),
            required,
            available,
        }
    }

    pub fn invalid_command<S: AsRef<str>>(s: S) -> Self {
        Error::InvalidCommand(s.as_ref().to_string())
    }

    pub fn malformed_range(start: usize, len: usize) -> Self {
        Error::MalformedRange { start, len }
    }

    pub fn lock_timeout<P: AsRef<Path>>(path: P) -> Self {
        Error::LockTimeout(path.as_ref().to_path_buf())
    }

    pub fn immutable<P: AsRef<Path>>(path: P) -> Self {
        Error::Immutable(path.as_ref().to_path_buf())
    }

    pub fn move_into_self<P: AsRef<Path>>(path: P) -> Self {
        Error::MoveIntoSelf(path.as_ref().to_path_buf())
    }

    pub fn overwrite_ancestor<P: AsRef<Path>>(path: P) -> Self {
        Error::OverwriteAncestor(path.as_ref().to_path_buf())
    }

    pub fn in_use<P: AsRef<Path>>(path: P) -> Self {
        Error::InUse(path.as_ref().to_path_buf())
    }

    pub fn prefix_not_supported<P: AsRef<Path>>(path: P) -> Self {
        Error::PrefixNotSupported(path.as_ref().to_path_buf())
    }

    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Error::InvalidConfig(msg.into())
    }

    pub fn inconsistent<S: Into<String>>(msg: S) -> Self {
        Error::Inconsistent(msg.into())
    }
}
