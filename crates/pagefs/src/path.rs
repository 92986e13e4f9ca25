// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Path resolution against a current-directory context.
//!
//! Resolution is purely lexical: it never consults the namespace, so it
//! can be used before the nodes it names exist.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// The single root of every namespace.
pub const ROOT: &str = "/";

/// The three components every namespace operation needs from a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Final segment, or `/` for the root itself
    pub name: String,
    /// Absolute path of the enclosing directory (root is its own parent)
    pub parent: PathBuf,
    /// Absolute, normalized path of the target
    pub absolute: PathBuf,
}

impl Resolved {
    pub fn is_root(&self) -> bool {
        self.absolute == Path::new(ROOT)
    }
}

/// Resolves `path` relative to `cwd`.
///
/// `.` is dropped, `..` pops the accumulated path and clamps at the root,
/// and an absolute input ignores `cwd` entirely.
pub fn resolve<P: AsRef<Path>, C: AsRef<Path>>(path: P, cwd: C) -> Result<Resolved> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(Error::EmptyPath);
    }

    let mut segments = if path.has_root() {
        Vec::new()
    } else {
        segments_of(cwd.as_ref())?
    };

    for component in path.components() {
        match component {
            Component::Prefix(_) => return Err(Error::prefix_not_supported(path)),
            Component::RootDir => segments.clear(),
            Component::CurDir => {}
            Component::ParentDir => {
                _ = segments.pop();
            }
            Component::Normal(name) => segments.push(name.to_string_lossy().to_string()),
        }
    }

    Ok(match segments.split_last() {
        None => Resolved {
            name: ROOT.to_string(),
            parent: PathBuf::from(ROOT),
            absolute: PathBuf::from(ROOT),
        },
        Some((name, dirs)) => Resolved {
            name: name.clone(),
            parent: join_segments(dirs),
            absolute: join_segments(&segments),
        },
    })
}

fn segments_of(dir: &Path) -> Result<Vec<String>> {
    let mut segments = Vec::new();
    for component in dir.components() {
        match component {
            Component::Prefix(_) => return Err(Error::prefix_not_supported(dir)),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                _ = segments.pop();
            }
            Component::Normal(name) => segments.push(name.to_string_lossy().to_string()),
        }
    }
    Ok(segments)
}

fn join_segments<S: AsRef<str>>(segments: &[S]) -> PathBuf {
    let mut path = PathBuf::from(ROOT);
    for segment in segments {
        path.push(segment.as_ref());
    }
    path
}

/// Re-roots `path` from under `from` to under `to`.
///
/// Returns `None` when `path` is not `from` or one of its descendants.
pub fn rebase<P: AsRef<Path>>(path: P, from: &Path, to: &Path) -> Option<PathBuf> {
    let rest = path.as_ref().strip_prefix(from).ok()?;
    if rest.as_os_str().is_empty() {
        Some(to.to_path_buf())
    } else {
        Some(to.join(rest))
    }
}
