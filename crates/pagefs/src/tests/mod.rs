// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

mod frames;
mod namespace;

use crate::config::FsConfig;
use crate::fs::FileSystem;

/// File system with the default frame size and `frame_count` frames.
pub(crate) fn new_fs(frame_count: usize) -> FileSystem {
    FileSystem::new(FsConfig::default().with_frame_count(frame_count)).unwrap()
}

/// Text of exactly `len` ASCII bytes.
pub(crate) fn text_of(len: usize) -> String {
    "0123456789".chars().cycle().take(len).collect()
}
