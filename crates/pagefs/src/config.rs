// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_FRAME_COUNT: usize = 10_000;
pub const DEFAULT_FRAME_SIZE: usize = 64;

/// Sizing of the frame pool and the write-open wait policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsConfig {
    pub frame_count: usize,
    pub frame_size: usize,
    /// How long a write open waits for another writer; `None` waits forever
    #[serde(default)]
    pub open_timeout: Option<Duration>,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            frame_count: DEFAULT_FRAME_COUNT,
            frame_size: DEFAULT_FRAME_SIZE,
            open_timeout: None,
        }
    }
}

impl FsConfig {
    pub fn with_frame_count(mut self, frame_count: usize) -> Self {
        self.frame_count = frame_count;
        self
    }

    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    pub fn with_open_timeout(mut self, open_timeout: Option<Duration>) -> Self {
        self.open_timeout = open_timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_size == 0 {
            return Err(Error::invalid_config("frame size must be positive"));
        }
        Ok(())
    }
}
