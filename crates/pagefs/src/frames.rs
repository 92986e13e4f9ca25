// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Fixed-size frame pool backing file contents.
//!
//! The pool has no locking of its own; it lives inside the file system's
//! structural lock and is only mutated while that lock is held.

use crate::error::{Error, Result};
use diagnostics::log_debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A bitmap of `len()` frames of `frame_size()` bytes each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramePool {
    frames: Vec<bool>,
    frame_size: usize,
    occupied: usize,
}

impl FramePool {
    pub fn new(frame_count: usize, frame_size: usize) -> Self {
        Self {
            frames: vec![false; frame_count],
            frame_size,
            occupied: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn occupied(&self) -> usize {
        self.occupied
    }

    pub fn free(&self) -> usize {
        self.len() - self.occupied
    }

    pub fn is_occupied(&self, frame: usize) -> bool {
        self.frames.get(frame).copied().unwrap_or(false)
    }

    /// Number of frames needed to hold `size` bytes.
    pub fn frames_required(&self, size: usize) -> usize {
        size.div_ceil(self.frame_size)
    }

    /// Frames a file could use if it gave back the `held` frames it owns.
    pub fn available_for(&self, held: usize) -> usize {
        self.free() + held
    }

    pub fn can_allocate(&self, held: usize, new_size: usize) -> bool {
        self.available_for(held) >= self.frames_required(new_size)
    }

    /// Resizes `pages` so that it holds exactly `frames_required(size)` frames.
    ///
    /// Growth takes the lowest-indexed free frames; shrinking releases the
    /// frames at the tail of the list. On failure `pages` is left untouched.
    pub fn allocate(&mut self, path: &Path, pages: &mut Vec<usize>, size: usize) -> Result<()> {
        let required = self.frames_required(size);
        let held = pages.len();

        if held < required {
            if !self.can_allocate(held, size) {
                return Err(Error::insufficient_frames(path, required, self.available_for(held)));
            }
            let mut next = 0;
            while pages.len() < required {
                let frame = (next..self.frames.len())
                    .find(|&i| !self.frames[i])
                    .ok_or_else(|| Error::inconsistent("free frame count disagrees with bitmap"))?;
                self.frames[frame] = true;
                self.occupied += 1;
                pages.push(frame);
                next = frame + 1;
            }
            let grown = required - held;
            let file = path.display().to_string();
            log_debug!("Allocated {grown} frames for {file}", grown: grown, file: file);
        } else if held > required {
            let released: Vec<usize> = pages.drain(required..).collect();
            self.release(&released);
            let shrunk = released.len();
            let file = path.display().to_string();
            log_debug!("Released {shrunk} frames from {file}", shrunk: shrunk, file: file);
        }
        Ok(())
    }

    /// Returns frames to the pool.
    pub fn release(&mut self, pages: &[usize]) {
        for &frame in pages {
            if let Some(slot) = self.frames.get_mut(frame) {
                if *slot {
                    *slot = false;
                    self.occupied -= 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_required() {
        let pool = FramePool::new(10, 64);
        assert_eq!(pool.frames_required(0), 0);
        assert_eq!(pool.frames_required(1), 1);
        assert_eq!(pool.frames_required(64), 1);
        assert_eq!(pool.frames_required(65), 2);
        assert_eq!(pool.frames_required(200), 4);
    }

    #[test]
    fn test_first_fit_growth() {
        let mut pool = FramePool::new(10, 64);
        let mut a = Vec::new();
        let mut b = Vec::new();
        pool.allocate(Path::new("/a"), &mut a, 100).unwrap();
        pool.allocate(Path::new("/b"), &mut b, 64).unwrap();
        assert_eq!(a, vec![0, 1]);
        assert_eq!(b, vec![2]);

        pool.release(&a);
        a.clear();
        let mut c = Vec::new();
        pool.allocate(Path::new("/c"), &mut c, 150).unwrap();
        assert_eq!(c, vec![0, 1, 3]);
        assert_eq!(pool.occupied(), 4);
    }

    #[test]
    fn test_shrink_releases_exact_excess() {
        let mut pool = FramePool::new(10, 64);
        let mut pages = Vec::new();
        pool.allocate(Path::new("/f"), &mut pages, 300).unwrap();
        assert_eq!(pages.len(), 5);

        pool.allocate(Path::new("/f"), &mut pages, 65).unwrap();
        assert_eq!(pages, vec![0, 1]);
        assert_eq!(pool.occupied(), 2);
        assert!(!pool.is_occupied(2));

        pool.allocate(Path::new("/f"), &mut pages, 0).unwrap();
        assert!(pages.is_empty());
        assert_eq!(pool.occupied(), 0);
    }

    #[test]
    fn test_can_allocate_counts_held_frames() {
        let mut pool = FramePool::new(4, 64);
        let mut pages = Vec::new();
        pool.allocate(Path::new("/f"), &mut pages, 128).unwrap();
        let mut other = Vec::new();
        pool.allocate(Path::new("/g"), &mut other, 64).unwrap();

        // 1 free + 2 held
        assert!(pool.can_allocate(pages.len(), 192));
        assert!(!pool.can_allocate(pages.len(), 193));
    }

    #[test]
    fn test_exhausted_pool_leaves_pages_untouched() {
        let mut pool = FramePool::new(2, 64);
        let mut pages = vec![];
        pool.allocate(Path::new("/f"), &mut pages, 64).unwrap();
        let err = pool.allocate(Path::new("/f"), &mut pages, 200).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientFrames { required: 4, available: 2, .. }
        ));
        assert_eq!(pages, vec![0]);
        assert_eq!(pool.occupied(), 1);
    }
}
