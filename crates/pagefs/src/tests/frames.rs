// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use super::{new_fs, text_of};
use crate::error::Error;
use crate::fs::CloseOutcome;
use crate::gft::{AccessMode, OpenerId};

const WRITER: OpenerId = OpenerId(1);

#[tokio::test]
async fn test_empty_file_holds_no_frames() {
    let fs = new_fs(10000);
    let root = fs.root();
    root.create("/f").await.unwrap();
    assert_eq!(fs.occupied_frames().await, 0);
    assert!(fs.pages("/f").await.unwrap().is_empty());
    assert!(fs.memory_map().await.is_empty());
}

#[tokio::test]
async fn test_frames_follow_committed_size() {
    let fs = new_fs(10000);
    let root = fs.root();
    root.create("/f").await.unwrap();

    let mut session = root.open("/f", WRITER, AccessMode::Write).await.unwrap();
    session.append(&text_of(100)).await.unwrap();
    assert_eq!(root.close(session).await.unwrap(), CloseOutcome::Saved);
    assert_eq!(fs.occupied_frames().await, 2);
    assert_eq!(fs.pages("/f").await.unwrap(), vec![0, 1]);

    let mut session = root.open("/f", WRITER, AccessMode::Write).await.unwrap();
    session.write_at(100, &text_of(100)).await.unwrap();
    root.close(session).await.unwrap();
    assert_eq!(fs.contents("/f").await.unwrap().len(), 200);
    assert_eq!(fs.occupied_frames().await, 4);

    // Shrinking returns the tail frames
    let mut session = root.open("/f", WRITER, AccessMode::Write).await.unwrap();
    session.truncate(64).await.unwrap();
    root.close(session).await.unwrap();
    assert_eq!(fs.pages("/f").await.unwrap(), vec![0]);
    assert_eq!(fs.occupied_frames().await, 1);
    fs.check_invariants().await.unwrap();
}

#[tokio::test]
async fn test_growth_rejected_without_frames() {
    let fs = new_fs(3);
    let root = fs.root();
    root.create("/f").await.unwrap();

    let original = text_of(100);
    let mut session = root.open("/f", WRITER, AccessMode::Write).await.unwrap();
    session.append(&original).await.unwrap();
    root.close(session).await.unwrap();
    assert_eq!(fs.occupied_frames().await, 2);

    let mut session = root.open("/f", WRITER, AccessMode::Write).await.unwrap();
    session.write_at(100, &text_of(100)).await.unwrap();
    let result = root.close(session).await;
    assert!(matches!(
        result,
        Err(Error::InsufficientFrames {
            required: 4,
            available: 3,
            ..
        })
    ));

    assert_eq!(fs.contents("/f").await.unwrap(), original);
    assert_eq!(fs.occupied_frames().await, 2);
    // The failed close still gives up the file
    assert!(!fs.file_table().is_tracked(std::path::Path::new("/f")).await);
    fs.check_invariants().await.unwrap();
}

#[tokio::test]
async fn test_growth_reuses_held_frames() {
    let fs = new_fs(4);
    let root = fs.root();
    root.create("/f").await.unwrap();

    let mut session = root.open("/f", WRITER, AccessMode::Write).await.unwrap();
    session.append(&text_of(100)).await.unwrap();
    root.close(session).await.unwrap();

    let mut session = root.open("/f", WRITER, AccessMode::Write).await.unwrap();
    session.append(&text_of(100)).await.unwrap();
    root.close(session).await.unwrap();
    assert_eq!(fs.occupied_frames().await, 4);
    assert_eq!(fs.pages("/f").await.unwrap(), vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_occupied_never_exceeds_pool() {
    let fs = new_fs(5);
    let root = fs.root();
    for name in ["/a", "/b", "/c", "/d"] {
        root.create(name).await.unwrap();
        let mut session = root.open(name, WRITER, AccessMode::Write).await.unwrap();
        session.append(&text_of(120)).await.unwrap();
        // Only the first two fit
        _ = root.close(session).await;
        assert!(fs.occupied_frames().await <= 5);
    }
    assert_eq!(fs.occupied_frames().await, 4);
    assert_eq!(fs.contents("/c").await.unwrap(), "");
    fs.check_invariants().await.unwrap();
}

#[tokio::test]
async fn test_memory_map_lists_files_with_frames() {
    let fs = new_fs(100);
    let root = fs.root();
    root.mkdir("/d").await.unwrap();
    root.create("/d/b").await.unwrap();
    root.create("/a").await.unwrap();
    root.create("/empty").await.unwrap();

    for (path, len) in [("/d/b", 10), ("/a", 70)] {
        let mut session = root.open(path, WRITER, AccessMode::Write).await.unwrap();
        session.append(&text_of(len)).await.unwrap();
        root.close(session).await.unwrap();
    }

    let lines: Vec<String> = fs.memory_map().await.iter().map(ToString::to_string).collect();
    assert_eq!(lines, vec!["/a [1, 2] 70", "/d/b [0] 10"]);
}

#[tokio::test]
async fn test_freed_frames_are_reused_first_fit() {
    let fs = new_fs(100);
    let root = fs.root();
    for (path, len) in [("/a", 64), ("/b", 64)] {
        root.create(path).await.unwrap();
        let mut session = root.open(path, WRITER, AccessMode::Write).await.unwrap();
        session.append(&text_of(len)).await.unwrap();
        root.close(session).await.unwrap();
    }
    root.delete("/a").await.unwrap();

    root.create("/c").await.unwrap();
    let mut session = root.open("/c", WRITER, AccessMode::Write).await.unwrap();
    session.append(&text_of(128)).await.unwrap();
    root.close(session).await.unwrap();
    assert_eq!(fs.pages("/c").await.unwrap(), vec![0, 2]);
}
