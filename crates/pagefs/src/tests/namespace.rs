// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use super::{new_fs, text_of};
use crate::error::Error;
use crate::gft::{AccessMode, OpenerId};

#[tokio::test]
async fn test_mkdir_requires_parent() {
    let fs = new_fs(16);
    let root = fs.root();

    let result = root.mkdir("/a/b").await;
    assert!(matches!(result, Err(Error::MissingParent(_))));
    assert!(!fs.exists("/a/b").await);

    root.mkdir("/a").await.unwrap();
    assert_eq!(root.mkdir("/a/b").await.unwrap().to_str(), Some("/a/b"));
    assert!(fs.exists("/a/b").await);
}

#[tokio::test]
async fn test_duplicate_create_keeps_count() {
    let fs = new_fs(16);
    let root = fs.root();

    root.create("/f").await.unwrap();
    let count = fs.node_count().await;

    let result = root.create("/f").await;
    assert!(matches!(result, Err(Error::DuplicateEntry(_))));
    assert_eq!(fs.node_count().await, count);

    // A directory of the same name is also a duplicate
    assert!(matches!(root.mkdir("/f").await, Err(Error::DuplicateEntry(_))));
}

#[tokio::test]
async fn test_create_under_file_fails() {
    let fs = new_fs(16);
    let root = fs.root();
    root.create("/f").await.unwrap();
    assert!(matches!(root.create("/f/g").await, Err(Error::NotADirectory(_))));
}

#[tokio::test]
async fn test_relative_paths_follow_chdir() {
    let fs = new_fs(16);
    let mut wd = fs.root();
    wd.mkdir("docs").await.unwrap();
    assert_eq!(wd.chdir("docs").await.unwrap().to_str(), Some("/docs"));

    wd.create("notes").await.unwrap();
    wd.mkdir("../src").await.unwrap();
    assert!(fs.exists("/docs/notes").await);
    assert!(fs.exists("/src").await);

    // Above the root clamps to the root
    assert_eq!(wd.chdir("../../..").await.unwrap().to_str(), Some("/"));
    assert!(matches!(wd.chdir("/docs/notes").await, Err(Error::NotADirectory(_))));
    assert!(matches!(wd.chdir("/nope").await, Err(Error::NotFound(_))));
    assert_eq!(wd.pwd().to_str(), Some("/"));
}

#[tokio::test]
async fn test_chdir_is_per_context() {
    let fs = new_fs(16);
    let mut first = fs.root();
    let second = fs.root();
    first.mkdir("/a").await.unwrap();
    first.chdir("/a").await.unwrap();

    second.create("f").await.unwrap();
    assert!(fs.exists("/f").await);
    assert!(!fs.exists("/a/f").await);
}

#[tokio::test]
async fn test_delete_directory_releases_frames() {
    let fs = new_fs(16);
    let root = fs.root();
    root.mkdir("/d").await.unwrap();
    root.create("/d/f").await.unwrap();

    let mut session = root.open("/d/f", OpenerId(1), AccessMode::Write).await.unwrap();
    session.append(&text_of(130)).await.unwrap();
    root.close(session).await.unwrap();
    assert_eq!(fs.occupied_frames().await, 3);

    root.delete("/d").await.unwrap();
    assert!(!fs.exists("/d/f").await);
    assert_eq!(fs.occupied_frames().await, 0);
    assert!(matches!(root.delete("/d").await, Err(Error::NotFound(_))));
    assert!(matches!(root.delete("/").await, Err(Error::Immutable(_))));
    fs.check_invariants().await.unwrap();
}

#[tokio::test]
async fn test_mv_overwrites_destination() {
    let fs = new_fs(16);
    let root = fs.root();
    root.create("/a").await.unwrap();
    root.create("/b").await.unwrap();

    let mut session = root.open("/b", OpenerId(1), AccessMode::Write).await.unwrap();
    session.append(&text_of(70)).await.unwrap();
    root.close(session).await.unwrap();
    assert_eq!(fs.occupied_frames().await, 2);

    root.rename("/a", "/b").await.unwrap();
    assert!(!fs.exists("/a").await);
    assert_eq!(fs.contents("/b").await.unwrap(), "");
    // The overwritten file's frames are returned to the pool
    assert_eq!(fs.occupied_frames().await, 0);
    fs.check_invariants().await.unwrap();
}

#[tokio::test]
async fn test_mv_directory_rewrites_descendants() {
    let fs = new_fs(16);
    let root = fs.root();
    root.mkdir("/a").await.unwrap();
    root.mkdir("/a/b").await.unwrap();
    root.create("/a/b/f").await.unwrap();
    root.mkdir("/z").await.unwrap();

    assert_eq!(root.rename("/a", "/z/y").await.unwrap().to_str(), Some("/z/y"));
    assert!(fs.exists("/z/y/b/f").await);
    assert!(!fs.exists("/a").await);
    assert!(!fs.exists("/a/b/f").await);

    // Renaming in place keeps the node
    root.rename("/z/y/b/f", "/z/y/b/g").await.unwrap();
    assert!(fs.exists("/z/y/b/g").await);
}

#[tokio::test]
async fn test_mv_rejections() {
    let fs = new_fs(16);
    let root = fs.root();
    root.mkdir("/a").await.unwrap();
    root.mkdir("/a/b").await.unwrap();

    assert!(matches!(root.rename("/a", "/a/b/c").await, Err(Error::MoveIntoSelf(_))));
    assert!(matches!(root.rename("/a/b", "/a").await, Err(Error::OverwriteAncestor(_))));
    assert!(matches!(root.rename("/x", "/y").await, Err(Error::NotFound(_))));
    assert!(matches!(root.rename("/a", "/q/r").await, Err(Error::MissingParent(_))));
    assert!(matches!(root.rename("/", "/r").await, Err(Error::Immutable(_))));
    assert!(fs.exists("/a/b").await);
}

#[tokio::test]
async fn test_print_after_changes() {
    let fs = new_fs(16);
    let root = fs.root();
    root.mkdir("/b").await.unwrap();
    root.create("/b/x").await.unwrap();
    root.create("/a").await.unwrap();

    assert_eq!(fs.print().await, "/\n├── a\n└── b/\n    └── x\n");
}
