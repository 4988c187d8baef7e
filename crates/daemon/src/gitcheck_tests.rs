// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

async fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "t")
        .env("GIT_AUTHOR_EMAIL", "t@t")
        .env("GIT_COMMITTER_NAME", "t")
        .env("GIT_COMMITTER_EMAIL", "t@t")
        .status()
        .await
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

#[tokio::test]
async fn non_repo_probes_as_clean_and_headless() {
    let dir = TempDir::new().unwrap();
    let state = GitState::capture(dir.path()).await;
    assert_eq!(state, GitState::default());
    assert!(!state.changed_since(&GitState::default()));
}

#[tokio::test]
async fn dirt_and_head_moves_are_detected() {
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "-q"]).await;
    std::fs::write(dir.path().join("a.txt"), "one").unwrap();
    git(dir.path(), &["add", "."]).await;
    git(dir.path(), &["commit", "-qm", "init"]).await;

    let before = GitState::capture(dir.path()).await;
    assert!(before.head.is_some());
    assert!(!before.dirty);

    // Untracked file counts as dirt
    std::fs::write(dir.path().join("b.txt"), "two").unwrap();
    let after = GitState::capture(dir.path()).await;
    assert!(after.dirty);
    assert!(after.changed_since(&before));

    // Committing moves HEAD and cleans the tree; still a change
    git(dir.path(), &["add", "."]).await;
    git(dir.path(), &["commit", "-qm", "more"]).await;
    let committed = GitState::capture(dir.path()).await;
    assert!(!committed.dirty);
    assert_ne!(committed.head, before.head);
    assert!(committed.changed_since(&before));
}

#[test]
fn declared_files_resolve_relative_to_workdir() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/login.ts"), "x").unwrap();

    assert!(any_declared_file_exists(dir.path(), &["src/login.ts".to_string()]));
    assert!(any_declared_file_exists(
        dir.path(),
        &["missing.ts".to_string(), "src/login.ts".to_string()],
    ));
    assert!(!any_declared_file_exists(dir.path(), &["missing.ts".to_string()]));
    assert!(!any_declared_file_exists(dir.path(), &[]));
}
