// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn empty_document_uses_defaults() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config.board.root, PathBuf::from("Board"));
    assert_eq!(config.board.labels.in_progress, "In Progress");
    assert_eq!(config.queue.debounce_ms, 500);
    assert_eq!(config.queue.order, QueueOrder::Alphabetical);
    assert_eq!(config.agent.command, "claude");
    assert!(!config.auto_reset_failed);
    assert!(config.watchdog.enabled);
}

#[test]
fn partial_tables_override_only_named_fields() {
    let config: Config = toml::from_str(
        r#"
        [board]
        root = "/srv/board"

        [queue]
        order = "priority_then_alphabetical"
        max_tasks_per_run = 3

        [watchdog]
        interval_ms = 1000
        max_warnings = 2
        "#,
    )
    .unwrap();
    assert_eq!(config.board.root, PathBuf::from("/srv/board"));
    assert_eq!(config.queue.order, QueueOrder::PriorityThenAlphabetical);
    assert_eq!(config.queue.max_tasks_per_run, 3);
    // untouched defaults survive
    assert_eq!(config.queue.debounce_ms, 500);
    assert_eq!(config.watchdog.interval_ms, 1000);
    assert_eq!(config.watchdog.max_warnings, 2);
    assert_eq!(config.watchdog.max_consecutive_same_task, 3);
}

#[test]
fn custom_labels_and_epic_type() {
    let config: Config = toml::from_str(
        r#"
        [board.labels]
        not_started = "Todo"
        done = "Shipped"

        [board]
        epic_type = "Initiative"
        "#,
    )
    .unwrap();
    assert_eq!(config.board.labels.not_started, "Todo");
    assert_eq!(config.board.labels.done, "Shipped");
    assert_eq!(config.board.labels.in_progress, "In Progress");
    assert_eq!(config.board.epic_type, "Initiative");
}

#[test]
fn load_reads_file_and_propagates_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("foreman.toml");

    std::fs::write(&path, "[agent]\ncommand = \"fake-agent\"\n").unwrap();
    let config = Config::load(&path).unwrap();
    assert_eq!(config.agent.command, "fake-agent");

    std::fs::write(&path, "not toml [").unwrap();
    assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));

    assert!(matches!(
        Config::load(&dir.path().join("missing.toml")),
        Err(ConfigError::Io(_))
    ));
}
