// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn labels() -> StatusLabels {
    StatusLabels::default()
}

#[yare::parameterized(
    not_started = { "Not Started", TaskStatus::NotStarted },
    in_progress = { "In Progress", TaskStatus::InProgress },
    done        = { "Done", TaskStatus::Done },
    padded      = { "  Done  ", TaskStatus::Done },
)]
fn status_from_label(raw: &str, expected: TaskStatus) {
    assert_eq!(TaskStatus::from_label(raw, &labels()), expected);
}

#[test]
fn status_unknown_label_is_other() {
    let status = TaskStatus::from_label("Blocked", &labels());
    assert_eq!(status, TaskStatus::Other("Blocked".to_string()));
    assert_eq!(status.as_label(&labels()), "Blocked");
}

#[test]
fn status_label_round_trip() {
    let l = labels();
    for status in [TaskStatus::NotStarted, TaskStatus::InProgress, TaskStatus::Done] {
        assert_eq!(TaskStatus::from_label(status.as_label(&l), &l), status);
    }
}

#[yare::parameterized(
    p0 = { "P0", Some(Priority::P0) },
    p3 = { "p3", Some(Priority::P3) },
    empty = { "", None },
    junk = { "high", None },
)]
fn priority_parse(raw: &str, expected: Option<Priority>) {
    assert_eq!(Priority::parse(raw), expected);
}

#[test]
fn priority_rank_orders_p0_first_and_none_last() {
    assert!(priority_rank(Some(Priority::P0)) < priority_rank(Some(Priority::P1)));
    assert!(priority_rank(Some(Priority::P3)) < priority_rank(None));
}

#[yare::parameterized(
    user_story = { "UserStory", TaskType::UserStory },
    spaced     = { "User Story", TaskType::UserStory },
    bug        = { "Bug", TaskType::Bug },
    epic       = { "Epic", TaskType::Epic },
    other      = { "Spike", TaskType::Other("Spike".to_string()) },
)]
fn type_parse(raw: &str, expected: TaskType) {
    assert_eq!(TaskType::parse(raw, "Epic"), expected);
}

#[test]
fn type_parse_honors_custom_epic_label() {
    assert_eq!(TaskType::parse("Initiative", "Initiative"), TaskType::Epic);
    // With a custom epic label, the default literal is just another type
    assert_eq!(TaskType::parse("Epic", "Initiative"), TaskType::Other("Epic".to_string()));
}
