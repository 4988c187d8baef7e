// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure queue-policy functions: which task runs next.
//!
//! The selector never does I/O; it is handed the full task list from one
//! board scan and returns references into it. Ordering is by id, optionally
//! preceded by priority rank.

use crate::config::QueueOrder;
use crate::task::{priority_rank, Task, TaskStatus, TaskType};
use std::cmp::Ordering;

fn compare(a: &Task, b: &Task, order: QueueOrder) -> Ordering {
    match order {
        QueueOrder::Alphabetical => a.id.cmp(&b.id),
        QueueOrder::PriorityThenAlphabetical => priority_rank(a.priority)
            .cmp(&priority_rank(b.priority))
            .then_with(|| a.id.cmp(&b.id)),
    }
}

fn sorted<'a>(tasks: impl Iterator<Item = &'a Task>, order: QueueOrder) -> Vec<&'a Task> {
    let mut out: Vec<&Task> = tasks.collect();
    out.sort_by(|a, b| compare(a, b, order));
    out
}

/// A task is an epic if its type says so or if any task claims it as parent
/// (the inference rule for folders with a blank `type:`).
pub fn is_epic(task: &Task, all: &[Task]) -> bool {
    task.task_type == TaskType::Epic
        || all.iter().any(|t| t.parent_id.as_deref() == Some(task.id.as_str()))
}

/// Pick the next standalone task: in-progress work first, then not-started.
/// Epic children are never picked here.
pub fn pick_next_task<'a>(all: &'a [Task], order: QueueOrder) -> Option<&'a Task> {
    let standalone = sorted(
        all.iter().filter(|t| !is_epic(t, all) && t.parent_id.is_none()),
        order,
    );
    standalone
        .iter()
        .find(|t| t.status.is_in_progress())
        .or_else(|| standalone.iter().find(|t| t.status.is_not_started()))
        .copied()
}

/// Pick the next epic under the strictly-sequential policy.
///
/// An in-progress epic always wins (only one epic runs at a time). Otherwise
/// epics are walked in order: done epics are skipped, the first not-started
/// epic is picked, and any other status parks the queue — a stuck epic is
/// never leapfrogged.
pub fn pick_next_epic<'a>(all: &'a [Task], order: QueueOrder) -> Option<&'a Task> {
    let epics = sorted(all.iter().filter(|t| is_epic(t, all)), order);
    if let Some(active) = epics.iter().find(|t| t.status.is_in_progress()) {
        return Some(active);
    }
    for epic in epics {
        match epic.status {
            TaskStatus::Done => continue,
            TaskStatus::NotStarted => return Some(epic),
            _ => return None,
        }
    }
    None
}

/// All children of `epic_id` in queue order.
pub fn epic_children<'a>(all: &'a [Task], epic_id: &str, order: QueueOrder) -> Vec<&'a Task> {
    sorted(all.iter().filter(|t| t.parent_id.as_deref() == Some(epic_id)), order)
}

/// Pick the next child of `epic_id`, with the same in-progress-first rule as
/// [`pick_next_task`].
pub fn pick_next_epic_child<'a>(
    all: &'a [Task],
    epic_id: &str,
    order: QueueOrder,
) -> Option<&'a Task> {
    let children = sorted(
        all.iter().filter(|t| t.parent_id.as_deref() == Some(epic_id)),
        order,
    );
    children
        .iter()
        .find(|t| t.status.is_in_progress())
        .or_else(|| children.iter().find(|t| t.status.is_not_started()))
        .copied()
}

/// Whether any epic still needs work (drives the normal→epic mode handoff).
pub fn has_incomplete_epic(all: &[Task]) -> bool {
    all.iter().any(|t| is_epic(t, all) && !t.status.is_done())
}

/// Check whether every child of `epic` is done.
///
/// An epic with zero children reports `false` so it is never auto-closed
/// before its children exist.
pub fn all_epic_children_done<'a>(epic: &Task, all: &'a [Task]) -> (bool, Vec<&'a Task>) {
    let children: Vec<&Task> = all
        .iter()
        .filter(|t| t.parent_id.as_deref() == Some(epic.id.as_str()))
        .collect();
    if children.is_empty() {
        return (false, children);
    }
    let all_done = children.iter().all(|t| t.status.is_done());
    (all_done, children)
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
