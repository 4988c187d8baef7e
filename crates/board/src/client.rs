// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Board client: enumeration and mutation of task files.
//!
//! The board is scanned at depth 2. Top-level `.md` files are standalone
//! tasks; top-level directories holding an `epic.md` are epics, and every
//! other `.md` inside them is a child of that epic. Statuses live in
//! frontmatter only — files never move between folders.

use crate::acs;
use crate::error::BoardError;
use crate::frontmatter::{self, Document, Frontmatter};
use fm_core::{BoardConfig, Priority, Task, TaskStatus, TaskType};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// File name that marks a top-level directory as an epic.
pub const EPIC_FILE: &str = "epic.md";

/// Fields for a task created through the client.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub name: String,
    pub priority: Option<Priority>,
    /// Raw `type:` label; compared against the configured epic literal.
    pub task_type: String,
    pub model: Option<String>,
}

/// Handle to the on-disk board.
///
/// Cloning is cheap: clones share the scan cache, which is invalidated on
/// any mutation through any clone.
#[derive(Clone)]
pub struct BoardClient {
    config: BoardConfig,
    cache: Arc<Mutex<Option<Vec<Task>>>>,
}

impl BoardClient {
    pub fn new(config: BoardConfig) -> Self {
        Self { config, cache: Arc::new(Mutex::new(None)) }
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    fn invalidate(&self) {
        *self.cache.lock() = None;
    }

    /// Enumerate the board. A missing root directory is an empty board,
    /// not an error. Results are cached until the next mutation.
    pub fn list_tasks(&self) -> Result<Vec<Task>, BoardError> {
        if let Some(cached) = self.cache.lock().as_ref() {
            return Ok(cached.clone());
        }
        let tasks = self.scan()?;
        *self.cache.lock() = Some(tasks.clone());
        Ok(tasks)
    }

    fn scan(&self) -> Result<Vec<Task>, BoardError> {
        let entries = match fs::read_dir(&self.config.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths: Vec<PathBuf> = entries
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|e| e.path())
            .collect();
        paths.sort();

        let mut tasks: Vec<Task> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for path in paths {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if file_name.starts_with('.') {
                continue;
            }

            if path.is_dir() {
                self.scan_epic_dir(&path, file_name, &mut tasks, &mut seen)?;
            } else if let Some(slug) = file_name.strip_suffix(".md") {
                self.collect(&path, slug.to_string(), None, &mut tasks, &mut seen)?;
            } else {
                debug!(path = %path.display(), "skipping unknown board entry");
            }
        }

        Ok(tasks)
    }

    fn scan_epic_dir(
        &self,
        dir: &Path,
        epic_id: &str,
        tasks: &mut Vec<Task>,
        seen: &mut HashSet<String>,
    ) -> Result<(), BoardError> {
        let epic_file = dir.join(EPIC_FILE);
        if !epic_file.is_file() {
            debug!(path = %dir.display(), "skipping directory without epic.md");
            return Ok(());
        }

        self.collect(&epic_file, epic_id.to_string(), None, tasks, seen)?;

        let mut children: Vec<PathBuf> = fs::read_dir(dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|e| e.path())
            .collect();
        children.sort();

        for child in children {
            let Some(name) = child.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') || name == EPIC_FILE || child.is_dir() {
                continue;
            }
            let Some(slug) = name.strip_suffix(".md") else {
                continue;
            };
            let id = format!("{epic_id}/{slug}");
            self.collect(&child, id, Some(epic_id.to_string()), tasks, seen)?;
        }
        Ok(())
    }

    /// Read one task file and add it to the scan result. Parse failures are
    /// logged and the file is left out of selection; I/O failures abort the
    /// scan.
    fn collect(
        &self,
        path: &Path,
        id: String,
        parent_id: Option<String>,
        tasks: &mut Vec<Task>,
        seen: &mut HashSet<String>,
    ) -> Result<(), BoardError> {
        match self.read_task(path, id, parent_id) {
            Ok(task) => {
                if !seen.insert(task.id.clone()) {
                    return Err(BoardError::DuplicateId(task.id));
                }
                tasks.push(task);
                Ok(())
            }
            Err(BoardError::Parse { path, reason }) => {
                warn!(path = %path.display(), reason, "ignoring unparseable task file");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Build a task from one frontmatter parse: metadata and AC counts in
    /// the same pass.
    fn read_task(
        &self,
        path: &Path,
        id: String,
        parent_id: Option<String>,
    ) -> Result<Task, BoardError> {
        let content = fs::read_to_string(path)?;
        let doc = frontmatter::parse(&content);

        let name = doc
            .frontmatter
            .get("name")
            .filter(|n| !n.is_empty())
            .ok_or_else(|| BoardError::Parse {
                path: path.to_path_buf(),
                reason: "missing required field: name".to_string(),
            })?
            .to_string();

        let labels = &self.config.labels;
        let status = doc
            .frontmatter
            .get("status")
            .filter(|s| !s.is_empty())
            .map(|s| TaskStatus::from_label(s, labels))
            .unwrap_or(TaskStatus::NotStarted);

        let acs = acs::parse_acs(&doc.body);
        let ac_done = acs.iter().filter(|ac| ac.checked).count();

        Ok(Task {
            id,
            name,
            priority: doc.frontmatter.get("priority").and_then(Priority::parse),
            task_type: TaskType::parse(
                doc.frontmatter.get("type").unwrap_or_default(),
                &self.config.epic_type,
            ),
            status,
            parent_id,
            model: doc.frontmatter.get("model").filter(|m| !m.is_empty()).map(str::to_string),
            ac_total: acs.len(),
            ac_done,
            file_path: path.to_path_buf(),
        })
    }

    pub fn get_task(&self, id: &str) -> Result<Task, BoardError> {
        self.list_tasks()?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| BoardError::TaskNotFound(id.to_string()))
    }

    /// Raw file contents for a task.
    pub fn get_task_markdown(&self, id: &str) -> Result<String, BoardError> {
        let task = self.get_task(id)?;
        Ok(fs::read_to_string(&task.file_path)?)
    }

    /// Rewrite the file with `status:` set. The write is a single call, so
    /// a crash never leaves a half-mutated file behind a partial status.
    pub fn update_task_status(&self, id: &str, status: &TaskStatus) -> Result<(), BoardError> {
        let task = self.get_task(id)?;
        let content = fs::read_to_string(&task.file_path)?;
        let updated =
            frontmatter::update_field(&content, "status", status.as_label(&self.config.labels));
        fs::write(&task.file_path, updated)?;
        self.invalidate();
        Ok(())
    }

    /// For each text, flip the first matching unchecked checkbox line.
    /// Texts with no match are ignored. Returns how many lines flipped.
    pub fn update_checkboxes_by_text(&self, id: &str, texts: &[String]) -> Result<usize, BoardError> {
        self.rewrite_checkboxes(id, |lines| {
            let mut flipped = 0;
            for text in texts {
                let target = text.trim();
                for line in lines.iter_mut() {
                    let Some((line_text, checked)) = acs::parse_line(line) else { continue };
                    if checked || line_text != target {
                        continue;
                    }
                    if let Some(updated) = acs::check_line(line) {
                        *line = updated;
                        flipped += 1;
                    }
                    break;
                }
            }
            flipped
        })
    }

    /// Flip the n-th checkbox line (1-based over all checkboxes in document
    /// order). Already-checked lines and out-of-range indices are ignored.
    pub fn update_checkboxes_by_index(
        &self,
        id: &str,
        indices: &[usize],
    ) -> Result<usize, BoardError> {
        self.rewrite_checkboxes(id, |lines| {
            let mut flipped = 0;
            let mut ordinal = 0;
            for line in lines.iter_mut() {
                if acs::parse_line(line).is_none() {
                    continue;
                }
                ordinal += 1;
                if !indices.contains(&ordinal) {
                    continue;
                }
                if let Some(updated) = acs::check_line(line) {
                    *line = updated;
                    flipped += 1;
                }
            }
            flipped
        })
    }

    fn rewrite_checkboxes(
        &self,
        id: &str,
        edit: impl FnOnce(&mut Vec<String>) -> usize,
    ) -> Result<usize, BoardError> {
        let task = self.get_task(id)?;
        let content = fs::read_to_string(&task.file_path)?;
        let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
        let flipped = edit(&mut lines);
        if flipped > 0 {
            fs::write(&task.file_path, lines.join("\n"))?;
            self.invalidate();
        }
        Ok(flipped)
    }

    /// Append a markdown block to the end of the task file, separated by a
    /// horizontal rule.
    pub fn append_markdown(&self, id: &str, md: &str) -> Result<(), BoardError> {
        let task = self.get_task(id)?;
        let mut content = fs::read_to_string(&task.file_path)?;
        content.push_str("\n\n---\n\n");
        content.push_str(md);
        content.push('\n');
        fs::write(&task.file_path, content)?;
        self.invalidate();
        Ok(())
    }

    /// Create a task file. An epic (by type) with no `epic_id` becomes a
    /// folder with an `epic.md`; everything else is a single file, either
    /// top-level or inside the named epic folder.
    pub fn create_task(
        &self,
        fields: NewTask,
        body: &str,
        epic_id: Option<&str>,
        file_name: Option<&str>,
    ) -> Result<Task, BoardError> {
        let slug = match file_name {
            Some(name) => name.strip_suffix(".md").unwrap_or(name).to_string(),
            None => slugify(&fields.name),
        };
        if slug.is_empty() {
            return Err(BoardError::Parse {
                path: self.config.root.clone(),
                reason: format!("cannot derive a file name from task name {:?}", fields.name),
            });
        }

        let mut fm = Frontmatter::default();
        fm.set("name", fields.name.clone());
        fm.set("priority", fields.priority.map(|p| p.as_str().to_string()).unwrap_or_default());
        fm.set("type", fields.task_type.clone());
        fm.set("status", self.config.labels.not_started.clone());
        if let Some(model) = &fields.model {
            fm.set("model", model.clone());
        }
        let content = frontmatter::serialize(&Document { frontmatter: fm, body: body.to_string() });

        let is_epic = fields.task_type == self.config.epic_type;
        let (path, id) = if is_epic && epic_id.is_none() {
            let dir = self.config.root.join(&slug);
            if dir.exists() {
                return Err(BoardError::TaskExists(slug));
            }
            fs::create_dir_all(&dir)?;
            (dir.join(EPIC_FILE), slug)
        } else {
            let (dir, id) = match epic_id {
                Some(epic) => {
                    let dir = self.config.root.join(epic);
                    if !dir.join(EPIC_FILE).is_file() {
                        return Err(BoardError::TaskNotFound(epic.to_string()));
                    }
                    (dir, format!("{epic}/{slug}"))
                }
                None => (self.config.root.clone(), slug.clone()),
            };
            fs::create_dir_all(&dir)?;
            let path = dir.join(format!("{slug}.md"));
            if path.exists() {
                return Err(BoardError::TaskExists(id));
            }
            (path, id)
        };

        fs::write(&path, content)?;
        self.invalidate();
        self.get_task(&id)
    }

    /// Remove a task file. For an epic, `delete_epic_folder` removes the
    /// whole folder (children included).
    pub fn delete_task(&self, id: &str, delete_epic_folder: bool) -> Result<(), BoardError> {
        let task = self.get_task(id)?;
        let is_epic_root = task.file_path.file_name().and_then(|n| n.to_str()) == Some(EPIC_FILE)
            && task.parent_id.is_none();
        if is_epic_root && delete_epic_folder {
            if let Some(dir) = task.file_path.parent() {
                fs::remove_dir_all(dir)?;
            }
        } else {
            fs::remove_file(&task.file_path)?;
        }
        self.invalidate();
        Ok(())
    }

    /// Names of top-level epic folders, for the external generator.
    pub fn list_epic_folders(&self) -> Result<Vec<String>, BoardError> {
        let entries = match fs::read_dir(&self.config.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut folders = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() && path.join(EPIC_FILE).is_file() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    if !name.starts_with('.') {
                        folders.push(name.to_string());
                    }
                }
            }
        }
        folders.sort();
        Ok(folders)
    }

    /// Next free numeric prefixes: `(next_task, next_epic)`. Standalone
    /// files count toward the first, epic folders toward the second.
    pub fn next_numbers(&self) -> Result<(u32, u32), BoardError> {
        let mut max_task = 0;
        let mut max_epic = 0;
        let entries = match fs::read_dir(&self.config.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((1, 1)),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            if name.starts_with('.') {
                continue;
            }
            if path.is_dir() {
                if let Some(n) = numeric_prefix(name.trim_start_matches(|c: char| c.is_alphabetic()))
                {
                    max_epic = max_epic.max(n);
                }
            } else if let Some(stem) = name.strip_suffix(".md") {
                if let Some(n) = numeric_prefix(stem) {
                    max_task = max_task.max(n);
                }
            }
        }
        Ok((max_task + 1, max_epic + 1))
    }
}

fn numeric_prefix(s: &str) -> Option<u32> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Lowercase, non-alphanumerics collapsed to single hyphens.
fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_hyphen = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            out.push('-');
            last_hyphen = true;
        }
    }
    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
