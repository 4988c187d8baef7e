// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt builders for task execution, recovery, and review runs.

use fm_board::AcceptanceCriterion;
use fm_core::Task;

/// Option-gated stanzas appended to a task prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptOptions<'a> {
    pub require_tests_created: bool,
    pub require_tests_run: bool,
    pub require_commit: bool,
    pub extra_prompt: Option<&'a str>,
}

/// Render the AC reference table: ordinal, current mark, text.
pub fn format_acs_for_prompt(acs: &[AcceptanceCriterion]) -> String {
    let mut out = String::new();
    for ac in acs {
        let mark = if ac.checked { "x" } else { " " };
        out.push_str(&format!("AC-{} [{}] {}\n", ac.index, mark, ac.text));
    }
    out
}

/// Build the full prompt for one task execution.
pub fn build_task_prompt(
    task: &Task,
    markdown: &str,
    acs: &[AcceptanceCriterion],
    options: &PromptOptions<'_>,
) -> String {
    let mut prompt = String::with_capacity(markdown.len() + 1024);
    prompt.push_str("You are completing one Kanban task. Finish every pending acceptance criterion, then report the result.\n\n");

    prompt.push_str("## Task\n");
    prompt.push_str(&format!("- id: {}\n", task.id));
    prompt.push_str(&format!("- name: {}\n", task.name));
    prompt.push_str(&format!("- type: {}\n", task.task_type));
    if let Some(priority) = task.priority {
        prompt.push_str(&format!("- priority: {priority}\n"));
    }

    prompt.push_str("\n## Task file\n\n");
    prompt.push_str(markdown);

    let pending: Vec<&AcceptanceCriterion> = acs.iter().filter(|ac| !ac.checked).collect();
    if !acs.is_empty() {
        prompt.push_str("\n## Acceptance criteria\n\n");
        prompt.push_str(&format_acs_for_prompt(acs));
        if pending.is_empty() {
            prompt.push_str("\nAll criteria are already checked; verify them and report.\n");
        }
    }

    prompt.push_str("\n## Reporting protocol\n\n");
    prompt.push_str(
        "After you complete an acceptance criterion, print one line containing only \
         {\"ac_complete\": <n>} where <n> is the AC ordinal above (or a line \
         [AC_COMPLETE] <exact criterion text>).\n",
    );
    prompt.push_str(
        "When you are finished, print the final JSON object \
         {\"status\": \"done\"|\"blocked\", \"summary\": \"...\", \"notes\": \"...\", \
         \"files\": [\"...\"], \"tests\": \"...\"}. \
         Use \"blocked\" when you cannot finish, with the reason in notes.\n",
    );

    if options.require_tests_created {
        prompt.push_str("\nCreate automated tests covering the new behavior.\n");
    }
    if options.require_tests_run {
        prompt.push_str("Run the test suite and do not report done while it fails.\n");
    }
    if options.require_commit {
        prompt.push_str("Commit your work with a descriptive message before reporting done.\n");
    }
    if let Some(extra) = options.extra_prompt {
        prompt.push('\n');
        prompt.push_str(extra);
        prompt.push('\n');
    }

    prompt
}

/// Rough classification of a failure message, used to steer the recovery
/// prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    MissingModule,
    Syntax,
    Timeout,
    Permission,
    Dependency,
    Generic,
}

impl ErrorCategory {
    fn hint(self) -> &'static str {
        match self {
            ErrorCategory::MissingModule => {
                "A module or file could not be found. Check paths and imports."
            }
            ErrorCategory::Syntax => "The code does not parse. Fix the syntax error first.",
            ErrorCategory::Timeout => {
                "The previous run was killed for taking too long. Find what hangs."
            }
            ErrorCategory::Permission => {
                "An operation was denied. Check file permissions and sandbox limits."
            }
            ErrorCategory::Dependency => {
                "A dependency failed to resolve or install. Fix the manifest or lockfile."
            }
            ErrorCategory::Generic => "Diagnose the failure from the output below.",
        }
    }
}

/// Classify an error message by well-known fragments.
pub fn categorize_error(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();
    if lower.contains("cannot find module")
        || lower.contains("module not found")
        || lower.contains("no such file")
    {
        ErrorCategory::MissingModule
    } else if lower.contains("syntaxerror") || lower.contains("syntax error") || lower.contains("unexpected token") {
        ErrorCategory::Syntax
    } else if lower.contains("timed out") || lower.contains("timeout") {
        ErrorCategory::Timeout
    } else if lower.contains("permission denied") || lower.contains("eacces") {
        ErrorCategory::Permission
    } else if lower.contains("dependency") || lower.contains("enoent: npm") || lower.contains("could not resolve") {
        ErrorCategory::Dependency
    } else {
        ErrorCategory::Generic
    }
}

/// Last `max_bytes` of a run's output, snapped to a char boundary.
pub fn output_tail(output: &str, max_bytes: usize) -> &str {
    if output.len() <= max_bytes {
        return output;
    }
    let mut start = output.len() - max_bytes;
    while !output.is_char_boundary(start) {
        start += 1;
    }
    &output[start..]
}

/// Inputs for the recovery (diagnose-and-fix) prompt.
pub struct RecoveryContext<'a> {
    pub task: &'a Task,
    pub error: &'a str,
    /// Tail of the failed run's output, pre-truncated by the caller.
    pub output_tail: &'a str,
    pub acs: &'a [AcceptanceCriterion],
    /// Declared artifact paths and whether each currently exists.
    pub expected_files: &'a [(String, bool)],
}

/// Build the diagnostic prompt sent after a failed run.
pub fn build_recovery_prompt(ctx: &RecoveryContext<'_>) -> String {
    let category = categorize_error(ctx.error);
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "The previous attempt at task {} ({}) failed. Diagnose the failure and fix what you can.\n\n",
        ctx.task.id, ctx.task.name,
    ));
    prompt.push_str(&format!("## Error\n\n{}\n\n{}\n", ctx.error, category.hint()));

    if !ctx.output_tail.is_empty() {
        prompt.push_str("\n## Last output\n\n```\n");
        prompt.push_str(ctx.output_tail);
        prompt.push_str("\n```\n");
    }

    if !ctx.acs.is_empty() {
        prompt.push_str("\n## Declared acceptance criteria\n\n");
        prompt.push_str(&format_acs_for_prompt(ctx.acs));
    }

    if !ctx.expected_files.is_empty() {
        prompt.push_str("\n## Expected artifacts\n\n");
        for (file, exists) in ctx.expected_files {
            let mark = if *exists { "✓" } else { "✗" };
            prompt.push_str(&format!("- {file} — exists? {mark}\n"));
        }
    }

    prompt.push_str(
        "\nWhen finished, print one JSON object \
         {\"status\": \"fixed\"|\"unfixable\", \"summary\": \"...\", \"root_cause\": \"...\", \
         \"files_changed\": [\"...\"], \"next_steps\": \"...\"}.\n",
    );
    prompt
}

/// Corrective prompt for a run that claimed success without producing any
/// observable artifact.
pub fn build_retry_prompt(task: &Task, claimed_summary: &str, claimed_files: &[String]) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "Your previous run of task {} reported done with this summary:\n\n> {}\n\n",
        task.id, claimed_summary,
    ));
    if claimed_files.is_empty() {
        prompt.push_str("It declared no files.\n");
    } else {
        prompt.push_str("It declared these files:\n");
        for file in claimed_files {
            prompt.push_str(&format!("- {file}\n"));
        }
    }
    prompt.push_str(
        "\nNo change is visible in the working tree and none of the declared files exist. \
         The work was not actually done. Do the task for real this time, then print the \
         final JSON contract as before.\n",
    );
    prompt
}

/// Review prompt for a completed task, addressed to the stronger model.
pub fn build_review_prompt(task: &Task, markdown: &str) -> String {
    format!(
        "Review the completed task {} ({}). Verify that every acceptance criterion in the \
         task file below is genuinely satisfied by the current state of the repository — \
         read the code, do not trust the checkboxes.\n\n## Task file\n\n{}\n\n\
         Print the final JSON object {{\"status\": \"done\"|\"blocked\", \"summary\": \"...\", \
         \"notes\": \"...\"}} where \"blocked\" means the work does not hold up, with the \
         problems in notes.\n",
        task.id, task.name, markdown,
    )
}

/// Review prompt for a whole epic, with the per-child results inline.
pub fn build_epic_review_prompt(epic: &Task, child_summaries: &str) -> String {
    format!(
        "Review the completed epic {} ({}). Its children were executed with the results \
         below. Check that the pieces fit together and nothing was left half-integrated.\n\n\
         ## Child results\n\n{}\n\
         Print the final JSON object {{\"status\": \"done\"|\"blocked\", \"summary\": \"...\", \
         \"notes\": \"...\"}}.\n",
        epic.id, epic.name, child_summaries,
    )
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
