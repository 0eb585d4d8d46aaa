//! Text search and category filtering over task snapshots.
//!
//! # Responsibility
//! - Derive list views from a supplied task sequence.
//!
//! # Invariants
//! - Functions are pure: output depends only on the inputs.
//! - Filters preserve the relative order of their input.
//! - Search matches `title` only, by substring under Unicode default case
//!   folding, so `Σ`, `σ` and final `ς` all match one another.

use crate::model::task::{CategoryFilter, Task};

/// Combined text + category query used by list views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Search text. Empty matches every task.
    pub text: String,
    pub category: CategoryFilter,
}

impl TaskQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: CategoryFilter::All,
        }
    }

    pub fn with_category(mut self, category: impl Into<CategoryFilter>) -> Self {
        self.category = category.into();
        self
    }

    /// Runs this query against `tasks`.
    pub fn run(&self, tasks: &[Task]) -> Vec<Task> {
        apply(tasks, &self.text, self.category)
    }
}

/// Keeps tasks whose title contains `text`, ignoring case.
///
/// Case folding is Unicode-aware; there is no word tokenization.
pub fn search(tasks: &[Task], text: &str) -> Vec<Task> {
    let needle = fold_case(text);
    tasks
        .iter()
        .filter(|task| title_matches(task, &needle))
        .cloned()
        .collect()
}

/// Keeps tasks in `category`; `CategoryFilter::All` keeps everything.
pub fn filter_by_category(tasks: &[Task], category: CategoryFilter) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| category.matches(task.category))
        .cloned()
        .collect()
}

/// Logical AND of [`search`] and [`filter_by_category`].
pub fn apply(tasks: &[Task], text: &str, category: CategoryFilter) -> Vec<Task> {
    let needle = fold_case(text);
    tasks
        .iter()
        .filter(|task| category.matches(task.category) && title_matches(task, &needle))
        .cloned()
        .collect()
}

/// Stable ascending sort by due date.
pub fn sort_by_due_date(tasks: &[Task]) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by_key(|task| task.due_at);
    sorted
}

fn title_matches(task: &Task, folded_needle: &str) -> bool {
    folded_needle.is_empty() || fold_case(&task.title).contains(folded_needle)
}

fn fold_case(value: &str) -> String {
    caseless::default_case_fold_str(value)
}
