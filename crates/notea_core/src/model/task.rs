//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record shared by every view.
//! - Own field defaults and title validation for create/update inputs.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `title` is never empty (or whitespace-only) in a persisted task.
//! - `priority` and `category` are closed enums; string forms are parsed,
//!   never stored free-form.
//! - `due_at` is always present (Unix epoch milliseconds).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for a task.
pub type TaskId = Uuid;

/// Task urgency shown as a colored marker in list rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    /// Display name, also used as the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// Fixed set of task categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Work,
    School,
    Exercise,
    Personal,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Work,
        Category::School,
        Category::Exercise,
        Category::Personal,
        Category::Other,
    ];

    /// Display name, also used as the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::School => "School",
            Self::Exercise => "Exercise",
            Self::Personal => "Personal",
            Self::Other => "Other",
        }
    }
}

/// Category selector for list views.
///
/// `All` is a view sentinel, not a category a task can carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    /// Returns whether `category` passes this filter.
    pub fn matches(self, category: Category) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == category,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Only(category) => category.as_str(),
        }
    }
}

impl From<Category> for CategoryFilter {
    fn from(value: Category) -> Self {
        Self::Only(value)
    }
}

/// Error returned when a string is not one of the enumerated values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl Display for ParseEnumError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {} `{}`", self.kind, self.value)
    }
}

impl Error for ParseEnumError {}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError {
                kind: "priority",
                value: s.to_string(),
            })
    }
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError {
                kind: "category",
                value: s.to_string(),
            })
    }
}

impl FromStr for CategoryFilter {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<Category>()
            .map(Self::Only)
            .map_err(|err| ParseEnumError {
                kind: "category filter",
                value: err.value,
            })
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for CategoryFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain validation errors for task records and inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Title is empty or whitespace only.
    EmptyTitle,
    /// Nil UUID cannot identify a task.
    NilId,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "task title must not be empty"),
            Self::NilId => write!(f, "task id must not be nil"),
        }
    }
}

impl Error for TaskValidationError {}

/// Creation input. Unset fields fall back to task defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    /// Epoch milliseconds. Defaults to creation time.
    pub due_at: Option<i64>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn due_at(mut self, due_at: i64) -> Self {
        self.due_at = Some(due_at);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Resolves defaults against `now` (epoch milliseconds).
    pub fn into_fields(self, now: i64) -> TaskFields {
        TaskFields {
            title: self.title,
            description: self.description.unwrap_or_default(),
            due_at: self.due_at.unwrap_or(now),
            priority: self.priority.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
        }
    }
}

/// Full editable field set. Updates replace all of it at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub due_at: i64,
    pub priority: Priority,
    pub category: Category,
}

impl TaskFields {
    /// Checks field-level invariants shared by create and update.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }
        Ok(())
    }
}

/// Canonical task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaskWire")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    /// Unix epoch milliseconds.
    pub due_at: i64,
    pub priority: Priority,
    pub category: Category,
}

impl Task {
    /// Builds a task with a generated id.
    pub fn new(fields: TaskFields) -> Result<Self, TaskValidationError> {
        Self::with_id(Uuid::new_v4(), fields)
    }

    /// Builds a task with a caller-provided id.
    ///
    /// Used by persistence read paths where identity already exists.
    pub fn with_id(id: TaskId, fields: TaskFields) -> Result<Self, TaskValidationError> {
        let task = Self {
            id,
            title: fields.title,
            description: fields.description,
            due_at: fields.due_at,
            priority: fields.priority,
            category: fields.category,
        };
        task.validate()?;
        Ok(task)
    }

    /// Validates id and field invariants.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id.is_nil() {
            return Err(TaskValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }
        Ok(())
    }

    /// Returns the editable fields of this task.
    pub fn fields(&self) -> TaskFields {
        TaskFields {
            title: self.title.clone(),
            description: self.description.clone(),
            due_at: self.due_at,
            priority: self.priority,
            category: self.category,
        }
    }

    /// Returns a copy of this task with all editable fields replaced.
    pub fn replaced(&self, fields: TaskFields) -> Result<Self, TaskValidationError> {
        Self::with_id(self.id, fields)
    }
}

#[derive(Deserialize)]
struct TaskWire {
    id: TaskId,
    title: String,
    #[serde(default)]
    description: String,
    due_at: i64,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    category: Category,
}

impl TryFrom<TaskWire> for Task {
    type Error = TaskValidationError;

    fn try_from(value: TaskWire) -> Result<Self, Self::Error> {
        Task::with_id(
            value.id,
            TaskFields {
                title: value.title,
                description: value.description,
                due_at: value.due_at,
                priority: value.priority,
                category: value.category,
            },
        )
    }
}
