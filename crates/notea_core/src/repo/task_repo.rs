//! Task persistence gateway contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the save/fetch/delete contract the task store depends on.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths validate the task before any SQL mutation.
//! - Read paths reject invalid persisted rows instead of masking them.
//! - `fetch_all` returns tasks in insertion order.

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::task::{Category, Priority, Task, TaskFields, TaskValidationError};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    description,
    due_at,
    priority,
    category
FROM tasks";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task and settings persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    Db(DbError),
    InvalidData(String),
    /// Connection was not opened through `db::open_db*`.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table missing: {table}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable storage contract consumed by the task store.
pub trait TaskGateway {
    /// Returns every stored task in insertion order.
    fn fetch_all(&self) -> RepoResult<Vec<Task>>;
    /// Inserts or fully replaces one task.
    fn save(&self, task: &Task) -> RepoResult<()>;
    /// Removes one task. Removing a missing task is not an error.
    fn delete(&self, task: &Task) -> RepoResult<()>;
}

impl<G: TaskGateway + ?Sized> TaskGateway for &G {
    fn fetch_all(&self) -> RepoResult<Vec<Task>> {
        (**self).fetch_all()
    }

    fn save(&self, task: &Task) -> RepoResult<()> {
        (**self).save(task)
    }

    fn delete(&self, task: &Task) -> RepoResult<()> {
        (**self).delete(task)
    }
}

/// SQLite-backed task gateway.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` when the `tasks` table is absent.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "tasks")?;
        Ok(Self { conn })
    }
}

impl TaskGateway for SqliteTaskRepository<'_> {
    fn fetch_all(&self) -> RepoResult<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} ORDER BY created_at ASC, rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();

        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }

        Ok(tasks)
    }

    fn save(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        self.conn.execute(
            "INSERT INTO tasks (
                uuid,
                title,
                description,
                due_at,
                priority,
                category
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (uuid) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                due_at = excluded.due_at,
                priority = excluded.priority,
                category = excluded.category,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                task.id.to_string(),
                task.title.as_str(),
                task.description.as_str(),
                task.due_at,
                priority_to_db(task.priority),
                category_to_db(task.category),
            ],
        )?;

        Ok(())
    }

    fn delete(&self, task: &Task) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM tasks WHERE uuid = ?1;", [task.id.to_string()])?;
        Ok(())
    }
}

/// Verifies schema version and one required table on `conn`.
pub(crate) fn ensure_connection_ready(conn: &Connection, table: &'static str) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(RepoError::MissingRequiredTable(table));
    }

    Ok(())
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in tasks.uuid"))
    })?;

    let priority_text: String = row.get("priority")?;
    let priority = parse_priority(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid priority `{priority_text}` in tasks.priority"
        ))
    })?;

    let category_text: String = row.get("category")?;
    let category = parse_category(&category_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid category `{category_text}` in tasks.category"
        ))
    })?;

    let fields = TaskFields {
        title: row.get("title")?,
        description: row.get("description")?,
        due_at: row.get("due_at")?,
        priority,
        category,
    };
    Ok(Task::with_id(id, fields)?)
}

fn priority_to_db(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
    }
}

fn parse_priority(value: &str) -> Option<Priority> {
    Priority::ALL
        .into_iter()
        .find(|priority| priority_to_db(*priority) == value)
}

fn category_to_db(category: Category) -> &'static str {
    match category {
        Category::Work => "work",
        Category::School => "school",
        Category::Exercise => "exercise",
        Category::Personal => "personal",
        Category::Other => "other",
    }
}

fn parse_category(value: &str) -> Option<Category> {
    Category::ALL
        .into_iter()
        .find(|category| category_to_db(*category) == value)
}
