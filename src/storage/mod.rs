//! Storage layer for Tasklist data.
//!
//! Tasks live in a single SQLite table, `todos`:
//!
//! | column       | type                               |
//! |--------------|------------------------------------|
//! | `id`         | INTEGER PRIMARY KEY AUTOINCREMENT  |
//! | `text`       | TEXT NOT NULL                      |
//! | `completed`  | INTEGER NOT NULL DEFAULT 0         |
//! | `created_at` | TEXT NOT NULL (RFC 3339, UTC)      |
//!
//! Every statement is parameterized. Any SQLite fault surfaces as
//! [`Error::Database`]; callers get no finer distinction than that.

use crate::models::{Task, TaskId, TaskPatch};
use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::fs;
use std::path::{Path, PathBuf};

const TASK_COLUMNS: &str = "id, text, completed, created_at";

/// Storage manager for the task table.
pub struct Storage {
    /// Database file, `None` for in-memory stores
    pub path: Option<PathBuf>,
    /// SQLite connection
    conn: Connection,
}

impl Storage {
    /// Open (or create) the database at `path` and ensure the table exists.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let storage = Self {
            path: Some(path.to_path_buf()),
            conn,
        };
        storage.ensure_schema()?;

        Ok(storage)
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { path: None, conn };
        storage.ensure_schema()?;
        Ok(storage)
    }

    /// Create the task table if it is absent. Safe to call repeatedly.
    pub fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS todos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_todos_created_at ON todos(created_at);
            CREATE INDEX IF NOT EXISTS idx_todos_completed ON todos(completed);
            "#,
        )?;
        Ok(())
    }

    /// Cheap round trip used by health probes.
    pub fn ping(&self) -> Result<()> {
        self.conn.prepare("SELECT 1 FROM todos LIMIT 1")?.exists([])?;
        Ok(())
    }

    // === Task Operations ===

    /// List all tasks, newest first.
    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM todos ORDER BY created_at DESC, id DESC",
            TASK_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map([], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// List tasks with the given completion flag, newest first.
    pub fn list_tasks_where_completed(&self, completed: bool) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM todos WHERE completed = ?1 ORDER BY created_at DESC, id DESC",
            TASK_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map([completed], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Get a task by ID.
    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let sql = format!("SELECT {} FROM todos WHERE id = ?1", TASK_COLUMNS);
        let task = self
            .conn
            .query_row(&sql, [id], row_to_task)
            .optional()?;
        Ok(task)
    }

    /// Insert a task. The store assigns the id and the creation time.
    pub fn insert_task(&mut self, text: &str, completed: bool) -> Result<Task> {
        let sql = format!(
            "INSERT INTO todos (text, completed, created_at) VALUES (?1, ?2, ?3) RETURNING {}",
            TASK_COLUMNS
        );
        let task = self.conn.query_row(
            &sql,
            params![text, completed, format_timestamp(Utc::now())],
            row_to_task,
        )?;
        Ok(task)
    }

    /// Apply a partial update. Returns the post-update task, or `None` if
    /// no task has this id.
    ///
    /// The patch is expected to be validated already; an empty patch just
    /// reads the task back.
    pub fn update_task(&mut self, id: i64, patch: &TaskPatch) -> Result<Option<Task>> {
        let task = match (&patch.text, patch.completed) {
            (Some(text), Some(completed)) => {
                let sql = format!(
                    "UPDATE todos SET text = ?1, completed = ?2 WHERE id = ?3 RETURNING {}",
                    TASK_COLUMNS
                );
                self.conn
                    .query_row(&sql, params![text, completed, id], row_to_task)
                    .optional()?
            }
            (Some(text), None) => {
                let sql = format!(
                    "UPDATE todos SET text = ?1 WHERE id = ?2 RETURNING {}",
                    TASK_COLUMNS
                );
                self.conn
                    .query_row(&sql, params![text, id], row_to_task)
                    .optional()?
            }
            (None, Some(completed)) => {
                let sql = format!(
                    "UPDATE todos SET completed = ?1 WHERE id = ?2 RETURNING {}",
                    TASK_COLUMNS
                );
                self.conn
                    .query_row(&sql, params![completed, id], row_to_task)
                    .optional()?
            }
            (None, None) => self.get_task(id)?,
        };
        Ok(task)
    }

    /// Delete a task by ID, returning the removed record.
    pub fn delete_task(&mut self, id: i64) -> Result<Option<Task>> {
        let sql = format!("DELETE FROM todos WHERE id = ?1 RETURNING {}", TASK_COLUMNS);
        let task = self
            .conn
            .query_row(&sql, [id], row_to_task)
            .optional()?;
        Ok(task)
    }

    /// Delete every completed task. Returns how many rows went away.
    pub fn delete_completed(&mut self) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM todos WHERE completed = 1", [])?;
        Ok(removed)
    }
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let created_at: String = row.get(3)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Task {
        id: TaskId::Server(row.get(0)?),
        text: row.get(1)?,
        completed: row.get(2)?,
        created_at,
    })
}

/// Default database location: `<data dir>/tasklist/todos.db`.
///
/// `TASKLIST_DATA_DIR` overrides the platform data directory.
pub fn default_database_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("todos.db"))
}

/// Root directory for Tasklist's own files.
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TASKLIST_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let base = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(base.join("tasklist"))
}
