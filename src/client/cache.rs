//! Local cache: the client's fallback copy of the task list.
//!
//! The cache file is a small key-value document (`{"<key>": <value>}`).
//! The task list lives under [`TASKS_KEY`]. Every operation reads the
//! whole list, changes it in memory and writes the whole document back
//! through a temp file + rename. Nothing is locked; one client process at
//! a time is assumed.
//!
//! Unreadable data (missing file, bad JSON, wrong shape) is an empty list.
//! Write failures are logged and swallowed: the cache is best effort.

use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::Result;
use crate::models::{Task, TaskId, normalize_text};

/// Key under which the task list is stored.
pub const TASKS_KEY: &str = "todo_app_tasks";

/// Durable key-value file holding the fallback task list.
#[derive(Debug, Clone)]
pub struct LocalCache {
    path: PathBuf,
}

impl LocalCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Map<String, Value> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(_) => return Map::new(),
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                tracing::warn!(path = %self.path.display(), "local cache unreadable, starting empty");
                Map::new()
            }
        }
    }

    fn write_document(&self, document: &Map<String, Value>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, document)?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// All cached tasks in stored order. Never fails.
    pub fn get_all(&self) -> Vec<Task> {
        let mut document = self.read_document();
        match document.remove(TASKS_KEY) {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "cached task list malformed, treating as empty");
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    /// Replace the stored list, keeping any other keys in the document.
    fn save(&self, tasks: &[Task]) {
        let mut document = self.read_document();
        let value = match serde_json::to_value(tasks) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "could not serialize local cache");
                return;
            }
        };
        document.insert(TASKS_KEY.to_string(), value);
        if let Err(e) = self.write_document(&document) {
            tracing::warn!(path = %self.path.display(), error = %e, "could not write local cache");
        }
    }

    fn mutate(&self, change: impl FnOnce(&mut Vec<Task>) -> bool) -> Vec<Task> {
        let mut tasks = self.get_all();
        if change(&mut tasks) {
            self.save(&tasks);
        }
        tasks
    }

    /// Create a task at the end of the list.
    ///
    /// The id is chosen against the list just read, so it never collides
    /// with a task already in the cache.
    pub fn append(&self, text: String) -> (Task, Vec<Task>) {
        let mut tasks = self.get_all();
        let task = Task::new_local(TaskId::next_local(&tasks), text);
        tasks.push(task.clone());
        self.save(&tasks);
        (task, tasks)
    }

    /// Set the completion flag of a task. Unknown ids are ignored.
    pub fn toggle(&self, id: &TaskId, completed: bool) -> Vec<Task> {
        self.mutate(|tasks| match tasks.iter_mut().find(|t| t.id.matches(id)) {
            Some(task) => {
                task.completed = completed;
                true
            }
            None => false,
        })
    }

    /// Replace the text of a task. Unknown ids and blank text are ignored.
    pub fn update_text(&self, id: &TaskId, text: &str) -> Vec<Task> {
        let Some(text) = normalize_text(text) else {
            return self.get_all();
        };
        self.mutate(|tasks| match tasks.iter_mut().find(|t| t.id.matches(id)) {
            Some(task) => {
                task.text = text;
                true
            }
            None => false,
        })
    }

    /// Remove a task.
    pub fn remove(&self, id: &TaskId) -> Vec<Task> {
        self.mutate(|tasks| {
            let before = tasks.len();
            tasks.retain(|t| !t.id.matches(id));
            tasks.len() != before
        })
    }

    /// Remove every completed task.
    pub fn remove_completed(&self) -> Vec<Task> {
        self.mutate(|tasks| {
            let before = tasks.len();
            tasks.retain(|t| !t.completed);
            tasks.len() != before
        })
    }
}
