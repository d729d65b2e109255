//! Data models for Tasklist entities.
//!
//! This module defines the core data structures:
//! - `Task` - A to-do item with text, completion flag and creation time
//! - `TaskId` - Identifier from either the server id space or the local one
//! - `NewTask` - Create request body
//! - `TaskPatch` - Partial update request body

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a task.
///
/// Tasks persisted by the service carry a store-assigned integer. Tasks
/// created in the local cache while the service was unreachable carry a
/// millisecond timestamp string. The two spaces are never reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    /// Assigned by the task store (serialized as a JSON number)
    Server(i64),
    /// Assigned by the client during an outage (serialized as a JSON string)
    Local(String),
}

impl TaskId {
    /// Parse an id typed by a user or taken from a URL.
    ///
    /// Anything that parses as an integer is treated as a server id; the
    /// local cache still finds timestamp ids through [`TaskId::matches`].
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.parse::<i64>() {
            Ok(n) => TaskId::Server(n),
            Err(_) => TaskId::Local(s.to_string()),
        }
    }

    /// Generate a client-side id not used by any of `existing`.
    ///
    /// Starts from the current millisecond timestamp and steps forward
    /// until the id is free, so ids stay numeric and unique even when
    /// several tasks are created within the same millisecond.
    pub fn next_local(existing: &[Task]) -> Self {
        let mut millis = Utc::now().timestamp_millis();
        loop {
            let id = TaskId::Local(millis.to_string());
            if !existing.iter().any(|t| t.id.matches(&id)) {
                return id;
            }
            millis += 1;
        }
    }

    /// Loose comparison on the textual form, so `Server(17)` matches `"17"`.
    pub fn matches(&self, other: &TaskId) -> bool {
        self.to_string() == other.to_string()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Server(n) => write!(f, "{}", n),
            TaskId::Local(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for TaskId {
    fn from(n: i64) -> Self {
        TaskId::Server(n)
    }
}

/// A to-do item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Trimmed, never empty
    pub text: String,

    /// Completion flag
    #[serde(default)]
    pub completed: bool,

    /// Creation timestamp (immutable, drives newest-first ordering)
    #[serde(alias = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a task that only exists in the local cache.
    pub fn new_local(id: TaskId, text: String) -> Self {
        Self {
            id,
            text,
            completed: false,
            created_at: Utc::now(),
        }
    }
}

/// Sort tasks newest first, breaking timestamp ties by id.
pub fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| match (&a.id, &b.id) {
                (TaskId::Server(x), TaskId::Server(y)) => y.cmp(x),
                _ => b.id.to_string().cmp(&a.id.to_string()),
            })
    });
}

/// Trim task text, rejecting empty or whitespace-only input.
pub fn normalize_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Request body for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

impl NewTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: false,
        }
    }

    /// Returns a copy with trimmed text, or an error message for empty text.
    pub fn validated(&self) -> Result<NewTask, String> {
        let text = normalize_text(&self.text).ok_or("Task text is required")?;
        Ok(NewTask {
            text,
            completed: self.completed,
        })
    }
}

/// Partial update for a task. Only supplied fields change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            text: None,
            completed: Some(completed),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            completed: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed.is_none()
    }

    /// Validate the patch against the task it targets.
    ///
    /// Checks run in a fixed order: blank text, then whether the task
    /// exists (through `exists`), then whether any field is present.
    /// Returns a copy with the text trimmed.
    pub fn validated<E>(
        &self,
        exists: impl FnOnce() -> Result<bool, E>,
    ) -> Result<TaskPatch, PatchRejection<E>> {
        let text = match &self.text {
            Some(text) => Some(
                normalize_text(text).ok_or(PatchRejection::Invalid("Task text cannot be empty"))?,
            ),
            None => None,
        };
        if !exists().map_err(PatchRejection::Lookup)? {
            return Err(PatchRejection::Missing);
        }
        let patch = TaskPatch {
            text,
            completed: self.completed,
        };
        if patch.is_empty() {
            return Err(PatchRejection::Invalid("No fields to update"));
        }
        Ok(patch)
    }
}

/// Why [`TaskPatch::validated`] refused a patch.
#[derive(Debug, PartialEq, Eq)]
pub enum PatchRejection<E> {
    /// Bad input, with a message for the caller
    Invalid(&'static str),
    /// No task has the targeted id
    Missing,
    /// The existence check itself failed
    Lookup(E),
}
