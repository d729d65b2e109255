//! Task service: the five operations behind the HTTP routes.
//!
//! Each operation validates its input before touching the store and
//! reports failures as a [`ServiceError`]. The store handle is optional:
//! when the database could not be opened (at startup, or after a failed
//! health probe) every operation short-circuits with
//! [`ServiceError::Unavailable`] so that clients switch to their fallback
//! instead of waiting on a doomed query.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

use crate::models::{NewTask, PatchRejection, Task, TaskPatch};
use crate::storage::Storage;

/// Failure taxonomy of the task service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Bad or missing input (HTTP 400)
    #[error("{0}")]
    Validation(String),

    /// Unknown task id (HTTP 404)
    #[error("{0}")]
    NotFound(String),

    /// The store cannot be reached (HTTP 503)
    #[error("Task store is unavailable")]
    Unavailable,

    /// Unexpected store fault (HTTP 500)
    #[error("{0}")]
    Internal(String),
}

/// Result of one store reachability probe.
#[derive(Debug, Clone, Serialize)]
pub struct StoreHealth {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl StoreHealth {
    fn connected() -> Self {
        Self {
            connected: true,
            error: None,
            checked_at: Utc::now(),
        }
    }

    fn disconnected(error: impl Into<String>) -> Self {
        Self {
            connected: false,
            error: Some(error.into()),
            checked_at: Utc::now(),
        }
    }
}

/// Shared handle to the task store.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<Mutex<Option<Storage>>>,
    /// Where to reopen the store from after an outage
    database: Option<PathBuf>,
}

impl TaskService {
    /// Wrap an already opened store.
    pub fn new(storage: Storage) -> Self {
        let database = storage.path.clone();
        Self {
            store: Arc::new(Mutex::new(Some(storage))),
            database,
        }
    }

    /// Open the store at `path`.
    ///
    /// Never fails: an unreachable store leaves the service running in
    /// unavailable mode until a later probe manages to open it.
    pub fn connect(path: &Path) -> Self {
        let storage = match Storage::open(path) {
            Ok(storage) => {
                tracing::info!(database = %path.display(), "task store opened");
                Some(storage)
            }
            Err(e) => {
                tracing::warn!(database = %path.display(), error = %e, "task store unavailable");
                None
            }
        };
        Self {
            store: Arc::new(Mutex::new(storage)),
            database: Some(path.to_path_buf()),
        }
    }

    /// A service with no store at all.
    pub fn unavailable() -> Self {
        Self {
            store: Arc::new(Mutex::new(None)),
            database: None,
        }
    }

    async fn store(&self) -> Result<MutexGuard<'_, Option<Storage>>, ServiceError> {
        let guard = self.store.lock().await;
        if guard.is_none() {
            return Err(ServiceError::Unavailable);
        }
        Ok(guard)
    }

    /// All tasks, newest first.
    pub async fn list(&self) -> Result<Vec<Task>, ServiceError> {
        let guard = self.store().await?;
        let store = guard.as_ref().ok_or(ServiceError::Unavailable)?;
        store
            .list_tasks()
            .map_err(internal("listing tasks"))
    }

    /// Create a task with trimmed text.
    pub async fn create(&self, new_task: NewTask) -> Result<Task, ServiceError> {
        let new_task = new_task.validated().map_err(ServiceError::Validation)?;

        let mut guard = self.store().await?;
        let store = guard.as_mut().ok_or(ServiceError::Unavailable)?;
        let task = store
            .insert_task(&new_task.text, new_task.completed)
            .map_err(internal("creating task"))?;

        tracing::debug!(id = %task.id, "task created");
        Ok(task)
    }

    /// Apply a partial update.
    ///
    /// Checks run in this order: blank text, store availability and
    /// unknown id, empty patch.
    pub async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task, ServiceError> {
        let mut guard = self.store.lock().await;
        let target = id.trim().parse::<i64>().ok();

        let patch = patch
            .validated(|| {
                let store = guard.as_ref().ok_or(ServiceError::Unavailable)?;
                match target {
                    Some(id) => store
                        .get_task(id)
                        .map(|task| task.is_some())
                        .map_err(internal("updating task")),
                    None => Ok(false),
                }
            })
            .map_err(|rejection| match rejection {
                PatchRejection::Invalid(message) => ServiceError::Validation(message.to_string()),
                PatchRejection::Missing => not_found(id.trim()),
                PatchRejection::Lookup(e) => e,
            })?;

        let store = guard.as_mut().ok_or(ServiceError::Unavailable)?;
        let id = target.ok_or_else(|| not_found(id.trim()))?;
        let task = store
            .update_task(id, &patch)
            .map_err(internal("updating task"))?
            .ok_or_else(|| not_found(id))?;

        tracing::debug!(id = %task.id, "task updated");
        Ok(task)
    }

    /// Delete a task, returning the removed record.
    pub async fn delete(&self, id: &str) -> Result<Task, ServiceError> {
        let mut guard = self.store().await?;
        let store = guard.as_mut().ok_or(ServiceError::Unavailable)?;

        let id = parse_id(id)?;
        let task = store
            .delete_task(id)
            .map_err(internal("deleting task"))?
            .ok_or_else(|| not_found(id))?;

        tracing::debug!(id = %task.id, "task deleted");
        Ok(task)
    }

    /// Delete every completed task and return the survivors.
    ///
    /// The survivors are read first and the delete runs as a separate
    /// statement; there is no transaction around the pair. A writer that
    /// shares the database file outside this process can slip in between.
    pub async fn clear_completed(&self) -> Result<Vec<Task>, ServiceError> {
        let mut guard = self.store().await?;
        let store = guard.as_mut().ok_or(ServiceError::Unavailable)?;

        let survivors = store
            .list_tasks_where_completed(false)
            .map_err(internal("clearing completed tasks"))?;
        let removed = store
            .delete_completed()
            .map_err(internal("clearing completed tasks"))?;

        tracing::debug!(removed, remaining = survivors.len(), "completed tasks cleared");
        Ok(survivors)
    }

    /// Re-run table creation (development helper).
    pub async fn ensure_schema(&self) -> Result<(), ServiceError> {
        let guard = self.store().await?;
        let store = guard.as_ref().ok_or(ServiceError::Unavailable)?;
        store
            .ensure_schema()
            .map_err(internal("creating task table"))
    }

    /// Probe the store and report what was found.
    ///
    /// A broken store is dropped; a missing one is reopened when possible.
    pub async fn check_connection(&self) -> StoreHealth {
        let mut guard = self.store.lock().await;

        if let Some(store) = guard.as_ref() {
            return match store.ping() {
                Ok(()) => StoreHealth::connected(),
                Err(e) => {
                    tracing::warn!(error = %e, "task store probe failed");
                    *guard = None;
                    StoreHealth::disconnected(e.to_string())
                }
            };
        }

        let Some(ref path) = self.database else {
            return StoreHealth::disconnected("No database configured");
        };

        match Storage::open(path) {
            Ok(store) => {
                tracing::info!(database = %path.display(), "task store reconnected");
                *guard = Some(store);
                StoreHealth::connected()
            }
            Err(e) => StoreHealth::disconnected(e.to_string()),
        }
    }

    /// Probe the store every `every` in the background.
    pub fn spawn_health_monitor(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately; startup already probed.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let health = service.check_connection().await;
                tracing::debug!(connected = health.connected, "periodic store probe");
            }
        })
    }
}

/// Ids that are not integers can never exist in the store.
fn parse_id(id: &str) -> Result<i64, ServiceError> {
    id.trim()
        .parse::<i64>()
        .map_err(|_| not_found(id))
}

fn not_found(id: impl std::fmt::Display) -> ServiceError {
    ServiceError::NotFound(format!("Task not found: {}", id))
}

fn internal(action: &'static str) -> impl Fn(crate::Error) -> ServiceError {
    move |e| {
        tracing::error!(error = %e, "store fault while {}", action);
        ServiceError::Internal(format!("Error {}", action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    fn service() -> TaskService {
        TaskService::new(Storage::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_create_trims_and_defaults_completed() {
        let service = service();
        let task = service.create(NewTask::new("  Buy milk  ")).await.unwrap();
        assert_eq!(task.text, "Buy milk");
        assert!(!task.completed);
    }

    #[tokio::test]
    async fn test_create_blank_text_stores_nothing() {
        let service = service();
        for text in ["", "   ", "\t\n"] {
            let err = service.create(NewTask::new(text)).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let service = service();
        let a = service.create(NewTask::new("a")).await.unwrap();
        let b = service.create(NewTask::new("b")).await.unwrap();

        let tasks = service.list().await.unwrap();
        assert_eq!(tasks[0].id, b.id);
        assert_eq!(tasks[1].id, a.id);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let service = service();
        let patches = [
            TaskPatch::completed(true),
            TaskPatch::text("x"),
            TaskPatch {
                text: Some("x".into()),
                completed: Some(false),
            },
            TaskPatch::default(),
        ];
        for patch in patches {
            let err = service.update("42", patch).await.unwrap_err();
            assert!(matches!(err, ServiceError::NotFound(_)), "{:?}", err);
        }
        let err = service
            .update("not-a-number", TaskPatch::completed(true))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_without_fields_is_validation_error() {
        let service = service();
        let task = service.create(NewTask::new("a")).await.unwrap();
        let err = service
            .update(&task.id.to_string(), TaskPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Validation("No fields to update".into()));
    }

    #[tokio::test]
    async fn test_update_blank_text_is_validation_error() {
        let service = service();
        let task = service.create(NewTask::new("a")).await.unwrap();
        let err = service
            .update(&task.id.to_string(), TaskPatch::text("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(service.list().await.unwrap()[0].text, "a");
    }

    #[tokio::test]
    async fn test_update_applies_only_supplied_fields() {
        let service = service();
        let task = service.create(NewTask::new("a")).await.unwrap();
        let id = task.id.to_string();

        let done = service.update(&id, TaskPatch::completed(true)).await.unwrap();
        assert!(done.completed);
        assert_eq!(done.text, "a");

        let renamed = service.update(&id, TaskPatch::text(" b ")).await.unwrap();
        assert_eq!(renamed.text, "b");
        assert!(renamed.completed);
        assert_eq!(renamed.created_at, task.created_at);
    }

    #[tokio::test]
    async fn test_delete() {
        let service = service();
        let task = service.create(NewTask::new("a")).await.unwrap();
        let id = task.id.to_string();

        let removed = service.delete(&id).await.unwrap();
        assert_eq!(removed.id, task.id);
        assert!(matches!(
            service.delete(&id).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_clear_completed_returns_survivors() {
        let service = service();
        let a = service.create(NewTask::new("a")).await.unwrap();
        let b = service.create(NewTask::new("b")).await.unwrap();
        let c = service.create(NewTask::new("c")).await.unwrap();
        service
            .update(&b.id.to_string(), TaskPatch::completed(true))
            .await
            .unwrap();

        let expected: Vec<Task> = service
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|t| !t.completed)
            .collect();
        let survivors = service.clear_completed().await.unwrap();

        assert_eq!(survivors, expected);
        assert_eq!(survivors.iter().map(|t| &t.id).collect::<Vec<_>>(), vec![&c.id, &a.id]);
        assert_eq!(service.list().await.unwrap(), survivors);
    }

    #[tokio::test]
    async fn test_unavailable_short_circuits_everything() {
        let service = TaskService::unavailable();
        assert_eq!(service.list().await.unwrap_err(), ServiceError::Unavailable);
        assert_eq!(
            service.create(NewTask::new("a")).await.unwrap_err(),
            ServiceError::Unavailable
        );
        assert_eq!(
            service
                .update("1", TaskPatch::completed(true))
                .await
                .unwrap_err(),
            ServiceError::Unavailable
        );
        assert_eq!(service.delete("1").await.unwrap_err(), ServiceError::Unavailable);
        assert_eq!(
            service.clear_completed().await.unwrap_err(),
            ServiceError::Unavailable
        );
        assert!(!service.check_connection().await.connected);
    }

    #[tokio::test]
    async fn test_update_checks_blank_text_before_availability() {
        let service = TaskService::unavailable();
        assert_eq!(
            service.update("1", TaskPatch::text("  ")).await.unwrap_err(),
            ServiceError::Validation("Task text cannot be empty".into())
        );
        assert_eq!(
            service.update("1", TaskPatch::default()).await.unwrap_err(),
            ServiceError::Unavailable
        );
    }

    #[tokio::test]
    async fn test_connect_to_unopenable_path_then_recover() {
        let env = TestEnv::new();
        // A regular file where a directory is expected blocks the open.
        let blocker = env.data_path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let db = blocker.join("todos.db");

        let service = TaskService::connect(&db);
        assert_eq!(service.list().await.unwrap_err(), ServiceError::Unavailable);
        assert!(!service.check_connection().await.connected);

        std::fs::remove_file(&blocker).unwrap();
        let health = service.check_connection().await;
        assert!(health.connected);
        assert!(service.list().await.unwrap().is_empty());
    }
}
