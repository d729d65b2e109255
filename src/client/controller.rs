//! Client controller: service first, local cache when the service fails.
//!
//! Every operation tries the task service. Any failure (connection refused,
//! non-success status, undecodable body) is logged and the same change is
//! applied to the [`LocalCache`] instead. The caller always gets a [`View`]
//! and learns where it came from through [`Source`]. Nothing is merged back
//! when the service returns.

use serde::Serialize;

use super::api::{ApiError, TaskApi};
use super::cache::LocalCache;
use super::view::{Filter, Source, View};
use crate::models::{NewTask, Task, TaskId, TaskPatch, normalize_text};
use crate::{Error, Result};

/// Result of a health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Connectivity {
    Online { store_connected: bool },
    Offline { reason: String },
}

/// What a controller operation produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    Applied {
        source: Source,
        view: View,
        /// The task the operation touched, when known
        #[serde(skip_serializing_if = "Option::is_none")]
        task: Option<Task>,
    },
    /// Confirmation was refused; nothing was sent or changed
    Cancelled,
}

impl Outcome {
    pub fn view(&self) -> Option<&View> {
        match self {
            Outcome::Applied { view, .. } => Some(view),
            Outcome::Cancelled => None,
        }
    }

    pub fn source(&self) -> Option<Source> {
        match self {
            Outcome::Applied { source, .. } => Some(*source),
            Outcome::Cancelled => None,
        }
    }
}

pub struct Controller<A: TaskApi> {
    api: A,
    cache: LocalCache,
    filter: Filter,
}

impl<A: TaskApi> Controller<A> {
    pub fn new(api: A, cache: LocalCache) -> Self {
        Self {
            api,
            cache,
            filter: Filter::default(),
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Ask the service whether it and its store are up.
    pub fn probe(&self) -> Connectivity {
        match self.api.health() {
            Ok(report) => Connectivity::Online {
                store_connected: report.store.connected,
            },
            Err(e) => Connectivity::Offline {
                reason: e.to_string(),
            },
        }
    }

    fn from_service(&self, all: Vec<Task>, task: Option<Task>) -> Outcome {
        Outcome::Applied {
            source: Source::Service,
            view: View::build(all, self.filter),
            task,
        }
    }

    fn from_cache(&self, all: Vec<Task>, task: Option<Task>) -> Outcome {
        Outcome::Applied {
            source: Source::Cache,
            view: View::build(all, self.filter),
            task,
        }
    }

    /// After a successful mutation, show the service's full list. If that
    /// read fails the cache is shown instead.
    fn refresh(&self, task: Option<Task>) -> Outcome {
        match self.api.list() {
            Ok(all) => self.from_service(all, task),
            Err(e) => {
                warn_fallback("reload", &e);
                self.from_cache(self.cache.get_all(), task)
            }
        }
    }

    pub fn load(&self) -> Outcome {
        match self.api.list() {
            Ok(all) => {
                tracing::debug!(count = all.len(), "loaded tasks from service");
                self.from_service(all, None)
            }
            Err(e) => {
                warn_fallback("load", &e);
                let all = self.cache.get_all();
                tracing::debug!(count = all.len(), "loaded tasks from local cache");
                self.from_cache(all, None)
            }
        }
    }

    pub fn add(&self, text: &str) -> Result<Outcome> {
        let text = normalize_text(text)
            .ok_or_else(|| Error::InvalidInput("Task text is required".to_string()))?;

        match self.api.create(&NewTask::new(text.clone())) {
            Ok(task) => Ok(self.refresh(Some(task))),
            Err(e) => {
                warn_fallback("create", &e);
                let (task, all) = self.cache.append(text);
                Ok(self.from_cache(all, Some(task)))
            }
        }
    }

    pub fn toggle(&self, id: &TaskId, completed: bool) -> Outcome {
        match self.api.update(id, &TaskPatch::completed(completed)) {
            Ok(task) => self.refresh(Some(task)),
            Err(e) => {
                warn_fallback("toggle", &e);
                let all = self.cache.toggle(id, completed);
                let task = find(&all, id);
                self.from_cache(all, task)
            }
        }
    }

    pub fn edit(&self, id: &TaskId, text: &str) -> Result<Outcome> {
        let text = normalize_text(text)
            .ok_or_else(|| Error::InvalidInput("Task text cannot be empty".to_string()))?;

        match self.api.update(id, &TaskPatch::text(text.clone())) {
            Ok(task) => Ok(self.refresh(Some(task))),
            Err(e) => {
                warn_fallback("edit", &e);
                let all = self.cache.update_text(id, &text);
                let task = find(&all, id);
                Ok(self.from_cache(all, task))
            }
        }
    }

    /// Delete one task. `confirm` receives a prompt and decides.
    pub fn delete(&self, id: &TaskId, confirm: impl FnOnce(&str) -> bool) -> Outcome {
        if !confirm("Delete this task?") {
            return Outcome::Cancelled;
        }

        match self.api.delete(id) {
            Ok(()) => self.refresh(None),
            Err(e) => {
                warn_fallback("delete", &e);
                let all = self.cache.remove(id);
                self.from_cache(all, None)
            }
        }
    }

    /// Remove every completed task. `confirm` receives a prompt and decides.
    pub fn clear_completed(&self, confirm: impl FnOnce(&str) -> bool) -> Outcome {
        if !confirm("Delete all completed tasks?") {
            return Outcome::Cancelled;
        }

        match self.api.clear_completed() {
            Ok(survivors) => self.from_service(survivors, None),
            Err(e) => {
                warn_fallback("clear completed", &e);
                let all = self.cache.remove_completed();
                self.from_cache(all, None)
            }
        }
    }
}

fn find(all: &[Task], id: &TaskId) -> Option<Task> {
    all.iter().find(|t| t.id.matches(id)).cloned()
}

fn warn_fallback(action: &str, e: &ApiError) {
    if e.is_unavailable() {
        tracing::warn!(action, "service store unavailable, using local cache");
    } else {
        tracing::warn!(action, error = %e, "service request failed, using local cache");
    }
}
