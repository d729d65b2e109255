//! Command implementations for the Tasklist CLI.
//!
//! Each client command is a thin wrapper over the [`Controller`]; the
//! interesting part here is how results are printed. Every result
//! implements [`Output`] so `main` can emit JSON (default) or text (`-H`).

use serde::Serialize;
use std::fmt::Write as _;

use crate::Result;
use crate::client::{Connectivity, Controller, Filter, Outcome, Source, TaskApi, View};
use crate::models::{Task, TaskId};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

fn task_line(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    format!("[{}] {}  {}", mark, task.id, task.text)
}

fn render_view(out: &mut String, view: &View) {
    if view.tasks.is_empty() {
        let _ = writeln!(out, "No tasks.");
    } else {
        for task in &view.tasks {
            let _ = writeln!(out, "{}", task_line(task));
        }
    }
    let _ = write!(out, "{}", view.pending_label());
    if view.has_completed {
        let _ = write!(out, ", {} completed", view.completed);
    }
    if view.filter != Filter::All {
        let _ = write!(out, " (showing {})", view.filter.as_str());
    }
}

impl Output for Outcome {
    fn to_json(&self) -> String {
        match self {
            Outcome::Cancelled => r#"{"cancelled":true}"#.to_string(),
            applied => json(applied),
        }
    }

    fn to_human(&self) -> String {
        let Outcome::Applied { source, view, .. } = self else {
            return "Cancelled.".to_string();
        };
        let mut out = String::new();
        render_view(&mut out, view);
        if *source == Source::Cache {
            out.push_str("\n(offline: saved locally)");
        }
        out
    }
}

/// Result of `tasklist status`.
#[derive(Serialize)]
pub struct StatusReport {
    pub api_url: String,
    pub cache_path: String,
    pub connectivity: Connectivity,
    pub cached_tasks: usize,
}

impl Output for StatusReport {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let state = match &self.connectivity {
            Connectivity::Online {
                store_connected: true,
            } => "online".to_string(),
            Connectivity::Online {
                store_connected: false,
            } => "online, store unavailable".to_string(),
            Connectivity::Offline { reason } => format!("offline ({})", reason),
        };
        format!(
            "Service: {} [{}]\nLocal cache: {} ({} tasks)",
            self.api_url, state, self.cache_path, self.cached_tasks
        )
    }
}

pub fn list<A: TaskApi>(controller: &Controller<A>) -> Outcome {
    controller.load()
}

pub fn add<A: TaskApi>(controller: &Controller<A>, text: &str) -> Result<Outcome> {
    controller.add(text)
}

pub fn set_done<A: TaskApi>(controller: &Controller<A>, id: &str, completed: bool) -> Outcome {
    controller.toggle(&TaskId::parse(id), completed)
}

pub fn edit<A: TaskApi>(controller: &Controller<A>, id: &str, text: &str) -> Result<Outcome> {
    controller.edit(&TaskId::parse(id), text)
}

pub fn remove<A: TaskApi>(
    controller: &Controller<A>,
    id: &str,
    confirm: impl FnOnce(&str) -> bool,
) -> Outcome {
    controller.delete(&TaskId::parse(id), confirm)
}

pub fn clear<A: TaskApi>(controller: &Controller<A>, confirm: impl FnOnce(&str) -> bool) -> Outcome {
    controller.clear_completed(confirm)
}

pub fn status<A: TaskApi>(controller: &Controller<A>, api_url: &str) -> StatusReport {
    StatusReport {
        api_url: api_url.to_string(),
        cache_path: controller.cache().path().display().to_string(),
        connectivity: controller.probe(),
        cached_tasks: controller.cache().get_all().len(),
    }
}
