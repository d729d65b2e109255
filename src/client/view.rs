//! What the client shows: a filtered, ordered task list plus counters.

use serde::Serialize;

use crate::models::{Task, sort_newest_first};

/// Which tasks are visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Active => "active",
            Filter::Completed => "completed",
        }
    }
}

/// Where the data behind a view came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Service,
    Cache,
}

/// Rendered state of the task list.
///
/// Counters always describe the full list, not the filtered one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub filter: Filter,
    pub tasks: Vec<Task>,
    pub pending: usize,
    pub completed: usize,
    pub total: usize,
    pub has_completed: bool,
}

impl View {
    pub fn build(mut all: Vec<Task>, filter: Filter) -> Self {
        sort_newest_first(&mut all);
        let total = all.len();
        let completed = all.iter().filter(|t| t.completed).count();
        let tasks = all.into_iter().filter(|t| filter.matches(t)).collect();
        Self {
            filter,
            tasks,
            pending: total - completed,
            completed,
            total,
            has_completed: completed > 0,
        }
    }

    /// "1 task pending" / "3 tasks pending"
    pub fn pending_label(&self) -> String {
        let noun = if self.pending == 1 { "task" } else { "tasks" };
        format!("{} {} pending", self.pending, noun)
    }
}
