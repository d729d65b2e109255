//! CLI argument definitions for Tasklist.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::client::Filter;
use crate::config::Environment;

/// Tasklist - a small to-do list with an offline-tolerant client.
///
/// Run `tasklist serve` to start the service, then use the other commands
/// from any terminal. When the service cannot be reached, changes go to a
/// local cache file instead.
#[derive(Parser, Debug)]
#[command(name = "tasklist")]
#[command(author, version, about = "A to-do list service and its offline-tolerant client", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Base URL of the task service (e.g. http://127.0.0.1:3000)
    #[arg(long, global = true, env = "TASKLIST_API_URL")]
    pub api_url: Option<String>,

    /// Local cache file used when the service is unreachable
    #[arg(long = "cache", global = true, env = "TASKLIST_CACHE")]
    pub cache_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the task service (REST API plus static files)
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "TASKLIST_PORT")]
        port: Option<u16>,

        /// Address to bind
        #[arg(long, env = "TASKLIST_HOST")]
        host: Option<String>,

        /// SQLite database file
        #[arg(long, env = "TASKLIST_DATABASE")]
        database: Option<PathBuf>,

        /// development or production
        #[arg(long = "env", env = "TASKLIST_ENV")]
        environment: Option<Environment>,

        /// Directory of static files to serve at /
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// List tasks, newest first
    List {
        /// Which tasks to show
        #[arg(short, long, value_enum, default_value_t = Filter::All)]
        filter: Filter,
    },

    /// Add a task
    Add {
        /// Task text
        text: String,
    },

    /// Mark a task completed
    Done {
        /// Task ID
        id: String,
    },

    /// Mark a task pending again
    Undo {
        /// Task ID
        id: String,
    },

    /// Change the text of a task
    Edit {
        /// Task ID
        id: String,

        /// New text
        text: String,
    },

    /// Delete a task
    Rm {
        /// Task ID
        id: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete all completed tasks
    Clear {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show service reachability and local cache location
    Status,
}
