//! Configuration for Tasklist.
//!
//! ## config.kdl
//!
//! Located at:
//! - `$TASKLIST_CONFIG_DIR/config.kdl` when the variable is set
//! - `~/.config/tasklist/config.kdl` otherwise
//!
//! Contains server settings (`port`, `host`, `database`, `environment`,
//! `cors-origin`, `static-dir`, `health-interval-secs`) and client
//! settings (`api-url`, `cache-path`). See [`schema`] for the format.
//!
//! ## Precedence
//!
//! CLI flag (or its `TASKLIST_*` env var) > config.kdl > defaults.
//! Use the [`resolver`] module for resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ClientOverrides, ClientSettings, DEFAULT_HOST, DEFAULT_PORT, Resolved, ServerOverrides,
    ServerSettings, ValueSource, config_path, load_config, resolve_client, resolve_server,
};
pub use schema::{Environment, TasklistConfig};
