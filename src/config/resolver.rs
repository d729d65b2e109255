//! Precedence resolution for server and client settings.
//!
//! Precedence (highest to lowest):
//! 1. CLI flags (clap also fills these from `TASKLIST_*` environment variables)
//! 2. `config.kdl`
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use crate::Result;
use crate::config::{Environment, TasklistConfig};
use crate::storage;

/// Default port for `tasklist serve`.
pub const DEFAULT_PORT: u16 = 3000;

/// Default bind address.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default interval between background store probes.
pub const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 30;

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag or its environment variable
    CliFlag,
    /// Value from config.kdl
    ConfigFile,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::ConfigFile => write!(f, "config"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

fn pick<T>(flag: Option<T>, file: Option<T>, default: impl FnOnce() -> Result<T>) -> Result<Resolved<T>> {
    if let Some(value) = flag {
        Ok(Resolved::new(value, ValueSource::CliFlag))
    } else if let Some(value) = file {
        Ok(Resolved::new(value, ValueSource::ConfigFile))
    } else {
        Ok(Resolved::new(default()?, ValueSource::Default))
    }
}

/// Values given on the command line for `tasklist serve`.
#[derive(Debug, Clone, Default)]
pub struct ServerOverrides {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub database: Option<PathBuf>,
    pub environment: Option<Environment>,
    pub static_dir: Option<PathBuf>,
}

/// Fully resolved server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub port: Resolved<u16>,
    pub host: Resolved<String>,
    pub database: Resolved<PathBuf>,
    pub environment: Resolved<Environment>,
    pub cors_origins: Vec<String>,
    pub static_dir: Option<PathBuf>,
    /// `None` disables the background probe
    pub health_interval: Option<Duration>,
}

impl ServerSettings {
    pub fn environment(&self) -> Environment {
        self.environment.value
    }

    /// Settings for tests and embedding: in-process defaults around `database`.
    pub fn for_database(database: PathBuf) -> Self {
        Self {
            port: Resolved::new(DEFAULT_PORT, ValueSource::Default),
            host: Resolved::new(DEFAULT_HOST.to_string(), ValueSource::Default),
            database: Resolved::new(database, ValueSource::CliFlag),
            environment: Resolved::new(Environment::Development, ValueSource::Default),
            cors_origins: Vec::new(),
            static_dir: None,
            health_interval: None,
        }
    }
}

/// Resolve server settings from flags and the config file.
pub fn resolve_server(config: &TasklistConfig, overrides: &ServerOverrides) -> Result<ServerSettings> {
    let port = pick(overrides.port, config.port, || Ok(DEFAULT_PORT))?;
    let host = pick(overrides.host.clone(), config.host.clone(), || {
        Ok(DEFAULT_HOST.to_string())
    })?;
    let database = pick(
        overrides.database.clone(),
        config.database.clone(),
        storage::default_database_path,
    )?;
    let environment = pick(overrides.environment, config.environment, || {
        Ok(Environment::default())
    })?;

    let secs = config
        .health_interval_secs
        .unwrap_or(DEFAULT_HEALTH_INTERVAL_SECS);
    let health_interval = (secs > 0).then(|| Duration::from_secs(secs));

    Ok(ServerSettings {
        port,
        host,
        database,
        environment,
        cors_origins: config.cors_origins.clone(),
        static_dir: overrides
            .static_dir
            .clone()
            .or_else(|| config.static_dir.clone()),
        health_interval,
    })
}

/// Values given on the command line for client commands.
#[derive(Debug, Clone, Default)]
pub struct ClientOverrides {
    pub api_url: Option<String>,
    pub cache_path: Option<PathBuf>,
}

/// Fully resolved client settings.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_url: Resolved<String>,
    pub cache_path: Resolved<PathBuf>,
}

/// Resolve client settings from flags and the config file.
pub fn resolve_client(config: &TasklistConfig, overrides: &ClientOverrides) -> Result<ClientSettings> {
    let api_url = pick(overrides.api_url.clone(), config.api_url.clone(), || {
        Ok(format!("http://{}:{}", DEFAULT_HOST, DEFAULT_PORT))
    })?;
    let cache_path = pick(
        overrides.cache_path.clone(),
        config.cache_path.clone(),
        || Ok(storage::data_dir()?.join("local-storage.json")),
    )?;

    Ok(ClientSettings {
        api_url: Resolved::new(
            api_url.value.trim_end_matches('/').to_string(),
            api_url.source,
        ),
        cache_path,
    })
}

/// Location of `config.kdl`.
///
/// `TASKLIST_CONFIG_DIR` overrides the platform config directory.
pub fn config_path() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TASKLIST_CONFIG_DIR") {
        return Ok(PathBuf::from(dir).join("config.kdl"));
    }
    let base = dirs::config_dir().ok_or_else(|| {
        crate::Error::Other("Could not determine config directory".to_string())
    })?;
    Ok(base.join("tasklist").join("config.kdl"))
}

/// Load `config.kdl` from its standard location.
pub fn load_config() -> Result<TasklistConfig> {
    TasklistConfig::load(&config_path()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_value_source_display() {
        assert_eq!(format!("{}", ValueSource::CliFlag), "cli");
        assert_eq!(format!("{}", ValueSource::ConfigFile), "config");
        assert_eq!(format!("{}", ValueSource::Default), "default");
    }

    #[test]
    fn test_resolve_server_defaults() {
        let config = TasklistConfig::new();
        let overrides = ServerOverrides {
            database: Some(PathBuf::from("/tmp/x.db")),
            ..Default::default()
        };
        let settings = resolve_server(&config, &overrides).unwrap();

        assert_eq!(settings.port.value, DEFAULT_PORT);
        assert_eq!(settings.port.source, ValueSource::Default);
        assert_eq!(settings.host.value, DEFAULT_HOST);
        assert_eq!(settings.database.source, ValueSource::CliFlag);
        assert_eq!(settings.environment(), Environment::Development);
        assert_eq!(
            settings.health_interval,
            Some(Duration::from_secs(DEFAULT_HEALTH_INTERVAL_SECS))
        );
    }

    #[test]
    fn test_resolve_server_cli_overrides_file() {
        let config = TasklistConfig {
            port: Some(8080),
            host: Some("0.0.0.0".into()),
            database: Some(PathBuf::from("/from/file.db")),
            ..Default::default()
        };
        let overrides = ServerOverrides {
            port: Some(9090),
            ..Default::default()
        };
        let settings = resolve_server(&config, &overrides).unwrap();

        assert_eq!(settings.port.value, 9090);
        assert_eq!(settings.port.source, ValueSource::CliFlag);
        assert_eq!(settings.host.value, "0.0.0.0");
        assert_eq!(settings.host.source, ValueSource::ConfigFile);
        assert_eq!(settings.database.value, PathBuf::from("/from/file.db"));
    }

    #[test]
    fn test_zero_health_interval_disables_probe() {
        let config = TasklistConfig {
            health_interval_secs: Some(0),
            database: Some(PathBuf::from("/tmp/x.db")),
            ..Default::default()
        };
        let settings = resolve_server(&config, &ServerOverrides::default()).unwrap();
        assert_eq!(settings.health_interval, None);
    }

    #[test]
    fn test_resolve_client_strips_trailing_slash() {
        let config = TasklistConfig {
            api_url: Some("http://example.test:1234/".into()),
            cache_path: Some(PathBuf::from("/tmp/cache.json")),
            ..Default::default()
        };
        let settings = resolve_client(&config, &ClientOverrides::default()).unwrap();
        assert_eq!(settings.api_url.value, "http://example.test:1234");
        assert_eq!(settings.api_url.source, ValueSource::ConfigFile);
        assert_eq!(settings.cache_path.value, PathBuf::from("/tmp/cache.json"));
    }

    #[test]
    #[serial]
    fn test_resolve_client_default_cache_uses_data_dir_env() {
        let dir = tempfile::TempDir::new().unwrap();
        // SAFETY: serialized with the other env-mutating tests.
        unsafe { std::env::set_var("TASKLIST_DATA_DIR", dir.path()) };

        let settings =
            resolve_client(&TasklistConfig::new(), &ClientOverrides::default()).unwrap();

        unsafe { std::env::remove_var("TASKLIST_DATA_DIR") };

        assert_eq!(settings.api_url.value, "http://127.0.0.1:3000");
        assert_eq!(
            settings.cache_path.value,
            dir.path().join("local-storage.json")
        );
        assert_eq!(settings.cache_path.source, ValueSource::Default);
    }

    #[test]
    #[serial]
    fn test_config_path_honors_env() {
        let dir = tempfile::TempDir::new().unwrap();
        // SAFETY: serialized with the other env-mutating tests.
        unsafe { std::env::set_var("TASKLIST_CONFIG_DIR", dir.path()) };
        std::fs::write(dir.path().join("config.kdl"), "port 4321").unwrap();

        let path = config_path().unwrap();
        let config = load_config().unwrap();

        unsafe { std::env::remove_var("TASKLIST_CONFIG_DIR") };

        assert_eq!(path, dir.path().join("config.kdl"));
        assert_eq!(config.port, Some(4321));
    }
}
