//! KDL schema for `config.kdl`.
//!
//! ```kdl
//! port 3000
//! host "127.0.0.1"
//! database "/var/lib/tasklist/todos.db"
//! environment "production"   // or "development"
//! cors-origin "https://example.app"
//! cors-origin "http://localhost:5500"
//! static-dir "./web"
//! health-interval-secs 30
//! api-url "http://localhost:3000"
//! cache-path "/home/me/.local/share/tasklist/local-storage.json"
//! ```
//!
//! Unknown nodes are ignored. Values of the wrong type are ignored too,
//! except where [`TasklistConfig::validate`] says otherwise.

use kdl::KdlDocument;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Deployment mode of the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    /// Permissive CORS, `/api/init-db` enabled
    #[default]
    Development,
    /// CORS allow-list only
    Production,
}

impl Environment {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Environment::parse(s).ok_or_else(|| format!("unknown environment: {}", s))
    }
}

/// Settings read from `config.kdl`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TasklistConfig {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub database: Option<PathBuf>,
    pub environment: Option<Environment>,
    /// Allowed origins in production (one `cors-origin` node each)
    pub cors_origins: Vec<String>,
    pub static_dir: Option<PathBuf>,
    pub health_interval_secs: Option<u64>,
    pub api_url: Option<String>,
    pub cache_path: Option<PathBuf>,
}

fn first_string(doc: &KdlDocument, name: &str) -> Option<String> {
    let node = doc.get(name)?;
    let entry = node.entries().first()?;
    entry.value().as_string().map(|s| s.to_string())
}

fn first_integer(doc: &KdlDocument, name: &str) -> Option<i128> {
    let node = doc.get(name)?;
    let entry = node.entries().first()?;
    entry.value().as_integer()
}

impl TasklistConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from KDL text.
    pub fn parse(text: &str) -> Result<Self> {
        let doc: KdlDocument = text
            .parse()
            .map_err(|e| Error::Config(format!("invalid config.kdl: {}", e)))?;
        let config = Self::from_kdl(&doc);
        config.validate().map_err(Error::Config)?;
        Ok(config)
    }

    /// Read config from a file. A missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse config from a KDL document.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(port) = first_integer(doc, "port") {
            config.port = u16::try_from(port).ok();
        }
        config.host = first_string(doc, "host");
        config.database = first_string(doc, "database").map(PathBuf::from);
        config.environment = first_string(doc, "environment").and_then(|s| Environment::parse(&s));

        config.cors_origins = doc
            .nodes()
            .iter()
            .filter(|node| node.name().value() == "cors-origin")
            .filter_map(|node| node.entries().first())
            .filter_map(|entry| entry.value().as_string())
            .map(|s| s.to_string())
            .collect();

        config.static_dir = first_string(doc, "static-dir").map(PathBuf::from);
        if let Some(secs) = first_integer(doc, "health-interval-secs") {
            config.health_interval_secs = u64::try_from(secs).ok();
        }
        config.api_url = first_string(doc, "api-url");
        config.cache_path = first_string(doc, "cache-path").map(PathBuf::from);

        config
    }

    /// Validate the config values.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.port == Some(0) {
            return Err("port must be between 1 and 65535".to_string());
        }
        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("api-url must be an http(s) URL, got {}", url));
            }
        }
        Ok(())
    }
}
