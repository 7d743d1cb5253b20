use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::ConfigError;

/// Which jobs this node executes.
///
/// Read once at startup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Comma-separated job names, e.g. `"billing, reports"`.
    pub execute_list: String,
    /// Execute every registered job and ignore `execute_list`.
    pub execute_all: bool,
}

impl ExecutionConfig {
    pub fn new(execute_list: impl Into<String>, execute_all: bool) -> Self {
        Self {
            execute_list: execute_list.into(),
            execute_all,
        }
    }

    /// Execute every registered job.
    pub fn all() -> Self {
        Self::new("", true)
    }

    /// The configured job names, trimmed, without empty segments.
    pub fn candidates(&self) -> BTreeSet<String> {
        self.execute_list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Connection settings for the coordination service.
///
/// Consumed by whatever constructs the
/// [`CoordinationClient`](crate::CoordinationClient) and scheduler backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Comma-separated `host:port` list.
    pub server_lists: String,
    /// Root node all job state lives under.
    pub namespace: String,
    /// Initial retry backoff in milliseconds.
    pub base_sleep_time_ms: u64,
    /// Upper bound for the retry backoff in milliseconds.
    pub max_sleep_time_ms: u64,
    pub max_retries: u32,
    /// Session timeout in milliseconds (0 = client default).
    pub session_timeout_ms: u64,
    /// Connection timeout in milliseconds (0 = client default).
    pub connection_timeout_ms: u64,
    /// `user:password` digest for authenticated access.
    pub digest: Option<String>,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            server_lists: "localhost:2181".to_string(),
            namespace: "jobwire".to_string(),
            base_sleep_time_ms: 1000,
            max_sleep_time_ms: 3000,
            max_retries: 3,
            session_timeout_ms: 0,
            connection_timeout_ms: 0,
            digest: None,
        }
    }
}

impl CoordinationConfig {
    pub fn new(server_lists: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            server_lists: server_lists.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    pub fn with_retries(
        mut self,
        max_retries: u32,
        base_sleep_time_ms: u64,
        max_sleep_time_ms: u64,
    ) -> Self {
        self.max_retries = max_retries;
        self.base_sleep_time_ms = base_sleep_time_ms;
        self.max_sleep_time_ms = max_sleep_time_ms;
        self
    }

    /// Servers split out of `server_lists`.
    pub fn servers(&self) -> Vec<&str> {
        self.server_lists
            .split(',')
            .map(str::trim)
            .filter(|server| !server.is_empty())
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers().is_empty() {
            return Err(ConfigError::Invalid(
                "coordination.server_lists must name at least one server".to_string(),
            ));
        }
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "coordination.namespace must not be empty".to_string(),
            ));
        }
        if self.base_sleep_time_ms > self.max_sleep_time_ms {
            return Err(ConfigError::Invalid(format!(
                "coordination.base_sleep_time_ms ({}) exceeds max_sleep_time_ms ({})",
                self.base_sleep_time_ms, self.max_sleep_time_ms
            )));
        }
        Ok(())
    }
}

/// Top-level configuration document.
///
/// ```toml
/// [execution]
/// execute_list = "billing,reports"
/// execute_all = false
///
/// [coordination]
/// server_lists = "zk1:2181,zk2:2181"
/// namespace = "payments"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobwireConfig {
    pub execution: ExecutionConfig,
    pub coordination: CoordinationConfig,
}

impl JobwireConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.coordination.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}
