use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Login details for one account used by the online tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    /// Role submitted on registration. Accounts that are only logged into
    /// (the seeded admin) leave this empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            role: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// How the harness decides the service is up before the online tier runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Route probed, relative to the API root.
    pub probe_path: String,
    /// Any of these statuses counts as "answering". 401 is expected from a
    /// protected endpoint probed without credentials.
    pub accepted_statuses: Vec<u16>,
    pub max_attempts: u32,
    pub interval_ms: u64,
    pub probe_timeout_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            probe_path: "/projects".to_string(),
            accepted_statuses: vec![200, 401],
            max_attempts: 30,
            interval_ms: 1_000,
            probe_timeout_ms: 2_000,
        }
    }
}

impl ReadinessConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Upper bound on time spent polling, ignoring probe latency.
    pub fn max_wait(&self) -> Duration {
        self.interval() * self.max_attempts
    }
}

/// A service process the harness starts itself and tears down afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// File receiving the server's stdout and stderr. Output is discarded
    /// when unset.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Time allowed between SIGTERM and SIGKILL.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_shutdown_grace_ms() -> u64 {
    5_000
}

impl ServerConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
            log_file: None,
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace_ms = grace.as_millis() as u64;
        self
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Service root, without the `/api` suffix.
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub readiness: ReadinessConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,
    /// Account registered (or reused) for authenticated scenarios.
    pub test_user: Credentials,
    /// Account registered by the registration scenario.
    pub integration_user: Credentials,
    /// Pre-seeded administrator.
    pub admin: Credentials,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout_ms: 10_000,
            readiness: ReadinessConfig::default(),
            server: None,
            test_user: Credentials::new("test@example.com", "test123").with_role("engineer"),
            integration_user: Credentials::new("integration_test@example.com", "test123")
                .with_role("engineer"),
            admin: Credentials::new("admin@example.com", "admin123"),
            report_path: None,
        }
    }
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_readiness(mut self, readiness: ReadinessConfig) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn with_server(mut self, server: ServerConfig) -> Self {
        self.server = Some(server);
        self
    }

    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Base URL of the API routes: `<base_url>/api`.
    pub fn api_base(&self) -> String {
        format!("{}/api", self.base_url.trim_end_matches('/'))
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |message: &str| {
            Err(ConfigError::Invalid {
                message: message.to_string(),
            })
        };

        if self.base_url.is_empty() {
            return invalid("Base URL cannot be empty");
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return invalid("Base URL must start with http:// or https://");
        }

        if self.request_timeout_ms == 0 {
            return invalid("Request timeout must be greater than 0");
        }

        if self.readiness.max_attempts == 0 {
            return invalid("Readiness max_attempts must be greater than 0");
        }

        if self.readiness.accepted_statuses.is_empty() {
            return invalid("Readiness accepted_statuses cannot be empty");
        }

        if !self.readiness.probe_path.starts_with('/') {
            return invalid("Readiness probe_path must start with '/'");
        }

        if let Some(server) = &self.server {
            if server.command.trim().is_empty() {
                return invalid("Server command cannot be empty");
            }
        }

        Ok(())
    }
}
