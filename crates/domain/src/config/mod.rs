mod backend;
mod call;
mod observability;
mod server;
mod sessions;

pub use backend::*;
pub use call::*;
pub use observability::*;
pub use server::*;
pub use sessions::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Environment variables that override values from the config file.
pub const ENV_DOMAIN: &str = "DM_DOMAIN";
pub const ENV_API_KEY: &str = "DM_API_KEY";
pub const ENV_VERSION_ID: &str = "DM_VERSION_ID";
pub const ENV_PROJECT_ID: &str = "DM_PROJECT_ID";
pub const ENV_FORWARDING_NUMBER: &str = "FORWARDING_PHONE_NUMBER";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub call: CallConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Overlay deployment settings from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Overlay deployment settings using `lookup` to read variables.
    ///
    /// Unset and empty variables leave the file value untouched.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = read(ENV_DOMAIN) {
            self.backend.domain = Some(v);
        }
        if let Some(v) = read(ENV_API_KEY) {
            self.backend.api_key = Some(v);
        }
        if let Some(v) = read(ENV_VERSION_ID) {
            self.backend.version_id = Some(v);
        }
        if let Some(v) = read(ENV_PROJECT_ID) {
            self.backend.project_id = Some(v);
        }
        if let Some(v) = read(ENV_FORWARDING_NUMBER) {
            self.call.forwarding_number = Some(v);
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: &str, message: &str) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: &str) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

fn is_blank(v: &Option<String>) -> bool {
    v.as_deref().map_or(true, |s| s.trim().is_empty())
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error(
                "server.port",
                "port must be greater than 0",
            ));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }

        if is_blank(&self.backend.api_key) {
            errors.push(ConfigError::error(
                "backend.api_key",
                &format!("API key is required (set it in the file or via {ENV_API_KEY})"),
            ));
        }
        if is_blank(&self.backend.version_id) {
            errors.push(ConfigError::error(
                "backend.version_id",
                &format!("version id is required (set it in the file or via {ENV_VERSION_ID})"),
            ));
        }
        if is_blank(&self.backend.project_id) {
            errors.push(ConfigError::warning(
                "backend.project_id",
                "no project id; archived transcripts will not be attributed to a project",
            ));
        }

        if is_blank(&self.call.forwarding_number) {
            errors.push(ConfigError::warning(
                "call.forwarding_number",
                &format!("no transfer destination configured ({ENV_FORWARDING_NUMBER})"),
            ));
        }

        if self.sessions.max_entries == 0 {
            errors.push(ConfigError::error(
                "sessions.max_entries",
                "max_entries must be greater than 0",
            ));
        }

        errors
    }
}
