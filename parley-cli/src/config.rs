//! # Environment-Based Configuration
//!
//! Settings for `parley serve` come from the environment first and are then
//! overridden by command-line flags.
//!
//! ## Environment Variables
//!
//! - `PARLEY_HOST` - Interface to bind (default: 0.0.0.0)
//! - `PARLEY_PORT` - Port to bind (default: the agent kind's well-known port)
//! - `PARLEY_REQUEST_TIMEOUT_SECS` - Timeout for calls to peers (default: 10, max: 300)
//! - `PARLEY_PEERS` - Comma-separated peer base URLs for the orchestrator
//! - `PARLEY_LOG_FORMAT` - `json` (default) or `pretty`

use parley_agents::AgentKind;
use std::{env, fmt, str::FromStr, time::Duration};

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{other}', expected json or pretty")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
        })
    }
}

/// Validated settings for one agent process
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub kind: AgentKind,
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub peers: Vec<String>,
    pub log_format: LogFormat,
}

impl AgentConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// URL advertised on the agent card
    pub fn public_url(&self) -> String {
        let host = match self.host.as_str() {
            "0.0.0.0" | "::" | "[::]" => "localhost",
            other => other,
        };
        format!("http://{host}:{}", self.port)
    }
}

/// Builder for `AgentConfig` with environment variable support
#[derive(Debug, Clone)]
pub struct AgentConfigBuilder {
    host: String,
    port: Option<u16>,
    request_timeout_secs: u64,
    peers: Vec<String>,
    log_format: LogFormat,
}

impl Default for AgentConfigBuilder {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: None,
            request_timeout_secs: 10,
            peers: Vec::new(),
            log_format: LogFormat::Json,
        }
    }
}

impl AgentConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::default();

        if let Some(host) = lookup("PARLEY_HOST") {
            builder = builder.host(host);
        }
        if let Some(port) = parse_var::<u16, _>(&lookup, "PARLEY_PORT")? {
            builder = builder.port(port);
        }
        if let Some(timeout) = parse_var::<u64, _>(&lookup, "PARLEY_REQUEST_TIMEOUT_SECS")? {
            builder = builder.request_timeout_secs(timeout);
        }
        if let Some(peers) = lookup("PARLEY_PEERS") {
            builder = builder.peers(
                peers
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from),
            );
        }
        if let Some(format) = lookup("PARLEY_LOG_FORMAT") {
            let format = format
                .parse::<LogFormat>()
                .map_err(|message| ConfigError::InvalidEnvVar {
                    key: "PARLEY_LOG_FORMAT".to_string(),
                    message,
                })?;
            builder = builder.log_format(format);
        }

        Ok(builder)
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn request_timeout_secs(mut self, timeout: u64) -> Self {
        self.request_timeout_secs = timeout;
        self
    }

    /// Replace the peer list
    pub fn peers<I, S>(mut self, peers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.peers = peers.into_iter().map(Into::into).collect();
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    pub fn current_log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Timeout for one-shot client commands, checked against the same bounds
    /// as `build`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the timeout is out of range.
    pub fn client_timeout(&self) -> Result<Duration, ConfigError> {
        self.validate_timeout()?;
        Ok(Duration::from_secs(self.request_timeout_secs))
    }

    /// Validate and build the settings for `kind`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the configuration is invalid.
    pub fn build(self, kind: AgentKind) -> Result<AgentConfig, ConfigError> {
        self.validate(kind)?;

        Ok(AgentConfig {
            kind,
            host: self.host,
            port: self.port.unwrap_or_else(|| kind.default_port()),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            peers: self.peers,
            log_format: self.log_format,
        })
    }

    fn validate(&self, kind: AgentKind) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "host cannot be empty".to_string(),
            ));
        }
        self.validate_timeout()?;
        if !self.peers.is_empty() && kind != AgentKind::Orchestrator {
            return Err(ConfigError::ValidationError(format!(
                "only the orchestrator accepts peers, not the {kind}"
            )));
        }
        for peer in &self.peers {
            url::Url::parse(peer).map_err(|e| {
                ConfigError::ValidationError(format!("invalid peer url '{peer}': {e}"))
            })?;
        }
        Ok(())
    }

    fn validate_timeout(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout_secs > 300 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be <= 300 (5 minutes)".to_string(),
            ));
        }
        Ok(())
    }
}

// Environment variable helper

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid value '{val}': {e}"),
            }),
        None => Ok(None),
    }
}
