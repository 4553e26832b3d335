// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration management for the bootstrap controller
//!
//! This is the tool's own configuration (transport, timing, logging). The
//! cluster description itself lives in the settings store, see
//! [`crate::settings`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{BootstrapError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Controller instance name
    pub name: String,

    /// Version of the configuration format
    #[serde(default = "default_version")]
    pub version: String,

    /// Path to the settings store file
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,

    /// HTTP transport configuration
    #[serde(default)]
    pub transport: TransportConfig,

    /// Orchestration timing and layout
    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    /// Health-gated trigger configuration
    #[serde(default)]
    pub trigger: TriggerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP transport configuration for the node management API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// URL scheme used to reach node management endpoints
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Accept self-signed node certificates
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,
}

/// Orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// Wall-clock budget between issuing primary promotion and any dependent call
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: u64,

    /// Index of the first usable admin-pair role/service entry
    #[serde(default = "default_secondary_offset")]
    pub secondary_assignment_offset: usize,

    /// Execution-time ceiling imposed by the invoking environment
    #[serde(default)]
    pub run_ceiling_secs: Option<u64>,
}

/// Health-gated trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Interval between primary health checks in watch mode
    #[serde(default = "default_trigger_interval")]
    pub interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            request_timeout_secs: default_request_timeout(),
            accept_invalid_certs: true,
        }
    }
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            settle_delay_secs: default_settle_delay(),
            secondary_assignment_offset: default_secondary_offset(),
            run_ceiling_secs: None,
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_trigger_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "ise-bootstrap".to_string(),
            version: default_version(),
            settings_file: default_settings_file(),
            transport: TransportConfig::default(),
            orchestration: OrchestrationConfig::default(),
            trigger: TriggerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TransportConfig {
    /// Per-request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl OrchestrationConfig {
    /// Settling delay as a duration
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The parsed configuration or an error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BootstrapError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(BootstrapError::InvalidConfig {
                message: "Controller name cannot be empty".to_string(),
            });
        }

        if self.transport.scheme != "https" && self.transport.scheme != "http" {
            return Err(BootstrapError::InvalidConfig {
                message: format!("Unsupported transport scheme '{}'", self.transport.scheme),
            });
        }

        if !(1..=300).contains(&self.transport.request_timeout_secs) {
            return Err(BootstrapError::InvalidConfig {
                message: format!(
                    "request_timeout_secs must be between 1 and 300, got {}",
                    self.transport.request_timeout_secs
                ),
            });
        }

        if self.trigger.interval_secs == 0 {
            return Err(BootstrapError::InvalidConfig {
                message: "trigger interval_secs must be positive".to_string(),
            });
        }

        Ok(())
    }

    /// Upper bound on one orchestration run
    ///
    /// Two admin-slot probes, the longer of the primary promotion timeout and
    /// the settling delay, and one request timeout per secondary and PSN call.
    pub fn worst_case_latency(&self, secondary_count: usize, psn_count: usize) -> Duration {
        let timeout = self.transport.request_timeout();
        let requests = 2 + secondary_count + psn_count;
        // The settle wait is measured from when the promotion is issued, so
        // the promotion call and the wait overlap.
        timeout * requests as u32 + timeout.max(self.orchestration.settle_delay())
    }

    /// Check the worst-case run latency against the configured ceiling
    pub fn check_run_ceiling(&self, secondary_count: usize, psn_count: usize) -> Result<()> {
        let Some(ceiling) = self.orchestration.run_ceiling_secs else {
            return Ok(());
        };

        let worst_case = self.worst_case_latency(secondary_count, psn_count);
        if worst_case > Duration::from_secs(ceiling) {
            return Err(BootstrapError::InvalidConfig {
                message: format!(
                    "worst-case run latency {}s exceeds the {}s execution ceiling",
                    worst_case.as_secs(),
                    ceiling
                ),
            });
        }

        Ok(())
    }
}

// Default value functions

fn default_version() -> String {
    "1.0".to_string()
}

fn default_settings_file() -> PathBuf {
    PathBuf::from("settings.toml")
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_settle_delay() -> u64 {
    100
}

fn default_secondary_offset() -> usize {
    1
}

fn default_trigger_interval() -> u64 {
    300 // 5 minutes
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}
