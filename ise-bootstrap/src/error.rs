// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for the ISE bootstrap controller

use thiserror::Error;

/// Result type alias for bootstrap operations
pub type Result<T> = std::result::Result<T, BootstrapError>;

/// Errors that can occur while bootstrapping a deployment
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Tool configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid tool configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A required setting is absent from the settings store
    #[error("Setting '{key}' is missing from the settings store")]
    ConfigMissing { key: String },

    /// Settings are present but disagree with each other
    #[error("Inconsistent cluster settings: {message}")]
    ConfigInconsistent { message: String },

    /// A node could not be reached or answered with a non-200 status
    #[error("Node {ip} is unreachable: {message}")]
    NodeUnreachable { ip: String, message: String },

    /// A node answered 200 but the payload could not be interpreted
    #[error("Malformed response from {ip}: {message}")]
    MalformedResponse { ip: String, message: String },

    /// A deployment mutation was rejected
    #[error("{operation} failed with status {status}: {body}")]
    MutationFailed {
        operation: String,
        status: u16,
        body: String,
    },

    /// IO error wrapper
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Transport error from the HTTP client
    #[error("HTTP transport error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_failed_carries_body() {
        let err = BootstrapError::MutationFailed {
            operation: "register-psn".to_string(),
            status: 400,
            body: "{\"message\":\"node already registered\"}".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("register-psn"));
        assert!(text.contains("400"));
        assert!(text.contains("already registered"));
    }

    #[test]
    fn test_missing_setting_names_key() {
        let err = BootstrapError::ConfigMissing {
            key: "primary_ip".to_string(),
        };
        assert!(err.to_string().contains("'primary_ip'"));
    }
}
