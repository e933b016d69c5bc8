//! Configuration module for the body filter
//!
//! Configuration is loaded from Envoy plugin configuration,
//! not from external files. This avoids file I/O in the Wasm sandbox.

use serde::Deserialize;

/// Filter configuration loaded from Envoy plugin configuration
#[derive(Clone, Debug, Deserialize)]
pub struct FilterConfig {
    /// Patterns that block the transaction when seen in a body
    #[serde(default = "default_blocked_patterns")]
    pub blocked_patterns: Vec<String>,

    /// Buffer and inspect request bodies
    #[serde(default = "default_inspect")]
    pub inspect_request_body: bool,

    /// Buffer and inspect response bodies
    #[serde(default = "default_inspect")]
    pub inspect_response_body: bool,

    /// Body bytes per direction after which inspection is skipped
    #[serde(default = "default_max_body_size")]
    pub max_body_size: u64,

    /// Log a hex dump of buffered chunks after every inspection pass
    #[serde(default)]
    pub dump_bodies: bool,

    /// Whether to log matched patterns
    #[serde(default = "default_log_matches")]
    pub log_matches: bool,
}

fn default_blocked_patterns() -> Vec<String> {
    vec![
        "union select".to_string(),
        "/etc/passwd".to_string(),
        "<script".to_string(),
        "cmd.exe".to_string(),
        "../../".to_string(),
    ]
}

fn default_inspect() -> bool {
    true
}

fn default_max_body_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_log_matches() -> bool {
    true
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            blocked_patterns: default_blocked_patterns(),
            inspect_request_body: default_inspect(),
            inspect_response_body: default_inspect(),
            max_body_size: default_max_body_size(),
            dump_bodies: false,
            log_matches: default_log_matches(),
        }
    }
}

impl FilterConfig {
    /// Parse configuration from JSON bytes (from Envoy plugin configuration)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config_str =
            std::str::from_utf8(bytes).map_err(|e| ConfigError::InvalidUtf8(e.to_string()))?;

        serde_json::from_str(config_str).map_err(|e| ConfigError::InvalidJson(e.to_string()))
    }
}

/// Configuration parsing errors
#[derive(Debug)]
pub enum ConfigError {
    InvalidUtf8(String),
    InvalidJson(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidUtf8(e) => write!(f, "Invalid UTF-8: {}", e),
            ConfigError::InvalidJson(e) => write!(f, "Invalid JSON: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FilterConfig::default();
        assert!(!config.blocked_patterns.is_empty());
        assert!(config.inspect_request_body);
        assert!(config.inspect_response_body);
        assert!(!config.dump_bodies);
        assert!(config.max_body_size > 0);
    }

    #[test]
    fn test_parse_config() {
        let json = r#"{"blocked_patterns": ["test"], "max_body_size": 1024, "dump_bodies": true}"#;
        let config = FilterConfig::from_bytes(json.as_bytes()).unwrap();
        assert_eq!(config.blocked_patterns, vec!["test"]);
        assert_eq!(config.max_body_size, 1024);
        assert!(config.dump_bodies);
        // unspecified fields keep their defaults
        assert!(config.inspect_response_body);
        assert!(config.log_matches);
    }

    #[test]
    fn test_invalid_utf8() {
        let err = FilterConfig::from_bytes(&[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUtf8(_)));
    }

    #[test]
    fn test_invalid_json() {
        let err = FilterConfig::from_bytes(b"{not json").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJson(_)));
        assert!(err.to_string().starts_with("Invalid JSON"));
    }
}
