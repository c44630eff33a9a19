//! # Runtime Configuration Module
//!
//! Dispatch behaviour that differs between deployments: which request field
//! carries the routing path, which one carries the per-call rendering id, and
//! whether handler panics are contained.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `DYNFORM_ROUTING_FIELD` | `requestHandler` | field holding the dotted handler path |
//! | `DYNFORM_INSTANCE_FIELD` | `requestId` | field overriding a control's rendering id for one call |
//! | `DYNFORM_CATCH_PANICS` | `true` | convert handler panics into 500 responses |
//!
//! ## YAML
//!
//! ```yaml
//! routing_field: handler
//! catch_panics: false
//! ```
//!
//! Missing keys fall back to the defaults above.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::Path;

pub const DEFAULT_ROUTING_FIELD: &str = "requestHandler";
pub const DEFAULT_INSTANCE_FIELD: &str = "requestId";

/// Configuration captured by a handler tree when it is built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Request field naming the target handler as a dotted path
    pub routing_field: String,
    /// Request field carrying a caller supplied rendering id
    pub instance_field: String,
    /// Contain handler panics at the faulting node
    pub catch_panics: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            routing_field: DEFAULT_ROUTING_FIELD.to_string(),
            instance_field: DEFAULT_INSTANCE_FIELD.to_string(),
            catch_panics: true,
        }
    }
}

impl DispatchConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            routing_field: non_empty_var("DYNFORM_ROUTING_FIELD")
                .unwrap_or(defaults.routing_field),
            instance_field: non_empty_var("DYNFORM_INSTANCE_FIELD")
                .unwrap_or(defaults.instance_field),
            catch_panics: env::var("DYNFORM_CATCH_PANICS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.catch_panics),
        }
    }

    pub fn from_yaml_str(source: &str) -> Result<Self> {
        serde_yaml::from_str(source).context("Failed to parse dispatch configuration")
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dispatch configuration {}", path.display()))?;
        Self::from_yaml_str(&source)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.routing_field, "requestHandler");
        assert_eq!(config.instance_field, "requestId");
        assert!(config.catch_panics);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = DispatchConfig::from_yaml_str("routing_field: handler\n").unwrap();
        assert_eq!(config.routing_field, "handler");
        assert_eq!(config.instance_field, "requestId");
        assert!(config.catch_panics);
    }

    #[test]
    fn test_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "catch_panics: false\ninstance_field: cid").unwrap();
        let config = DispatchConfig::from_yaml_file(file.path()).unwrap();
        assert!(!config.catch_panics);
        assert_eq!(config.instance_field, "cid");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = DispatchConfig::from_yaml_file("/nonexistent/dynform.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read dispatch configuration"));
    }
}
