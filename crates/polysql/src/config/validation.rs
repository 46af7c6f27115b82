//! Configuration validation.

use super::Config;
use crate::core::split_scheme;
use crate::error::{Result, SqlError};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    for (name, profile) in &config.connections {
        if name.trim().is_empty() {
            return Err(SqlError::Config(
                "connection profile names cannot be empty".into(),
            ));
        }
        if profile.url.trim().is_empty() {
            return Err(SqlError::Config(format!(
                "connections.{}.url is required",
                name
            )));
        }
        if split_scheme(&profile.url).is_none() {
            return Err(SqlError::Config(format!(
                "connections.{}.url must start with a scheme such as 'sqlite:' or 'postgresql:', got '{}'",
                name, profile.url
            )));
        }
    }

    if let Some(default) = &config.default_connection {
        if !config.connections.contains_key(default) {
            return Err(SqlError::Config(format!(
                "default_connection '{}' is not a configured connection",
                default
            )));
        }
    }

    if config.output.separator.is_empty() {
        return Err(SqlError::Config("output.separator cannot be empty".into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionConfig, OutputConfig};
    use std::collections::BTreeMap;

    fn valid_config() -> Config {
        let mut connections = BTreeMap::new();
        connections.insert(
            "local".to_string(),
            ConnectionConfig {
                url: "sqlite::memory:".to_string(),
                init: Vec::new(),
                description: None,
            },
        );
        Config {
            default_connection: Some("local".to_string()),
            connections,
            output: OutputConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_url() {
        let mut config = valid_config();
        config.connections.get_mut("local").unwrap().url = String::new();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("connections.local.url is required"));
    }

    #[test]
    fn test_url_without_scheme() {
        let mut config = valid_config();
        config.connections.get_mut("local").unwrap().url = "/tmp/data.db".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unknown_default_connection() {
        let mut config = valid_config();
        config.default_connection = Some("warehouse".to_string());
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("'warehouse'"));
    }

    #[test]
    fn test_empty_separator() {
        let mut config = valid_config();
        config.output.separator = String::new();
        assert!(validate(&config).is_err());
    }
}
