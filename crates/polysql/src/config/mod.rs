//! Connection profile loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::{Result, SqlError};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Resolve a profile by name, or the default profile when `name` is `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<&ConnectionConfig> {
        let name = match name.or(self.default_connection.as_deref()) {
            Some(name) => name,
            None => {
                return Err(SqlError::Config(
                    "no connection named and no default_connection configured".into(),
                ))
            }
        };
        self.connections
            .get(name)
            .ok_or_else(|| SqlError::NotFound(format!("connection profile '{}'", name)))
    }

    /// Serialize back to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
