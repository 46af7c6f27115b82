//! Configuration type definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Profile used when none is named explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_connection: Option<String>,

    /// Named connection profiles.
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionConfig>,

    /// Result rendering options.
    #[serde(default)]
    pub output: OutputConfig,
}

/// One named connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Scheme-prefixed connection URL (e.g. "sqlite:./data.db").
    pub url: String,

    /// Statements executed right after connecting, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init: Vec<String>,

    /// Free-form note about the profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// How query results are printed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Text printed for NULL cells (default: "NULL").
    #[serde(default = "default_null_text")]
    pub null_text: String,

    /// Output format (default: text).
    #[serde(default)]
    pub format: OutputFormat,

    /// Column separator for text output (default: " | ").
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            null_text: default_null_text(),
            format: OutputFormat::default(),
            separator: default_separator(),
        }
    }
}

/// Result output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Header line plus one separated line per row.
    #[default]
    Text,

    /// One JSON object per row.
    Json,
}

fn default_null_text() -> String {
    "NULL".to_string()
}

fn default_separator() -> String {
    " | ".to_string()
}
