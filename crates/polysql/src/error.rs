//! Error types for the polysql library.

use thiserror::Error;

/// Main error type for connection, statement and value operations.
///
/// Driver failures keep the native error code (sqlite extended result code,
/// PostgreSQL SQLSTATE, MySQL server error number, ODBC native error) next to
/// the driver's message.
#[derive(Error, Debug)]
pub enum SqlError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Native connect failure
    #[error("Connection failed [{code}]: {message}")]
    Connection { code: String, message: String },

    /// Bad SQL at prepare time
    #[error("Prepare failed [{code}]: {message}")]
    Prepare { code: String, message: String },

    /// Parameter index, name or type rejected while binding
    #[error("Bind failed: {0}")]
    Bind(String),

    /// Native execution failure, including constraint violations
    #[error("Execute failed [{code}]: {message}")]
    Execute { code: String, message: String },

    /// Native fetch failure in the middle of a cursor
    #[error("Fetch failed [{code}]: {message}")]
    Fetch { code: String, message: String },

    /// String to numeric coercion failure
    #[error("Cannot parse {input:?} as {target}")]
    Parse { input: String, target: &'static str },

    /// Row or column index past the end
    #[error("Index {index} out of range (size {size})")]
    OutOfRange { index: usize, size: usize },

    /// Dereferencing an exhausted or invalidated cursor
    #[error("Invalid iterator")]
    InvalidIterator,

    /// Named lookup miss (connection profile, parameter)
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SqlError {
    /// Create a Connection error from a native code and message
    pub fn connection(code: impl ToString, message: impl Into<String>) -> Self {
        SqlError::Connection {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Create a Prepare error from a native code and message
    pub fn prepare(code: impl ToString, message: impl Into<String>) -> Self {
        SqlError::Prepare {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Create a Bind error
    pub fn bind(message: impl Into<String>) -> Self {
        SqlError::Bind(message.into())
    }

    /// Create an Execute error from a native code and message
    pub fn execute(code: impl ToString, message: impl Into<String>) -> Self {
        SqlError::Execute {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Create a Fetch error from a native code and message
    pub fn fetch(code: impl ToString, message: impl Into<String>) -> Self {
        SqlError::Fetch {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Create a Parse error for a string that is not a valid `target`
    pub fn parse(input: impl Into<String>, target: &'static str) -> Self {
        SqlError::Parse {
            input: input.into(),
            target,
        }
    }

    pub fn out_of_range(index: usize, size: usize) -> Self {
        SqlError::OutOfRange { index, size }
    }

    /// Native error code, when the error came from a driver.
    pub fn native_code(&self) -> Option<&str> {
        match self {
            SqlError::Connection { code, .. }
            | SqlError::Prepare { code, .. }
            | SqlError::Execute { code, .. }
            | SqlError::Fetch { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Process exit code used by the command-line tool.
    pub fn exit_code(&self) -> u8 {
        match self {
            SqlError::Config(_) | SqlError::Yaml(_) | SqlError::NotFound(_) | SqlError::Io(_) => 2,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for polysql operations.
pub type Result<T> = std::result::Result<T, SqlError>;
