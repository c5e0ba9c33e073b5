//! Error handling with codes, context and recovery suggestions
//!
//! Every failure the resolver can hit while *loading* a descriptor is an
//! [`Error`] carrying an [`ErrorCode`]. Problems found while *validating* a
//! loaded descriptor are not errors; they are collected as violations in
//! [`crate::validation::ValidationResult`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum ErrorCode {
    // General errors (1xxx)
    Internal = 1001,

    // IO errors (2xxx)
    IoError = 2000,
    FileNotFound = 2001,
    PermissionDenied = 2002,

    // Configuration errors (3xxx)
    ConfigNotFound = 3001,
    ConfigParseError = 3002,
    InvalidConfigValue = 3004,
    MissingField = 3005,
    InvalidNumericValue = 3006,

    // Process errors (5xxx)
    ProcessError = 5000,
    CommandNotFound = 5001,

    // Validation errors (6xxx)
    InvalidInput = 6001,

    // Platform-specific errors (8xxx)
    GradleError = 8002,
    FlutterError = 8005,
}

impl ErrorCode {
    /// Get the numeric code
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a human-readable category
    pub fn category(&self) -> &'static str {
        match self.code() / 1000 {
            1 => "General",
            2 => "IO",
            3 => "Configuration",
            5 => "Process",
            6 => "Validation",
            8 => "Platform",
            _ => "Unknown",
        }
    }

    /// Whether this code belongs to the configuration category
    pub fn is_config(&self) -> bool {
        self.code() / 1000 == 3
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// Main error type with rich context
#[derive(Error, Debug)]
pub struct Error {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional context
    pub context: Option<String>,
    /// Recovery suggestion
    pub suggestion: Option<String>,
    /// Source error
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, "\n  Context: {}", ctx)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl Error {
    /// Create a new error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            suggestion: None,
            source: None,
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a recovery suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors

    pub fn file_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::FileNotFound,
            format!("File not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Check that the file exists and you have read permissions")
    }

    pub fn config_not_found(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Configuration file not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Create a .droidplan.toml file or use --config to specify a path")
    }

    pub fn invalid_value(field: &str, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidConfigValue,
            format!("Invalid value for `{}`: {}", field, message.into()),
        )
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field `{}` is missing", field),
        )
        .with_suggestion(format!("Add `{}` to the build descriptor", field))
    }

    pub fn invalid_numeric(field: &str, actual: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidNumericValue,
            format!("Field `{}` must be a non-negative integer, got {}", field, actual),
        )
    }

    pub fn process(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProcessError, message)
    }

    pub fn command_not_found(cmd: &str) -> Self {
        Self::new(
            ErrorCode::CommandNotFound,
            format!("Command not found: {}", cmd),
        )
        .with_suggestion(format!("Install {} and ensure it's in your PATH", cmd))
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// The build engine ran but exited unsuccessfully
    pub fn engine_failed(code: ErrorCode, program: &str, status: i32) -> Self {
        Self::new(code, format!("{} exited with code {}", program, status))
            .with_suggestion("Re-run with -v to see the full engine command")
    }

    /// Map this error onto a process exit code
    pub fn exit_code(&self) -> i32 {
        match self.code {
            ErrorCode::CommandNotFound => exit_codes::COMMAND_NOT_FOUND,
            code if code.is_config() => exit_codes::CONFIG_ERROR,
            ErrorCode::FileNotFound => exit_codes::CONFIG_ERROR,
            _ => exit_codes::FAILURE,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Exit codes for CLI commands
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const VALIDATION_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const COMMAND_NOT_FOUND: i32 = 127;
}

// Implement From for common error types

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            _ => ErrorCode::IoError,
        };
        Error::new(code, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, format!("JSON parse error: {}", err))
            .with_source(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, format!("TOML parse error: {}", err))
            .with_source(err)
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::new(ErrorCode::Internal, format!("TOML render error: {}", err)).with_source(err)
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_suggestion(suggestion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::FileNotFound.to_string(), "E2001");
        assert_eq!(ErrorCode::MissingField.to_string(), "E3005");
        assert_eq!(ErrorCode::InvalidNumericValue.to_string(), "E3006");
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::IoError.category(), "IO");
        assert_eq!(ErrorCode::MissingField.category(), "Configuration");
        assert_eq!(ErrorCode::GradleError.category(), "Platform");
    }

    #[test]
    fn test_missing_field_carries_suggestion() {
        let err = Error::missing_field("minSdk").with_context("While loading app.toml");

        assert_eq!(err.code, ErrorCode::MissingField);
        assert!(err.context.is_some());
        assert!(err.suggestion.as_deref().unwrap().contains("minSdk"));
    }

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(Error::missing_field("x").exit_code(), exit_codes::CONFIG_ERROR);
        assert_eq!(Error::invalid_numeric("x", "\"abc\"").exit_code(), exit_codes::CONFIG_ERROR);
        assert_eq!(
            Error::engine_failed(ErrorCode::GradleError, "./gradlew", 1).exit_code(),
            exit_codes::FAILURE
        );
        assert_eq!(Error::command_not_found("flutter").exit_code(), exit_codes::COMMAND_NOT_FOUND);
        assert_eq!(Error::process("boom").exit_code(), exit_codes::FAILURE);
    }

    #[test]
    fn test_engine_failure_message() {
        let err = Error::engine_failed(ErrorCode::FlutterError, "flutter", 2);
        assert_eq!(err.code.category(), "Platform");
        assert_eq!(err.to_string().lines().next(), Some("[E8005] flutter exited with code 2"));
    }
}
