use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(wrapped::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(wrapped::config))]
    Config(String),

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(wrapped::google_calendar))]
    GoogleCalendar(String),

    #[error("OAuth error: {0}")]
    #[diagnostic(code(wrapped::oauth))]
    OAuth(String),

    #[error("Storage error: {0}")]
    #[diagnostic(code(wrapped::storage))]
    Storage(String),

    #[error("{0}")]
    #[diagnostic(code(wrapped::validation))]
    Validation(String),

    #[error("Session error: {0}")]
    #[diagnostic(code(wrapped::session))]
    Session(String),

    #[error("Template error: {0}")]
    #[diagnostic(code(wrapped::template))]
    Template(String),

    #[error(transparent)]
    #[diagnostic(code(wrapped::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(wrapped::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(wrapped::other))]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<askama::Error> for Error {
    fn from(err: askama::Error) -> Self {
        Error::Template(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type WrappedResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}

/// Helper to create OAuth errors
pub fn oauth_error(message: &str) -> Error {
    Error::OAuth(message.to_string())
}

/// Helper to create storage errors
pub fn storage_error(message: &str) -> Error {
    Error::Storage(message.to_string())
}

/// Helper to create validation errors. The message is shown to the user as is.
pub fn validation_error(message: &str) -> Error {
    Error::Validation(message.to_string())
}
