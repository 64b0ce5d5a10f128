use miette::Diagnostic;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(gcal_history::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(gcal_history::config))]
    Config(String),

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(gcal_history::google_calendar))]
    GoogleCalendar(String),

    #[error("Storage error: {0}")]
    #[diagnostic(code(gcal_history::storage))]
    Storage(String),

    #[error("Page error: {0}")]
    #[diagnostic(code(gcal_history::page))]
    Page(String),

    #[error(transparent)]
    #[diagnostic(code(gcal_history::io))]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    #[diagnostic(code(gcal_history::http))]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(gcal_history::serialization))]
    Serialization(String),

    #[error("{0}")]
    #[diagnostic(code(gcal_history::boxed))]
    Boxed(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("Other error: {0}")]
    #[diagnostic(code(gcal_history::other))]
    Other(String),
}

// Implement From for TOML deserialization errors
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

/// Type alias for Result with our Error type
pub type AppResult<T> = Result<T, Error>;

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

/// Helper to create storage errors
pub fn storage_error(message: &str) -> Error {
    Error::Storage(message.to_string())
}

/// Helper to create page errors
pub fn page_error(message: &str) -> Error {
    Error::Page(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
