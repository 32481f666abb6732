//! Result and error types for the core library

use thiserror::Error;

/// Message shared by every failed login, whatever the cause
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Account already exists: {0}")]
    DuplicateIdentifier(String),

    /// Unknown account and wrong password both map here
    #[error("{}", INVALID_CREDENTIALS_MESSAGE)]
    InvalidCredentials,

    #[error("Invalid username: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    /// True for the uniform login failure
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::InvalidCredentials)
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Self::Database(format!("{:#}", e))
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_credentials_message_is_uniform() {
        let err = Error::InvalidCredentials;
        assert_eq!(err.to_string(), "Invalid username or password");
        assert!(err.is_auth_failure());
    }

    #[test]
    fn test_duplicate_identifier_names_account() {
        let err = Error::DuplicateIdentifier("alice".to_string());
        assert!(err.to_string().contains("alice"));
        assert!(!err.is_auth_failure());
    }
}
