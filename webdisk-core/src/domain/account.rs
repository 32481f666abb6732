//! Account domain model

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use super::result::{Error, Result};

/// Longest identifier accepted at registration
pub const MAX_IDENTIFIER_LEN: usize = 64;

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("identifier pattern is valid"))
}

/// Validate an account identifier (username)
///
/// Identifiers are compared exactly; no case folding or trimming is applied
/// to what gets stored, so leading/trailing whitespace is rejected outright.
pub fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.trim().is_empty() {
        return Err(Error::InvalidIdentifier("must not be empty".to_string()));
    }
    if identifier.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::InvalidIdentifier(format!(
            "must be at most {} characters",
            MAX_IDENTIFIER_LEN
        )));
    }
    if !identifier_pattern().is_match(identifier) {
        return Err(Error::InvalidIdentifier(
            "only letters, digits, '_', '.' and '-' are allowed".to_string(),
        ));
    }
    Ok(())
}

/// A registered user account
///
/// `credential_hash` is a PHC-format string carrying algorithm, version,
/// cost parameters, salt and digest. It is never serialized.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub identifier: String,
    #[serde(skip_serializing)]
    pub credential_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(identifier: impl Into<String>, credential_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            identifier: identifier.into(),
            credential_hash: credential_hash.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the credential hash, bumping `updated_at`
    pub fn with_credential_hash(mut self, credential_hash: impl Into<String>) -> Self {
        self.credential_hash = credential_hash.into();
        self.updated_at = Utc::now();
        self
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("identifier", &self.identifier)
            .field("credential_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        for id in ["alice", "bob_99", "first.last", "a-b", "X"] {
            assert!(validate_identifier(id).is_ok(), "{} should be valid", id);
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        for id in ["", "   ", " alice", "al ice", "alice/..", "ali\nce", "a@b"] {
            assert!(
                matches!(validate_identifier(id), Err(Error::InvalidIdentifier(_))),
                "{:?} should be rejected",
                id
            );
        }
        let long = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(validate_identifier(&long).is_err());
        let max = "a".repeat(MAX_IDENTIFIER_LEN);
        assert!(validate_identifier(&max).is_ok());
    }

    #[test]
    fn test_debug_redacts_hash() {
        let account = Account::new("alice", "$argon2id$v=19$m=8,t=1,p=1$c2FsdA$ZGlnZXN0");
        let debug = format!("{:?}", account);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("argon2id"));
    }

    #[test]
    fn test_serialize_skips_hash() {
        let account = Account::new("alice", "secret-hash-material");
        let json = serde_json::to_string(&account).unwrap();
        assert!(json.contains("alice"));
        assert!(!json.contains("secret-hash-material"));
    }

    #[test]
    fn test_with_credential_hash_bumps_updated_at() {
        let account = Account::new("alice", "old");
        let created = account.created_at;
        let updated = account.with_credential_hash("new");
        assert_eq!(updated.credential_hash, "new");
        assert_eq!(updated.created_at, created);
        assert!(updated.updated_at >= created);
    }
}
