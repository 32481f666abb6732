//! Credential domain models

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::result::{Error, Result};

/// Default Argon2id parameters (OWASP baseline: 19 MiB, 2 passes, 1 lane)
pub const DEFAULT_MEMORY_COST: u32 = 19456;
pub const DEFAULT_TIME_COST: u32 = 2;
pub const DEFAULT_PARALLELISM: u32 = 1;

/// Smallest parameters Argon2 accepts; only for tests and CI
pub const FAST_MEMORY_COST: u32 = 8;
pub const FAST_TIME_COST: u32 = 1;
pub const FAST_PARALLELISM: u32 = 1;

/// Upper bound on password length, keeps KDF input bounded
pub const MAX_PASSWORD_BYTES: usize = 1024;

/// Argon2id cost parameters used when deriving new credential hashes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HashParams {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Number of passes
    pub time_cost: u32,
    /// Degree of parallelism (lanes)
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_cost: DEFAULT_MEMORY_COST,
            time_cost: DEFAULT_TIME_COST,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

impl HashParams {
    /// Minimum-cost parameters
    pub fn fast() -> Self {
        Self {
            memory_cost: FAST_MEMORY_COST,
            time_cost: FAST_TIME_COST,
            parallelism: FAST_PARALLELISM,
        }
    }
}

/// A plaintext password
///
/// The buffer is wiped when the value is dropped and never shows up in
/// `Debug` output.
pub struct Password(Zeroizing<String>);

impl Password {
    pub fn new(plaintext: impl Into<String>) -> Self {
        Self(Zeroizing::new(plaintext.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Check length limits. The error never echoes the password.
    pub fn validate(&self, min_length: usize) -> Result<()> {
        if self.0.is_empty() {
            return Err(Error::InvalidPassword("must not be empty".to_string()));
        }
        if self.0.chars().count() < min_length {
            return Err(Error::InvalidPassword(format!(
                "must be at least {} characters",
                min_length
            )));
        }
        if self.0.len() > MAX_PASSWORD_BYTES {
            return Err(Error::InvalidPassword(format!(
                "must be at most {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }
        Ok(())
    }
}

impl From<String> for Password {
    fn from(plaintext: String) -> Self {
        Self::new(plaintext)
    }
}

impl From<&str> for Password {
    fn from(plaintext: &str) -> Self {
        Self::new(plaintext)
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = HashParams::default();
        assert_eq!(params.memory_cost, 19456);
        assert_eq!(params.time_cost, 2);
        assert_eq!(params.parallelism, 1);
    }

    #[test]
    fn test_params_json_is_camel_case() {
        let json = serde_json::to_string(&HashParams::fast()).unwrap();
        assert!(json.contains("memoryCost"));
        assert!(json.contains("timeCost"));
    }

    #[test]
    fn test_password_debug_is_redacted() {
        let password = Password::from("hunter2");
        assert_eq!(format!("{:?}", password), "Password(<redacted>)");
    }

    #[test]
    fn test_password_validation() {
        assert!(Password::from("").validate(1).is_err());
        assert!(Password::from("abc").validate(4).is_err());
        assert!(Password::from("abcd").validate(4).is_ok());
        assert!(Password::from("x".repeat(MAX_PASSWORD_BYTES + 1)).validate(1).is_err());
    }

    #[test]
    fn test_password_error_does_not_echo_plaintext() {
        let err = Password::from("tiny").validate(10).unwrap_err();
        assert!(!err.to_string().contains("tiny"));
    }
}
