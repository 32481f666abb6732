//! Credential service - password hashing and verification
//!
//! Passwords are hashed with Argon2id into PHC strings
//! (`$argon2id$v=19$m=..,t=..,p=..$<salt>$<digest>`), so every stored hash
//! carries the parameters needed to verify it. Verification recomputes the
//! digest with those parameters and compares in constant time.
//!
//! Unknown identifiers are checked against a dummy hash with the configured
//! parameters. A login for a missing account costs the same KDF work as a
//! wrong password and yields the same result.

use std::sync::Arc;

use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::domain::result::{Error, Result};
use crate::domain::{validate_identifier, Account, HashParams, Password};
use crate::ports::AccountStore;

/// Hashed in place of a real password when the account does not exist
const DUMMY_PASSWORD: &str = "webdisk-dummy-password";

/// Build an Argon2id hasher, failing on parameters the algorithm rejects
fn build_hasher(params: &HashParams) -> Result<Argon2<'static>> {
    let argon2_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        None,
    )
    .map_err(|e| Error::Config(format!("Invalid Argon2 parameters: {}", e)))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params))
}

/// Registers accounts and verifies passwords against an [`AccountStore`]
pub struct CredentialStore {
    store: Arc<dyn AccountStore>,
    params: HashParams,
    hasher: Argon2<'static>,
    min_password_length: usize,
    dummy_hash: String,
}

impl CredentialStore {
    /// Create a credential store
    ///
    /// Invalid KDF parameters fail here, at startup, rather than on the first
    /// registration.
    pub fn new(store: Arc<dyn AccountStore>, params: HashParams) -> Result<Self> {
        let hasher = build_hasher(&params)?;
        let dummy_hash = derive(&hasher, DUMMY_PASSWORD.as_bytes())?;

        Ok(Self {
            store,
            params,
            hasher,
            min_password_length: 1,
            dummy_hash,
        })
    }

    /// Require passwords of at least `min_length` characters on register and change
    pub fn with_min_password_length(mut self, min_length: usize) -> Self {
        self.min_password_length = min_length.max(1);
        self
    }

    /// Register a new account
    ///
    /// The password is consumed and wiped once the hash is derived.
    pub fn register(&self, identifier: &str, password: Password) -> Result<Account> {
        validate_identifier(identifier)?;
        password.validate(self.min_password_length)?;

        // Cheap early rejection; insert_unique still decides races
        if self.store.find_by_identifier(identifier)?.is_some() {
            return Err(Error::DuplicateIdentifier(identifier.to_string()));
        }

        let credential_hash = derive(&self.hasher, password.as_bytes())?;
        drop(password);

        let account = Account::new(identifier, credential_hash);
        self.store.insert_unique(&account)?;
        Ok(account)
    }

    /// Check a password
    ///
    /// Returns `Ok(false)` both for a wrong password and for an unknown
    /// identifier. Errors are reserved for store failures and corrupt hashes.
    pub fn verify(&self, identifier: &str, password: Password) -> Result<bool> {
        Ok(self.check(identifier, password)?.is_some())
    }

    /// Verify and return the account, or the uniform `InvalidCredentials` error
    pub fn authenticate(&self, identifier: &str, password: Password) -> Result<Account> {
        self.check(identifier, password)?
            .ok_or(Error::InvalidCredentials)
    }

    /// Replace an account's password after verifying the current one
    pub fn change_password(
        &self,
        identifier: &str,
        current: Password,
        new_password: Password,
    ) -> Result<Account> {
        let account = self.authenticate(identifier, current)?;
        new_password.validate(self.min_password_length)?;

        let credential_hash = derive(&self.hasher, new_password.as_bytes())?;
        drop(new_password);

        self.store
            .update_credential_hash(identifier, &credential_hash)?;
        Ok(account.with_credential_hash(credential_hash))
    }

    /// Whether `credential_hash` was made with other than the configured
    /// algorithm, version or cost parameters
    pub fn needs_rehash(&self, credential_hash: &str) -> Result<bool> {
        let parsed = parse_hash(credential_hash)?;

        if parsed.algorithm != argon2::ARGON2ID_IDENT {
            return Ok(true);
        }
        if parsed.version != Some(Version::V0x13 as u32) {
            return Ok(true);
        }

        Ok(match Params::try_from(&parsed) {
            Ok(stored) => {
                stored.m_cost() != self.params.memory_cost
                    || stored.t_cost() != self.params.time_cost
                    || stored.p_cost() != self.params.parallelism
            }
            Err(_) => true,
        })
    }

    /// Shared path for verify/authenticate: the account on success
    fn check(&self, identifier: &str, password: Password) -> Result<Option<Account>> {
        let account = match self.store.find_by_identifier(identifier)? {
            Some(account) => account,
            None => {
                // Same KDF work as a real check; the outcome is discarded
                let _ = matches_hash(&self.hasher, password.as_bytes(), &self.dummy_hash);
                return Ok(None);
            }
        };

        if !matches_hash(&self.hasher, password.as_bytes(), &account.credential_hash)? {
            return Ok(None);
        }

        if self.needs_rehash(&account.credential_hash)? {
            match derive(&self.hasher, password.as_bytes()) {
                Ok(upgraded) => {
                    match self
                        .store
                        .update_credential_hash(&account.identifier, &upgraded)
                    {
                        Ok(()) => return Ok(Some(account.with_credential_hash(upgraded))),
                        Err(e) => {
                            eprintln!("[webdisk] Failed to upgrade credential hash: {}", e)
                        }
                    }
                }
                Err(e) => eprintln!("[webdisk] Failed to upgrade credential hash: {}", e),
            }
        }

        Ok(Some(account))
    }
}

/// Derive a PHC string for `password` with a fresh random salt
fn derive(hasher: &Argon2<'static>, password: &[u8]) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher
        .hash_password(password, &salt)
        .map_err(|e| Error::credential(format!("Password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

fn parse_hash(credential_hash: &str) -> Result<PasswordHash<'_>> {
    PasswordHash::new(credential_hash)
        .map_err(|e| Error::credential(format!("Invalid stored hash: {}", e)))
}

/// Recompute with the hash's own salt and parameters; constant-time compare
fn matches_hash(hasher: &Argon2<'static>, password: &[u8], credential_hash: &str) -> Result<bool> {
    let parsed = parse_hash(credential_hash)?;
    match hasher.verify_password(password, &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::credential(format!("Password verification failed: {}", e))),
    }
}
