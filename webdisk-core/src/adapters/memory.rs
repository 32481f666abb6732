//! In-memory account store
//!
//! Holds accounts in a `HashMap` behind an `RwLock`. Useful for embedding the
//! credential store without a database file, and in tests.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::RwLock;

use chrono::Utc;

use crate::domain::result::{Error, Result};
use crate::domain::Account;
use crate::ports::AccountStore;

#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> Error {
    Error::database(format!("Lock poisoned: {}", e))
}

impl AccountStore for MemoryAccountStore {
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().map_err(poisoned)?;
        Ok(accounts.get(identifier).cloned())
    }

    fn insert_unique(&self, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;
        match accounts.entry(account.identifier.clone()) {
            Entry::Occupied(_) => Err(Error::DuplicateIdentifier(account.identifier.clone())),
            Entry::Vacant(slot) => {
                slot.insert(account.clone());
                Ok(())
            }
        }
    }

    fn update_credential_hash(&self, identifier: &str, credential_hash: &str) -> Result<()> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;
        let account = accounts
            .get_mut(identifier)
            .ok_or_else(|| Error::not_found(format!("account {}", identifier)))?;
        account.credential_hash = credential_hash.to_string();
        account.updated_at = Utc::now();
        Ok(())
    }

    fn count_accounts(&self) -> Result<u64> {
        let accounts = self.accounts.read().map_err(poisoned)?;
        Ok(accounts.len() as u64)
    }
}
