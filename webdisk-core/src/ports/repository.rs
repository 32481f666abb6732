//! Account store port - persistence abstraction for credentials

use crate::domain::result::Result;
use crate::domain::Account;

/// Persistent mapping from identifier to account
///
/// The credential store depends only on this trait. Implementations must
/// enforce identifier uniqueness themselves: two racing `insert_unique`
/// calls for the same identifier may not both succeed.
pub trait AccountStore: Send + Sync {
    /// Look up an account by its exact identifier
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>>;

    /// Insert a new account
    ///
    /// Fails with `Error::DuplicateIdentifier` if the identifier is taken.
    /// Never overwrites an existing account.
    fn insert_unique(&self, account: &Account) -> Result<()>;

    /// Replace the credential hash of an existing account
    ///
    /// Fails with `Error::NotFound` if there is no such account.
    fn update_credential_hash(&self, identifier: &str, credential_hash: &str) -> Result<()>;

    /// Number of registered accounts
    fn count_accounts(&self) -> Result<u64>;
}
