//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
mod credential;
mod file;
pub mod result;

pub use account::{validate_identifier, Account, MAX_IDENTIFIER_LEN};
pub use credential::{HashParams, Password, MAX_PASSWORD_BYTES};
pub use file::{extension_of, is_bare_file_name, StoredFile};
