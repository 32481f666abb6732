//! WebDisk Core - accounts and file storage
//!
//! Follows hexagonal architecture:
//!
//! - **domain**: Core entities (Account, Password, StoredFile) and errors
//! - **ports**: Trait definitions for external dependencies (AccountStore)
//! - **services**: Business logic (CredentialStore, FileService, logging)
//! - **adapters**: Concrete implementations (DuckDB, in-memory)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use services::{CredentialStore, FileService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result};
pub use domain::{Account, HashParams, Password, StoredFile};
pub use services::{EntryPoint, LogEntry, LogEvent, LoggingService};

const DB_FILENAME: &str = "webdisk.duckdb";

/// Main context for WebDisk operations
///
/// Owns the database handle for its lifetime: built once at startup with
/// [`WebDiskContext::open`] and shut down with [`WebDiskContext::close`].
pub struct WebDiskContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub repository: Arc<DuckDbRepository>,
    pub credentials: CredentialStore,
    pub files: FileService,
}

impl WebDiskContext {
    /// Open the data directory: load config, open the database, run
    /// migrations and build the services
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&data_dir.join(DB_FILENAME))?);
        repository.ensure_schema()?;

        let credentials = CredentialStore::new(repository.clone(), config.hash_params)?
            .with_min_password_length(config.min_password_length);
        let files = FileService::new(Arc::clone(&repository), config.uploads_path(data_dir));

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            repository,
            credentials,
            files,
        })
    }

    /// Flush and release the database
    pub fn close(self) -> Result<()> {
        self.repository.checkpoint()
    }
}
