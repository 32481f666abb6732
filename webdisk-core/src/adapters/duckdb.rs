//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use duckdb::{params, Connection, OptionalExt};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, StoredFile};
use crate::ports::AccountStore;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("could not set lock")
        || lower.contains("file is already open")
}

const USER_COLUMNS: &str = "identifier, credential_hash, created_at, updated_at";

const FILE_COLUMNS: &str =
    "file_id, generated_name, original_name, storage_path, size_bytes, sha256, uploaded_at";

/// DuckDB repository implementation
///
/// One connection guarded by a mutex. Every statement runs while the lock is
/// held, so writes from threads sharing a repository are serialized.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the database at `db_path`
    ///
    /// Retries with exponential backoff on file locking errors, which occur
    /// when another process holds the database briefly.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[webdisk] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES))
            .into())
    }

    /// Attempt to open a database connection (called by new() with retry logic)
    fn try_open_connection(db_path: &Path) -> anyhow::Result<Connection> {
        // Extension autoloading stays off; nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(db_path, config)?;
        Ok(conn)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        let migration_service = MigrationService::new(&conn);
        Ok(migration_service.run_pending()?)
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Flush the write-ahead log to the database file
    pub fn checkpoint(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch("CHECKPOINT")?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    // === File metadata ===

    pub fn insert_file(&self, file: &StoredFile) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO files ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
                FILE_COLUMNS
            ),
            params![
                file.id.to_string(),
                file.generated_name,
                file.original_name,
                file.storage_path,
                file.size_bytes as i64,
                file.sha256,
                file.uploaded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All files, oldest upload first
    pub fn get_files(&self) -> Result<Vec<StoredFile>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM files ORDER BY uploaded_at, generated_name",
            FILE_COLUMNS
        ))?;

        let files = stmt
            .query_map([], row_to_file)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(files)
    }

    pub fn get_file_by_id(&self, id: Uuid) -> Result<Option<StoredFile>> {
        let conn = self.conn()?;
        let file = conn
            .query_row(
                &format!("SELECT {} FROM files WHERE file_id = ?", FILE_COLUMNS),
                [id.to_string()],
                row_to_file,
            )
            .optional()?;
        Ok(file)
    }

    pub fn get_file_by_name(&self, generated_name: &str) -> Result<Option<StoredFile>> {
        let conn = self.conn()?;
        let file = conn
            .query_row(
                &format!("SELECT {} FROM files WHERE generated_name = ?", FILE_COLUMNS),
                [generated_name],
                row_to_file,
            )
            .optional()?;
        Ok(file)
    }

    pub fn file_name_exists(&self, generated_name: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM files WHERE generated_name = ?",
            [generated_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Delete file metadata; returns false if there was no such file
    pub fn delete_file(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM files WHERE file_id = ?", [id.to_string()])?;
        Ok(deleted > 0)
    }
}

impl AccountStore for DuckDbRepository {
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE identifier = ?", USER_COLUMNS),
                [identifier],
                row_to_account,
            )
            .optional()?;
        Ok(account)
    }

    fn insert_unique(&self, account: &Account) -> Result<()> {
        let conn = self.conn()?;
        // ON CONFLICT DO NOTHING leaves an existing row untouched; zero rows
        // changed means the identifier was already taken
        let rows_changed = conn.execute(
            &format!(
                "INSERT INTO users ({}) VALUES (?, ?, ?, ?)
                 ON CONFLICT (identifier) DO NOTHING",
                USER_COLUMNS
            ),
            params![
                account.identifier,
                account.credential_hash,
                account.created_at.to_rfc3339(),
                account.updated_at.to_rfc3339(),
            ],
        )?;

        if rows_changed == 0 {
            return Err(Error::DuplicateIdentifier(account.identifier.clone()));
        }
        Ok(())
    }

    fn update_credential_hash(&self, identifier: &str, credential_hash: &str) -> Result<()> {
        let conn = self.conn()?;
        let rows_changed = conn.execute(
            "UPDATE users SET credential_hash = ?, updated_at = ? WHERE identifier = ?",
            params![credential_hash, Utc::now().to_rfc3339(), identifier],
        )?;

        if rows_changed == 0 {
            return Err(Error::not_found(format!("account {}", identifier)));
        }
        Ok(())
    }

    fn count_accounts(&self) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn row_to_account(row: &duckdb::Row) -> duckdb::Result<Account> {
    let created_str: String = row.get(2)?;
    let updated_str: String = row.get(3)?;
    Ok(Account {
        identifier: row.get(0)?,
        credential_hash: row.get(1)?,
        created_at: parse_timestamp(&created_str),
        updated_at: parse_timestamp(&updated_str),
    })
}

fn row_to_file(row: &duckdb::Row) -> duckdb::Result<StoredFile> {
    let id_str: String = row.get(0)?;
    let size: i64 = row.get(4)?;
    let uploaded_str: String = row.get(6)?;
    Ok(StoredFile {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        generated_name: row.get(1)?,
        original_name: row.get(2)?,
        storage_path: row.get(3)?,
        size_bytes: size.max(0) as u64,
        sha256: row.get(5)?,
        uploaded_at: parse_timestamp(&uploaded_str),
    })
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
