//! Stored file domain model

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata for an uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: Uuid,
    /// Name on disk inside the uploads directory (e.g. "1718000000000.pdf")
    pub generated_name: String,
    /// Name the file had when it was uploaded
    pub original_name: String,
    pub storage_path: String,
    pub size_bytes: u64,
    /// Hex-encoded SHA-256 of the content
    pub sha256: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Extension of `original_name` including the leading dot, or ""
///
/// Dotfiles like ".bashrc" have no extension.
pub fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

/// Whether `name` is a bare file name that can't escape the uploads directory
pub fn is_bare_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
