//! Configuration management
//!
//! Settings live in `<data_dir>/settings.json`:
//! ```json
//! {
//!   "auth": { "memoryCost": 19456, "timeCost": 2, "parallelism": 1, "minPasswordLength": 1 },
//!   "storage": { "uploadsDir": "uploads" }
//! }
//! ```
//! Keys this crate doesn't know about are preserved when saving.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::HashParams;

/// Env var selecting the KDF cost profile ("fast" for tests/CI)
pub const KDF_PROFILE_ENV: &str = "WEBDISK_KDF_PROFILE";

const SETTINGS_FILE: &str = "settings.json";
const DEFAULT_UPLOADS_DIR: &str = "uploads";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    auth: AuthSettings,
    #[serde(default)]
    storage: StorageSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthSettings {
    #[serde(flatten)]
    hash_params: HashParams,
    #[serde(default = "default_min_password_length")]
    min_password_length: usize,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            hash_params: HashParams::default(),
            min_password_length: default_min_password_length(),
            other: HashMap::new(),
        }
    }
}

fn default_min_password_length() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageSettings {
    #[serde(default = "default_uploads_dir")]
    uploads_dir: String,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            uploads_dir: default_uploads_dir(),
            other: HashMap::new(),
        }
    }
}

fn default_uploads_dir() -> String {
    DEFAULT_UPLOADS_DIR.to_string()
}

/// WebDisk configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub hash_params: HashParams,
    pub min_password_length: usize,
    /// Relative paths are resolved against the data directory
    pub uploads_dir: String,
    // Params forced by WEBDISK_KDF_PROFILE; never written back
    profile_params: Option<HashParams>,
    // Keep the raw settings for preservation when saving
    raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        let raw = SettingsFile::default();
        Self {
            hash_params: raw.auth.hash_params,
            min_password_length: raw.auth.min_password_length,
            uploads_dir: raw.storage.uploads_dir.clone(),
            profile_params: None,
            raw_settings: raw,
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// A missing settings file means defaults. A malformed one is a
    /// configuration error: silently falling back would change KDF costs.
    /// `WEBDISK_KDF_PROFILE=fast` swaps in minimum-cost hash parameters.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join(SETTINGS_FILE);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).map_err(|e| {
                Error::Config(format!("Invalid {}: {}", settings_path.display(), e))
            })?
        } else {
            SettingsFile::default()
        };

        let profile_params = match std::env::var(KDF_PROFILE_ENV).ok().as_deref() {
            Some("fast" | "FAST") => Some(HashParams::fast()),
            _ => None,
        };

        Ok(Self {
            hash_params: profile_params.unwrap_or(raw.auth.hash_params),
            min_password_length: raw.auth.min_password_length,
            uploads_dir: raw.storage.uploads_dir.clone(),
            profile_params,
            raw_settings: raw,
        })
    }

    /// Save config to the data directory, preserving unmanaged settings
    ///
    /// Hash parameters forced by the KDF profile env var are not persisted;
    /// the file keeps the values it was loaded with.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = self.raw_settings.clone();
        if self.profile_params != Some(self.hash_params) {
            settings.auth.hash_params = self.hash_params;
        }
        settings.auth.min_password_length = self.min_password_length;
        settings.storage.uploads_dir = self.uploads_dir.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(data_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    /// Absolute uploads directory for `data_dir`
    pub fn uploads_path(&self, data_dir: &Path) -> PathBuf {
        let dir = Path::new(&self.uploads_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            data_dir.join(dir)
        }
    }
}
