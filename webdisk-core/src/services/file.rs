//! File service - upload, list, download and delete stored files
//!
//! Blobs are written to the uploads directory under a generated
//! `<unix-millis><ext>` name; metadata (original name, size, SHA-256) goes
//! to the `files` table.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::{Error, Result};
use crate::domain::{extension_of, is_bare_file_name, StoredFile};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Stream `reader` into `dest`, returning (bytes written, hex SHA-256)
fn copy_and_hash(reader: &mut impl Read, dest: &Path) -> Result<(u64, String)> {
    let mut out = File::create(dest)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buffer[..n]);
        out.write_all(&buffer[..n])?;
        total += n as u64;
    }
    out.sync_all()?;

    Ok((total, hex::encode(hasher.finalize())))
}

/// Name a download gets inside a destination directory
///
/// Only the last component of the original name is used; names with none
/// (like "..") fall back to the generated name.
fn download_name(file: &StoredFile) -> String {
    Path::new(&file.original_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| is_bare_file_name(n))
        .unwrap_or_else(|| file.generated_name.clone())
}

/// File storage service
pub struct FileService {
    repository: Arc<DuckDbRepository>,
    uploads_dir: PathBuf,
}

impl FileService {
    pub fn new(repository: Arc<DuckDbRepository>, uploads_dir: PathBuf) -> Self {
        Self {
            repository,
            uploads_dir,
        }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Upload a file from the local filesystem
    pub fn upload(&self, source: &Path) -> Result<StoredFile> {
        if !source.is_file() {
            return Err(Error::not_found(format!("file {}", source.display())));
        }
        let original_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::validation(format!("no file name in {}", source.display())))?;

        let mut reader = File::open(source)?;
        self.store(&original_name, &mut reader)
    }

    /// Upload in-memory content under `original_name`
    pub fn upload_bytes(&self, original_name: &str, content: &[u8]) -> Result<StoredFile> {
        if original_name.trim().is_empty() {
            return Err(Error::validation("original file name must not be empty"));
        }
        if !is_bare_file_name(original_name) {
            return Err(Error::validation(format!(
                "original file name must not contain a path: {}",
                original_name
            )));
        }
        let mut reader = content;
        self.store(original_name, &mut reader)
    }

    fn store(&self, original_name: &str, reader: &mut impl Read) -> Result<StoredFile> {
        fs::create_dir_all(&self.uploads_dir)?;

        let generated_name = self.generate_name(original_name)?;
        let final_path = self.uploads_dir.join(&generated_name);
        let part_path = self.uploads_dir.join(format!("{}.part", generated_name));

        let (size_bytes, sha256) = match copy_and_hash(reader, &part_path) {
            Ok(result) => result,
            Err(e) => {
                let _ = fs::remove_file(&part_path);
                return Err(e);
            }
        };
        if let Err(e) = fs::rename(&part_path, &final_path) {
            let _ = fs::remove_file(&part_path);
            return Err(e.into());
        }

        let file = StoredFile {
            id: Uuid::new_v4(),
            generated_name,
            original_name: original_name.to_string(),
            storage_path: final_path.to_string_lossy().into_owned(),
            size_bytes,
            sha256,
            uploaded_at: Utc::now(),
        };

        if let Err(e) = self.repository.insert_file(&file) {
            let _ = fs::remove_file(&final_path);
            return Err(e);
        }

        Ok(file)
    }

    /// `<unix-millis><ext>`, with `-N` appended while the name is taken
    fn generate_name(&self, original_name: &str) -> Result<String> {
        let stem = Utc::now().timestamp_millis().to_string();
        let ext = extension_of(original_name);

        let mut candidate = format!("{}{}", stem, ext);
        let mut suffix = 1;
        while self.uploads_dir.join(&candidate).exists()
            || self.repository.file_name_exists(&candidate)?
        {
            candidate = format!("{}-{}{}", stem, suffix, ext);
            suffix += 1;
        }
        Ok(candidate)
    }

    /// All stored files, oldest first
    pub fn list(&self) -> Result<Vec<StoredFile>> {
        self.repository.get_files()
    }

    /// Copy a stored file out to `dest`
    ///
    /// When `dest` is an existing directory the file keeps the last component
    /// of its original name inside it. Targets inside the uploads directory
    /// are refused. The copy goes to a temporary file next to the target and
    /// is renamed into place only after its SHA-256 matches the recorded one.
    pub fn download(&self, generated_name: &str, dest: &Path) -> Result<PathBuf> {
        if !is_bare_file_name(generated_name) {
            return Err(Error::validation(format!(
                "invalid file name: {}",
                generated_name
            )));
        }

        let file = self
            .repository
            .get_file_by_name(generated_name)?
            .ok_or_else(|| Error::not_found(format!("file {}", generated_name)))?;

        let blob_path = self.uploads_dir.join(&file.generated_name);
        if !blob_path.is_file() {
            return Err(Error::Storage(format!(
                "content for {} is missing from {}",
                file.generated_name,
                self.uploads_dir.display()
            )));
        }

        let target = if dest.is_dir() {
            dest.join(download_name(&file))
        } else {
            dest.to_path_buf()
        };
        let target_name = target
            .file_name()
            .ok_or_else(|| Error::validation(format!("invalid target {}", target.display())))?;
        let target_dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        if fs::canonicalize(&target_dir)? == fs::canonicalize(&self.uploads_dir)? {
            return Err(Error::validation(format!(
                "cannot download {} into the uploads directory",
                target_name.to_string_lossy()
            )));
        }

        let part_path = target_dir.join(format!(".{}.part", Uuid::new_v4()));
        let copied = File::open(&blob_path)
            .map_err(Error::from)
            .and_then(|mut reader| copy_and_hash(&mut reader, &part_path));

        let sha256 = match copied {
            Ok((_, sha256)) => sha256,
            Err(e) => {
                let _ = fs::remove_file(&part_path);
                return Err(e);
            }
        };
        if sha256 != file.sha256 {
            let _ = fs::remove_file(&part_path);
            return Err(Error::Storage(format!(
                "checksum mismatch for {}",
                file.generated_name
            )));
        }
        if let Err(e) = fs::rename(&part_path, &target) {
            let _ = fs::remove_file(&part_path);
            return Err(e.into());
        }

        Ok(target)
    }

    /// Delete a stored file by id; false if there was no such file
    pub fn delete(&self, id: Uuid) -> Result<bool> {
        let Some(file) = self.repository.get_file_by_id(id)? else {
            return Ok(false);
        };

        match fs::remove_file(self.uploads_dir.join(&file.generated_name)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.repository.delete_file(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_service(dir: &TempDir) -> FileService {
        let repo = DuckDbRepository::new(&dir.path().join("test.duckdb")).unwrap();
        repo.ensure_schema().unwrap();
        FileService::new(Arc::new(repo), dir.path().join("uploads"))
    }

    #[test]
    fn test_upload_bytes_records_metadata() {
        let dir = TempDir::new().unwrap();
        let service = create_service(&dir);

        let file = service.upload_bytes("hello.txt", b"hello world").unwrap();
        assert!(file.generated_name.ends_with(".txt"));
        assert_eq!(file.original_name, "hello.txt");
        assert_eq!(file.size_bytes, 11);
        assert_eq!(
            file.sha256,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert!(service.uploads_dir().join(&file.generated_name).is_file());
        assert!(!service
            .uploads_dir()
            .join(format!("{}.part", file.generated_name))
            .exists());
    }

    #[test]
    fn test_generated_names_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let service = create_service(&dir);

        let a = service.upload_bytes("a.txt", b"a").unwrap();
        let b = service.upload_bytes("b.txt", b"b").unwrap();
        let c = service.upload_bytes("c.txt", b"c").unwrap();
        assert_ne!(a.generated_name, b.generated_name);
        assert_ne!(b.generated_name, c.generated_name);
        assert_eq!(service.list().unwrap().len(), 3);
    }

    #[test]
    fn test_upload_missing_source() {
        let dir = TempDir::new().unwrap();
        let service = create_service(&dir);
        let err = service.upload(&dir.path().join("nope.bin")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_download_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let service = create_service(&dir);
        for name in ["../test.duckdb", "..", "a/b"] {
            let err = service.download(name, dir.path()).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{} accepted", name);
        }
    }

    #[test]
    fn test_upload_bytes_rejects_path_names() {
        let dir = TempDir::new().unwrap();
        let service = create_service(&dir);
        for name in ["../escaped.txt", "/etc/passwd", "a/b.txt", "..", "a\\b.txt"] {
            let err = service.upload_bytes(name, b"data").unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{} accepted", name);
        }
        assert!(service.list().unwrap().is_empty());
    }

    /// Record a file whose metadata bypassed upload validation
    fn insert_raw(service: &FileService, generated_name: &str, original_name: &str, content: &[u8]) {
        let blob = service.uploads_dir().join(generated_name);
        fs::create_dir_all(service.uploads_dir()).unwrap();
        fs::write(&blob, content).unwrap();
        service
            .repository
            .insert_file(&StoredFile {
                id: Uuid::new_v4(),
                generated_name: generated_name.to_string(),
                original_name: original_name.to_string(),
                storage_path: blob.to_string_lossy().into_owned(),
                size_bytes: content.len() as u64,
                sha256: hex::encode(Sha256::digest(content)),
                uploaded_at: Utc::now(),
            })
            .unwrap();
    }

    #[test]
    fn test_download_stays_inside_destination() {
        let dir = TempDir::new().unwrap();
        let service = create_service(&dir);
        insert_raw(&service, "100.txt", "../escaped.txt", b"content");
        insert_raw(&service, "200.txt", "..", b"dots");

        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();

        let written = service.download("100.txt", &out).unwrap();
        assert_eq!(written, out.join("escaped.txt"));
        assert!(!dir.path().join("escaped.txt").exists());
        assert_eq!(fs::read(&written).unwrap(), b"content");

        let written = service.download("200.txt", &out).unwrap();
        assert_eq!(written, out.join("200.txt"));
    }

    #[test]
    fn test_download_onto_stored_copy_keeps_blob() {
        let dir = TempDir::new().unwrap();
        let service = create_service(&dir);

        let file = service.upload_bytes("keep.bin", b"precious").unwrap();
        let blob = service.uploads_dir().join(&file.generated_name);

        let err = service.download(&file.generated_name, &blob).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(fs::read(&blob).unwrap(), b"precious");

        // Original name equal to the generated one, downloaded into uploads/
        insert_raw(&service, "300.bin", "300.bin", b"again");
        let err = service.download("300.bin", service.uploads_dir()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(fs::read(service.uploads_dir().join("300.bin")).unwrap(), b"again");
    }

    #[test]
    fn test_failed_download_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        let service = create_service(&dir);

        let file = service.upload_bytes("data.bin", b"original").unwrap();
        let missing_dir = dir.path().join("missing").join("out.bin");
        assert!(service.download(&file.generated_name, &missing_dir).is_err());
        assert!(!dir.path().join("missing").exists());

        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(service.uploads_dir().join(&file.generated_name), b"tampered").unwrap();
        assert!(service.download(&file.generated_name, &out).is_err());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_download_detects_tampering() {
        let dir = TempDir::new().unwrap();
        let service = create_service(&dir);

        let file = service.upload_bytes("data.bin", b"original").unwrap();
        fs::write(service.uploads_dir().join(&file.generated_name), b"tampered").unwrap();

        let out = dir.path().join("out.bin");
        let err = service.download(&file.generated_name, &out).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(!out.exists());
    }

    #[test]
    fn test_delete_unknown_id() {
        let dir = TempDir::new().unwrap();
        let service = create_service(&dir);
        assert!(!service.delete(Uuid::new_v4()).unwrap());
    }
}
