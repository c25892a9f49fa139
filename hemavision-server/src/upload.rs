use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use bon::bon;
use chrono::Local;
use thiserror::Error;

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

const FALLBACK_NAME: &str = "upload";
const NAME_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file selected")]
    NoFileSelected,
    #[error("Invalid file type. Use: png, jpg, jpeg")]
    InvalidType,
    #[error("failed to write upload")]
    Io(#[from] io::Error),
}

/// An upload that made it to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// Client filename after sanitizing.
    pub source_name: String,
    /// Timestamp-prefixed name inside the upload directory.
    pub stored_name: String,
    pub path: PathBuf,
}

/// Holding directory for uploaded images.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    retention: Option<Duration>,
}

#[bon]
impl UploadStore {
    #[builder]
    pub fn new(#[builder(into)] dir: PathBuf, retention: Option<Duration>) -> Self {
        Self { dir, retention }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Rejects empty names and extensions outside [`ALLOWED_EXTENSIONS`], case-insensitively.
    pub fn check(filename: &str) -> Result<(), UploadError> {
        if filename.is_empty() {
            return Err(UploadError::NoFileSelected);
        }
        let allowed = filename.rsplit_once('.').is_some_and(|(_, ext)| {
            ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        });
        if allowed {
            Ok(())
        } else {
            Err(UploadError::InvalidType)
        }
    }

    /// Keeps the last path component, joins whitespace runs with `_` and drops
    /// everything outside `[A-Za-z0-9._-]`.
    pub fn sanitize(filename: &str) -> String {
        let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
        let joined = base.split_whitespace().collect::<Vec<_>>().join("_");
        let cleaned: String = joined
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            .collect();
        match cleaned.trim_matches(['.', '_']) {
            "" => FALLBACK_NAME.to_owned(),
            name => name.to_owned(),
        }
    }

    /// Writes `bytes` under a fresh timestamped name. Never overwrites an existing file.
    pub fn store(&self, filename: &str, bytes: &[u8]) -> Result<StoredUpload, UploadError> {
        std::fs::create_dir_all(&self.dir)?;
        if self.retention.is_some() {
            self.purge_expired()?;
        }

        let source_name = Self::sanitize(filename);
        let (stored_name, path, mut file) = self.create_unique(&source_name)?;
        file.write_all(bytes)?;
        tracing::info!(path = %path.display(), len = bytes.len(), "stored upload");
        Ok(StoredUpload {
            source_name,
            stored_name,
            path,
        })
    }

    fn create_unique(&self, source_name: &str) -> io::Result<(String, PathBuf, File)> {
        let mut last_err = None;
        for _ in 0..NAME_ATTEMPTS {
            let stored_name = format!(
                "{}{source_name}",
                Local::now().format("%Y%m%d_%H%M%S_%6f_")
            );
            let path = self.dir.join(&stored_name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((stored_name, path, file)),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => last_err = Some(err),
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::AlreadyExists)))
    }

    /// Removes files older than the retention window. Returns how many were removed.
    pub fn purge_expired(&self) -> io::Result<usize> {
        let Some(retention) = self.retention else {
            return Ok(0);
        };
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let expired = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .ok()
                .filter(|_| entry.path().is_file())
                .and_then(|modified| modified.elapsed().ok())
                .is_some_and(|age| age >= retention);
            if !expired {
                continue;
            }
            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(err) => {
                    tracing::warn!(path = %entry.path().display(), %err, "failed to purge upload")
                }
            }
        }
        if removed > 0 {
            tracing::info!(removed, "purged expired uploads");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("cell.png")]
    #[case("cell.JPG")]
    #[case("archive.tar.jpeg")]
    fn accepts_image_extensions(#[case] filename: &str) {
        assert!(UploadStore::check(filename).is_ok());
    }

    #[rstest]
    #[case("cell.gif")]
    #[case("png")]
    #[case("cell.png.exe")]
    fn rejects_other_extensions(#[case] filename: &str) {
        assert!(matches!(
            UploadStore::check(filename),
            Err(UploadError::InvalidType)
        ));
    }

    #[test]
    fn empty_name_is_not_selected() {
        assert!(matches!(
            UploadStore::check(""),
            Err(UploadError::NoFileSelected)
        ));
    }

    #[rstest]
    #[case("blood smear 01.png", "blood_smear_01.png")]
    #[case("../../etc/passwd.png", "passwd.png")]
    #[case("C:\\Users\\lab\\cell.jpg", "cell.jpg")]
    #[case("ünï cell.png", "n_cell.png")]
    #[case("...", "upload")]
    fn sanitizes_client_names(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(UploadStore::sanitize(raw), expected);
    }

    #[test]
    fn stores_under_timestamped_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::builder().dir(dir.path().join("uploads")).build();
        let first = store.store("my cell.png", b"one").unwrap();
        let second = store.store("my cell.png", b"two").unwrap();

        assert_eq!(first.source_name, "my_cell.png");
        assert!(first.stored_name.ends_with("_my_cell.png"));
        assert_ne!(first.stored_name, second.stored_name);
        assert_eq!(std::fs::read(&first.path).unwrap(), b"one");
        assert_eq!(std::fs::read(&second.path).unwrap(), b"two");
        assert_eq!(store.purge_expired().unwrap(), 0);
    }

    #[test]
    fn zero_retention_keeps_only_the_latest_upload() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::builder()
            .dir(dir.path())
            .retention(Duration::ZERO)
            .build();
        let first = store.store("a.png", b"a").unwrap();
        let second = store.store("b.png", b"b").unwrap();
        assert!(!first.path.exists());
        assert!(second.path.exists());
    }
}
