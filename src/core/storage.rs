//! Document bucket - stores uploaded activity files on the local filesystem.
//!
//! Files are written under `{root}/{activity_id}/{millis}_{name}` and referred to by that
//! relative path. Only the reference is kept in the database.

use crate::errors::{Error, Result};
use chrono::Utc;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// A directory holding uploaded documents.
#[derive(Debug, Clone)]
pub struct DocumentBucket {
    root: PathBuf,
}

impl DocumentBucket {
    /// Uses `root` as the bucket directory. Nothing is created until the first upload.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Bucket directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `bytes` for `activity_id` and returns the reference path.
    ///
    /// # Errors
    /// Returns [`Error::Storage`] if the directory or file cannot be written.
    pub async fn put(&self, activity_id: i64, file_name: &str, bytes: &[u8]) -> Result<String> {
        let file_ref = format!(
            "{activity_id}/{}_{}",
            Utc::now().timestamp_millis(),
            sanitize_file_name(file_name)
        );
        let path = self.root.join(&file_ref);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error("create document directory", &e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| storage_error("write document", &e))?;

        debug!(file_ref, size = bytes.len(), "Document stored");
        Ok(file_ref)
    }

    /// Reads the bytes behind `file_ref`.
    ///
    /// # Errors
    /// Returns [`Error::Storage`] for unreadable files or references escaping the bucket.
    pub async fn get(&self, file_ref: &str) -> Result<Vec<u8>> {
        let path = self.resolve(file_ref)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| storage_error("read document", &e))
    }

    /// Removes the file behind `file_ref`. A file that is already gone is not an error.
    ///
    /// # Errors
    /// Returns [`Error::Storage`] if the file exists but cannot be removed.
    pub async fn remove(&self, file_ref: &str) -> Result<()> {
        let path = self.resolve(file_ref)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(file_ref, "Document already missing from bucket");
                Ok(())
            }
            Err(e) => Err(storage_error("remove document", &e)),
        }
    }

    fn resolve(&self, file_ref: &str) -> Result<PathBuf> {
        let relative = Path::new(file_ref);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if file_ref.is_empty() || escapes {
            return Err(Error::Storage {
                message: format!("Invalid document reference '{file_ref}'"),
            });
        }
        Ok(self.root.join(relative))
    }
}

fn storage_error(action: &str, err: &std::io::Error) -> Error {
    Error::Storage {
        message: format!("Failed to {action}: {err}"),
    }
}

/// Keeps ASCII letters, digits, `.`, `-` and `_`; everything else becomes `_`.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
pub(crate) fn temp_bucket() -> DocumentBucket {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!(
        "indicore-docs-{}-{}-{}",
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    DocumentBucket::new(dir)
}
