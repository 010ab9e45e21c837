//! Rule Store
//!
//! JSON file holding every guild's rules. Read once at startup, rewritten
//! in full after each mutation.

use super::types::RuleBook;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Rule store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed rule file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// File-backed rule store
#[derive(Debug, Clone)]
pub struct RuleStore {
    path: PathBuf,
}

impl RuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the persisted rule book. A missing file is an empty book.
    pub fn load(&self) -> Result<RuleBook, StoreError> {
        if !self.path.exists() {
            return Ok(RuleBook::new());
        }

        let data = std::fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        let book: RuleBook =
            serde_json::from_str(&data).map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        let total: usize = book.values().map(Vec::len).sum();
        info!(
            "Loaded {} auto-reply rules across {} servers from {:?}",
            total,
            book.len(),
            self.path
        );

        Ok(book)
    }

    /// Like `load`, but any failure is logged and yields an empty book
    pub fn load_or_default(&self) -> RuleBook {
        self.load().unwrap_or_else(|e| {
            warn!("Starting with empty auto-reply rules: {}", e);
            RuleBook::new()
        })
    }

    /// Serialize the whole book and replace the file
    pub fn save(&self, book: &RuleBook) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        // Write atomically via temp file
        let temp_path = self.path.with_extension("tmp");
        let result = write_file(&temp_path, book)
            .and_then(|()| std::fs::rename(&temp_path, &self.path).map_err(io_err));

        if result.is_err() {
            if let Err(e) = std::fs::remove_file(&temp_path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", temp_path.display(), e);
                }
            }
        }
        result
    }
}

fn write_file(path: &Path, book: &RuleBook) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, book)?;
    writer.flush().map_err(io_err)?;
    writer.get_ref().sync_all().map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replies::types::Rule;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = RuleStore::new(dir.path().join("absent.json"));

        let book = store.load().unwrap();
        assert!(book.is_empty());
    }

    #[test]
    fn test_malformed_file_is_error_but_default_recovers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = RuleStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Malformed { .. })));
        assert!(store.load_or_default().is_empty());
    }

    #[test]
    fn test_save_creates_parent_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("rules.json");
        let store = RuleStore::new(&path);

        let mut book = RuleBook::new();
        book.insert("G1".to_string(), vec![Rule::new("hello", "hi", "U1")]);
        store.save(&book).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
        assert_eq!(store.load().unwrap(), book);
    }

    #[test]
    fn test_failed_save_removes_temp() {
        let dir = tempdir().unwrap();
        // Renaming onto a directory fails after the temp file is written
        let path = dir.path().join("rules.json");
        std::fs::create_dir(&path).unwrap();
        let store = RuleStore::new(&path);

        let mut book = RuleBook::new();
        book.insert("G1".to_string(), vec![Rule::new("hello", "hi", "U1")]);

        assert!(matches!(store.save(&book), Err(StoreError::Io { .. })));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_file_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.json");
        let store = RuleStore::new(&path);

        let mut book = RuleBook::new();
        book.insert(
            "G1".to_string(),
            vec![Rule::new("hello", "hi", "U1"), Rule::new("bye", "cya", "")],
        );
        store.save(&book).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["G1"][0]["trigger"], "hello");
        assert_eq!(raw["G1"][0]["author_id"], "U1");
        assert!(raw["G1"][1].get("author_id").is_none());
    }
}
