//! JSON file persistence with write-then-rename

use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::StorageError;

/// A single JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the document, or `T::default()` when the file is missing or unreadable.
    ///
    /// Unreadable content is logged and otherwise ignored; an empty result does not
    /// prove the file never existed.
    pub fn load_or_default<T>(&self) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.load() {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(path = %self.path.display(), "No file yet, starting empty");
                T::default()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Unreadable file, starting empty");
                T::default()
            }
        }
    }

    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Write the whole document to a sibling temp file, then rename over the target.
    ///
    /// Blocking; async callers run it on the blocking pool.
    pub fn save<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let data = serde_json::to_vec_pretty(value)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &data)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), bytes = data.len(), "Saved");
        Ok(())
    }
}
