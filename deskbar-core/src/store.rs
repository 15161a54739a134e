//! Whole-file JSON persistence
//!
//! A store is a single JSON object mapping ids to entries. Every save rewrites
//! the whole object; the new content is written to a sibling temp file and
//! renamed over the original so a crash mid-write leaves the old file intact.

use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::tracing::{field_names, span_names};

/// Entries keyed by id, in file order
pub type StoreMap<V> = IndexMap<Uuid, V>;

/// A JSON file holding a `{ id: entry }` mapping
#[derive(Debug)]
pub struct JsonStore<V> {
    path: PathBuf,
    _entry: PhantomData<fn() -> V>,
}

impl<V> Clone for JsonStore<V> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            _entry: PhantomData,
        }
    }
}

impl<V: Serialize + DeserializeOwned> JsonStore<V> {
    /// Opens the store, creating an empty one first if the file is absent,
    /// and returns its current content.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created or the
    /// existing file is not a valid mapping.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<(Self, StoreMap<V>)> {
        let store = Self {
            path: path.into(),
            _entry: PhantomData,
        };
        if !store.path.exists() {
            if let Some(parent) = store.path.parent() {
                fs::create_dir_all(parent).map_err(|source| store.io_error(source))?;
            }
            store.save(&StoreMap::new())?;
            tracing::info!({ field_names::PATH } = %store.path.display(), "Created empty store");
        }
        let entries = store.load()?;
        Ok((store, entries))
    }

    /// Store file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(&self) -> StoreResult<StoreMap<V>> {
        let _span = crate::trace_operation!(span_names::STORE_LOAD, { field_names::PATH } = %self.path.display())
            .entered();
        let content = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        if content.trim().is_empty() {
            return Ok(StoreMap::new());
        }
        serde_json::from_str(&content).map_err(|e| StoreError::Parse {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Atomically replaces the file with `entries`
    ///
    /// # Errors
    ///
    /// Returns an error if serialization, the temp write, or the rename fails.
    pub fn save(&self, entries: &StoreMap<V>) -> StoreResult<()> {
        let _span = crate::trace_operation!(
            span_names::STORE_WRITE,
            { field_names::PATH } = %self.path.display(),
            entries = entries.len()
        )
        .entered();
        let content = serde_json::to_vec_pretty(entries).map_err(|e| StoreError::Serialize {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        let tmp = self.temp_path();
        let write_tmp = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&content)?;
            file.sync_all()
        };
        if let Err(source) = write_tmp() {
            let _ = fs::remove_file(&tmp);
            return Err(self.io_error(source));
        }
        fs::rename(&tmp, &self.path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            self.io_error(source)
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
