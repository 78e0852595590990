//! Key-value store persisted as one JSON object on disk.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use num_craze_core::{KeyValueStore, StoreError};
use tracing::warn;

/// Name of the store file inside the data directory.
pub(crate) const STORE_FILE_NAME: &str = "store.json";

/// Store that writes every change through to `store.json`.
#[derive(Debug)]
pub(crate) struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens the store in `dir`, creating the directory when needed.
    ///
    /// A corrupt store file is logged and replaced by an empty store on the next write.
    pub(crate) fn open(dir: &Path) -> Result<Self, StoreError> {
        let path = dir.join(STORE_FILE_NAME);
        fs::create_dir_all(dir).map_err(|error| write_error(&path, &error))?;

        let values = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|error| {
                warn!(%error, path = %path.display(), "store file corrupt; starting empty");
                BTreeMap::new()
            }),
            Err(error) if error.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => {
                return Err(StoreError::Read {
                    key: path.display().to_string(),
                    reason: error.to_string(),
                })
            }
        };

        Ok(Self { path, values })
    }

    fn flush(&self, key: &str) -> Result<(), StoreError> {
        let encoded = serde_json::to_string_pretty(&self.values).map_err(|error| {
            StoreError::Write {
                key: key.to_owned(),
                reason: error.to_string(),
            }
        })?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, encoded)
            .and_then(|()| fs::rename(&staging, &self.path))
            .map_err(|error| StoreError::Write {
                key: key.to_owned(),
                reason: error.to_string(),
            })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let _ = self.values.insert(key.to_owned(), value.to_owned());
        self.flush(key)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.values.remove(key).is_none() {
            return Ok(());
        }
        self.flush(key)
    }
}

fn write_error(path: &Path, error: &io::Error) -> StoreError {
    StoreError::Write {
        key: path.display().to_string(),
        reason: error.to_string(),
    }
}
