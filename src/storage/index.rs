use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A `key -> record` mapping persisted as a single pretty-printed JSON object.
///
/// Every mutation is a full read-modify-write of the file. Mutations made through the
/// same `JsonIndex` are serialized, so one process owning the file never loses updates.
/// Two processes writing the same file still race (last writer wins).
pub struct JsonIndex<T> {
    path: PathBuf,
    write_lock: Mutex<()>,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonIndex<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Bind an index to `path`, creating the parent directory. The file itself is
    /// created lazily by the first write.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
            _record: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the index file has ever been written.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the whole index. A missing file is an empty index.
    pub fn load(&self) -> Result<BTreeMap<String, T>, StoreError> {
        match std::fs::read(&self.path) {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<T>, StoreError> {
        let mut entries = self.load()?;
        Ok(entries.remove(key))
    }

    pub fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.load()?.contains_key(key))
    }

    /// Insert or replace the record stored under `key`.
    pub fn insert(&self, key: &str, record: T) -> Result<(), StoreError> {
        let _guard = self.lock();
        let mut entries = self.load()?;
        entries.insert(key.to_string(), record);
        self.save(&entries)
    }

    /// Insert only when `key` is free. Returns false (and writes nothing) when taken.
    pub fn insert_new(&self, key: &str, record: T) -> Result<bool, StoreError> {
        let _guard = self.lock();
        let mut entries = self.load()?;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), record);
        self.save(&entries)?;
        Ok(true)
    }

    /// Remove `key`, returning the record it held.
    pub fn remove(&self, key: &str) -> Result<Option<T>, StoreError> {
        let _guard = self.lock();
        let mut entries = self.load()?;
        let removed = entries.remove(key);
        if removed.is_some() {
            self.save(&entries)?;
        }
        Ok(removed)
    }

    /// Apply `f` to the record under `key` and persist it. Returns the updated record,
    /// or `None` (without writing) when the key is absent.
    pub fn update<F>(&self, key: &str, f: F) -> Result<Option<T>, StoreError>
    where
        F: FnOnce(&mut T),
        T: Clone,
    {
        let _guard = self.lock();
        let mut entries = self.load()?;
        let updated = match entries.get_mut(key) {
            Some(record) => {
                f(record);
                record.clone()
            }
            None => return Ok(None),
        };
        self.save(&entries)?;
        Ok(Some(updated))
    }

    fn save(&self, entries: &BTreeMap<String, T>) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, data)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
