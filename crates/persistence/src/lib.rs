#![deny(warnings)]

//! Persistence layer: a key-value record store with in-memory and
//! JSON-file backends.
//!
//! Records are whole JSON documents. Writes replace the record
//! (last writer wins); callers that need read-modify-write atomicity
//! serialize access themselves.

pub mod usage;

pub use usage::{record_use, UsageCounters, UsageKind, USES_KEY};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Keys are limited to ASCII letters, digits, `_` and `-`.
    #[error("invalid record key {0:?}")]
    InvalidKey(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// The record exists but does not decode as the requested type.
    #[error("record {key:?} has an unexpected shape: {source}")]
    Malformed {
        key: String,
        source: serde_json::Error,
    },
}

/// Key-value store of JSON records.
pub trait RecordStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn put(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

fn check_key(key: &str) -> Result<(), StoreError> {
    let ok = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// Typed read.
///
/// A record that exists but does not match `T` is an error, never `None`,
/// so callers cannot write a fresh default over data they failed to read.
pub fn load<T, S>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    S: RecordStore + ?Sized,
{
    let Some(value) = store.get(key)? else {
        return Ok(None);
    };
    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| StoreError::Malformed {
            key: key.to_string(),
            source,
        })
}

/// Typed write.
pub fn save<T, S>(store: &mut S, key: &str, value: &T) -> Result<(), StoreError>
where
    T: Serialize,
    S: RecordStore + ?Sized,
{
    store.put(key, serde_json::to_value(value)?)
}

/// Read-modify-write of one record, starting from `T::default()` when absent.
/// Nothing is written when the stored record fails to decode.
pub fn update<T, S, R>(
    store: &mut S,
    key: &str,
    f: impl FnOnce(&mut T) -> R,
) -> Result<R, StoreError>
where
    T: DeserializeOwned + Serialize + Default,
    S: RecordStore + ?Sized,
{
    let mut record: T = load(&*store, key)?.unwrap_or_default();
    let out = f(&mut record);
    save(store, key, &record)?;
    Ok(out)
}

/// Records held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        check_key(key)?;
        Ok(self.records.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        check_key(key)?;
        self.records.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        check_key(key)?;
        self.records.remove(key);
        Ok(())
    }
}

/// One pretty-printed `<key>.json` file per record under a directory.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> Result<PathBuf, StoreError> {
        check_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl RecordStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path(key)?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&text) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable record; treating as absent");
                Ok(None)
            }
        }
    }

    fn put(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        let path = self.path(key)?;
        fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&value)?)?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), "record written");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        n: u32,
    }

    fn exercise(store: &mut dyn RecordStore) {
        assert!(store.get("missing").unwrap().is_none());
        save(store, "counter", &Counter { n: 1 }).unwrap();
        let n = update(store, "counter", |c: &mut Counter| {
            c.n += 1;
            c.n
        })
        .unwrap();
        assert_eq!(n, 2);
        assert_eq!(
            load::<Counter, _>(&*store, "counter").unwrap(),
            Some(Counter { n: 2 })
        );
        store.remove("counter").unwrap();
        store.remove("counter").unwrap();
        assert!(store.get("counter").unwrap().is_none());
    }

    #[test]
    fn memory_store_round_trip() {
        exercise(&mut MemoryStore::new());
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&mut JsonFileStore::new(dir.path().join("data")));
    }

    #[test]
    fn keys_cannot_escape_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path());
        for key in ["", "../x", "a/b", "a.b"] {
            assert!(matches!(
                store.put(key, json!(1)),
                Err(StoreError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn corrupt_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("uses.json"), "{not json").unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.get("uses").unwrap().is_none());
    }

    #[test]
    fn mismatched_shape_is_an_error() {
        let mut store = MemoryStore::new();
        store.put("counter", json!(["not", "a", "counter"])).unwrap();
        assert!(matches!(
            load::<Counter, _>(&store, "counter"),
            Err(StoreError::Malformed { ref key, .. }) if key == "counter"
        ));
    }

    #[test]
    fn update_leaves_undecodable_record_untouched() {
        let mut store = MemoryStore::new();
        let stored = json!({"n": "seven"});
        store.put("counter", stored.clone()).unwrap();
        let result = update(&mut store, "counter", |c: &mut Counter| c.n += 1);
        assert!(matches!(result, Err(StoreError::Malformed { .. })));
        assert_eq!(store.get("counter").unwrap(), Some(stored));
    }
}
