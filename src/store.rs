//! The small typed key-value store backing `head` and the per-context
//! entries-root bookkeeping.
//!
//! This is intentionally narrow — just `get`/`put`/`delete` over byte
//! strings — mirroring the reference crate's preference for the smallest
//! store abstraction a component actually needs rather than a general
//! database trait.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use parking_lot::RwLock;

use crate::error::EngineError;

/// Persistent key-value store abstraction used for the advertisement
/// chain's `head` pointer and the `ctx/<contextID>` → entries-root map.
pub trait PersistentStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, EngineError>;
    fn put(&self, key: &str, value: &[u8]) -> Result<(), EngineError>;
    fn delete(&self, key: &str) -> Result<(), EngineError>;
}

/// An in-memory [`PersistentStore`], the default for tests.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, EngineError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), EngineError> {
        self.data.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), EngineError> {
        self.data.write().remove(key);
        Ok(())
    }
}

/// An on-disk [`PersistentStore`]: one file per key under `base_dir`, with
/// the key's hex-escaped form as the filename (so arbitrary contextID bytes
/// can't escape the directory or collide with `/`-separated key namespaces
/// like `ctx/<contextID>`).
pub struct FileStore {
    base_dir: PathBuf,
    write_lock: parking_lot::Mutex<()>,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> io::Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir, write_lock: parking_lot::Mutex::new(()) })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(hex::encode(key.as_bytes()))
    }
}

impl PersistentStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, EngineError> {
        match fs::read(self.path_for(key)) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                log::error!("failed to read store key {key}: {err}");
                Err(EngineError::StoreIo(err))
            }
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), EngineError> {
        let path = self.path_for(key);
        let _guard = self.write_lock.lock();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), EngineError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                log::error!("failed to delete store key {key}: {err}");
                Err(EngineError::StoreIo(err))
            }
        }
    }
}

/// The store key holding the advertisement chain head link.
pub const HEAD_KEY: &str = "head";

/// Build the store key for the last-known entries root of `context_id`.
pub fn ctx_key(context_id: &[u8]) -> String {
    format!("ctx/{}", hex::encode(context_id))
}
