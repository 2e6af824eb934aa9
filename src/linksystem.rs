//! Content-addressed block storage.
//!
//! Mirrors the split the reference crate uses for chunk storage: a small
//! trait describing the three operations the core needs (`store`, `load`,
//! `delete`), and at least one concrete, on-disk implementation that lays
//! blocks out as one file per digest under a store directory.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::EngineError;
use crate::link::{link_for_bytes, Link};

/// Content-addressed block store abstraction consumed by the chunker, the
/// cache, and the advertisement chain.
///
/// Implementations must guarantee: deterministic hashing, `load(store(b))
/// == b`, and that `store` is idempotent for identical bytes.
pub trait LinkSystem: Send + Sync {
    /// Content-address and persist a block, returning its link.
    fn store(&self, block: &[u8]) -> Result<Link, EngineError>;

    /// Load a previously stored block.
    fn load(&self, link: &Link) -> Result<Bytes, EngineError>;

    /// Remove a block. Used only by the cache on eviction; removing an
    /// absent block is not an error (eviction bookkeeping may race with a
    /// link that was never actually written, e.g. after a partial chunk
    /// failure).
    fn delete(&self, link: &Link) -> Result<(), EngineError>;
}

/// An in-memory [`LinkSystem`], the default for tests and small engines.
#[derive(Default)]
pub struct MemoryLinkSystem {
    blocks: Mutex<HashMap<Link, Bytes>>,
}

impl MemoryLinkSystem {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LinkSystem for MemoryLinkSystem {
    fn store(&self, block: &[u8]) -> Result<Link, EngineError> {
        let link = link_for_bytes(block);
        self.blocks.lock().entry(link).or_insert_with(|| Bytes::copy_from_slice(block));
        Ok(link)
    }

    fn load(&self, link: &Link) -> Result<Bytes, EngineError> {
        self.blocks
            .lock()
            .get(link)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(link.to_string()))
    }

    fn delete(&self, link: &Link) -> Result<(), EngineError> {
        self.blocks.lock().remove(link);
        Ok(())
    }
}

/// An on-disk [`LinkSystem`] that stores each block under `base_dir`, keyed
/// by the base32 form of its link (the same form `Cid::to_string()`
/// produces), the on-disk analogue of the reference crate's
/// digest-addressed chunk paths.
pub struct FileLinkSystem {
    base_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLinkSystem {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> io::Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir, write_lock: Mutex::new(()) })
    }

    /// Shard blocks two hex characters deep so a single directory never
    /// accumulates an unreasonable number of entries.
    fn block_path(&self, link: &Link) -> PathBuf {
        let name = link.to_string();
        let shard = &name[..name.len().min(2)];
        self.base_dir.join(shard).join(name)
    }
}

impl LinkSystem for FileLinkSystem {
    fn store(&self, block: &[u8]) -> Result<Link, EngineError> {
        let link = link_for_bytes(block);
        let path = self.block_path(&link);

        let _guard = self.write_lock.lock();
        if path.exists() {
            return Ok(link);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write via a temp file + rename so a reader never observes a
        // partially written block.
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, block)?;
        fs::rename(&tmp_path, &path)?;

        Ok(link)
    }

    fn load(&self, link: &Link) -> Result<Bytes, EngineError> {
        let path = self.block_path(link);
        match fs::read(&path) {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(EngineError::NotFound(link.to_string()))
            }
            Err(err) => {
                log::error!("failed to read block {link} from {}: {err}", path.display());
                Err(EngineError::StoreIo(err))
            }
        }
    }

    fn delete(&self, link: &Link) -> Result<(), EngineError> {
        let path = self.block_path(link);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                log::error!("failed to delete block {link} at {}: {err}", path.display());
                Err(EngineError::StoreIo(err))
            }
        }
    }
}
