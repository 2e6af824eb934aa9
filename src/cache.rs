//! An LRU-bounded wrapper over [`EntryChunker`] that avoids re-chunking a
//! contextID's content on every put and reclaims storage for chains that
//! fall out of the working set.
//!
//! The cache key is the chain's own root [`Link`], not the contextID: two
//! contextIDs whose content hashes the same share one cached chain. Which
//! root belongs to which contextID is tracked two ways: an in-memory
//! `context_roots` map updated the moment a root is admitted (so a second
//! caller for the same, never-before-seen contextID that was waiting on
//! `inner`'s mutex sees it immediately, independent of anything written to
//! the [`PersistentStore`]), and the `ctx/<contextID>` mapping that
//! [`crate::chain::AdvertisementChain`] writes on append, consulted as a
//! fallback so a freshly restarted process can still resolve a contextID it
//! has not chunked since coming up.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;

use crate::cancel::CancellationToken;
use crate::chunker::EntryChunker;
use crate::error::EngineError;
use crate::link::Link;
use crate::linksystem::LinkSystem;
use crate::multihash_iter::MultihashIterator;
use crate::store::{ctx_key, PersistentStore};

struct Inner {
    /// Root link -> every chunk link reachable from it, so eviction knows
    /// exactly what to delete from the link system.
    entries: LruCache<Link, Vec<Link>>,
    /// ContextID -> the root it last resolved to, kept purely in memory so a
    /// concurrent first-time caller for the same contextID can be resolved
    /// without re-chunking, without waiting on a store write that only
    /// happens later (in `AdvertisementChain::append`). A stale entry
    /// pointing at an evicted root is harmless: the cache-hit check below
    /// re-verifies LRU residency before trusting it.
    context_roots: HashMap<Vec<u8>, Link>,
}

/// Coalesces concurrent `chunk_or_get_cached` calls and evicts the
/// least-recently-used chain once the cache is at capacity.
///
/// The single mutex below is held for the duration of a cache miss's whole
/// chunking pass: a second caller for the *same* contextID that arrives
/// while a first is chunking blocks on this mutex and, once it acquires it,
/// finds `context_roots` already populated and returns that root directly —
/// true single-flight, not just serialization. Callers for *distinct*
/// contextIDs are also serialized by this same mutex (a stronger guarantee
/// than the invariant requires, traded here for simplicity).
pub struct CachedEntriesChunker {
    chunker: EntryChunker,
    link_system: Arc<dyn LinkSystem>,
    store: Arc<dyn PersistentStore>,
    inner: Mutex<Inner>,
}

impl CachedEntriesChunker {
    pub fn new(
        link_system: Arc<dyn LinkSystem>,
        store: Arc<dyn PersistentStore>,
        chunk_size: usize,
        capacity: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(capacity).expect("cache capacity must be >= 1");
        Self {
            chunker: EntryChunker::new(link_system.clone(), chunk_size),
            link_system,
            store,
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                context_roots: HashMap::new(),
            }),
        }
    }

    /// Return the cached root for `context_id` if one is resident in the
    /// cache — checked first against the in-memory `context_roots` index,
    /// then against the persistent store's `ctx/<contextID>` mapping — or
    /// else drain `make_iterator()` through the chunker, admit the result,
    /// and return its root.
    pub fn chunk_or_get_cached(
        &self,
        context_id: &[u8],
        make_iterator: impl FnOnce() -> Result<Box<dyn MultihashIterator>, EngineError>,
        cancel: &CancellationToken,
    ) -> Result<Link, EngineError> {
        let mut inner = self.inner.lock();

        if let Some(&root) = inner.context_roots.get(context_id) {
            if inner.entries.get(&root).is_some() {
                log::debug!("single-flight cache hit for contextID, root {root}");
                return Ok(root);
            }
        }

        if let Some(root) = self.last_known_root(context_id)? {
            if inner.entries.get(&root).is_some() {
                log::debug!("cache hit for contextID, root {root}");
                inner.context_roots.insert(context_id.to_vec(), root);
                return Ok(root);
            }
        }

        cancel.check()?;
        let root = self.chunker.chunk(make_iterator()?, cancel)?;
        self.admit(&mut inner, root)?;
        inner.context_roots.insert(context_id.to_vec(), root);
        Ok(root)
    }

    /// Pre-seed the cache with a chain that is already known for
    /// `context_id` (e.g. recovered from a previous process) without
    /// re-running the chunker. Records the `ctx/<contextID>` mapping in the
    /// persistent store (a no-op if it is already there) so a later
    /// `chunk_or_get_cached` for the same contextID resolves to `root`, then
    /// admits `root` into the LRU the same way a fresh chunk would be.
    pub fn restore(&self, context_id: &[u8], root: Link) -> Result<(), EngineError> {
        let (root_bytes, _) = crate::link::encode_and_link(&root)?;
        self.store.put(&ctx_key(context_id), &root_bytes)?;

        let mut inner = self.inner.lock();
        self.admit(&mut inner, root)?;
        inner.context_roots.insert(context_id.to_vec(), root);
        Ok(())
    }

    /// Load a chunk's raw bytes if its link belongs to a chain currently
    /// resident in the cache.
    pub fn get_raw_cached_chunk(&self, link: &Link) -> Result<Option<Bytes>, EngineError> {
        let inner = self.inner.lock();
        let resident = inner.entries.iter().any(|(_, links)| links.contains(link));
        drop(inner);
        if !resident {
            return Ok(None);
        }
        Ok(Some(self.link_system.load(link)?))
    }

    /// Drop every entry from the cache without touching the underlying
    /// link system; chains already written remain retrievable by link, just
    /// no longer tracked for eviction.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.context_roots.clear();
    }

    fn last_known_root(&self, context_id: &[u8]) -> Result<Option<Link>, EngineError> {
        let key = ctx_key(context_id);
        match self.store.get(&key)? {
            Some(bytes) => Ok(Some(crate::link::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn admit(&self, inner: &mut Inner, root: Link) -> Result<(), EngineError> {
        if inner.entries.get(&root).is_some() {
            return Ok(());
        }

        let links = self.chunker.chain_links(root)?;
        log::debug!("admitting chain with root {root} ({} chunks) into cache", links.len());

        if let Some((evicted_root, evicted_links)) = inner.entries.push(root, links) {
            if evicted_root != root {
                log::info!(
                    "evicting chain with root {evicted_root} ({} chunks) from cache",
                    evicted_links.len()
                );
                for link in &evicted_links {
                    self.link_system.delete(link)?;
                }
            }
        }

        Ok(())
    }
}
