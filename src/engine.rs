//! Ties the cache, the advertisement chain, and the callback registry
//! together into the public engine contract.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::advertisement::{Advertisement, Signer};
use crate::cache::CachedEntriesChunker;
use crate::cancel::CancellationToken;
use crate::chain::AdvertisementChain;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::link::Link;
use crate::linksystem::{FileLinkSystem, LinkSystem};
use crate::multihash_iter::MultihashIterator;
use crate::store::{FileStore, PersistentStore};

/// Caller-supplied source of content for a contextID.
///
/// Must be deterministic: repeated calls for the same `context_id` must
/// yield sequences that hash to the same chain root, or regeneration after
/// eviction will diverge from an already-published advertisement.
pub trait ContentCallback: Send + Sync {
    /// Produce a fresh multihash iterator for `context_id`, or
    /// `Err(EngineError::UnknownContext)` if this callback has no data for
    /// it.
    fn iterator_for(&self, context_id: &[u8]) -> Result<Box<dyn MultihashIterator>, EngineError>;
}

/// Invoked synchronously after a successful append; responsible for
/// transport-level dissemination. Failures are logged and treated as
/// non-fatal — they never turn a successful `notify_put`/`notify_remove`
/// into an `Err`.
pub trait PublishHook: Send + Sync {
    fn publish(&self, adv_link: Link) -> Result<(), EngineError>;
}

/// A [`PublishHook`] that does nothing, the default when no transport is
/// wired up.
pub struct NoopPublishHook;

impl PublishHook for NoopPublishHook {
    fn publish(&self, _adv_link: Link) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Orchestrates the callback registry, the cached chunker, the
/// advertisement chain, and the publication hook.
pub struct Engine {
    signer: Box<dyn Signer>,
    addresses: Vec<String>,
    cache: CachedEntriesChunker,
    chain: AdvertisementChain,
    callback: RwLock<Option<Box<dyn ContentCallback>>>,
    publish_hook: Box<dyn PublishHook>,
    closed: AtomicBool,
}

impl Engine {
    /// Build an engine from a validated configuration and its storage
    /// backends. The caller supplies the `Signer` (provider identity) and
    /// may override the publish hook; `NoopPublishHook` is used otherwise.
    pub fn new(config: &EngineConfig, signer: Box<dyn Signer>) -> Result<Self, EngineError> {
        config.validate()?;

        let link_system: Arc<dyn LinkSystem> =
            Arc::new(FileLinkSystem::new(&config.link_store_path)?);
        let state_store: Arc<dyn PersistentStore> =
            Arc::new(FileStore::new(&config.state_store_path)?);

        Ok(Self {
            signer,
            addresses: config.addresses.clone(),
            cache: CachedEntriesChunker::new(
                link_system.clone(),
                state_store.clone(),
                config.chunk_size as usize,
                config.cache_capacity,
            ),
            chain: AdvertisementChain::new(link_system, state_store),
            callback: RwLock::new(None),
            publish_hook: Box::new(NoopPublishHook),
            closed: AtomicBool::new(false),
        })
    }

    /// Build an engine directly from already-constructed backends, used by
    /// tests and by callers who want in-memory storage.
    pub fn with_backends(
        signer: Box<dyn Signer>,
        addresses: Vec<String>,
        link_system: Arc<dyn LinkSystem>,
        state_store: Arc<dyn PersistentStore>,
        chunk_size: usize,
        cache_capacity: usize,
        publish_hook: Box<dyn PublishHook>,
    ) -> Self {
        Self {
            signer,
            addresses,
            cache: CachedEntriesChunker::new(
                link_system.clone(),
                state_store.clone(),
                chunk_size,
                cache_capacity,
            ),
            chain: AdvertisementChain::new(link_system, state_store),
            callback: RwLock::new(None),
            publish_hook,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(EngineError::Closed)
        } else {
            Ok(())
        }
    }

    /// Install the single callback invoked to materialize multihash
    /// iterators. Re-registration atomically replaces any previous one.
    pub fn register_callback(&self, callback: Box<dyn ContentCallback>) {
        *self.callback.write() = Some(callback);
    }

    /// Pre-seed the cache for `context_id` with an already-known `root_link`
    /// without rebuilding it, so a following `notify_put` for that context
    /// is a cache hit instead of re-running the chunker.
    ///
    /// Intended for engine startup: the persistent store's `head` and
    /// `ctx/<contextID>` entries survive a restart, but the in-memory LRU
    /// does not, so callers that track which contextIDs they have active
    /// (this crate's minimal store has no key-enumeration operation to
    /// discover that set on its own) call this once per known context after
    /// construction to warm the cache back up.
    pub fn restore_context(&self, context_id: &[u8], root_link: Link) -> Result<(), EngineError> {
        self.ensure_open()?;
        self.cache.restore(context_id, root_link)
    }

    /// Register content for `context_id` and append a put advertisement.
    pub fn notify_put(
        &self,
        context_id: &[u8],
        metadata: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<Link, EngineError> {
        self.ensure_open()?;
        cancel.check()?;

        let entries_root = {
            let guard = self.callback.read();
            let callback = guard.as_ref().ok_or(EngineError::NoCallback)?;
            self.cache.chunk_or_get_cached(
                context_id,
                || callback.iterator_for(context_id),
                cancel,
            )?
        };

        cancel.check()?;

        let adv_link = self.chain.append(
            self.signer.as_ref(),
            self.addresses.clone(),
            Some(entries_root),
            context_id.to_vec(),
            metadata,
            false,
        )?;

        if let Err(err) = self.publish_hook.publish(adv_link) {
            log::warn!("publish hook failed for advertisement {adv_link}: {err}");
        }

        Ok(adv_link)
    }

    /// Append a removal advertisement for `context_id`, reusing its
    /// last-known entries root.
    pub fn notify_remove(&self, context_id: &[u8]) -> Result<Link, EngineError> {
        self.ensure_open()?;

        let entries_root = self
            .chain
            .entries_root_for(context_id)?
            .ok_or(EngineError::UnknownContext)?;

        let adv_link = self.chain.append(
            self.signer.as_ref(),
            self.addresses.clone(),
            Some(entries_root),
            context_id.to_vec(),
            Vec::new(),
            true,
        )?;

        self.chain.forget_context(context_id)?;

        if let Err(err) = self.publish_hook.publish(adv_link) {
            log::warn!("publish hook failed for advertisement {adv_link}: {err}");
        }

        Ok(adv_link)
    }

    /// Load a previously published advertisement by link.
    pub fn get_adv(&self, link: &Link) -> Result<Advertisement, EngineError> {
        self.ensure_open()?;
        self.chain.get(link)
    }

    /// Read the chain head and load its advertisement, if any.
    pub fn get_latest_adv(&self) -> Result<Option<(Link, Advertisement)>, EngineError> {
        self.ensure_open()?;
        match self.chain.head()? {
            Some(link) => {
                let adv = self.chain.get(&link)?;
                Ok(Some((link, adv)))
            }
            None => Ok(None),
        }
    }

    /// Marks the engine closed. Idempotent: a second call is a no-op.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
