//! The per-provider, append-only advertisement chain.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::advertisement::{build_and_sign, Advertisement, Signer};
use crate::error::EngineError;
use crate::link::Link;
use crate::linksystem::LinkSystem;
use crate::store::{ctx_key, PersistentStore, HEAD_KEY};

/// Maintains `head` and appends new [`Advertisement`]s under a single write
/// mutex, so the chain is linearized regardless of caller concurrency.
pub struct AdvertisementChain {
    link_system: Arc<dyn LinkSystem>,
    store: Arc<dyn PersistentStore>,
    write_lock: Mutex<()>,
}

impl AdvertisementChain {
    pub fn new(link_system: Arc<dyn LinkSystem>, store: Arc<dyn PersistentStore>) -> Self {
        Self { link_system, store, write_lock: Mutex::new(()) }
    }

    /// Current head link, or `None` before the genesis advertisement.
    pub fn head(&self) -> Result<Option<Link>, EngineError> {
        match self.store.get(HEAD_KEY)? {
            Some(bytes) => Ok(Some(crate::link::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Load and deserialize a previously appended advertisement.
    pub fn get(&self, link: &Link) -> Result<Advertisement, EngineError> {
        let bytes = self.link_system.load(link)?;
        crate::link::decode(&bytes)
    }

    /// Build, sign, and append a new advertisement, then atomically advance
    /// `head` and the `ctx/<contextID>` mapping.
    #[allow(clippy::too_many_arguments)]
    pub fn append(
        &self,
        signer: &dyn Signer,
        addresses: Vec<String>,
        entries_root: Option<Link>,
        context_id: Vec<u8>,
        metadata: Vec<u8>,
        is_rm: bool,
    ) -> Result<Link, EngineError> {
        let _guard = self.write_lock.lock();

        let previous = self.head()?;
        let adv = build_and_sign(
            signer,
            previous,
            addresses,
            entries_root,
            context_id.clone(),
            metadata,
            is_rm,
        )?;

        let (bytes, link) = crate::link::encode_and_link(&adv)?;
        self.link_system.store(&bytes)?;

        let (head_bytes, _) = crate::link::encode_and_link(&link)?;
        self.store.put(HEAD_KEY, &head_bytes)?;
        if let Some(root) = entries_root {
            let (root_bytes, _) = crate::link::encode_and_link(&root)?;
            self.store.put(&ctx_key(&context_id), &root_bytes)?;
        }

        log::info!("appended advertisement {link}, new head");
        Ok(link)
    }

    /// Look up the last-known entries root recorded for `context_id`.
    pub fn entries_root_for(&self, context_id: &[u8]) -> Result<Option<Link>, EngineError> {
        match self.store.get(&ctx_key(context_id))? {
            Some(bytes) => Ok(Some(crate::link::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Remove the `ctx/<contextID>` mapping, e.g. after a successful removal
    /// advertisement.
    pub fn forget_context(&self, context_id: &[u8]) -> Result<(), EngineError> {
        self.store.delete(&ctx_key(context_id))
    }
}
