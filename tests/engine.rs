//! End-to-end scenarios for the indexing advertisement engine, covering the
//! concrete walkthroughs used to validate the design.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use indexer_ad_engine::{
    CachedEntriesChunker, CancellationToken, ContentCallback, Ed25519Signer, Engine, EngineError,
    LinkSystem, MemoryLinkSystem, MemoryStore, Multihash, MultihashIterator, NoopPublishHook,
    PersistentStore, VecMultihashIterator,
};
use multihash_codetable::{Code, MultihashDigest};

fn mh(seed: u32) -> Multihash {
    Code::Sha2_256.digest(&seed.to_be_bytes())
}

fn seq(start: u32, count: u32) -> Vec<Multihash> {
    (start..start + count).map(mh).collect()
}

/// A callback backed by a fixed table of contextID -> multihashes, for
/// deterministic regeneration after eviction.
#[derive(Default)]
struct TableCallback {
    table: Mutex<HashMap<Vec<u8>, Vec<Multihash>>>,
}

impl TableCallback {
    fn new() -> Self {
        Self::default()
    }

    fn set(&self, context_id: &[u8], items: Vec<Multihash>) {
        self.table.lock().insert(context_id.to_vec(), items);
    }
}

impl ContentCallback for TableCallback {
    fn iterator_for(&self, context_id: &[u8]) -> Result<Box<dyn MultihashIterator>, EngineError> {
        let table = self.table.lock();
        let items = table.get(context_id).ok_or(EngineError::UnknownContext)?;
        Ok(Box::new(VecMultihashIterator::new(items.clone())))
    }
}

fn engine_with(
    chunk_size: usize,
    cache_capacity: usize,
) -> (Engine, Arc<dyn LinkSystem>, Arc<TableCallback>) {
    let link_system: Arc<dyn LinkSystem> = Arc::new(MemoryLinkSystem::new());
    let state_store: Arc<dyn PersistentStore> = Arc::new(MemoryStore::new());
    let signer = Box::new(Ed25519Signer::generate());
    let engine = Engine::with_backends(
        signer,
        vec!["/ip4/127.0.0.1/tcp/9999".into()],
        link_system.clone(),
        state_store,
        chunk_size,
        cache_capacity,
        Box::new(NoopPublishHook),
    );
    let callback = Arc::new(TableCallback::new());
    engine.register_callback(Box::new(CallbackHandle(callback.clone())));
    (engine, link_system, callback)
}

/// A thin `Box<dyn ContentCallback>` wrapper so the same `Arc<TableCallback>`
/// can be shared between the engine and the test for later mutation.
struct CallbackHandle(Arc<TableCallback>);

impl ContentCallback for CallbackHandle {
    fn iterator_for(&self, context_id: &[u8]) -> Result<Box<dyn MultihashIterator>, EngineError> {
        self.0.iterator_for(context_id)
    }
}

#[test]
fn basic_put_yields_fifteen_chunk_chain_and_verifiable_advertisement() {
    let (engine, _ls, callback) = engine_with(7, 16);
    callback.set(b"A", seq(0, 100));

    let link = engine
        .notify_put(b"A", b"M".to_vec(), &CancellationToken::new())
        .unwrap();

    let adv = engine.get_adv(&link).unwrap();
    assert_eq!(adv.previous_id, None);
    assert_eq!(adv.metadata.as_ref(), b"M");
    assert!(adv.entries.is_some());
}

#[test]
fn second_put_extends_the_chain() {
    let (engine, _ls, callback) = engine_with(7, 16);
    callback.set(b"A", seq(0, 100));
    callback.set(b"B", seq(1000, 50));

    let link1 = engine
        .notify_put(b"A", b"M".to_vec(), &CancellationToken::new())
        .unwrap();
    let link2 = engine
        .notify_put(b"B", b"M2".to_vec(), &CancellationToken::new())
        .unwrap();

    let adv2 = engine.get_adv(&link2).unwrap();
    assert_eq!(adv2.previous_id, Some(link1));
    assert_eq!(engine.get_latest_adv().unwrap().unwrap().0, link2);
}

#[test]
fn cache_alone_regenerates_the_same_root_after_eviction() {
    // Drives `CachedEntriesChunker` directly (no `ctx` mapping in the
    // persistent store, so the second `chunk_or_get_cached(b"A", ..)` call
    // below is a deliberate re-chunk, not a cache hit) to isolate the
    // chunker/cache regeneration guarantee from the engine's bookkeeping.
    // See `eviction_then_regeneration_through_the_engine` for the same
    // scenario driven end-to-end through `Engine::notify_put`.
    let link_system: Arc<dyn LinkSystem> = Arc::new(MemoryLinkSystem::new());
    let state_store: Arc<dyn PersistentStore> = Arc::new(MemoryStore::new());
    let callback = Arc::new(TableCallback::new());
    callback.set(b"A", seq(0, 12));
    callback.set(b"B", seq(1000, 10));

    let cache = CachedEntriesChunker::new(link_system.clone(), state_store.clone(), 2, 1);

    let root_a = cache
        .chunk_or_get_cached(b"A", || callback.iterator_for(b"A"), &CancellationToken::new())
        .unwrap();
    assert!(link_system.load(&root_a).is_ok());

    let _root_b = cache
        .chunk_or_get_cached(b"B", || callback.iterator_for(b"B"), &CancellationToken::new())
        .unwrap();
    assert!(link_system.load(&root_a).is_err(), "A's chunks should be evicted");

    let root_a_again = cache
        .chunk_or_get_cached(b"A", || callback.iterator_for(b"A"), &CancellationToken::new())
        .unwrap();
    assert_eq!(root_a, root_a_again);
    assert!(link_system.load(&root_a_again).is_ok());
}

#[test]
fn eviction_then_regeneration_through_the_engine() {
    // SPEC_FULL §8 scenario 3, driven through the public `Engine` contract:
    // two `notify_put`s for distinct contexts with `cache_capacity=1` evicts
    // the first context's chain, and a third `notify_put` that reuses the
    // first context's (unchanged) callback output regenerates the identical
    // `entries_root` rather than failing or diverging.
    let (engine, ls, callback) = engine_with(2, 1);
    callback.set(b"A", seq(0, 12));
    callback.set(b"B", seq(1000, 10));

    let link_a1 = engine
        .notify_put(b"A", b"M".to_vec(), &CancellationToken::new())
        .unwrap();
    let adv_a1 = engine.get_adv(&link_a1).unwrap();
    let root_a = adv_a1.entries.unwrap();
    assert!(ls.load(&root_a).is_ok());

    engine
        .notify_put(b"B", b"M2".to_vec(), &CancellationToken::new())
        .unwrap();
    assert!(ls.load(&root_a).is_err(), "A's chain should be evicted once B is cached");

    let link_a2 = engine
        .notify_put(b"A", b"M3".to_vec(), &CancellationToken::new())
        .unwrap();
    let adv_a2 = engine.get_adv(&link_a2).unwrap();
    assert_eq!(adv_a2.entries, Some(root_a), "regenerated root must match the original");
    assert!(ls.load(&root_a).is_ok(), "regenerated chain must be stored again");
}

#[test]
fn repeated_put_with_unchanged_callback_reuses_the_entries_root_but_advances_the_chain() {
    // SPEC_FULL §8 round-trip law: repeated `notify_put(ctx, m)` with an
    // unchanged callback output yields the same `entries_root` across calls
    // but distinct advertisement links, since `PreviousID` advances.
    let (engine, _ls, callback) = engine_with(7, 16);
    callback.set(b"A", seq(0, 20));

    let link1 = engine
        .notify_put(b"A", b"M1".to_vec(), &CancellationToken::new())
        .unwrap();
    let link2 = engine
        .notify_put(b"A", b"M2".to_vec(), &CancellationToken::new())
        .unwrap();

    assert_ne!(link1, link2, "each put appends a distinct advertisement");
    let adv1 = engine.get_adv(&link1).unwrap();
    let adv2 = engine.get_adv(&link2).unwrap();
    assert_eq!(adv1.entries, adv2.entries, "unchanged callback output is a cache hit");
    assert_eq!(adv2.previous_id, Some(link1));
}

#[test]
fn restore_context_warms_the_cache_for_a_context_known_from_a_previous_process() {
    // Simulates an engine restart: the first engine's `head`/`ctx` state and
    // link-system blocks survive (shared backends below), but a fresh
    // `Engine` has a cold in-memory LRU until `restore_context` seeds it.
    let link_system: Arc<dyn LinkSystem> = Arc::new(MemoryLinkSystem::new());
    let state_store: Arc<dyn PersistentStore> = Arc::new(MemoryStore::new());
    let signer = Ed25519Signer::generate();
    let callback = Arc::new(TableCallback::new());
    callback.set(b"A", seq(0, 12));

    let first_run = Engine::with_backends(
        Box::new(Ed25519Signer::generate()),
        vec![],
        link_system.clone(),
        state_store.clone(),
        2,
        1,
        Box::new(NoopPublishHook),
    );
    first_run.register_callback(Box::new(CallbackHandle(callback.clone())));
    let link1 = first_run
        .notify_put(b"A", b"M".to_vec(), &CancellationToken::new())
        .unwrap();
    let root_a = first_run.get_adv(&link1).unwrap().entries.unwrap();

    let second_run = Engine::with_backends(
        Box::new(signer),
        vec![],
        link_system.clone(),
        state_store,
        2,
        1,
        Box::new(NoopPublishHook),
    );
    second_run.register_callback(Box::new(CallbackHandle(callback)));
    second_run.restore_context(b"A", root_a).unwrap();

    let link2 = second_run
        .notify_put(b"A", b"M2".to_vec(), &CancellationToken::new())
        .unwrap();
    let adv2 = second_run.get_adv(&link2).unwrap();
    assert_eq!(adv2.entries, Some(root_a), "restored root must be reused without re-chunking");
}

#[test]
fn removal_then_second_removal_fails() {
    let (engine, _ls, callback) = engine_with(7, 16);
    callback.set(b"A", seq(0, 100));

    let put_link = engine
        .notify_put(b"A", b"M".to_vec(), &CancellationToken::new())
        .unwrap();
    let put_adv = engine.get_adv(&put_link).unwrap();

    let rm_link = engine.notify_remove(b"A").unwrap();
    let rm_adv = engine.get_adv(&rm_link).unwrap();
    assert!(rm_adv.is_rm);
    assert_eq!(rm_adv.entries, put_adv.entries);

    assert!(matches!(engine.notify_remove(b"A"), Err(EngineError::UnknownContext)));
}

#[test]
fn empty_callback_fails_and_leaves_head_unchanged() {
    let (engine, _ls, callback) = engine_with(7, 16);
    callback.set(b"A", vec![]);

    assert!(engine.get_latest_adv().unwrap().is_none());
    let result = engine.notify_put(b"A", b"M".to_vec(), &CancellationToken::new());
    assert!(matches!(result, Err(EngineError::EmptyIterator)));
    assert!(engine.get_latest_adv().unwrap().is_none());
}

#[test]
fn advertisement_signature_verifies_against_the_provider_key() {
    let link_system: Arc<dyn LinkSystem> = Arc::new(MemoryLinkSystem::new());
    let state_store: Arc<dyn PersistentStore> = Arc::new(MemoryStore::new());
    let signer = Ed25519Signer::generate();
    let verifying_key = signer.verifying_key();

    let engine = Engine::with_backends(
        Box::new(signer),
        vec![],
        link_system,
        state_store,
        7,
        16,
        Box::new(NoopPublishHook),
    );
    let callback = Arc::new(TableCallback::new());
    callback.set(b"A", seq(0, 20));
    engine.register_callback(Box::new(CallbackHandle(callback)));

    let link = engine
        .notify_put(b"A", b"M".to_vec(), &CancellationToken::new())
        .unwrap();
    let adv = engine.get_adv(&link).unwrap();
    adv.verify(&verifying_key).unwrap();
}

#[test]
fn put_without_a_registered_callback_fails() {
    let link_system: Arc<dyn LinkSystem> = Arc::new(MemoryLinkSystem::new());
    let state_store: Arc<dyn PersistentStore> = Arc::new(MemoryStore::new());
    let engine = Engine::with_backends(
        Box::new(Ed25519Signer::generate()),
        vec![],
        link_system,
        state_store,
        7,
        16,
        Box::new(NoopPublishHook),
    );

    let result = engine.notify_put(b"A", b"M".to_vec(), &CancellationToken::new());
    assert!(matches!(result, Err(EngineError::NoCallback)));
}

#[test]
fn closed_engine_rejects_further_operations() {
    let (engine, _ls, callback) = engine_with(7, 16);
    callback.set(b"A", seq(0, 10));
    engine
        .notify_put(b"A", b"M".to_vec(), &CancellationToken::new())
        .unwrap();

    engine.close();
    engine.close(); // idempotent

    let result = engine.notify_put(b"B", b"M".to_vec(), &CancellationToken::new());
    assert!(matches!(result, Err(EngineError::Closed)));
}
