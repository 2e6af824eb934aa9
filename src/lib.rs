//! An indexing advertisement engine for a content-routing provider.
//!
//! Callers register a [`engine::ContentCallback`] that, given a contextID,
//! produces the multihashes the provider serves under that context. The
//! engine chunks those multihashes into a content-addressed, singly-linked
//! [`chunker::EntryChain`], caches the result under a bounded LRU, wraps the
//! chain's root into a signed [`advertisement::Advertisement`], and appends
//! it to a per-provider, append-only [`chain::AdvertisementChain`].
//!
//! Process lifecycle, libp2p transport, HTTP admin endpoints, the
//! peer-facing advertisement-serving protocol, CAR-file ingestion, and
//! pubsub announcement are all out of scope here — this crate is the core
//! that those collaborators are built around.

pub mod advertisement;
pub mod cache;
pub mod cancel;
pub mod chain;
pub mod chunker;
pub mod config;
pub mod engine;
pub mod error;
pub mod link;
pub mod linksystem;
pub mod multihash_iter;
pub mod store;

pub use advertisement::{Advertisement, Ed25519Signer, Signer};
pub use cache::CachedEntriesChunker;
pub use cancel::CancellationToken;
pub use chain::AdvertisementChain;
pub use chunker::{EntryChunk, EntryChunker};
pub use config::EngineConfig;
pub use engine::{ContentCallback, Engine, NoopPublishHook, PublishHook};
pub use error::{EngineError, Result};
pub use link::Link;
pub use linksystem::{FileLinkSystem, LinkSystem, MemoryLinkSystem};
pub use multihash_iter::{Multihash, MultihashIterator, VecMultihashIterator};
pub use store::{FileStore, MemoryStore, PersistentStore};
