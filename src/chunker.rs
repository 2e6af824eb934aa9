//! The one-shot chunker: turns a lazy multihash sequence into a persisted,
//! content-addressed singly-linked chain of [`EntryChunk`] blocks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::error::EngineError;
use crate::link::{encode_and_link, Link};
use crate::linksystem::LinkSystem;
use crate::multihash_iter::{Multihash, MultihashIterator};

/// An immutable block carrying a slice of multihashes and a link to the
/// next chunk in the chain (absent on the terminal chunk).
///
/// Field names mirror the wire schema's capitalized form so the DAG-CBOR
/// encoding matches what downstream indexers expect on the wire, while the
/// in-memory struct stays idiomatic Rust.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryChunk {
    #[serde(rename = "Entries")]
    pub entries: Vec<Multihash>,
    #[serde(rename = "Next")]
    pub next: Option<Link>,
}

/// Materializes a [`MultihashIterator`] into a chain of [`EntryChunk`]
/// blocks in a [`LinkSystem`] and returns the root (iteration-order first)
/// chunk's link.
///
/// Chunks are linked in reverse order of emission: the terminal chunk
/// (last in iteration order) has `next = None` and is written first; each
/// preceding chunk's `next` points at the chunk written after it. This is
/// unavoidable under content addressing — a chunk's link depends on its
/// `next` field, so the chain must be built tail-first.
pub struct EntryChunker {
    link_system: Arc<dyn LinkSystem>,
    chunk_size: usize,
}

impl EntryChunker {
    pub fn new(link_system: Arc<dyn LinkSystem>, chunk_size: usize) -> Self {
        assert!(chunk_size >= 1, "ChunkSize must be >= 1");
        Self { link_system, chunk_size }
    }

    /// Drain `iterator` and write the resulting chain, returning its root link.
    pub fn chunk(
        &self,
        mut iterator: Box<dyn MultihashIterator>,
        cancel: &CancellationToken,
    ) -> Result<Link, EngineError> {
        let mut all = Vec::new();
        while let Some(mh) = iterator.next_multihash()? {
            all.push(mh);
        }

        if all.is_empty() {
            return Err(EngineError::EmptyIterator);
        }

        let mut next: Option<Link> = None;
        for group in all.chunks(self.chunk_size).rev() {
            cancel.check()?;
            let chunk = EntryChunk { entries: group.to_vec(), next };
            let (bytes, _link) = encode_and_link(&chunk)?;
            let stored = self.link_system.store(&bytes)?;
            next = Some(stored);
        }

        // `all` was non-empty, so at least one chunk was emitted.
        Ok(next.expect("chunking a non-empty sequence always yields a root link"))
    }

    /// Enumerate every chunk link reachable from `root`, in chain order.
    /// Used by the cache to know exactly what to delete on eviction.
    pub fn chain_links(&self, root: Link) -> Result<Vec<Link>, EngineError> {
        let mut links = Vec::new();
        let mut current = Some(root);
        while let Some(link) = current {
            links.push(link);
            let bytes = self.link_system.load(&link)?;
            let chunk: EntryChunk = crate::link::decode(&bytes)?;
            current = chunk.next;
        }
        Ok(links)
    }
}
