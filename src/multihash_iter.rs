//! Lazy, forward-only multihash sequences handed to the chunker.

use crate::error::EngineError;

/// Concrete multihash type used throughout this crate: a SHA2-256 (or other
/// codetable-registered) digest, self-describing per the multihash spec.
pub type Multihash = multihash::Multihash<64>;

/// A lazy, forward-only sequence of multihashes produced by a callback.
///
/// The iterator is not required to be restartable: the engine never rewinds
/// one. Whenever re-materialization is needed (a cache miss, a post-eviction
/// reload) the engine asks the callback for a fresh iterator instead.
pub trait MultihashIterator: Send {
    /// Advance the sequence, returning `None` once exhausted.
    ///
    /// A source that can fail mid-iteration (a file scan, a remote call)
    /// returns `Err` through the outer `Result`; `Ok(None)` is the only
    /// "clean" end-of-sequence signal the chunker treats as exhaustion.
    fn next_multihash(&mut self) -> Result<Option<Multihash>, EngineError>;
}

/// A [`MultihashIterator`] over an in-memory vector, used in tests and by
/// small callbacks that precompute their whole batch up front.
pub struct VecMultihashIterator {
    items: std::vec::IntoIter<Multihash>,
}

impl VecMultihashIterator {
    pub fn new(items: Vec<Multihash>) -> Self {
        Self { items: items.into_iter() }
    }
}

impl MultihashIterator for VecMultihashIterator {
    fn next_multihash(&mut self) -> Result<Option<Multihash>, EngineError> {
        Ok(self.items.next())
    }
}

/// Adapts any plain `Iterator<Item = Multihash>` into a [`MultihashIterator`]
/// whose `next_multihash` can never fail.
pub struct InfallibleMultihashIterator<I> {
    inner: I,
}

impl<I: Iterator<Item = Multihash> + Send> InfallibleMultihashIterator<I> {
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

impl<I: Iterator<Item = Multihash> + Send> MultihashIterator for InfallibleMultihashIterator<I> {
    fn next_multihash(&mut self) -> Result<Option<Multihash>, EngineError> {
        Ok(self.inner.next())
    }
}
