//! Error taxonomy for the indexing advertisement engine.
//!
//! Modeled as a single `thiserror` enum rather than per-module error types,
//! since every variant here is something a caller of the public engine
//! operations needs to match on (see the error table in the design doc).

use std::io;

/// Errors surfaced by the public operations of this crate.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// `notify_put`/`notify_remove` called before a callback was registered.
    #[error("no callback registered")]
    NoCallback,

    /// The callback signalled that it has no data for this contextID, or
    /// `notify_remove` was called for a contextID that was never put.
    #[error("unknown context id")]
    UnknownContext,

    /// A callback's iterator produced zero multihashes.
    #[error("callback produced an empty iterator")]
    EmptyIterator,

    /// The persistent store or link system failed to read or write.
    #[error("store I/O error: {0}")]
    StoreIo(#[from] io::Error),

    /// DAG-CBOR encode/decode of a block failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The provider's private key rejected the sign operation.
    #[error("signature failure: {0}")]
    SignatureFailure(String),

    /// A caller-supplied cancellation token tripped mid-operation.
    #[error("operation canceled")]
    Canceled,

    /// An operation was attempted on a closed engine.
    #[error("engine is closed")]
    Closed,

    /// `EngineConfig` had a zero `chunk_size` or `cache_capacity`.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(&'static str),

    /// A link referenced a block that is not present in the link system.
    #[error("block not found for link {0}")]
    NotFound(String),
}

/// Wraps the two directions DAG-CBOR codec failures can come from, so
/// `EngineError::Codec` has a single `#[from]` source regardless of whether
/// the failure happened while encoding or decoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("decode failed: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
