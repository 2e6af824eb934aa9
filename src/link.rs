//! Content identifiers ("links") addressing IPLD blocks.
//!
//! A [`Link`] is a CIDv1 binding the DAG-CBOR codec to a SHA2-256 multihash
//! of the block's serialized bytes. Equality is bytewise (`Cid` already
//! implements this the right way), and two blocks with identical bytes
//! always produce the same link.

use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};

use crate::error::{CodecError, EngineError};

/// The multicodec tag for DAG-CBOR, per the multicodec table.
pub const DAG_CBOR_CODEC: u64 = 0x71;

/// A content identifier referencing an IPLD block.
pub type Link = Cid;

/// Hash `bytes` with SHA2-256 and wrap it in a CIDv1 tagged as DAG-CBOR.
///
/// This is the one place the engine turns raw bytes into a [`Link`]; both
/// [`crate::linksystem::LinkSystem::store`] and the chunker/advertisement
/// encoders route through it so that `store(b)` is always idempotent for
/// identical `b`.
pub fn link_for_bytes(bytes: &[u8]) -> Link {
    let digest = Code::Sha2_256.digest(bytes);
    Cid::new_v1(DAG_CBOR_CODEC, digest)
}

/// Serialize `value` to DAG-CBOR and compute its link, without storing it.
pub fn encode_and_link<T: serde::Serialize>(value: &T) -> Result<(Vec<u8>, Link), EngineError> {
    let bytes = serde_ipld_dagcbor::to_vec(value)
        .map_err(|err| EngineError::Codec(CodecError::Encode(err.to_string())))?;
    let link = link_for_bytes(&bytes);
    Ok((bytes, link))
}

/// Deserialize DAG-CBOR bytes into `T`.
pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, EngineError> {
    serde_ipld_dagcbor::from_slice(bytes)
        .map_err(|err| EngineError::Codec(CodecError::Decode(err.to_string())))
}

/// Render a link the way log lines and store keys want it: its string form.
pub fn link_to_string(link: &Link) -> String {
    link.to_string()
}
