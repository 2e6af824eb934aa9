//! Construction-time configuration for an [`crate::engine::Engine`].
//!
//! Parsing this from a file or merging it with CLI flags is out of scope
//! for this crate; only the struct and its `serde` (de)serialization are.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// The parameters needed to construct an [`crate::engine::Engine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of multihashes per `EntryChunk`.
    pub chunk_size: u32,
    /// Maximum number of entry chains held in the cache at once.
    pub cache_capacity: usize,
    /// Retrieval multiaddresses advertised for this provider.
    pub addresses: Vec<String>,
    /// Directory backing the `FileLinkSystem` used for chunk/advertisement
    /// blocks.
    pub link_store_path: PathBuf,
    /// Directory backing the `FileStore` used for `head`/`ctx` state.
    pub state_store_path: PathBuf,
}

impl EngineConfig {
    /// Reject configurations an `Engine` could never safely run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.chunk_size == 0 {
            return Err(EngineError::InvalidConfig("chunk_size must be >= 1"));
        }
        if self.cache_capacity == 0 {
            return Err(EngineError::InvalidConfig("cache_capacity must be >= 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> EngineConfig {
        EngineConfig {
            chunk_size: 100,
            cache_capacity: 64,
            addresses: vec!["/ip4/127.0.0.1/tcp/9999".into()],
            link_store_path: PathBuf::from("/tmp/links"),
            state_store_path: PathBuf::from("/tmp/state"),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let mut cfg = base();
        cfg.chunk_size = 0;
        assert!(matches!(cfg.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn zero_cache_capacity_is_rejected() {
        let mut cfg = base();
        cfg.cache_capacity = 0;
        assert!(matches!(cfg.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn roundtrips_through_json() {
        let cfg = base();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.chunk_size, cfg.chunk_size);
        assert_eq!(back.addresses, cfg.addresses);
    }
}
