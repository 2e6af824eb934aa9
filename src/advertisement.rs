//! The signed advertisement record and the signing abstraction it is built
//! against.
//!
//! The wire shape mirrors the schema used by real content-routing
//! indexers: `PreviousID`/`Provider`/`Addresses`/`Entries`/`ContextID`/
//! `Metadata`/`IsRm`/`Signature`, capitalized to match what a downstream
//! indexer expects on the wire while the Rust struct itself stays
//! idiomatic (lower_snake_case fields, `#[serde(rename = ...)]`).

use std::convert::TryFrom;

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::error::EngineError;
use crate::link::Link;

/// A signed advertisement: announces that `Provider` serves the multihashes
/// reachable from the `Entries` chain for `ContextID`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advertisement {
    #[serde(rename = "PreviousID")]
    pub previous_id: Option<Link>,
    #[serde(rename = "Provider")]
    pub provider: String,
    #[serde(rename = "Addresses")]
    pub addresses: Vec<String>,
    #[serde(rename = "Entries")]
    pub entries: Option<Link>,
    #[serde(rename = "ContextID")]
    pub context_id: ByteBuf,
    #[serde(rename = "Metadata")]
    pub metadata: ByteBuf,
    #[serde(rename = "IsRm")]
    pub is_rm: bool,
    /// Signature over the DAG-CBOR encoding of this record with this field
    /// fixed to an empty byte string, never omitted from the map.
    #[serde(rename = "Signature")]
    pub signature: ByteBuf,
}

impl Advertisement {
    /// Build the bytes that get signed: the DAG-CBOR encoding of the record
    /// with `signature` zeroed to an empty byte string.
    fn signing_bytes(&self) -> Result<Vec<u8>, EngineError> {
        let mut unsigned = self.clone();
        unsigned.signature = ByteBuf::new();
        let (bytes, _link) = crate::link::encode_and_link(&unsigned)?;
        Ok(bytes)
    }

    /// Verify `self.signature` against `provider_key` over this record's
    /// signing bytes.
    pub fn verify(&self, provider_key: &VerifyingKey) -> Result<(), EngineError> {
        let payload = self.signing_bytes()?;
        let sig_bytes: &[u8] = self.signature.as_ref();
        let sig = Signature::try_from(sig_bytes)
            .map_err(|err| EngineError::SignatureFailure(err.to_string()))?;
        provider_key
            .verify(&payload, &sig)
            .map_err(|err| EngineError::SignatureFailure(err.to_string()))
    }
}

/// Abstracts over "something that can sign advertisement bytes and report
/// the provider identity those signatures verify against", so the engine
/// doesn't need to hold a raw private key directly.
pub trait Signer: Send + Sync {
    /// Sign `message`, returning the raw signature bytes.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, EngineError>;

    /// The base58 provider identity string derived from this signer's
    /// public key, used to populate `Advertisement::provider`.
    fn provider_id(&self) -> String;

    /// The verifying key matching this signer's private key.
    fn verifying_key(&self) -> VerifyingKey;
}

/// An ed25519-backed [`Signer`].
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    pub fn new(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// Generate a fresh keypair using the OS RNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self { signing_key: SigningKey::generate(&mut csprng) }
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, EngineError> {
        Ok(self.signing_key.sign(message).to_bytes().to_vec())
    }

    fn provider_id(&self) -> String {
        bs58::encode(self.signing_key.verifying_key().to_bytes()).into_string()
    }

    fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

/// Build and sign a fresh advertisement record. Called by
/// [`crate::chain::AdvertisementChain::append`].
pub fn build_and_sign(
    signer: &dyn Signer,
    previous_id: Option<Link>,
    addresses: Vec<String>,
    entries: Option<Link>,
    context_id: Vec<u8>,
    metadata: Vec<u8>,
    is_rm: bool,
) -> Result<Advertisement, EngineError> {
    let mut adv = Advertisement {
        previous_id,
        provider: signer.provider_id(),
        addresses,
        entries,
        context_id: ByteBuf::from(context_id),
        metadata: ByteBuf::from(metadata),
        is_rm,
        signature: ByteBuf::new(),
    };
    let payload = adv.signing_bytes()?;
    adv.signature = ByteBuf::from(signer.sign(&payload)?);
    Ok(adv)
}
