//! Client identity: import a configured private key or generate a fresh one.
//!
//! Nothing is persisted. A generated key is handed back once as a
//! [`KeyDisclosure`]; losing it means the next start generates a different
//! key and therefore a different identity.

use std::fmt;

use sha2::{Digest, Sha256};
use tracing::info;

use crate::address::Address;
use crate::crypto::{CryptoSuite, KeyPair};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Imported,
    Generated,
}

/// Resolved client identity.
#[derive(Clone)]
pub struct Identity {
    /// First 8 hex chars of `SHA256(public_key)`; safe to log.
    pub key_id: String,
    pub source: KeySource,
    address: Address,
    key_pair: KeyPair,
}

impl Identity {
    fn new(key_pair: KeyPair, source: KeySource) -> Self {
        let address = key_pair.address();
        let key_id = compute_key_id(&key_pair.public_key_bytes());
        Self { key_id, source, address, key_pair }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn suite(&self) -> CryptoSuite {
        self.key_pair.suite()
    }

    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.key_pair.public_key_bytes()
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.key_pair.secret_bytes())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("key_id", &self.key_id)
            .field("source", &self.source)
            .field("suite", &self.suite())
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// One-time hand-off of a freshly generated key so the operator can keep it.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyDisclosure {
    pub private_key_hex: String,
    pub address: Address,
}

impl fmt::Debug for KeyDisclosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyDisclosure")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub identity: Identity,
    /// `Some` only when the key was generated.
    pub disclosure: Option<KeyDisclosure>,
}

/// Import `configured_hex_key` when present and non-blank, otherwise generate.
pub fn resolve_identity(
    configured_hex_key: Option<&str>,
    suite: CryptoSuite,
) -> Result<ResolvedIdentity, AppError> {
    match configured_hex_key.map(str::trim).filter(|k| !k.is_empty()) {
        Some(hex_key) => {
            info!(%suite, "found hex private key in configuration");
            let identity = import(hex_key, suite)?;
            Ok(ResolvedIdentity { identity, disclosure: None })
        }
        None => {
            info!(%suite, "hex private key not configured, generating one");
            let identity = Identity::new(suite.generate(), KeySource::Generated);
            let disclosure = KeyDisclosure {
                private_key_hex: identity.private_key_hex(),
                address: identity.address(),
            };
            info!(
                private_key = %disclosure.private_key_hex,
                address = %disclosure.address,
                "generated default private key"
            );
            Ok(ResolvedIdentity { identity, disclosure: Some(disclosure) })
        }
    }
}

fn import(hex_key: &str, suite: CryptoSuite) -> Result<Identity, AppError> {
    let digits = hex_key
        .strip_prefix("0x")
        .or_else(|| hex_key.strip_prefix("0X"))
        .unwrap_or(hex_key);
    let bytes = hex::decode(digits)
        .map_err(|e| AppError::InvalidKeyFormat(format!("private key is not hex: {e}")))?;
    let key_pair = suite
        .import(&bytes)
        .map_err(|e| AppError::InvalidKeyFormat(e.to_string()))?;
    Ok(Identity::new(key_pair, KeySource::Imported))
}

/// First 8 hex chars of `SHA256(public_key)`.
pub fn compute_key_id(public_key: &[u8]) -> String {
    let digest = Sha256::digest(public_key);
    hex::encode(digest)[..8].to_string()
}
