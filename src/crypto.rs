//! Crypto suites: key generation, import and address derivation.
//!
//! | suite     | curve     | address                                   |
//! |-----------|-----------|-------------------------------------------|
//! | `ecdsa`   | secp256k1 | last 20 bytes of `keccak256(X ‖ Y)`        |
//! | `ed25519` | ed25519   | last 20 bytes of `keccak256(verifying_key)`|

use std::fmt;
use std::str::FromStr;

use rand_core::OsRng;
use sha3::{Digest, Keccak256};
use thiserror::Error;

use crate::address::Address;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("private key must be 32 bytes, got {0}")]
    KeyLength(usize),
    #[error("private key is not a valid {suite} scalar")]
    InvalidScalar { suite: CryptoSuite },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CryptoSuite {
    #[default]
    Ecdsa,
    Ed25519,
}

impl CryptoSuite {
    pub fn as_str(&self) -> &'static str {
        match self {
            CryptoSuite::Ecdsa => "ecdsa",
            CryptoSuite::Ed25519 => "ed25519",
        }
    }

    /// Fresh key pair from the OS randomness source.
    pub fn generate(&self) -> KeyPair {
        match self {
            CryptoSuite::Ecdsa => KeyPair::Ecdsa(k256::ecdsa::SigningKey::random(&mut OsRng)),
            CryptoSuite::Ed25519 => {
                KeyPair::Ed25519(ed25519_dalek::SigningKey::generate(&mut OsRng))
            }
        }
    }

    /// Import raw private key bytes verbatim.
    pub fn import(&self, secret: &[u8]) -> Result<KeyPair, CryptoError> {
        // k256 would left-pad short slices; only exact 32-byte keys are accepted.
        let seed: [u8; 32] = secret
            .try_into()
            .map_err(|_| CryptoError::KeyLength(secret.len()))?;
        match self {
            CryptoSuite::Ecdsa => k256::ecdsa::SigningKey::from_slice(&seed)
                .map(KeyPair::Ecdsa)
                .map_err(|_| CryptoError::InvalidScalar { suite: *self }),
            CryptoSuite::Ed25519 => Ok(KeyPair::Ed25519(ed25519_dalek::SigningKey::from_bytes(&seed))),
        }
    }
}

impl fmt::Display for CryptoSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CryptoSuite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ecdsa" | "secp256k1" => Ok(CryptoSuite::Ecdsa),
            "ed25519" => Ok(CryptoSuite::Ed25519),
            other => Err(format!("unknown crypto suite '{other}' (expected ecdsa or ed25519)")),
        }
    }
}

#[derive(Clone)]
pub enum KeyPair {
    Ecdsa(k256::ecdsa::SigningKey),
    Ed25519(ed25519_dalek::SigningKey),
}

impl KeyPair {
    pub fn suite(&self) -> CryptoSuite {
        match self {
            KeyPair::Ecdsa(_) => CryptoSuite::Ecdsa,
            KeyPair::Ed25519(_) => CryptoSuite::Ed25519,
        }
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        match self {
            KeyPair::Ecdsa(key) => out.copy_from_slice(&key.to_bytes()),
            KeyPair::Ed25519(key) => out = key.to_bytes(),
        }
        out
    }

    /// Public key bytes: 64-byte `X ‖ Y` for secp256k1, 32 bytes for ed25519.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        match self {
            KeyPair::Ecdsa(key) => {
                let point = key.verifying_key().to_encoded_point(false);
                point.as_bytes()[1..].to_vec()
            }
            KeyPair::Ed25519(key) => key.verifying_key().to_bytes().to_vec(),
        }
    }

    pub fn address(&self) -> Address {
        Address::from_digest(&Keccak256::digest(self.public_key_bytes()))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair {{ suite: {}, address: {} }}", self.suite(), self.address())
    }
}
