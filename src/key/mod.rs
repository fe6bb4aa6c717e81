/*!
 * Internal key representation
 *
 * Every successful import produces a [`Key`]. A key knows its algorithm, its
 * subject key identifier and whether it was imported as ephemeral, and holds
 * exactly one storage form: a handle to a non-extractable HSM object, or an
 * in-memory public value. Keys are immutable once built and can be shared
 * across threads freely.
 */

use std::fmt;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::KeyError;
use crate::hsm::HsmHandle;

pub mod ecdsa;
pub mod rsa;

pub use self::ecdsa::{EcdsaCurve, EcdsaPublicKey};

/// Subject key identifier: SHA-256 over the canonical public-key encoding
///
/// The same public key always yields the same identifier, whichever import
/// path it came through.
#[derive(Clone, Copy, Eq, Hash)]
pub struct Ski([u8; 32]);

impl Ski {
    pub fn digest(canonical_encoding: &[u8]) -> Self {
        Ski(Sha256::digest(canonical_encoding).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl PartialEq for Ski {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl AsRef<[u8]> for Ski {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Ski {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Ski {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ski({})", self.to_hex())
    }
}

/// Algorithm of an imported key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Ecdsa(EcdsaCurve),
    Rsa { modulus_bits: usize },
}

impl KeyAlgorithm {
    /// Algorithm family name, `"ECDSA"` or `"RSA"`
    pub fn family(&self) -> &'static str {
        match self {
            KeyAlgorithm::Ecdsa(_) => "ECDSA",
            KeyAlgorithm::Rsa { .. } => "RSA",
        }
    }

    pub fn is_ecdsa(&self) -> bool {
        matches!(self, KeyAlgorithm::Ecdsa(_))
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Ecdsa(curve) => write!(f, "ECDSA {}", curve),
            KeyAlgorithm::Rsa { modulus_bits } => write!(f, "RSA-{}", modulus_bits),
        }
    }
}

/// In-memory public key value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeyValue {
    Ecdsa(EcdsaPublicKey),
    Rsa(::rsa::RsaPublicKey),
}

impl PublicKeyValue {
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            PublicKeyValue::Ecdsa(pk) => KeyAlgorithm::Ecdsa(pk.curve()),
            PublicKeyValue::Rsa(pk) => KeyAlgorithm::Rsa {
                modulus_bits: self::rsa::modulus_bits(pk),
            },
        }
    }

    pub fn ski(&self) -> Result<Ski, KeyError> {
        match self {
            PublicKeyValue::Ecdsa(pk) => Ok(pk.ski()),
            PublicKeyValue::Rsa(pk) => self::rsa::ski(pk),
        }
    }

    /// PKIX `SubjectPublicKeyInfo` DER
    pub fn to_pkix_der(&self) -> Result<Vec<u8>, KeyError> {
        match self {
            PublicKeyValue::Ecdsa(pk) => pk
                .to_pkix_der()
                .map_err(|e| KeyError::Encoding(format!("SubjectPublicKeyInfo: {}", e))),
            PublicKeyValue::Rsa(pk) => self::rsa::to_pkix_der(pk),
        }
    }
}

/// Where a key's material lives. Exactly one form per key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStorage {
    /// Non-extractable private key object inside the HSM
    Hsm(HsmHandle),
    /// Public key value held in process memory
    InMemory(PublicKeyValue),
}

/// A key produced by the import pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    algorithm: KeyAlgorithm,
    ski: Ski,
    ephemeral: bool,
    storage: KeyStorage,
}

impl Key {
    /// Wrap an in-memory public key, computing its SKI
    pub fn from_public(value: PublicKeyValue, ephemeral: bool) -> Result<Self, KeyError> {
        Ok(Key {
            algorithm: value.algorithm(),
            ski: value.ski()?,
            ephemeral,
            storage: KeyStorage::InMemory(value),
        })
    }

    /// Wrap a private key already stored in the HSM under `handle`
    pub(crate) fn hsm_backed(algorithm: KeyAlgorithm, ski: Ski, handle: HsmHandle, ephemeral: bool) -> Self {
        Key {
            algorithm,
            ski,
            ephemeral,
            storage: KeyStorage::Hsm(handle),
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn ski(&self) -> &Ski {
        &self.ski
    }

    /// True for HSM-backed private keys
    pub fn is_private(&self) -> bool {
        matches!(self.storage, KeyStorage::Hsm(_))
    }

    /// Imported keys are always asymmetric
    pub fn is_symmetric(&self) -> bool {
        false
    }

    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    pub fn storage(&self) -> &KeyStorage {
        &self.storage
    }

    /// The in-memory public value, `None` for HSM-backed keys
    pub fn public_key(&self) -> Option<&PublicKeyValue> {
        match &self.storage {
            KeyStorage::InMemory(value) => Some(value),
            KeyStorage::Hsm(_) => None,
        }
    }

    /// The HSM handle, `None` for in-memory public keys
    pub fn hsm_handle(&self) -> Option<&HsmHandle> {
        match &self.storage {
            KeyStorage::Hsm(handle) => Some(handle),
            KeyStorage::InMemory(_) => None,
        }
    }

    /// Export the key as PKIX DER. HSM-backed private keys are not exportable.
    pub fn to_bytes(&self) -> Result<Vec<u8>, KeyError> {
        match &self.storage {
            KeyStorage::InMemory(value) => value.to_pkix_der(),
            KeyStorage::Hsm(_) => Err(KeyError::NotExportable {
                ski: self.ski.to_hex(),
                reason: "private key is held in the HSM as a non-extractable object".to_string(),
            }),
        }
    }
}
