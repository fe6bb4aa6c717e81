/*!
 * CSP Key Import
 *
 * This crate implements the key-import subsystem of a cryptographic service
 * provider for blockchain network participants. Externally supplied key
 * material becomes a uniform [`Key`] that the rest of the CSP can sign,
 * verify and look keys up with.
 *
 * Accepted inputs:
 *
 * - PKIX `SubjectPublicKeyInfo` DER holding an ECDSA public key
 * - PKCS#1, PKCS#8 or SEC1 DER private keys, stored as non-extractable HSM
 *   objects and never kept in process memory
 * - already decoded ECDSA public keys
 * - parsed X.509 certificates with an ECDSA or RSA subject key
 *
 * ECDSA keys must be on P-256 or P-384.
 */

/// Internal key representation and subject key identifiers
pub mod key;

/// Import dispatcher, decoders, validators and per-variant importers
pub mod import;

/// HSM session gateway, session pool and providers
pub mod hsm;

/// Private-key import policy gate
pub mod policy;

/// CSP configuration
pub mod config;

/// Common error types for the import pipeline
pub mod error;

/// Secure memory handling utilities
pub mod secure_memory;

// Re-export main types for convenience
pub use config::{CspConfig, HsmConfig, SessionPoolConfig};
pub use error::{ErrorKind, ImportError, ImportResult};
pub use import::{Csp, ImportOptions, ImportVariant, KeyImporter, RawMaterial};
pub use key::{EcdsaCurve, EcdsaPublicKey, Key, KeyAlgorithm, PublicKeyValue, Ski};
pub use policy::ImportPolicy;

/// Initialize the key import module.
///
/// Nothing needs to be set up today; the function exists so that callers
/// have one stable place to hook backend initialization into.
///
/// # Example
///
/// ```
/// use csp_keyimport::prelude::*;
///
/// fn main() -> Result<(), ImportError> {
///     init()?;
///
///     let csp = Csp::new(ImportPolicy::default());
///     let result = csp.key_import(Some(RawMaterial::Bytes(&[0])), None);
///     assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidOpts);
///     Ok(())
/// }
/// ```
pub fn init() -> Result<(), ImportError> {
    Ok(())
}

/// The types most callers need
pub mod prelude {
    pub use crate::config::{CspConfig, HsmConfig, SessionPoolConfig};
    pub use crate::error::{ErrorKind, GatewayError, HsmError, ImportError, ImportResult, KeyError, ResourceError};
    pub use crate::hsm::{HsmGateway, HsmHandle, HsmSession, MockSessionProvider, SessionPool, SessionProvider};
    pub use crate::import::{Csp, ImportOptions, ImportVariant, KeyImporter, RawMaterial};
    pub use crate::init;
    pub use crate::key::{EcdsaCurve, EcdsaPublicKey, Key, KeyAlgorithm, KeyStorage, PublicKeyValue, Ski};
    pub use crate::policy::ImportPolicy;
    pub use crate::secure_memory::{with_secure_scope, SecureBytes};
}
