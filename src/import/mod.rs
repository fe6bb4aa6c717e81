/*!
 * Key import dispatch
 *
 * One entry point, [`Csp::key_import`], accepts raw material together with
 * an [`ImportOptions`] value naming how that material is to be read. Each
 * options variant is served by exactly one importer:
 *
 * | Options                          | Raw material                | Importer                    |
 * |----------------------------------|-----------------------------|-----------------------------|
 * | `PkixPublicKey`                  | PKIX DER bytes              | [`PkixPublicKeyImporter`]   |
 * | `PrivateKey`                     | PKCS#1 / PKCS#8 / SEC1 DER  | [`PrivateKeyImporter`]      |
 * | `EcdsaPublicKey`                 | decoded [`EcdsaPublicKey`]  | [`EcdsaPublicKeyImporter`]  |
 * | `X509Certificate`                | parsed [`Certificate`]      | [`X509CertificateImporter`] |
 *
 * The `Csp` also exposes one typed method per variant. Those only accept the
 * raw shape their variant supports, so a wrong-shape argument cannot be
 * expressed at all.
 */

use std::fmt;
use std::sync::Arc;

use x509_cert::Certificate;

use crate::config::CspConfig;
use crate::error::{error_codes, GatewayError, ImportError, ImportResult, KeyError};
use crate::hsm::HsmGateway;
use crate::key::{EcdsaPublicKey, Key, PublicKeyValue};
use crate::policy::ImportPolicy;

pub mod decode;
pub mod native;
pub mod pkix;
pub mod private;
pub mod validate;
pub mod x509;


pub use self::native::EcdsaPublicKeyImporter;
pub use self::pkix::PkixPublicKeyImporter;
pub use self::private::PrivateKeyImporter;
pub use self::x509::X509CertificateImporter;

/// Tag naming one of the import pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportVariant {
    PkixPublicKey,
    PrivateKey,
    EcdsaPublicKey,
    X509Certificate,
}

impl fmt::Display for ImportVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportVariant::PkixPublicKey => "PkixPublicKey",
            ImportVariant::PrivateKey => "PrivateKey",
            ImportVariant::EcdsaPublicKey => "EcdsaPublicKey",
            ImportVariant::X509Certificate => "X509Certificate",
        };
        f.write_str(name)
    }
}

/// How the raw material of an import is to be interpreted
///
/// `ephemeral` keys are not meant to outlive the process; for private keys
/// this makes the HSM object session-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOptions {
    /// PKIX `SubjectPublicKeyInfo` DER
    PkixPublicKey { ephemeral: bool },
    /// PKCS#1, PKCS#8 or SEC1 private key DER
    PrivateKey { ephemeral: bool },
    /// Already decoded ECDSA public key
    EcdsaPublicKey { ephemeral: bool },
    /// Parsed X.509 certificate
    X509Certificate { ephemeral: bool },
}

impl ImportOptions {
    pub fn variant(&self) -> ImportVariant {
        match self {
            ImportOptions::PkixPublicKey { .. } => ImportVariant::PkixPublicKey,
            ImportOptions::PrivateKey { .. } => ImportVariant::PrivateKey,
            ImportOptions::EcdsaPublicKey { .. } => ImportVariant::EcdsaPublicKey,
            ImportOptions::X509Certificate { .. } => ImportVariant::X509Certificate,
        }
    }

    pub fn ephemeral(&self) -> bool {
        match *self {
            ImportOptions::PkixPublicKey { ephemeral }
            | ImportOptions::PrivateKey { ephemeral }
            | ImportOptions::EcdsaPublicKey { ephemeral }
            | ImportOptions::X509Certificate { ephemeral } => ephemeral,
        }
    }
}

/// Caller-owned input to an import
///
/// Borrowed for the duration of the call only.
#[derive(Debug, Clone, Copy)]
pub enum RawMaterial<'a> {
    Bytes(&'a [u8]),
    EcdsaPublicKey(&'a EcdsaPublicKey),
    Certificate(&'a Certificate),
}

impl<'a> RawMaterial<'a> {
    /// Short description of the shape, used in error messages
    pub fn shape(&self) -> &'static str {
        match self {
            RawMaterial::Bytes(_) => "byte sequence",
            RawMaterial::EcdsaPublicKey(_) => "decoded ECDSA public key",
            RawMaterial::Certificate(_) => "parsed certificate",
        }
    }
}

impl<'a> From<&'a [u8]> for RawMaterial<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        RawMaterial::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for RawMaterial<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        RawMaterial::Bytes(bytes.as_slice())
    }
}

impl<'a> From<&'a EcdsaPublicKey> for RawMaterial<'a> {
    fn from(key: &'a EcdsaPublicKey) -> Self {
        RawMaterial::EcdsaPublicKey(key)
    }
}

impl<'a> From<&'a Certificate> for RawMaterial<'a> {
    fn from(certificate: &'a Certificate) -> Self {
        RawMaterial::Certificate(certificate)
    }
}

/// One import pipeline: decode, validate, wrap
pub trait KeyImporter {
    const VARIANT: ImportVariant;

    /// Import `raw`, rejecting any shape this pipeline does not accept
    fn import(&self, raw: RawMaterial<'_>, ephemeral: bool) -> ImportResult<Key>;
}

/// Error for raw material of the wrong shape
pub(crate) fn wrong_shape(variant: ImportVariant, expected: &str) -> ImportError {
    ImportError::invalid_raw(variant, &format!("expected {}", expected), error_codes::RAW_WRONG_SHAPE)
}

/// Decode failure for a public key that parsed but cannot be used
///
/// Coded after the pipeline the key arrived through.
pub(crate) fn public_key_failure(variant: ImportVariant, encoding: &'static str, err: KeyError) -> ImportError {
    let error_code = match variant {
        ImportVariant::X509Certificate => error_codes::CERTIFICATE_KEY_DECODE_FAILED,
        _ => error_codes::PKIX_DECODE_FAILED,
    };
    ImportError::decode_failure(variant, encoding, &err.to_string(), error_code)
}

/// Wrap a validated public value into a [`Key`]
pub(crate) fn wrap_public(variant: ImportVariant, value: PublicKeyValue, ephemeral: bool) -> ImportResult<Key> {
    let key = Key::from_public(value, ephemeral)
        .map_err(|e| public_key_failure(variant, "canonical public key", e))?;
    log::debug!("Imported {} key {} via {}", key.algorithm(), key.ski(), variant);
    Ok(key)
}

/// The key-import capability of the CSP
///
/// Stateless apart from the policy and the HSM gateway it was built with,
/// so one `Csp` can serve imports from any number of threads.
#[derive(Clone)]
pub struct Csp {
    policy: ImportPolicy,
    gateway: Option<Arc<dyn HsmGateway>>,
}

impl fmt::Debug for Csp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Csp")
            .field("policy", &self.policy)
            .field("gateway", &self.gateway.is_some())
            .finish()
    }
}

impl Csp {
    /// A CSP without HSM access. Private-key imports fail even if allowed.
    pub fn new(policy: ImportPolicy) -> Self {
        Self {
            policy,
            gateway: None,
        }
    }

    /// Store imported private keys through `gateway`
    pub fn with_gateway(mut self, gateway: Arc<dyn HsmGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Build a CSP from configuration, connecting to the configured HSM
    pub fn from_config(config: &CspConfig) -> Result<Self, GatewayError> {
        let csp = Csp::new(ImportPolicy::from_config(config));
        match &config.hsm {
            None => Ok(csp),
            Some(hsm) => {
                let gateway = connect_gateway(hsm, config)?;
                Ok(csp.with_gateway(gateway))
            }
        }
    }

    pub fn policy(&self) -> &ImportPolicy {
        &self.policy
    }

    /// Import `raw` as directed by `opts`
    ///
    /// Options are checked first, then the presence of raw material, then
    /// the selected pipeline runs.
    pub fn key_import(&self, raw: Option<RawMaterial<'_>>, opts: Option<&ImportOptions>) -> ImportResult<Key> {
        let opts = opts.ok_or_else(|| ImportError::invalid_opts("It must not be nil"))?;
        let variant = opts.variant();
        let raw = raw.ok_or_else(|| {
            ImportError::invalid_raw(variant, "must not be nil", error_codes::RAW_MISSING)
        })?;

        log::debug!("Dispatching {} import of a {}", variant, raw.shape());

        let ephemeral = opts.ephemeral();
        match opts {
            ImportOptions::PkixPublicKey { .. } => PkixPublicKeyImporter.import(raw, ephemeral),
            ImportOptions::PrivateKey { .. } => self.private_key_importer().import(raw, ephemeral),
            ImportOptions::EcdsaPublicKey { .. } => EcdsaPublicKeyImporter.import(raw, ephemeral),
            ImportOptions::X509Certificate { .. } => X509CertificateImporter.import(raw, ephemeral),
        }
    }

    /// Import a PKIX DER ECDSA public key
    pub fn import_pkix_public_key(&self, der: &[u8], ephemeral: bool) -> ImportResult<Key> {
        PkixPublicKeyImporter.import_der(der, ephemeral)
    }

    /// Import a DER private key into the HSM
    pub fn import_private_key(&self, der: &[u8], ephemeral: bool) -> ImportResult<Key> {
        self.private_key_importer().import_der(der, ephemeral)
    }

    /// Import a decoded ECDSA public key
    pub fn import_ecdsa_public_key(&self, public: &EcdsaPublicKey, ephemeral: bool) -> ImportResult<Key> {
        EcdsaPublicKeyImporter.import_key(public, ephemeral)
    }

    /// Import the public key of a parsed certificate
    pub fn import_certificate(&self, certificate: &Certificate, ephemeral: bool) -> ImportResult<Key> {
        X509CertificateImporter.import_certificate(certificate, ephemeral)
    }

    fn private_key_importer(&self) -> PrivateKeyImporter<'_> {
        PrivateKeyImporter::new(self.policy, self.gateway.as_deref())
    }
}

#[cfg(feature = "pkcs11")]
fn connect_gateway(hsm: &crate::config::HsmConfig, config: &CspConfig) -> Result<Arc<dyn HsmGateway>, GatewayError> {
    use crate::hsm::{Pkcs11SessionProvider, SessionPool};

    let provider = Pkcs11SessionProvider::connect(hsm)?;
    let pool = SessionPool::new(provider, &config.session_pool)?;
    Ok(Arc::new(pool))
}

#[cfg(not(feature = "pkcs11"))]
fn connect_gateway(hsm: &crate::config::HsmConfig, _config: &CspConfig) -> Result<Arc<dyn HsmGateway>, GatewayError> {
    Err(crate::error::HsmError::device(
        "connect",
        &format!(
            "cannot load {}: built without the `pkcs11` feature",
            hsm.library_path
        ),
    )
    .into())
}
