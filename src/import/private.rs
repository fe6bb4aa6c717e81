/*!
 * Private key importer
 *
 * Private keys never become in-memory keys. The decoded scalar lives just
 * long enough to derive the public key and be handed to the HSM, and the
 * returned [`Key`] holds only the HSM handle.
 */

use super::{decode, validate, wrong_shape, ImportVariant, KeyImporter, RawMaterial};
use crate::error::{error_codes, ImportError, ImportResult, ResourceError};
use crate::hsm::{HsmGateway, PrivateKeyMaterial};
use crate::key::{Key, KeyAlgorithm};
use crate::policy::ImportPolicy;

/// Imports ECDSA private keys as non-extractable HSM objects
#[derive(Clone, Copy)]
pub struct PrivateKeyImporter<'a> {
    policy: ImportPolicy,
    gateway: Option<&'a dyn HsmGateway>,
}

impl<'a> PrivateKeyImporter<'a> {
    pub fn new(policy: ImportPolicy, gateway: Option<&'a dyn HsmGateway>) -> Self {
        Self { policy, gateway }
    }

    /// Import PKCS#1, PKCS#8 or SEC1 DER
    pub fn import_der(&self, der: &[u8], ephemeral: bool) -> ImportResult<Key> {
        self.policy.enforce_private_key_import(Self::VARIANT)?;
        self.import_checked(der, ephemeral)
    }

    fn import_checked(&self, der: &[u8], ephemeral: bool) -> ImportResult<Key> {
        if der.is_empty() {
            return Err(ImportError::invalid_raw(
                Self::VARIANT,
                "must not be empty",
                error_codes::RAW_EMPTY,
            ));
        }

        let decoded = decode::decode_private_key(Self::VARIANT, der)?;
        let private = validate::require_ecdsa_private(Self::VARIANT, decoded)?;
        let public = private.public_key();
        validate::validate_public_point(Self::VARIANT, &public)?;

        let gateway = self.gateway.ok_or_else(|| {
            ImportError::from_gateway(Self::VARIANT, ResourceError::NotConfigured.into())
        })?;

        let curve = private.curve();
        let ski = public.ski();
        let material = PrivateKeyMaterial::new(
            curve,
            private.scalar(),
            public.to_uncompressed_point(),
            ski,
            ephemeral,
        );
        drop(private);

        let created = gateway.create_non_extractable_private_key(&material);
        drop(material);

        let handle = created.map_err(|e| {
            log::warn!("HSM rejected private key {}: {}", ski, e);
            ImportError::from_gateway(Self::VARIANT, e)
        })?;

        log::debug!("Imported ECDSA {} private key {} into HSM", curve, ski);
        Ok(Key::hsm_backed(KeyAlgorithm::Ecdsa(curve), ski, handle, ephemeral))
    }
}

impl<'a> KeyImporter for PrivateKeyImporter<'a> {
    const VARIANT: ImportVariant = ImportVariant::PrivateKey;

    fn import(&self, raw: RawMaterial<'_>, ephemeral: bool) -> ImportResult<Key> {
        self.policy.enforce_private_key_import(Self::VARIANT)?;
        match raw {
            RawMaterial::Bytes(der) => self.import_checked(der, ephemeral),
            _ => Err(wrong_shape(Self::VARIANT, "byte sequence")),
        }
    }
}
