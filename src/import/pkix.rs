//! PKIX public key importer

use super::{decode, validate, wrap_public, wrong_shape, ImportVariant, KeyImporter, RawMaterial};
use crate::error::{error_codes, ImportError, ImportResult};
use crate::key::{Key, PublicKeyValue};

/// Imports ECDSA public keys from PKIX `SubjectPublicKeyInfo` DER
#[derive(Debug, Clone, Copy, Default)]
pub struct PkixPublicKeyImporter;

impl PkixPublicKeyImporter {
    pub fn import_der(&self, der: &[u8], ephemeral: bool) -> ImportResult<Key> {
        if der.is_empty() {
            return Err(ImportError::invalid_raw(
                Self::VARIANT,
                "must not be empty",
                error_codes::RAW_EMPTY,
            ));
        }

        let decoded = decode::decode_pkix_public_key(Self::VARIANT, der)?;
        let public = validate::require_ecdsa(Self::VARIANT, decoded)?;
        wrap_public(Self::VARIANT, PublicKeyValue::Ecdsa(public), ephemeral)
    }
}

impl KeyImporter for PkixPublicKeyImporter {
    const VARIANT: ImportVariant = ImportVariant::PkixPublicKey;

    fn import(&self, raw: RawMaterial<'_>, ephemeral: bool) -> ImportResult<Key> {
        match raw {
            RawMaterial::Bytes(der) => self.import_der(der, ephemeral),
            _ => Err(wrong_shape(Self::VARIANT, "byte sequence")),
        }
    }
}
