//! Importer for ECDSA public keys that are already decoded

use super::{validate, wrap_public, wrong_shape, ImportVariant, KeyImporter, RawMaterial};
use crate::error::ImportResult;
use crate::key::{EcdsaPublicKey, Key, PublicKeyValue};

#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaPublicKeyImporter;

impl EcdsaPublicKeyImporter {
    pub fn import_key(&self, public: &EcdsaPublicKey, ephemeral: bool) -> ImportResult<Key> {
        validate::validate_public_point(Self::VARIANT, public)?;
        wrap_public(Self::VARIANT, PublicKeyValue::Ecdsa(public.clone()), ephemeral)
    }
}

impl KeyImporter for EcdsaPublicKeyImporter {
    const VARIANT: ImportVariant = ImportVariant::EcdsaPublicKey;

    fn import(&self, raw: RawMaterial<'_>, ephemeral: bool) -> ImportResult<Key> {
        match raw {
            RawMaterial::EcdsaPublicKey(public) => self.import_key(public, ephemeral),
            _ => Err(wrong_shape(Self::VARIANT, "decoded ECDSA public key")),
        }
    }
}
