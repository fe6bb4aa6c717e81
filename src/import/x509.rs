//! X.509 certificate importer
//!
//! Extracts the certificate's subject public key. Unlike the other public-key
//! importers this one accepts two families, ECDSA and RSA.

use x509_cert::Certificate;

use super::{decode, validate, wrap_public, wrong_shape, ImportVariant, KeyImporter, RawMaterial};
use crate::error::ImportResult;
use crate::key::Key;

#[derive(Debug, Clone, Copy, Default)]
pub struct X509CertificateImporter;

impl X509CertificateImporter {
    pub fn import_certificate(&self, certificate: &Certificate, ephemeral: bool) -> ImportResult<Key> {
        let decoded = decode::decode_certificate_public_key(Self::VARIANT, certificate)?;
        let value = validate::require_ecdsa_or_rsa(Self::VARIANT, decoded)?;
        wrap_public(Self::VARIANT, value, ephemeral)
    }
}

impl KeyImporter for X509CertificateImporter {
    const VARIANT: ImportVariant = ImportVariant::X509Certificate;

    fn import(&self, raw: RawMaterial<'_>, ephemeral: bool) -> ImportResult<Key> {
        match raw {
            RawMaterial::Certificate(certificate) => self.import_certificate(certificate, ephemeral),
            _ => Err(wrong_shape(Self::VARIANT, "parsed certificate")),
        }
    }
}
