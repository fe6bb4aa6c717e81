/*!
 * ECDSA public keys on the supported NIST curves
 */

use std::fmt;

use p256::elliptic_curve::sec1::ToEncodedPoint;
use pkcs8::{AssociatedOid, EncodePublicKey, ObjectIdentifier};

use super::Ski;

/// `id-ecPublicKey` (RFC 5480)
pub const ID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// DER encoding of the P-256 named-curve OID, as stored in `CKA_EC_PARAMS`
const P256_EC_PARAMS: [u8; 10] = [0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07];

/// DER encoding of the P-384 named-curve OID
const P384_EC_PARAMS: [u8; 7] = [0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x22];

/// Named curves an imported ECDSA key may live on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcdsaCurve {
    /// NIST P-256 (secp256r1)
    P256,
    /// NIST P-384 (secp384r1)
    P384,
}

impl EcdsaCurve {
    /// Named-curve OID
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            EcdsaCurve::P256 => p256::NistP256::OID,
            EcdsaCurve::P384 => p384::NistP384::OID,
        }
    }

    /// Look up a curve by its named-curve OID
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        if *oid == p256::NistP256::OID {
            Some(EcdsaCurve::P256)
        } else if *oid == p384::NistP384::OID {
            Some(EcdsaCurve::P384)
        } else {
            None
        }
    }

    /// DER-encoded curve OID for the PKCS#11 `CKA_EC_PARAMS` attribute
    pub fn ec_params_der(&self) -> &'static [u8] {
        match self {
            EcdsaCurve::P256 => &P256_EC_PARAMS,
            EcdsaCurve::P384 => &P384_EC_PARAMS,
        }
    }

    /// Length of a private scalar in bytes
    pub fn scalar_len(&self) -> usize {
        match self {
            EcdsaCurve::P256 => 32,
            EcdsaCurve::P384 => 48,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EcdsaCurve::P256 => "P-256",
            EcdsaCurve::P384 => "P-384",
        }
    }
}

impl fmt::Display for EcdsaCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded, in-memory ECDSA public key
///
/// The wrapped curve point is always a valid non-identity point on its
/// curve; the underlying `PublicKey` types cannot represent anything else.
#[derive(Clone, PartialEq, Eq)]
pub enum EcdsaPublicKey {
    P256(p256::PublicKey),
    P384(p384::PublicKey),
}

impl EcdsaPublicKey {
    /// Decode a SEC1 point (compressed or uncompressed) on `curve`
    pub fn from_sec1_bytes(curve: EcdsaCurve, bytes: &[u8]) -> Result<Self, p256::elliptic_curve::Error> {
        match curve {
            EcdsaCurve::P256 => p256::PublicKey::from_sec1_bytes(bytes).map(EcdsaPublicKey::P256),
            EcdsaCurve::P384 => p384::PublicKey::from_sec1_bytes(bytes).map(EcdsaPublicKey::P384),
        }
    }

    pub fn curve(&self) -> EcdsaCurve {
        match self {
            EcdsaPublicKey::P256(_) => EcdsaCurve::P256,
            EcdsaPublicKey::P384(_) => EcdsaCurve::P384,
        }
    }

    /// Uncompressed SEC1 encoding `04 || X || Y`
    pub fn to_uncompressed_point(&self) -> Vec<u8> {
        match self {
            EcdsaPublicKey::P256(pk) => pk.to_encoded_point(false).as_bytes().to_vec(),
            EcdsaPublicKey::P384(pk) => pk.to_encoded_point(false).as_bytes().to_vec(),
        }
    }

    /// SHA-256 over the uncompressed point
    pub fn ski(&self) -> Ski {
        Ski::digest(&self.to_uncompressed_point())
    }

    /// PKIX `SubjectPublicKeyInfo` DER
    pub fn to_pkix_der(&self) -> Result<Vec<u8>, pkcs8::spki::Error> {
        let document = match self {
            EcdsaPublicKey::P256(pk) => pk.to_public_key_der()?,
            EcdsaPublicKey::P384(pk) => pk.to_public_key_der()?,
        };
        Ok(document.as_bytes().to_vec())
    }
}

impl From<p256::PublicKey> for EcdsaPublicKey {
    fn from(pk: p256::PublicKey) -> Self {
        EcdsaPublicKey::P256(pk)
    }
}

impl From<p384::PublicKey> for EcdsaPublicKey {
    fn from(pk: p384::PublicKey) -> Self {
        EcdsaPublicKey::P384(pk)
    }
}

impl fmt::Debug for EcdsaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcdsaPublicKey")
            .field("curve", &self.curve())
            .field("point", &hex::encode(self.to_uncompressed_point()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_oid_lookup() {
        assert_eq!(EcdsaCurve::from_oid(&EcdsaCurve::P256.oid()), Some(EcdsaCurve::P256));
        assert_eq!(EcdsaCurve::from_oid(&EcdsaCurve::P384.oid()), Some(EcdsaCurve::P384));

        let secp256k1 = ObjectIdentifier::new_unwrap("1.3.132.0.10");
        assert_eq!(EcdsaCurve::from_oid(&secp256k1), None);
    }

    #[test]
    fn test_ec_params_match_oid_encoding() {
        use pkcs8::der::Encode;

        for curve in [EcdsaCurve::P256, EcdsaCurve::P384] {
            let encoded = curve.oid().to_der().unwrap();
            assert_eq!(encoded.as_slice(), curve.ec_params_der());
        }
    }

    #[test]
    fn test_uncompressed_point_length() {
        let scalar = [0x11u8; 32];
        let secret = p256::SecretKey::from_slice(&scalar).unwrap();
        let public = EcdsaPublicKey::from(secret.public_key());

        let point = public.to_uncompressed_point();
        assert_eq!(point.len(), 65);
        assert_eq!(point[0], 0x04);
    }

    #[test]
    fn test_compressed_and_uncompressed_share_ski() {
        let secret = p384::SecretKey::from_slice(&[0x22u8; 48]).unwrap();
        let compressed = secret.public_key().to_encoded_point(true);
        let uncompressed = secret.public_key().to_encoded_point(false);

        let a = EcdsaPublicKey::from_sec1_bytes(EcdsaCurve::P384, compressed.as_bytes()).unwrap();
        let b = EcdsaPublicKey::from_sec1_bytes(EcdsaCurve::P384, uncompressed.as_bytes()).unwrap();
        assert_eq!(a.ski(), b.ski());
    }

    #[test]
    fn test_identity_point_rejected() {
        assert!(EcdsaPublicKey::from_sec1_bytes(EcdsaCurve::P256, &[0x00]).is_err());
    }
}
