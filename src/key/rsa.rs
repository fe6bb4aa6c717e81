/*!
 * RSA public keys carried by imported certificates
 */

use pkcs8::{EncodePublicKey, ObjectIdentifier};
use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};

use super::Ski;
use crate::error::KeyError;

/// `rsaEncryption` (RFC 8017)
pub const ID_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// Largest modulus accepted from a certificate
pub const MAX_MODULUS_BITS: usize = 16384;

/// Build a public key from big-endian modulus and exponent bytes
///
/// Moduli up to [`MAX_MODULUS_BITS`] are accepted, well above the 4096-bit
/// default of the `rsa` crate.
pub fn from_components(modulus: &[u8], public_exponent: &[u8]) -> Result<RsaPublicKey, KeyError> {
    RsaPublicKey::new_with_max_size(
        BigUint::from_bytes_be(modulus),
        BigUint::from_bytes_be(public_exponent),
        MAX_MODULUS_BITS,
    )
    .map_err(|e| KeyError::Encoding(format!("RSAPublicKey: {}", e)))
}

/// Modulus size in bits
pub fn modulus_bits(key: &RsaPublicKey) -> usize {
    key.size() * 8
}

/// SHA-256 over the PKCS#1 `RSAPublicKey` DER
pub fn ski(key: &RsaPublicKey) -> Result<Ski, KeyError> {
    let der = key
        .to_pkcs1_der()
        .map_err(|e| KeyError::Encoding(format!("PKCS#1 RSAPublicKey: {}", e)))?;
    Ok(Ski::digest(der.as_bytes()))
}

pub fn to_pkix_der(key: &RsaPublicKey) -> Result<Vec<u8>, KeyError> {
    let document = key
        .to_public_key_der()
        .map_err(|e| KeyError::Encoding(format!("SubjectPublicKeyInfo: {}", e)))?;
    Ok(document.as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::DecodePublicKey;

    const RSA_SPKI: &[u8] = include_bytes!("../../tests/fixtures/rsa_spki.der");
    const RSA_SKI_HEX: &str = "6bb72d455195b710af48444e31b73dc1df410dd23b48cc73ea39f2d89d424186";
    const RSA8192_SPKI: &[u8] = include_bytes!("../../tests/fixtures/rsa8192_spki.der");
    const RSA8192_SKI_HEX: &str = "8ddd7e07f3df47da23656047b08c5c3b48516a6a39b74f07dd1615890ac7c70c";

    fn components(spki: &[u8]) -> (Vec<u8>, Vec<u8>) {
        use rsa::pkcs1::der::Decode;

        let info = pkcs8::SubjectPublicKeyInfoRef::try_from(spki).unwrap();
        let bytes = info.subject_public_key.as_bytes().unwrap();
        let key = rsa::pkcs1::RsaPublicKey::from_der(bytes).unwrap();
        (key.modulus.as_bytes().to_vec(), key.public_exponent.as_bytes().to_vec())
    }

    #[test]
    fn test_rsa_ski_known_answer() {
        let key = RsaPublicKey::from_public_key_der(RSA_SPKI).unwrap();
        assert_eq!(ski(&key).unwrap().to_string(), RSA_SKI_HEX);
    }

    #[test]
    fn test_rsa_pkix_round_trip() {
        let key = RsaPublicKey::from_public_key_der(RSA_SPKI).unwrap();
        assert_eq!(to_pkix_der(&key).unwrap(), RSA_SPKI);
        assert_eq!(modulus_bits(&key), 2048);
    }

    #[test]
    fn test_large_modulus_from_components() {
        let (n, e) = components(RSA8192_SPKI);
        let key = from_components(&n, &e).unwrap();
        assert_eq!(modulus_bits(&key), 8192);
        assert_eq!(ski(&key).unwrap().to_string(), RSA8192_SKI_HEX);
        assert_eq!(to_pkix_der(&key).unwrap(), RSA8192_SPKI);
    }

    #[test]
    fn test_components_reject_bad_exponent() {
        let (n, _) = components(RSA_SPKI);
        assert!(matches!(from_components(&n, &[0x01]), Err(KeyError::Encoding(_))));
    }
}
