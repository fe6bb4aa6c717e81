/*!
 * Algorithm-family validators
 */

use super::decode::{algorithm_name, DecodedPrivateKey, DecodedPublicKey, EcdsaPrivateKey};
use super::{public_key_failure, ImportVariant};
use crate::error::{error_codes, ImportError, ImportResult};
use crate::key::{self, EcdsaPublicKey, PublicKeyValue};

const EXPECTED_ECDSA: &str = "expected ECDSA";
const EXPECTED_SUPPORTED_CURVE: &str = "expected ECDSA on P-256 or P-384";
const EXPECTED_ECDSA_OR_RSA: &str = "supported families are ECDSA, RSA";

/// Accept only ECDSA public keys on a supported curve
pub fn require_ecdsa(variant: ImportVariant, decoded: DecodedPublicKey) -> ImportResult<EcdsaPublicKey> {
    match decoded {
        DecodedPublicKey::Ecdsa(public) => Ok(public),
        DecodedPublicKey::UnsupportedCurve(curve) => Err(unsupported_curve(variant, &curve.to_string())),
        DecodedPublicKey::Rsa(_) => Err(ImportError::unsupported_algorithm(
            variant,
            EXPECTED_ECDSA,
            "RSA",
            error_codes::NOT_ECDSA,
        )),
        DecodedPublicKey::Other(oid) => Err(ImportError::unsupported_algorithm(
            variant,
            EXPECTED_ECDSA,
            &algorithm_name(&oid),
            error_codes::NOT_ECDSA,
        )),
    }
}

/// Accept ECDSA or RSA public keys
///
/// RSA moduli are accepted up to [`key::rsa::MAX_MODULUS_BITS`].
pub fn require_ecdsa_or_rsa(variant: ImportVariant, decoded: DecodedPublicKey) -> ImportResult<PublicKeyValue> {
    match decoded {
        DecodedPublicKey::Ecdsa(public) => Ok(PublicKeyValue::Ecdsa(public)),
        DecodedPublicKey::Rsa(components) => {
            key::rsa::from_components(&components.modulus, &components.public_exponent)
                .map(PublicKeyValue::Rsa)
                .map_err(|e| public_key_failure(variant, "PKCS#1 RSAPublicKey", e))
        }
        DecodedPublicKey::UnsupportedCurve(curve) => Err(unsupported_curve(variant, &curve.to_string())),
        DecodedPublicKey::Other(oid) => Err(ImportError::unsupported_algorithm(
            variant,
            EXPECTED_ECDSA_OR_RSA,
            &algorithm_name(&oid),
            error_codes::NOT_ECDSA_OR_RSA,
        )),
    }
}

/// Accept only ECDSA private keys on a supported curve
pub fn require_ecdsa_private(variant: ImportVariant, decoded: DecodedPrivateKey) -> ImportResult<EcdsaPrivateKey> {
    match decoded {
        DecodedPrivateKey::Ecdsa(private) => Ok(private),
        DecodedPrivateKey::UnsupportedCurve(curve) => Err(unsupported_curve(variant, &curve.to_string())),
        DecodedPrivateKey::Rsa => Err(ImportError::unsupported_algorithm(
            variant,
            EXPECTED_ECDSA,
            "RSA",
            error_codes::NOT_ECDSA,
        )),
        DecodedPrivateKey::Other(oid) => Err(ImportError::unsupported_algorithm(
            variant,
            EXPECTED_ECDSA,
            &algorithm_name(&oid),
            error_codes::NOT_ECDSA,
        )),
    }
}

/// Check an ECDSA public value is a well-formed, non-zero point
pub fn validate_public_point(variant: ImportVariant, public: &EcdsaPublicKey) -> ImportResult<()> {
    let point = public.to_uncompressed_point();
    let coordinate_len = public.curve().scalar_len();

    if point.len() != 1 + 2 * coordinate_len || point[0] != 0x04 {
        return Err(ImportError::decode_failure(
            variant,
            "SEC1 EC point",
            "malformed uncompressed point",
            error_codes::PUBLIC_POINT_INVALID,
        ));
    }
    if point[1..].iter().all(|b| *b == 0) {
        return Err(ImportError::decode_failure(
            variant,
            "SEC1 EC point",
            "point must not be zero",
            error_codes::PUBLIC_POINT_INVALID,
        ));
    }
    Ok(())
}

fn unsupported_curve(variant: ImportVariant, curve: &str) -> ImportError {
    ImportError::unsupported_algorithm(
        variant,
        EXPECTED_SUPPORTED_CURVE,
        &format!("ECDSA on curve {}", curve),
        error_codes::UNSUPPORTED_CURVE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::import::decode::RsaComponents;
    use pkcs8::ObjectIdentifier;

    const V: ImportVariant = ImportVariant::X509Certificate;

    #[test]
    fn test_other_family_rejected_by_both_validators() {
        let ed25519 = ObjectIdentifier::new_unwrap("1.3.101.112");

        let err = require_ecdsa(V, DecodedPublicKey::Other(ed25519)).unwrap_err();
        assert_eq!(err.error_code(), error_codes::NOT_ECDSA);

        let err = require_ecdsa_or_rsa(V, DecodedPublicKey::Other(ed25519)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedAlgorithm);
        assert!(err.to_string().contains("supported families are ECDSA, RSA"));
        assert!(err.to_string().contains("Ed25519"));
    }

    #[test]
    fn test_unsupported_curve_names_curve() {
        let secp256k1 = ObjectIdentifier::new_unwrap("1.3.132.0.10");
        let err = require_ecdsa_private(V, DecodedPrivateKey::UnsupportedCurve(secp256k1)).unwrap_err();
        assert_eq!(err.error_code(), error_codes::UNSUPPORTED_CURVE);
        assert!(err.to_string().contains("1.3.132.0.10"));
    }

    #[test]
    fn test_rsa_private_rejected() {
        let err = require_ecdsa_private(V, DecodedPrivateKey::Rsa).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedAlgorithm);
        assert!(err.to_string().contains("expected ECDSA"));
    }

    #[test]
    fn test_rsa_exponent_out_of_range_is_decode_failure() {
        let components = RsaComponents {
            modulus: vec![0xc5; 256],
            public_exponent: vec![0x01],
        };

        let err = require_ecdsa_or_rsa(V, DecodedPublicKey::Rsa(components.clone())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeFailure);
        assert_eq!(err.error_code(), error_codes::CERTIFICATE_KEY_DECODE_FAILED);

        // Family check comes first for the ECDSA-only pipelines
        let err = require_ecdsa(ImportVariant::PkixPublicKey, DecodedPublicKey::Rsa(components)).unwrap_err();
        assert_eq!(err.error_code(), error_codes::NOT_ECDSA);
    }

    #[test]
    fn test_valid_point_accepted() {
        let secret = p256::SecretKey::from_slice(&[0x05u8; 32]).unwrap();
        let public = EcdsaPublicKey::from(secret.public_key());
        assert!(validate_public_point(V, &public).is_ok());
    }
}
