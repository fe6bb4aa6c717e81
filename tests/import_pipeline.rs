// End-to-end import tests against the public API
// Fixture keys live in tests/fixtures as DER files

use std::sync::Arc;

use csp_keyimport::error::error_codes;
use csp_keyimport::prelude::*;
use proptest::prelude::*;
use x509_cert::der::Decode;
use x509_cert::Certificate;

const P256_SPKI: &[u8] = include_bytes!("fixtures/ec_p256_spki.der");
const P256_PKCS8: &[u8] = include_bytes!("fixtures/ec_p256_pkcs8.der");
const P384_SPKI: &[u8] = include_bytes!("fixtures/ec_p384_spki.der");
const P384_SEC1: &[u8] = include_bytes!("fixtures/ec_p384_sec1.der");
const K256_SPKI: &[u8] = include_bytes!("fixtures/ec_k256_spki.der");
const K256_PKCS8: &[u8] = include_bytes!("fixtures/ec_k256_pkcs8.der");
const RSA_PKCS8: &[u8] = include_bytes!("fixtures/rsa_pkcs8.der");
const ED25519_SPKI: &[u8] = include_bytes!("fixtures/ed25519_spki.der");
const CERT_ECDSA: &[u8] = include_bytes!("fixtures/cert_ecdsa_p256.der");
const CERT_RSA: &[u8] = include_bytes!("fixtures/cert_rsa.der");
const CERT_ED25519: &[u8] = include_bytes!("fixtures/cert_ed25519.der");

const P256_SKI: &str = "631a9393260a22f95f618ed642c7f082bd78825e5d268d93f716baf4b0edd8fd";
const P384_SKI: &str = "5cdf303e1668c7b4c6beb0c9d16890ac2c4dc0251601197f007b2de3588a9694";
const RSA_SKI: &str = "6bb72d455195b710af48444e31b73dc1df410dd23b48cc73ea39f2d89d424186";

fn permissive_csp() -> (Csp, MockSessionProvider) {
    let provider = MockSessionProvider::new();
    let pool = SessionPool::new(provider.clone(), &SessionPoolConfig::default()).unwrap();
    (Csp::new(ImportPolicy::permissive()).with_gateway(Arc::new(pool)), provider)
}

#[test]
fn test_pkix_import_on_supported_curves() {
    let csp = Csp::new(ImportPolicy::default());

    let p256 = csp.import_pkix_public_key(P256_SPKI, false).unwrap();
    assert_eq!(p256.algorithm(), KeyAlgorithm::Ecdsa(EcdsaCurve::P256));
    assert_eq!(p256.ski().to_hex(), P256_SKI);
    assert!(!p256.is_private());
    assert!(!p256.is_symmetric());
    assert!(!p256.is_ephemeral());

    let p384 = csp.import_pkix_public_key(P384_SPKI, true).unwrap();
    assert_eq!(p384.algorithm(), KeyAlgorithm::Ecdsa(EcdsaCurve::P384));
    assert_eq!(p384.ski().to_hex(), P384_SKI);
    assert!(p384.is_ephemeral());
}

#[test]
fn test_pkix_import_rejects_other_algorithms() {
    let csp = Csp::new(ImportPolicy::default());

    let err = csp.import_pkix_public_key(ED25519_SPKI, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedAlgorithm);
    assert_eq!(err.error_code(), error_codes::NOT_ECDSA);
    assert!(err.to_string().contains("Ed25519"), "{}", err);

    let err = csp.import_pkix_public_key(K256_SPKI, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedAlgorithm);
    assert_eq!(err.error_code(), error_codes::UNSUPPORTED_CURVE);
}

#[test]
fn test_pkix_import_rejects_truncated_der() {
    let csp = Csp::new(ImportPolicy::default());
    let err = csp
        .import_pkix_public_key(&P256_SPKI[..P256_SPKI.len() - 3], false)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);
    assert_eq!(err.error_code(), error_codes::PKIX_DECODE_FAILED);
}

#[test]
fn test_private_import_accepts_every_encoding() {
    let (csp, provider) = permissive_csp();

    let from_pkcs8 = csp.import_private_key(P256_PKCS8, false).unwrap();
    assert_eq!(from_pkcs8.ski().to_hex(), P256_SKI);

    let from_sec1 = csp.import_private_key(P384_SEC1, false).unwrap();
    assert_eq!(from_sec1.ski().to_hex(), P384_SKI);

    assert_eq!(provider.create_calls(), 2);
    let err = from_pkcs8.to_bytes().unwrap_err();
    assert!(matches!(err, KeyError::NotExportable { .. }));
    assert!(err.to_string().contains(P256_SKI));
}

#[test]
fn test_private_import_of_sec1_without_curve_parameter() {
    let (csp, provider) = permissive_csp();

    let p256_secret = p256::SecretKey::from_slice(&[0x42; 32]).unwrap();
    let p384_secret = p384::SecretKey::from_slice(&[0x42; 48]).unwrap();
    let cases = [
        (
            p256_secret.to_sec1_der().unwrap(),
            EcdsaPublicKey::from(p256_secret.public_key()),
        ),
        (
            p384_secret.to_sec1_der().unwrap(),
            EcdsaPublicKey::from(p384_secret.public_key()),
        ),
    ];

    for (der, public) in &cases {
        let key = csp.import_private_key(der, false).unwrap();
        assert_eq!(key.algorithm(), KeyAlgorithm::Ecdsa(public.curve()));
        assert_eq!(*key.ski(), public.ski());
    }
    assert_eq!(provider.create_calls(), 2);
}

#[test]
fn test_private_import_rejects_other_families() {
    let (csp, provider) = permissive_csp();

    let err = csp.import_private_key(RSA_PKCS8, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedAlgorithm);

    let err = csp.import_private_key(K256_PKCS8, false).unwrap_err();
    assert_eq!(err.error_code(), error_codes::UNSUPPORTED_CURVE);

    assert_eq!(provider.create_calls(), 0);
}

#[test]
fn test_private_import_disabled_by_default() {
    let csp = Csp::new(ImportPolicy::default());
    let err = csp.import_private_key(P256_PKCS8, false).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PolicyViolation);
    assert_eq!(err.error_code(), error_codes::PRIVATE_IMPORT_DISABLED);
    assert_eq!(err.variant(), Some(ImportVariant::PrivateKey));
}

#[test]
fn test_certificate_with_ecdsa_key() {
    let csp = Csp::new(ImportPolicy::default());
    let certificate = Certificate::from_der(CERT_ECDSA).unwrap();

    let key = csp.import_certificate(&certificate, false).unwrap();
    assert_eq!(key.algorithm().family(), "ECDSA");
    assert_eq!(key.ski().to_hex(), P256_SKI);
    assert_eq!(key.to_bytes().unwrap(), P256_SPKI);
}

#[test]
fn test_certificate_with_rsa_key() {
    let csp = Csp::new(ImportPolicy::default());
    let certificate = Certificate::from_der(CERT_RSA).unwrap();

    let key = csp
        .key_import(
            Some(RawMaterial::from(&certificate)),
            Some(&ImportOptions::X509Certificate { ephemeral: false }),
        )
        .unwrap();
    assert_eq!(key.algorithm().family(), "RSA");
    assert!(matches!(key.algorithm(), KeyAlgorithm::Rsa { modulus_bits: 2048 }));
    assert_eq!(key.ski().to_hex(), RSA_SKI);
    assert!(matches!(key.public_key(), Some(PublicKeyValue::Rsa(_))));
}

#[test]
fn test_certificate_with_ed25519_key_is_unsupported() {
    let csp = Csp::new(ImportPolicy::default());
    let certificate = Certificate::from_der(CERT_ED25519).unwrap();

    let err = csp.import_certificate(&certificate, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedAlgorithm);
    assert_eq!(err.error_code(), error_codes::NOT_ECDSA_OR_RSA);
    assert!(err.to_string().contains("supported families are ECDSA, RSA"));
}

#[test]
fn test_public_key_round_trip_through_pkix() {
    let csp = Csp::new(ImportPolicy::default());

    for der in [P256_SPKI, P384_SPKI] {
        let imported = csp.import_pkix_public_key(der, false).unwrap();
        let public = match imported.public_key() {
            Some(PublicKeyValue::Ecdsa(public)) => public.clone(),
            other => panic!("expected ECDSA public key, got {:?}", other),
        };

        let native = csp.import_ecdsa_public_key(&public, true).unwrap();
        assert_eq!(native.ski(), imported.ski());
        assert!(native.is_ephemeral());

        let reimported = csp.import_pkix_public_key(&native.to_bytes().unwrap(), false).unwrap();
        assert_eq!(reimported.ski(), imported.ski());
    }
}

#[test]
fn test_csp_from_default_config() {
    let csp = Csp::from_config(&CspConfig::default()).unwrap();
    assert!(!csp.policy().private_key_import_enabled());

    let err = csp.import_private_key(P256_PKCS8, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyViolation);
}

#[test]
fn test_csp_from_config_without_hsm() {
    let config: CspConfig = serde_json::from_str(r#"{ "private_key_import": true }"#).unwrap();
    let csp = Csp::from_config(&config).unwrap();

    let err = csp.import_private_key(P256_PKCS8, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HsmFailure);
    assert_eq!(err.error_code(), error_codes::HSM_NOT_CONFIGURED);
}

proptest! {
    #[test]
    fn prop_pkix_decoder_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let csp = Csp::new(ImportPolicy::default());
        let _ = csp.import_pkix_public_key(&bytes, false);
    }

    #[test]
    fn prop_private_decoder_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let csp = Csp::new(ImportPolicy::permissive());
        if let Err(err) = csp.import_private_key(&bytes, false) {
            prop_assert_ne!(err.kind(), ErrorKind::PolicyViolation);
        }
    }

    #[test]
    fn prop_corrupted_pkix_never_yields_another_key(index in 0usize..91, flip in 1u8..=255) {
        let csp = Csp::new(ImportPolicy::default());
        let mut der = P256_SPKI.to_vec();
        der[index] ^= flip;

        if let Ok(key) = csp.import_pkix_public_key(&der, false) {
            let reimported = csp.import_pkix_public_key(&key.to_bytes().unwrap(), false).unwrap();
            prop_assert_eq!(*key.ski(), *reimported.ski());
        }
    }
}
