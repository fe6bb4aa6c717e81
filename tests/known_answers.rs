// Known-answer vectors for every import variant
// The vectors are kept in tests/fixtures/known_answers.json

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use csp_keyimport::prelude::*;
use serde::Deserialize;
use x509_cert::der::Decode;
use x509_cert::Certificate;

#[derive(Debug, Deserialize)]
struct KnownAnswer {
    fixture: String,
    variant: String,
    family: Option<String>,
    ski: Option<String>,
    error: Option<String>,
}

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn load_vectors() -> Vec<KnownAnswer> {
    let json = fs::read_to_string(fixtures_dir().join("known_answers.json"))
        .expect("Failed to read known answer vectors");
    serde_json::from_str(&json).expect("Failed to parse known answer vectors")
}

fn import(csp: &Csp, vector: &KnownAnswer) -> ImportResult<Key> {
    let der = fs::read(fixtures_dir().join(&vector.fixture)).expect("Failed to read fixture");
    match vector.variant.as_str() {
        "pkix" => csp.key_import(
            Some(RawMaterial::Bytes(&der)),
            Some(&ImportOptions::PkixPublicKey { ephemeral: false }),
        ),
        "private" => csp.key_import(
            Some(RawMaterial::Bytes(&der)),
            Some(&ImportOptions::PrivateKey { ephemeral: false }),
        ),
        "certificate" => {
            let certificate = Certificate::from_der(&der).expect("Failed to parse certificate fixture");
            csp.key_import(
                Some(RawMaterial::Certificate(&certificate)),
                Some(&ImportOptions::X509Certificate { ephemeral: false }),
            )
        }
        other => panic!("unknown variant in vectors: {}", other),
    }
}

#[test]
fn test_known_answer_vectors() {
    let provider = MockSessionProvider::new();
    let pool = SessionPool::new(provider.clone(), &SessionPoolConfig::default()).unwrap();
    let csp = Csp::new(ImportPolicy::permissive()).with_gateway(Arc::new(pool));

    let vectors = load_vectors();
    assert!(!vectors.is_empty());

    let mut expected_hsm_objects = 0;
    for vector in &vectors {
        let result = import(&csp, vector);
        match (&vector.error, result) {
            (None, Ok(key)) => {
                assert_eq!(Some(key.algorithm().family()), vector.family.as_deref(), "{:?}", vector);
                assert_eq!(Some(key.ski().to_hex()), vector.ski, "{:?}", vector);
                if vector.variant == "private" {
                    expected_hsm_objects += 1;
                }
            }
            (Some(kind), Err(err)) => {
                assert_eq!(&format!("{:?}", err.kind()), kind, "{:?}: {}", vector, err);
            }
            (expected, actual) => panic!("{:?}: expected {:?}, got {:?}", vector, expected, actual),
        }
    }

    assert_eq!(provider.create_calls(), expected_hsm_objects);
}

#[test]
fn test_certificate_and_spki_fixtures_share_a_key() {
    let csp = Csp::new(ImportPolicy::default());

    let spki = fs::read(fixtures_dir().join("ec_p256_spki.der")).unwrap();
    let cert_der = fs::read(fixtures_dir().join("cert_ecdsa_p256.der")).unwrap();
    let certificate = Certificate::from_der(&cert_der).unwrap();

    let from_spki = csp.import_pkix_public_key(&spki, false).unwrap();
    let from_cert = csp.import_certificate(&certificate, false).unwrap();
    assert_eq!(from_spki.ski(), from_cert.ski());
}
