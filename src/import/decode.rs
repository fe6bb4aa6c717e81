/*!
 * Format decoders
 *
 * Pure functions from bytes, or parsed certificates, to algorithm-specific
 * key structures. A decoder only fails when the input does not parse. Input
 * that parses but carries an algorithm the pipeline does not accept is
 * returned as such and left to the validators.
 */

use pkcs8::der::referenced::OwnedToRef;
use pkcs8::der::Decode;
use pkcs8::{ObjectIdentifier, PrivateKeyInfo, SubjectPublicKeyInfoRef};
use sec1::EcPrivateKey;
use x509_cert::Certificate;

use super::ImportVariant;
use crate::error::{error_codes, ImportError, ImportResult};
use crate::key::ecdsa::ID_EC_PUBLIC_KEY;
use crate::key::rsa::ID_RSA_ENCRYPTION;
use crate::key::{EcdsaCurve, EcdsaPublicKey};
use crate::secure_memory::{with_secure_scope, SecureBytes};

const ID_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");
const ID_ED448: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.113");
const ID_X25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.110");
const ID_X448: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.111");
const ID_DSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10040.4.1");

/// Human-readable name of a public-key algorithm OID
pub fn algorithm_name(oid: &ObjectIdentifier) -> String {
    let name = if *oid == ID_EC_PUBLIC_KEY {
        "ECDSA"
    } else if *oid == ID_RSA_ENCRYPTION {
        "RSA"
    } else if *oid == ID_ED25519 {
        "Ed25519"
    } else if *oid == ID_ED448 {
        "Ed448"
    } else if *oid == ID_X25519 {
        "X25519"
    } else if *oid == ID_X448 {
        "X448"
    } else if *oid == ID_DSA {
        "DSA"
    } else {
        return oid.to_string();
    };
    name.to_string()
}

/// Public key decoded from a `SubjectPublicKeyInfo`
#[derive(Debug)]
pub enum DecodedPublicKey {
    Ecdsa(EcdsaPublicKey),
    /// EC key on a named curve other than P-256 or P-384
    UnsupportedCurve(ObjectIdentifier),
    Rsa(RsaComponents),
    /// Any other algorithm
    Other(ObjectIdentifier),
}

/// Big-endian integers of a PKCS#1 `RSAPublicKey`, not yet range checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaComponents {
    pub modulus: Vec<u8>,
    pub public_exponent: Vec<u8>,
}

/// EC private key on a supported curve. Wiped on drop.
pub enum EcdsaPrivateKey {
    P256(p256::SecretKey),
    P384(p384::SecretKey),
}

impl EcdsaPrivateKey {
    pub fn curve(&self) -> EcdsaCurve {
        match self {
            EcdsaPrivateKey::P256(_) => EcdsaCurve::P256,
            EcdsaPrivateKey::P384(_) => EcdsaCurve::P384,
        }
    }

    /// Derive the matching public key
    pub fn public_key(&self) -> EcdsaPublicKey {
        match self {
            EcdsaPrivateKey::P256(sk) => EcdsaPublicKey::P256(sk.public_key()),
            EcdsaPrivateKey::P384(sk) => EcdsaPublicKey::P384(sk.public_key()),
        }
    }

    /// Big-endian scalar copied into a wiping container
    pub fn scalar(&self) -> SecureBytes {
        match self {
            EcdsaPrivateKey::P256(sk) => {
                let mut bytes = sk.to_bytes();
                with_secure_scope(bytes.as_mut_slice(), |b| SecureBytes::new(b))
            }
            EcdsaPrivateKey::P384(sk) => {
                let mut bytes = sk.to_bytes();
                with_secure_scope(bytes.as_mut_slice(), |b| SecureBytes::new(b))
            }
        }
    }
}

impl std::fmt::Debug for EcdsaPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EcdsaPrivateKey({}, [REDACTED])", self.curve())
    }
}

/// Private key decoded from PKCS#1, PKCS#8 or SEC1 DER
#[derive(Debug)]
pub enum DecodedPrivateKey {
    Ecdsa(EcdsaPrivateKey),
    UnsupportedCurve(ObjectIdentifier),
    Rsa,
    Other(ObjectIdentifier),
}

/// Decode a PKIX `SubjectPublicKeyInfo` DER blob
pub fn decode_pkix_public_key(variant: ImportVariant, der: &[u8]) -> ImportResult<DecodedPublicKey> {
    let spki = SubjectPublicKeyInfoRef::try_from(der).map_err(|e| {
        ImportError::decode_failure(
            variant,
            "PKIX SubjectPublicKeyInfo",
            &e.to_string(),
            error_codes::PKIX_DECODE_FAILED,
        )
    })?;
    decode_spki(variant, spki, error_codes::PKIX_DECODE_FAILED)
}

/// Decode the public key embedded in a parsed certificate
pub fn decode_certificate_public_key(
    variant: ImportVariant,
    certificate: &Certificate,
) -> ImportResult<DecodedPublicKey> {
    let spki = certificate
        .tbs_certificate
        .subject_public_key_info
        .owned_to_ref();
    decode_spki(variant, spki, error_codes::CERTIFICATE_KEY_DECODE_FAILED)
}

fn decode_spki(
    variant: ImportVariant,
    spki: SubjectPublicKeyInfoRef<'_>,
    error_code: u32,
) -> ImportResult<DecodedPublicKey> {
    let algorithm = spki.algorithm.oid;

    if algorithm == ID_EC_PUBLIC_KEY {
        let curve_oid = spki.algorithm.parameters_oid().map_err(|e| {
            ImportError::decode_failure(variant, "EC named curve parameter", &e.to_string(), error_code)
        })?;
        let curve = match EcdsaCurve::from_oid(&curve_oid) {
            Some(curve) => curve,
            None => return Ok(DecodedPublicKey::UnsupportedCurve(curve_oid)),
        };
        let point = spki.subject_public_key.as_bytes().ok_or_else(|| {
            ImportError::decode_failure(
                variant,
                "SEC1 EC point",
                "subject public key is not octet aligned",
                error_codes::PUBLIC_POINT_INVALID,
            )
        })?;
        let public = EcdsaPublicKey::from_sec1_bytes(curve, point).map_err(|_| {
            ImportError::decode_failure(
                variant,
                "SEC1 EC point",
                &format!("not a valid point on {}", curve),
                error_codes::PUBLIC_POINT_INVALID,
            )
        })?;
        Ok(DecodedPublicKey::Ecdsa(public))
    } else if algorithm == ID_RSA_ENCRYPTION {
        let rsa_failure = |cause: &str| {
            ImportError::decode_failure(variant, "PKCS#1 RSAPublicKey", cause, error_code)
        };
        let bytes = spki
            .subject_public_key
            .as_bytes()
            .ok_or_else(|| rsa_failure("subject public key is not octet aligned"))?;
        let public = rsa::pkcs1::RsaPublicKey::from_der(bytes).map_err(|e| rsa_failure(&e.to_string()))?;
        Ok(DecodedPublicKey::Rsa(RsaComponents {
            modulus: public.modulus.as_bytes().to_vec(),
            public_exponent: public.public_exponent.as_bytes().to_vec(),
        }))
    } else {
        Ok(DecodedPublicKey::Other(algorithm))
    }
}

/// Decode a private key, trying PKCS#1, then PKCS#8, then SEC1
///
/// The first encoding the bytes parse as wins. Parsing as none of them is a
/// decode failure; the error names the SEC1 attempt, the last one tried.
pub fn decode_private_key(variant: ImportVariant, der: &[u8]) -> ImportResult<DecodedPrivateKey> {
    if rsa::pkcs1::RsaPrivateKey::try_from(der).is_ok() {
        return Ok(DecodedPrivateKey::Rsa);
    }

    if let Ok(info) = PrivateKeyInfo::try_from(der) {
        return decode_pkcs8(variant, info);
    }

    match EcPrivateKey::try_from(der) {
        Ok(ec) => decode_sec1(variant, ec),
        Err(e) => Err(ImportError::decode_failure(
            variant,
            "PKCS#1, PKCS#8 or SEC1 private key",
            &e.to_string(),
            error_codes::PRIVATE_KEY_DECODE_FAILED,
        )),
    }
}

fn decode_pkcs8(variant: ImportVariant, info: PrivateKeyInfo<'_>) -> ImportResult<DecodedPrivateKey> {
    let algorithm = info.algorithm.oid;

    if algorithm == ID_EC_PUBLIC_KEY {
        // Curve parameters may be left to the inner ECPrivateKey
        let curve_oid = match info.algorithm.parameters {
            None => None,
            Some(_) => Some(info.algorithm.parameters_oid().map_err(|e| {
                ImportError::decode_failure(
                    variant,
                    "EC named curve parameter",
                    &e.to_string(),
                    error_codes::PRIVATE_KEY_DECODE_FAILED,
                )
            })?),
        };
        let ec = EcPrivateKey::try_from(info.private_key).map_err(|e| {
            ImportError::decode_failure(
                variant,
                "PKCS#8 EC private key",
                &e.to_string(),
                error_codes::PRIVATE_KEY_DECODE_FAILED,
            )
        })?;
        decode_ec_private_key(variant, curve_oid, ec)
    } else if algorithm == ID_RSA_ENCRYPTION {
        Ok(DecodedPrivateKey::Rsa)
    } else {
        Ok(DecodedPrivateKey::Other(algorithm))
    }
}

fn decode_sec1(variant: ImportVariant, ec: EcPrivateKey<'_>) -> ImportResult<DecodedPrivateKey> {
    decode_ec_private_key(variant, None, ec)
}

/// Decode an `ECPrivateKey`, with the curve optionally fixed by an enclosing
/// PKCS#8 algorithm identifier
fn decode_ec_private_key(
    variant: ImportVariant,
    outer_curve: Option<ObjectIdentifier>,
    ec: EcPrivateKey<'_>,
) -> ImportResult<DecodedPrivateKey> {
    let sec1_failure = |cause: &str| {
        ImportError::decode_failure(
            variant,
            "SEC1 ECPrivateKey",
            cause,
            error_codes::PRIVATE_KEY_DECODE_FAILED,
        )
    };

    let inner_curve = ec.parameters.and_then(|params| params.named_curve());
    let curve = match (outer_curve, inner_curve) {
        (Some(outer), Some(inner)) if outer != inner => {
            return Err(sec1_failure(&format!(
                "curve {} contradicts algorithm parameter {}",
                inner, outer
            )))
        }
        (Some(oid), _) | (None, Some(oid)) => match EcdsaCurve::from_oid(&oid) {
            Some(curve) => curve,
            None => return Ok(DecodedPrivateKey::UnsupportedCurve(oid)),
        },
        (None, None) => infer_curve(&ec).ok_or_else(|| sec1_failure("missing named curve parameter"))?,
    };

    let private = match curve {
        EcdsaCurve::P256 => p256::SecretKey::from_slice(ec.private_key).map(EcdsaPrivateKey::P256),
        EcdsaCurve::P384 => p384::SecretKey::from_slice(ec.private_key).map(EcdsaPrivateKey::P384),
    }
    .map_err(|_| sec1_failure(&format!("private scalar is not valid on {}", curve)))?;

    if let Some(embedded) = ec.public_key {
        let matches = EcdsaPublicKey::from_sec1_bytes(curve, embedded)
            .map(|public| public == private.public_key())
            .unwrap_or(false);
        if !matches {
            return Err(sec1_failure("embedded public key does not match the private scalar"));
        }
    }

    Ok(DecodedPrivateKey::Ecdsa(private))
}

/// Curve of an `ECPrivateKey` without parameters
///
/// The embedded public point decides when present, otherwise the scalar
/// length. A bare 32-byte scalar is read as P-256.
fn infer_curve(ec: &EcPrivateKey<'_>) -> Option<EcdsaCurve> {
    let by_point = ec.public_key.and_then(|point| match point.len() {
        33 | 65 => Some(EcdsaCurve::P256),
        49 | 97 => Some(EcdsaCurve::P384),
        _ => None,
    });
    by_point.or(match ec.private_key.len() {
        32 => Some(EcdsaCurve::P256),
        48 => Some(EcdsaCurve::P384),
        _ => None,
    })
}
