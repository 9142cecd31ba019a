//! SPKI pin computation.
//!
//! The pin is SHA-256 over the DER of the certificate's SubjectPublicKeyInfo,
//! base64 encoded. The SPKI must be strict DER with an allow-listed key
//! algorithm; for such input the encoding is already canonical, so the
//! hashed bytes are the ones carried in the certificate.

use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};
use spki::der::{Decode, Encode};
use spki::{ObjectIdentifier, SubjectPublicKeyInfoRef};
use x509_parser::certificate::X509Certificate;

use crate::error::HashError;

/// Key algorithms accepted for pinning: RSA, EC, Ed25519, X25519.
const SUPPORTED_KEY_ALGORITHMS: [ObjectIdentifier; 4] = [
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1"),
    ObjectIdentifier::new_unwrap("1.2.840.10045.2.1"),
    ObjectIdentifier::new_unwrap("1.3.101.112"),
    ObjectIdentifier::new_unwrap("1.3.101.110"),
];

/// Compute the pin of a parsed certificate.
pub fn spki_pin(cert: &X509Certificate<'_>) -> Result<String, HashError> {
    spki_pin_from_der(cert.public_key().raw)
}

/// Compute the pin from a DER-encoded SubjectPublicKeyInfo.
pub fn spki_pin_from_der(spki_der: &[u8]) -> Result<String, HashError> {
    let canonical = canonical_spki_der(spki_der)?;
    let digest = Sha256::digest(&canonical);
    Ok(general_purpose::STANDARD.encode(digest))
}

/// Check the SPKI is strict DER with a supported key algorithm and return
/// its DER encoding (byte-identical to valid input).
pub fn canonical_spki_der(spki_der: &[u8]) -> Result<Vec<u8>, HashError> {
    let info = SubjectPublicKeyInfoRef::from_der(spki_der)
        .map_err(|e| HashError::Encoding(e.to_string()))?;

    let oid = info.algorithm.oid;
    if !SUPPORTED_KEY_ALGORITHMS.contains(&oid) {
        return Err(HashError::UnsupportedAlgorithm(oid.to_string()));
    }

    info.to_der().map_err(|e| HashError::Encoding(e.to_string()))
}
