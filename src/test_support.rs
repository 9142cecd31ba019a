//! Certificate fixtures shared by unit tests.

use base64::{engine::general_purpose, Engine as _};
use rcgen::{date_time_ymd, CertificateParams, KeyPair, SerialNumber};
use x509_parser::pem::parse_x509_pem;

pub const ZERO_PIN: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

pub fn key_pair() -> KeyPair {
    KeyPair::generate().unwrap()
}

/// Self-signed certificate for `host`; `serial` also shifts the validity start.
pub fn self_signed_pem(key: &KeyPair, host: &str, serial: u64) -> String {
    let mut params = CertificateParams::new(vec![host.to_string()]).unwrap();
    params.serial_number = Some(SerialNumber::from(serial));
    params.not_before = date_time_ymd(2020, 1, (serial % 28 + 1) as u8);
    params.not_after = date_time_ymd(2030, 1, 1);
    params.self_signed(key).unwrap().pem()
}

pub fn der_of(pem: &str) -> Vec<u8> {
    let (_, pem) = parse_x509_pem(pem.as_bytes()).unwrap();
    pem.contents
}

/// DER of `id-ecPublicKey` (1.2.840.10045.2.1), as rcgen's default P-256 key carries it.
const EC_PUBLIC_KEY_OID: [u8; 9] = [0x06, 0x07, 0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x02, 0x01];

/// Well-formed certificate whose SPKI names 1.2.840.10045.2.9, a key
/// algorithm nobody pins. Only the key OID is touched; the signature no
/// longer verifies, which chain parsing does not check.
pub fn unsupported_key_pem(key: &KeyPair, host: &str) -> String {
    let mut der = der_of(&self_signed_pem(key, host, 1));
    let at = der
        .windows(EC_PUBLIC_KEY_OID.len())
        .position(|w| w == EC_PUBLIC_KEY_OID)
        .unwrap();
    der[at + EC_PUBLIC_KEY_OID.len() - 1] = 0x09;

    let body = general_purpose::STANDARD.encode(&der);
    let mut pem = String::from("-----BEGIN CERTIFICATE-----\n");
    for line in body.as_bytes().chunks(64) {
        pem.push_str(std::str::from_utf8(line).unwrap());
        pem.push('\n');
    }
    pem.push_str("-----END CERTIFICATE-----\n");
    pem
}

pub fn pin_directive(value: &str) -> String {
    format!("pin-sha256=\"{}\"", value)
}
