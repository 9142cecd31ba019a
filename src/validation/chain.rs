//! Certificate chain parsing.
//!
//! Turns the PEM strings of a reported chain into `ChainCertificate`s in
//! submission order. Only structure is checked: no expiry, signature or
//! trust evaluation happens here.

use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::error::CertificateError;
use crate::logging::structured::LogContext;
use crate::storage::models::ChainKind;
use crate::{log_debug, log_warn};

use super::spki_hash::spki_pin;

/// One entry of a reported chain, with its freshly computed pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainCertificate {
    /// PEM text exactly as submitted.
    pub pem: String,
    /// Base64 SHA-256 of the SPKI.
    pub pin: String,
    /// Zero-based index in the submitted chain.
    pub position: usize,
}

/// Parse a single chain entry.
pub fn parse_chain_entry(position: usize, pem_text: &str) -> Result<ChainCertificate, CertificateError> {
    let (rest, pem) = parse_x509_pem(pem_text.as_bytes()).map_err(|e| CertificateError::Pem {
        position,
        reason: e.to_string(),
    })?;

    if parse_x509_pem(rest).is_ok() {
        return Err(CertificateError::MultiplePemBlocks { position });
    }

    let (trailing, cert) =
        X509Certificate::from_der(&pem.contents).map_err(|e| CertificateError::X509 {
            position,
            reason: e.to_string(),
        })?;

    if !trailing.is_empty() {
        return Err(CertificateError::TrailingData { position });
    }

    let pin = spki_pin(&cert).map_err(|source| CertificateError::Hash { position, source })?;

    Ok(ChainCertificate {
        pem: pem_text.to_string(),
        pin,
        position,
    })
}

/// Parse a whole chain, preserving order. Fails on the first bad entry.
pub fn parse_certificate_chain<S: AsRef<str>>(
    kind: ChainKind,
    entries: &[S],
    ctx: &LogContext,
) -> Result<Vec<ChainCertificate>, CertificateError> {
    let mut chain = Vec::with_capacity(entries.len());

    for (position, entry) in entries.iter().enumerate() {
        match parse_chain_entry(position, entry.as_ref()) {
            Ok(cert) => {
                log_debug!(
                    ctx,
                    "CHAIN_ENTRY_PARSED",
                    chain = kind,
                    position = position,
                    pin = cert.pin
                );
                chain.push(cert);
            }
            Err(e) => {
                log_warn!(ctx, "CHAIN_REJECTED", chain = kind, error = e);
                return Err(e);
            }
        }
    }

    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HashError;
    use crate::test_support::{key_pair, self_signed_pem, unsupported_key_pem};

    fn ctx() -> LogContext {
        LogContext::new("sub-test")
    }

    #[test]
    fn test_positions_follow_input_order() {
        let pems: Vec<String> = (0..3)
            .map(|i| self_signed_pem(&key_pair(), &format!("c{}.example", i), i + 1))
            .collect();

        let chain = parse_certificate_chain(ChainKind::Served, &pems, &ctx()).unwrap();
        assert_eq!(chain.len(), 3);
        for (i, cert) in chain.iter().enumerate() {
            assert_eq!(cert.position, i);
            assert_eq!(cert.pem, pems[i]);
        }
    }

    #[test]
    fn test_repeated_entries_not_collapsed() {
        let pem = self_signed_pem(&key_pair(), "same.example", 1);
        let chain =
            parse_certificate_chain(ChainKind::Validated, &[pem.clone(), pem], &ctx()).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].pin, chain[1].pin);
        assert_eq!(chain[1].position, 1);
    }

    #[test]
    fn test_shared_key_same_pin_different_pem() {
        let key = key_pair();
        let a = parse_chain_entry(0, &self_signed_pem(&key, "a.example", 1)).unwrap();
        let b = parse_chain_entry(1, &self_signed_pem(&key, "b.example", 2)).unwrap();
        assert_ne!(a.pem, b.pem);
        assert_eq!(a.pin, b.pin);
    }

    #[test]
    fn test_not_pem() {
        assert!(matches!(
            parse_chain_entry(0, "hello"),
            Err(CertificateError::Pem { position: 0, .. })
        ));
    }

    #[test]
    fn test_pem_with_garbage_der() {
        let pem = "-----BEGIN CERTIFICATE-----\nAAECAwQF\n-----END CERTIFICATE-----\n";
        assert!(matches!(
            parse_chain_entry(2, pem),
            Err(CertificateError::X509 { position: 2, .. })
        ));
    }

    #[test]
    fn test_two_blocks_in_one_entry() {
        let key = key_pair();
        let doubled = format!(
            "{}\n{}",
            self_signed_pem(&key, "a.example", 1),
            self_signed_pem(&key, "b.example", 2)
        );
        assert_eq!(
            parse_chain_entry(0, &doubled),
            Err(CertificateError::MultiplePemBlocks { position: 0 })
        );
    }

    #[test]
    fn test_unsupported_key_algorithm() {
        let pem = unsupported_key_pem(&key_pair(), "odd.example");
        assert!(matches!(
            parse_chain_entry(3, &pem),
            Err(CertificateError::Hash {
                position: 3,
                source: HashError::UnsupportedAlgorithm(ref oid),
            }) if oid == "1.2.840.10045.2.9"
        ));
    }

    #[test]
    fn test_first_bad_entry_stops_chain() {
        let good = self_signed_pem(&key_pair(), "ok.example", 1);
        let entries = vec![good.clone(), "broken".to_string(), good];
        assert!(matches!(
            parse_certificate_chain(ChainKind::Served, &entries, &ctx()),
            Err(CertificateError::Pem { position: 1, .. })
        ));
    }

    #[test]
    fn test_empty_chain() {
        let entries: Vec<String> = Vec::new();
        assert!(parse_certificate_chain(ChainKind::Served, &entries, &ctx())
            .unwrap()
            .is_empty());
    }
}
