//! Error types for report validation and storage.
//!
//! Validation failures (`FormatError`, `CertificateError`) are raised before
//! any write happens. `StorageError` covers everything after the transaction
//! is opened. `IngestError` is what the pipeline hands back to the boundary.

use thiserror::Error;

use crate::storage::models::ChainKind;

/// A `known-pins` token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("known pin #{index} is not a pin-sha256 directive")]
    Directive { index: usize },

    #[error("known pin #{index} is not valid base64")]
    Base64 { index: usize },

    #[error("known pin #{index} decodes to {len} bytes, expected 32")]
    DigestLength { index: usize, len: usize },
}

/// A certificate's public key could not be canonically re-serialized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    #[error("malformed subject public key info: {0}")]
    Encoding(String),

    #[error("unsupported public key algorithm {0}")]
    UnsupportedAlgorithm(String),
}

/// A chain entry is not a usable PEM/X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CertificateError {
    #[error("chain entry {position}: no PEM block: {reason}")]
    Pem { position: usize, reason: String },

    #[error("chain entry {position}: more than one PEM block")]
    MultiplePemBlocks { position: usize },

    #[error("chain entry {position}: malformed X.509 certificate: {reason}")]
    X509 { position: usize, reason: String },

    #[error("chain entry {position}: trailing data after certificate")]
    TrailingData { position: usize },

    #[error("chain entry {position}: {source}")]
    Hash {
        position: usize,
        #[source]
        source: HashError,
    },
}

/// Failure while writing a report.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("duplicate {kind} chain position {position}")]
    DuplicateChainPosition { kind: ChainKind, position: usize },

    #[error("row for {table} key {key} vanished after insert")]
    MissingRow { table: &'static str, key: String },
}

/// Anything that can stop a submission from being recorded.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("report body could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Certificate(#[from] CertificateError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IngestError {
    /// True when the reporter sent something unusable (maps to a 400).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, IngestError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        let err: IngestError = FormatError::Directive { index: 0 }.into();
        assert!(err.is_client_error());

        let err: IngestError = CertificateError::TrailingData { position: 2 }.into();
        assert!(err.is_client_error());

        let err: IngestError = StorageError::DuplicateChainPosition {
            kind: ChainKind::Served,
            position: 1,
        }
        .into();
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_hash_error_carries_position() {
        let err = CertificateError::Hash {
            position: 3,
            source: HashError::UnsupportedAlgorithm("1.2.3.4".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "chain entry 3: unsupported public key algorithm 1.2.3.4"
        );
    }
}
