//! HPKP Report Core - Public-Key-Pinning violation report receiver
//!
//! Browsers that see a certificate chain contradicting a site's pinned keys
//! send a report. This crate validates the report's cryptographic material
//! and records it durably. The implementation prioritizes:
//!
//! 1. **Correctness** - Pins are recomputed from the submitted certificates, never trusted
//! 2. **Atomicity** - A report is stored completely or not at all
//! 3. **Logging** - Every decision point logged with submission context
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `validation` - Known-pin parsing, certificate chain parsing, SPKI pin hashing
//! - `storage` - Models, SQL text and the transactional SQLite store
//! - `pipeline` - Validate-then-persist orchestration and the worker pool
//! - `logging` - Structured logging with submission context
//! - `config` - Environment-driven configuration
//! - `error` - Failure taxonomy
//!
//! With the `python` feature the pipeline is also exposed as a PyO3 module,
//! for an HTTP front end written in Python.

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod storage;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{CertificateError, FormatError, HashError, IngestError, StorageError};
pub use pipeline::context::{request_ip, SubmissionContext};
pub use pipeline::ingestion::{ingest_json, ingest_report};
pub use storage::models::RawReport;
pub use storage::store::ReportStore;

/// Initialize the module-level logger
pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}

#[cfg(feature = "python")]
mod python {
    use pyo3::exceptions::{PyRuntimeError, PyValueError};
    use pyo3::prelude::*;

    use crate::config::StoreConfig;
    use crate::logging::structured::LogContext;
    use crate::pipeline::context::SubmissionContext;
    use crate::pipeline::ingestion::ingest_json;
    use crate::storage::models::ChainKind;
    use crate::storage::store::ReportStore;
    use crate::validation::{chain, pins};

    use super::init_logger;

    /// Validate and store one JSON report.
    ///
    /// # Arguments
    /// * `database_path` - SQLite database file
    /// * `body` - Raw request body
    /// * `request_ip` - Reporter address (may be empty)
    /// * `user_agent` - Reporter user agent (may be empty)
    ///
    /// # Returns
    /// The stored report id. Raises `ValueError` for unusable reports and
    /// `RuntimeError` for storage failures.
    #[pyfunction]
    fn ingest_report_json(
        py: Python<'_>,
        database_path: String,
        body: String,
        request_ip: String,
        user_agent: String,
    ) -> PyResult<i64> {
        init_logger();

        py.allow_threads(move || {
            let ctx = SubmissionContext::new(&request_ip, &user_agent);
            let mut store = ReportStore::open(&StoreConfig::new(database_path))
                .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;

            ingest_json(&mut store, &ctx, &body).map_err(|e| {
                if e.is_client_error() {
                    PyValueError::new_err(e.to_string())
                } else {
                    crate::log_error!(ctx.log_context(), "REPORT_STORE_FAILED", error = e);
                    PyRuntimeError::new_err(e.to_string())
                }
            })
        })
    }

    /// Canonical pins for a list of `pin-sha256` directives.
    #[pyfunction]
    fn parse_known_pins(tokens: Vec<String>) -> PyResult<Vec<String>> {
        pins::parse_known_pins(&tokens, &LogContext::new("python"))
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// SPKI pins of a list of PEM certificates, in order.
    #[pyfunction]
    fn spki_pins(chain: Vec<String>) -> PyResult<Vec<String>> {
        chain::parse_certificate_chain(ChainKind::Served, &chain, &LogContext::new("python"))
            .map(|certs| certs.into_iter().map(|c| c.pin).collect())
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Python module definition
    #[pymodule]
    fn hpkp_report_core(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(ingest_report_json, m)?)?;
        m.add_function(wrap_pyfunction!(parse_known_pins, m)?)?;
        m.add_function(wrap_pyfunction!(spki_pins, m)?)?;
        Ok(())
    }
}
