//! Main report ingestion pipeline.
//!
//! Coordinates the processing of one report:
//! 1. Known-pin parsing
//! 2. Served chain parsing
//! 3. Validated chain parsing
//! 4. One store transaction for everything
//!
//! Steps 1-3 finish before the store is touched, so a rejected report never
//! causes a write.

use crate::error::IngestError;
use crate::storage::models::{ChainKind, RawReport, ReportRecord};
use crate::storage::store::ReportStore;
use crate::validation::chain::parse_certificate_chain;
use crate::validation::pins::parse_known_pins;
use crate::{log_info, log_warn};

use super::context::SubmissionContext;

/// Validate and persist a decoded report. Returns the stored report id.
pub fn ingest_report(
    store: &mut ReportStore,
    ctx: &SubmissionContext,
    raw: &RawReport,
) -> Result<i64, IngestError> {
    let log_ctx = ctx.log_context();

    log_info!(
        log_ctx,
        "REPORT_RECEIVED",
        hostname = raw.hostname,
        port = raw.port,
        known_pins = raw.known_pins.len(),
        served = raw.served_certificate_chain.len(),
        validated = raw.validated_certificate_chain.len()
    );

    let pins = parse_known_pins(&raw.known_pins, &log_ctx)?;
    let served = parse_certificate_chain(ChainKind::Served, &raw.served_certificate_chain, &log_ctx)?;
    let validated = parse_certificate_chain(
        ChainKind::Validated,
        &raw.validated_certificate_chain,
        &log_ctx,
    )?;

    let record = ReportRecord::new(raw, ctx);
    let report_id = store.persist(&record, &pins, &served, &validated, &log_ctx)?;

    log_info!(log_ctx.with_report(report_id), "REPORT_ACCEPTED");
    Ok(report_id)
}

/// Decode a JSON body, then ingest it.
pub fn ingest_json(
    store: &mut ReportStore,
    ctx: &SubmissionContext,
    body: &str,
) -> Result<i64, IngestError> {
    let raw: RawReport = serde_json::from_str(body).map_err(|e| {
        log_warn!(ctx.log_context(), "REPORT_DECODE_FAILED", error = e);
        e
    })?;
    ingest_report(store, ctx, &raw)
}
