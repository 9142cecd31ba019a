//! Report data as received and as stored.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::context::SubmissionContext;

/// Timestamp layout used for every stored datetime column (UTC).
pub const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A violation report body as the browser sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawReport {
    pub date_time: DateTime<Utc>,
    pub effective_expiration_date: DateTime<Utc>,
    pub hostname: String,
    pub noted_hostname: String,
    pub port: u16,
    pub include_subdomains: bool,
    #[serde(default)]
    pub served_certificate_chain: Vec<String>,
    #[serde(default)]
    pub validated_certificate_chain: Vec<String>,
    #[serde(default)]
    pub known_pins: Vec<String>,
}

/// The `reports` row for one accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub created_at: DateTime<Utc>,
    pub request_ip: String,
    pub user_agent: String,
    pub date_time: DateTime<Utc>,
    pub effective_expiration_date: DateTime<Utc>,
    pub hostname: String,
    pub noted_hostname: String,
    pub port: u16,
    pub include_subdomains: bool,
}

impl ReportRecord {
    pub fn new(raw: &RawReport, ctx: &SubmissionContext) -> Self {
        Self {
            created_at: ctx.created_at,
            request_ip: ctx.request_ip.clone(),
            user_agent: ctx.user_agent.clone(),
            date_time: raw.date_time,
            effective_expiration_date: raw.effective_expiration_date,
            hostname: raw.hostname.clone(),
            noted_hostname: raw.noted_hostname.clone(),
            port: raw.port,
            include_subdomains: raw.include_subdomains,
        }
    }
}

/// Which of the two reported chains a certificate belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainKind {
    /// What the server presented.
    Served,
    /// What the client's validation built.
    Validated,
}

impl ChainKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainKind::Served => "served",
            ChainKind::Validated => "validated",
        }
    }

    /// Join table holding this chain's memberships.
    pub fn table(&self) -> &'static str {
        match self {
            ChainKind::Served => "report_s_chain",
            ChainKind::Validated => "report_v_chain",
        }
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row counts per table, for analysis tooling and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub reports: u64,
    pub pins: u64,
    pub report_pins: u64,
    pub certs: u64,
    pub report_s_chain: u64,
    pub report_v_chain: u64,
}

pub fn format_db_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(DB_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_report_field_names() {
        let body = r#"{
            "date-time": "2014-04-06T13:00:50Z",
            "effective-expiration-date": "2014-05-01T12:40:50+02:00",
            "hostname": "www.example.com",
            "noted-hostname": "example.com",
            "port": 443,
            "include-subdomains": true,
            "served-certificate-chain": ["a"],
            "validated-certificate-chain": ["b", "c"],
            "known-pins": ["pin-sha256=\"x\""]
        }"#;
        let raw: RawReport = serde_json::from_str(body).unwrap();
        assert_eq!(raw.hostname, "www.example.com");
        assert_eq!(raw.noted_hostname, "example.com");
        assert_eq!(raw.port, 443);
        assert!(raw.include_subdomains);
        assert_eq!(raw.served_certificate_chain.len(), 1);
        assert_eq!(raw.validated_certificate_chain.len(), 2);
        assert_eq!(raw.known_pins.len(), 1);
        assert_eq!(
            format_db_timestamp(&raw.effective_expiration_date),
            "2014-05-01 10:40:50"
        );
    }

    #[test]
    fn test_port_out_of_range_rejected() {
        let body = r#"{
            "date-time": "2014-04-06T13:00:50Z",
            "effective-expiration-date": "2014-04-06T13:00:50Z",
            "hostname": "h", "noted-hostname": "h",
            "port": 70000, "include-subdomains": false
        }"#;
        assert!(serde_json::from_str::<RawReport>(body).is_err());
    }

    #[test]
    fn test_chain_tables() {
        assert_eq!(ChainKind::Served.table(), "report_s_chain");
        assert_eq!(ChainKind::Validated.table(), "report_v_chain");
        assert_eq!(ChainKind::Validated.to_string(), "validated");
    }
}
