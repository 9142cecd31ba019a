//! Submission context management.
//!
//! Carries what the boundary layer knows about a request (reporter IP,
//! user agent) plus the server-assigned id and receive time.

use std::net::{IpAddr, SocketAddr};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::logging::structured::LogContext;

/// Context for one inbound report.
#[derive(Debug, Clone)]
pub struct SubmissionContext {
    pub submission_id: String,
    pub created_at: DateTime<Utc>,
    pub request_ip: String,
    pub user_agent: String,
}

impl SubmissionContext {
    pub fn new(request_ip: &str, user_agent: &str) -> Self {
        let submission_id = format!("sub-{}", &Uuid::new_v4().to_string()[..8]);

        Self {
            submission_id,
            created_at: Utc::now(),
            request_ip: request_ip.to_string(),
            user_agent: user_agent.to_string(),
        }
    }

    pub fn log_context(&self) -> LogContext {
        LogContext::new(&self.submission_id)
    }
}

/// Reporter address as stored: the `X-Forwarded-For` value if present,
/// otherwise the peer address, without port. Empty if it is not an IP.
pub fn request_ip(forwarded_for: Option<&str>, remote_addr: &str) -> String {
    let raw = forwarded_for
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(remote_addr)
        .trim();

    if let Ok(addr) = raw.parse::<SocketAddr>() {
        return addr.ip().to_string();
    }

    raw.parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .unwrap_or_default()
}
