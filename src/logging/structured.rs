//! Structured logging utilities.
//!
//! Provides context-aware logging with submission_id (and report_id once
//! the report row exists) included in every log message.

use std::fmt;

/// Logging context for one report submission.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub submission_id: String,
    pub report_id: Option<i64>,
}

impl LogContext {
    pub fn new(submission_id: &str) -> Self {
        Self {
            submission_id: submission_id.to_string(),
            report_id: None,
        }
    }

    pub fn with_report(&self, report_id: i64) -> Self {
        Self {
            submission_id: self.submission_id.clone(),
            report_id: Some(report_id),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.report_id {
            Some(rid) => write!(f, "[submission={}] [report={}]", self.submission_id, rid),
            None => write!(f, "[submission={}]", self.submission_id),
        }
    }
}

/// Log an info message with context.
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        log::info!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={} "),*), $($value),*)
        );
    };
}

/// Log a warning message with context.
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        log::warn!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={} "),*), $($value),*)
        );
    };
}

/// Log an error message with context.
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        log::error!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={} "),*), $($value),*)
        );
    };
}

/// Log a debug message with context.
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        log::debug!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={} "),*), $($value),*)
        );
    };
}
