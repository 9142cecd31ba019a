//! Structured logging with submission context.
//!
//! Provides logging macros and utilities that include submission_id and
//! report_id in every log message for easy correlation.

pub mod structured;

pub use structured::*;
