//! Pipeline orchestration module.
//!
//! Report ingestion pipeline that coordinates:
//! - Known-pin validation
//! - Certificate chain parsing and pinning
//! - Transactional storage
//! - Concurrent workers

pub mod context;
pub mod ingestion;
pub mod workers;

pub use context::*;
pub use ingestion::*;
pub use workers::*;
