//! Report validation module.
//!
//! Everything that has to pass before a report may be stored:
//! - Known-pin directive parsing
//! - PEM/X.509 chain parsing
//! - SPKI pin computation

pub mod chain;
pub mod pins;
pub mod spki_hash;

pub use chain::*;
pub use pins::*;
pub use spki_hash::*;
