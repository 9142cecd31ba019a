//! Storage module.
//!
//! Database models, SQL text, and the transactional SQLite report store.

pub mod models;
pub mod queries;
pub mod store;

pub use models::*;
pub use queries::*;
pub use store::*;
