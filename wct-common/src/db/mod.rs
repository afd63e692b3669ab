//! Database schema, models and queries

pub mod init;
pub mod models;

pub use init::*;
pub use models::*;
