//! # WordCamp Talks Common Library
//!
//! Shared code for the talk review service:
//! - Database schema and models (talks, users, outbox)
//! - Rating ledger aggregation
//! - Applicant roster filtering
//! - Event bus for rating hooks
//! - Configuration loading
//! - Request context, capabilities, feedback catalog and request tokens

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod events;
pub mod feedback;
pub mod mailer;
pub mod nonce;
pub mod profile;
pub mod ratings;
pub mod roster;

pub use error::{Error, Result};
