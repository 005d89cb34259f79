//! # Tradewind Events
//!
//! This crate defines the notable events the account service announces to
//! whoever is listening: the CLI shell, a UI, or an alerting hook.
//!
//! As a Layer 0 crate, it depends only on `core-types` and provides the
//! shared vocabulary for everything that happens to an account.

// Declare the modules that make up this crate.
pub mod error;
pub mod messages;

// Re-export the core types to provide a clean public API.
pub use error::EventsError;
pub use messages::{AccountEvent, EventEnvelope, StorageOperation};
