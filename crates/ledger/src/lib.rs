//! # Tradewind Ledger Crate
//!
//! This crate is the pure core of the account engine. It derives cash and
//! positions from an append-only transaction ledger, advances pending trades
//! through T+2 settlement, and merges divergent copies of a ledger.
//!
//! ## Architectural Principles
//!
//! - **Ledger as Source of Truth:** Balance and positions are never patched in
//!   place. Every mutation path re-runs the projection over the full ledger, so
//!   a stale or buggy stored value can never drift into new state.
//! - **No I/O, No Clock:** Every function here takes the current time as an
//!   argument and returns new values. Scheduling, persistence and locking live
//!   in the `engine` crate.
//!
//! ## Public API
//!
//! - `FeeSchedule`: fee, tax and gross amount for an order.
//! - `SettlementCalendar`: the T+2 business-day settlement date.
//! - `project` / `project_balance` / `project_positions`: the projection engine.
//! - `process_settlements`: one settlement pass over a ledger.
//! - `reconcile`: id-based merge of a local and a remote account.
//! - `repair_book`: load-time re-projection of a stored record.
//! - `valuate`: mark-to-market view of an account at given quotes.

// Declare the modules that constitute this crate.
pub mod calendar;
pub mod error;
pub mod fees;
pub mod projection;
pub mod reconciler;
pub mod repair;
pub mod settlement;
pub mod valuation;

// Re-export the key components to provide a clean, public-facing API.
pub use calendar::SettlementCalendar;
pub use error::LedgerError;
pub use fees::FeeSchedule;
pub use projection::{
    PendingSettlement, Projection, canonical_order, pending_settlement, project, project_balance,
    project_positions, reproject,
};
pub use reconciler::{Reconciliation, reconcile};
pub use repair::repair_book;
pub use settlement::{SettlementPass, process_settlements};
pub use valuation::{PositionValuation, Valuation, valuate};
