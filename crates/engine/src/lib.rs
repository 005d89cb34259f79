//! # Tradewind Engine Crate
//!
//! This crate owns one user's accounts for the lifetime of a session. It wires
//! the pure rules of the `ledger` crate to storage, the clock and event
//! subscribers.
//!
//! ## Architectural Principles
//!
//! - **Single Owner:** All state lives behind one async mutex per user. Order
//!   confirmation, settlement, sync and reset each hold it for their whole
//!   read-modify-write, the save included.
//! - **Degrade, Don't Crash:** Storage and remote failures are logged and
//!   broadcast as `StorageDegraded`. The in-memory book stays authoritative and
//!   the next write retries.
//! - **Explicit Time:** The service reads time through the `Clock` trait so
//!   settlement can be driven deterministically.
//!
//! ## Public API
//!
//! - `AccountService`: open, quote, confirm, tick, sync, reset and inspect.
//! - `ServiceParams`: resolved trading and service settings.
//! - `BackgroundScheduler`: the periodic settlement and sync task.
//! - `OrderRequest` / `PendingOrderQuote` / `OrderRejection`: the order flow.
//! - `Clock` / `SystemClock` / `ManualClock`: time sources.

pub mod background;
pub mod clock;
pub mod error;
pub mod orders;
pub mod service;

pub use background::BackgroundScheduler;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::EngineError;
pub use orders::{
    OrderRejection, OrderRequest, PendingOrderQuote, check_order, price_ticket, ticket_for,
    validate_ticket,
};
pub use service::{AccountService, AccountSnapshot, ServiceParams, SyncReport, TickReport};
