//! # Tradewind Database Crate
//!
//! This crate is the storage collaborator of the account service. It hides
//! where account records live behind two small async traits.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** The core never touches disk or network directly. It sees
//!   `Storage` (the durable local copy) and `RemoteLedger` (a possibly stale
//!   replica) and nothing else.
//! - **Whole-Record Upserts:** `save` replaces the user's record in one step
//!   and is idempotent; records are keyed by username.
//!
//! ## Public API
//!
//! - `Storage` / `RemoteLedger`: the collaborator traits.
//! - `FileStore`: one JSON document per user under a root directory, written
//!   atomically. Implements both traits, so two directories model two devices.
//! - `MemoryStore`: an in-process store for tests and throwaway sessions.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod error;
pub mod file_store;
pub mod memory_store;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use error::DbError;
pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use repository::{RemoteLedger, Storage};
