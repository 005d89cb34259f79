pub mod account;
pub mod enums;
pub mod error;
pub mod record;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use account::{Account, UserBook};
pub use enums::{LotMode, SettlementStatus, Side, TradingMode};
pub use error::CoreError;
pub use record::{
    ClientDualModeRecord, ClientModeData, ClientTransaction, DualModeRecord, HistoryEntry, LegacyRecord,
    RecordTime, StoredAccount, StoredRecord,
};
pub use structs::{FeeBreakdown, Position, TradeTicket, Transaction};
