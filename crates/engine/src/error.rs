use database::DbError;
use ledger::LedgerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Ledger setup error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),

    #[error("Storage call `{operation}` timed out after {after_ms} ms")]
    Timeout { operation: &'static str, after_ms: u128 },
}
