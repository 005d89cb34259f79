use crate::enums::SettlementStatus;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Transaction {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: String,
        from: SettlementStatus,
        to: SettlementStatus,
    },
}
