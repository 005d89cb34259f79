use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Settlement hour must be between 0 and 23, got {0}")]
    InvalidSettlementHour(u32),

    #[error("UTC offset of {0} hours is out of range")]
    InvalidUtcOffset(i32),

    #[error("Rate for {name} must be in [0, 1), got {value}")]
    InvalidRate { name: &'static str, value: String },
}
