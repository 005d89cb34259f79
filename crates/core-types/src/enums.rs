use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

/// How an order quantity is expressed: round lots or raw shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotMode {
    Whole,
    Odd,
}

impl LotMode {
    /// Converts a quantity in this lot mode into a raw share count, or `None`
    /// when the count does not fit in a `u64`.
    pub fn to_shares(&self, quantity: u64, lot_size: u64) -> Option<u64> {
        match self {
            LotMode::Whole => quantity.checked_mul(lot_size),
            LotMode::Odd => Some(quantity),
        }
    }
}

/// Settlement lifecycle of a transaction. Only `Pending` may change, and only forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    #[default]
    Pending,
    Settled,
    Defaulted,
}

/// The two fully independent accounts a user holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    /// Trades against near-real-time exchange quotes.
    LiveQuote,
    /// Trades against the simulated teaching market.
    Practice,
}

impl TradingMode {
    pub const ALL: [TradingMode; 2] = [TradingMode::LiveQuote, TradingMode::Practice];
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingMode::LiveQuote => write!(f, "live-quote"),
            TradingMode::Practice => write!(f, "practice"),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}
