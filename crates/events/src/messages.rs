use crate::error::EventsError;
use chrono::{DateTime, Utc};
use core_types::{TradingMode, Transaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which collaborator call degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageOperation {
    Save,
    FetchRemote,
}

/// Something worth telling the user about.
///
/// The `#[serde(tag = "type", content = "payload")]` attribute serializes each
/// variant as `{"type": "AccountDefaulted", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum AccountEvent {
    /// A quote was confirmed and appended to the ledger.
    OrderConfirmed {
        mode: TradingMode,
        transaction: Transaction,
        balance: Decimal,
    },
    /// A settlement pass moved at least one transaction out of pending.
    SettlementProcessed {
        mode: TradingMode,
        settled: Vec<String>,
        defaulted: Vec<String>,
    },
    /// A settlement shortfall froze the account. Not an error: a terminal business state.
    AccountDefaulted {
        mode: TradingMode,
        transaction_ids: Vec<String>,
    },
    /// A remote replica contributed changes to the local ledger.
    LedgerSynced {
        mode: TradingMode,
        added: usize,
        balance: Decimal,
    },
    /// One mode's account was replaced with a fresh one.
    ModeReset { mode: TradingMode },
    /// A storage or remote call failed or timed out; in-memory state was kept.
    StorageDegraded {
        operation: StorageOperation,
        reason: String,
    },
}

/// An event stamped with the user it concerns and when it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub user: String,
    pub at: DateTime<Utc>,
    pub event: AccountEvent,
}

impl EventEnvelope {
    pub fn to_json(&self) -> Result<String, EventsError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn events_serialize_with_type_and_payload() {
        let envelope = EventEnvelope {
            user: "amy".to_string(),
            at: Utc.with_ymd_and_hms(2024, 3, 6, 2, 0, 0).unwrap(),
            event: AccountEvent::AccountDefaulted {
                mode: TradingMode::Practice,
                transaction_ids: vec!["b".to_string()],
            },
        };
        let json: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(json["event"]["type"], "AccountDefaulted");
        assert_eq!(json["event"]["payload"]["mode"], "practice");
        assert_eq!(json["event"]["payload"]["transaction_ids"][0], "b");
    }
}
