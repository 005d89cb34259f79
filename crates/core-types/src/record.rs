//! Persisted account record shapes.
//!
//! Storage may hold either the current dual-mode record or the legacy
//! single-mode record written by older clients. Both are resolved once, at load
//! time, into a [`UserBook`]; nothing past the loader ever sees the legacy shape.
//! Saving always writes [`DualModeRecord`], which upgrades legacy data on the
//! first write.
//!
//! The browser client wrote its own shapes with camelCase keys, millisecond
//! timestamps and a settled flag in place of a status. Those are read here too
//! and converted on the way in.

use crate::account::{Account, UserBook};
use crate::enums::{LotMode, SettlementStatus, Side};
use crate::structs::{FeeBreakdown, Position, TradeTicket, Transaction};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The stored shape of a single mode's account. Derived fields are kept for
/// readers that display them, but they are never trusted on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAccount {
    #[serde(default)]
    pub starting_balance: Option<Decimal>,
    #[serde(default)]
    pub balance: Decimal,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default, alias = "history")]
    pub ledger: Vec<Transaction>,
    #[serde(default, alias = "is_bankrupt")]
    pub frozen: bool,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub generation: u64,
}

impl StoredAccount {
    pub fn into_account(self, default_starting_balance: Decimal, fallback: DateTime<Utc>) -> Account {
        Account {
            starting_balance: self.starting_balance.unwrap_or(default_starting_balance),
            balance: self.balance,
            positions: self
                .positions
                .into_iter()
                .map(|p| (p.symbol.clone(), p))
                .collect(),
            ledger: self.ledger,
            frozen: self.frozen,
            last_update: self.last_update.unwrap_or(fallback),
            generation: self.generation,
        }
    }
}

impl From<&Account> for StoredAccount {
    fn from(account: &Account) -> Self {
        Self {
            starting_balance: Some(account.starting_balance),
            balance: account.balance,
            positions: account.positions.values().cloned().collect(),
            ledger: account.ledger.clone(),
            frozen: account.frozen,
            last_update: Some(account.last_update),
            generation: account.generation,
        }
    }
}

/// The current record shape: one account per trading mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualModeRecord {
    pub username: String,
    pub live_quote: StoredAccount,
    pub practice: StoredAccount,
    pub last_update: DateTime<Utc>,
}

/// The pre-mode record shape: a single account stored at the top level.
///
/// Holdings stored next to the history are not read; they are re-derived from
/// the ledger on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyRecord {
    pub username: String,
    pub balance: Decimal,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default, alias = "isBankrupt")]
    pub is_bankrupt: bool,
    #[serde(default, alias = "lastUpdate")]
    pub last_update: Option<RecordTime>,
}

/// The browser client's two-mode shape: `realMode` and `simulationMode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDualModeRecord {
    pub username: String,
    pub real_mode: ClientModeData,
    pub simulation_mode: ClientModeData,
    #[serde(default)]
    pub last_update: Option<RecordTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientModeData {
    #[serde(default)]
    pub balance: Decimal,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub is_bankrupt: bool,
}

/// A timestamp as either writer stored it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordTime {
    /// Milliseconds since the Unix epoch.
    Millis(i64),
    Instant(DateTime<Utc>),
}

impl RecordTime {
    /// Out-of-range millisecond values resolve to `fallback`.
    pub fn resolve(self, fallback: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            RecordTime::Millis(ms) => DateTime::from_timestamp_millis(ms).unwrap_or(fallback),
            RecordTime::Instant(at) => at,
        }
    }
}

/// One entry of a stored history, in either writer's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryEntry {
    Current(Transaction),
    Client(ClientTransaction),
}

impl HistoryEntry {
    pub fn into_transaction(self, fallback: DateTime<Utc>) -> Transaction {
        match self {
            HistoryEntry::Current(tx) => tx,
            HistoryEntry::Client(tx) => tx.into_transaction(fallback),
        }
    }
}

/// A transaction as the browser client wrote it. `totalAmount` is the gross
/// amount; fee and tax are stored beside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTransaction {
    pub id: String,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub side: Side,
    #[serde(rename = "mode")]
    pub lot_mode: LotMode,
    pub shares: u64,
    pub price: Decimal,
    #[serde(default)]
    pub fee: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    pub total_amount: Decimal,
    pub timestamp: RecordTime,
    pub settlement_date: RecordTime,
    #[serde(default)]
    pub is_settled: bool,
}

impl ClientTransaction {
    /// The client only recorded whether a trade had settled. An unsettled
    /// trade comes back pending and the next settlement pass decides it.
    pub fn into_transaction(self, fallback: DateTime<Utc>) -> Transaction {
        let created_at = self.timestamp.resolve(fallback);
        let settles_at = self.settlement_date.resolve(created_at);
        let ticket = TradeTicket {
            symbol: self.symbol,
            name: self.name,
            side: self.side,
            lot_mode: self.lot_mode,
            shares: self.shares,
            price: self.price,
        };
        let costs = FeeBreakdown {
            gross: self.total_amount,
            fee: self.fee,
            tax: self.tax,
        };
        let mut tx = Transaction::pending(self.id, &ticket, costs, created_at, settles_at);
        if self.is_settled {
            // Pending to settled is always a legal transition.
            let _ = tx.transition(SettlementStatus::Settled);
        }
        tx
    }
}

fn resolve_history(history: Vec<HistoryEntry>, fallback: DateTime<Utc>) -> Vec<Transaction> {
    history
        .into_iter()
        .map(|entry| entry.into_transaction(fallback))
        .collect()
}

/// Whatever shape was found in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredRecord {
    DualMode(DualModeRecord),
    ClientDualMode(ClientDualModeRecord),
    LegacySingleMode(LegacyRecord),
}

impl StoredRecord {
    pub fn username(&self) -> &str {
        match self {
            StoredRecord::DualMode(r) => &r.username,
            StoredRecord::ClientDualMode(r) => &r.username,
            StoredRecord::LegacySingleMode(r) => &r.username,
        }
    }

    /// Anything but the current shape is rewritten on the first save.
    pub fn is_legacy(&self) -> bool {
        !matches!(self, StoredRecord::DualMode(_))
    }

    /// Resolves either shape into the canonical dual-mode book.
    ///
    /// A legacy record becomes the live-quote account and the practice account
    /// starts fresh. The client's real and simulation modes map to live-quote
    /// and practice. Balances and positions are copied as found; callers must
    /// re-project before use.
    pub fn into_book(self, default_starting_balance: Decimal, now: DateTime<Utc>) -> UserBook {
        match self {
            StoredRecord::DualMode(r) => UserBook {
                username: r.username,
                live_quote: r.live_quote.into_account(default_starting_balance, r.last_update),
                practice: r.practice.into_account(default_starting_balance, r.last_update),
                last_update: r.last_update,
            },
            StoredRecord::ClientDualMode(r) => {
                let last_update = r.last_update.map_or(now, |t| t.resolve(now));
                UserBook {
                    username: r.username,
                    live_quote: r.real_mode.into_account(default_starting_balance, last_update),
                    practice: r.simulation_mode.into_account(default_starting_balance, last_update),
                    last_update,
                }
            }
            StoredRecord::LegacySingleMode(r) => {
                let last_update = r.last_update.map_or(now, |t| t.resolve(now));
                let live_quote = ClientModeData {
                    balance: r.balance,
                    history: r.history,
                    is_bankrupt: r.is_bankrupt,
                }
                .into_account(default_starting_balance, last_update);
                UserBook {
                    username: r.username,
                    live_quote,
                    practice: Account::new(default_starting_balance, now),
                    last_update,
                }
            }
        }
    }
}

impl ClientModeData {
    fn into_account(self, default_starting_balance: Decimal, last_update: DateTime<Utc>) -> Account {
        StoredAccount {
            starting_balance: None,
            balance: self.balance,
            positions: Vec::new(),
            ledger: resolve_history(self.history, last_update),
            frozen: self.is_bankrupt,
            last_update: Some(last_update),
            generation: 0,
        }
        .into_account(default_starting_balance, last_update)
    }
}

impl From<&UserBook> for DualModeRecord {
    fn from(book: &UserBook) -> Self {
        Self {
            username: book.username.clone(),
            live_quote: StoredAccount::from(&book.live_quote),
            practice: StoredAccount::from(&book.practice),
            last_update: book.last_update,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::SettlementStatus;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    const LEGACY: &str = r#"{
        "username": "amy",
        "balance": 899858,
        "holdings": [],
        "history": [{
            "id": "k3j2h1",
            "symbol": "2330",
            "name": "TSMC",
            "side": "BUY",
            "lot_mode": "WHOLE",
            "shares": 1000,
            "price": "100",
            "fee": "142",
            "tax": "0",
            "gross_amount": "100000",
            "created_at": "2024-03-04T02:00:00Z",
            "settles_at": "2024-03-06T02:00:00Z",
            "status": "SETTLED"
        }],
        "is_bankrupt": false
    }"#;

    #[test]
    fn legacy_shape_is_detected_and_becomes_live_quote() {
        let record: StoredRecord = serde_json::from_str(LEGACY).unwrap();
        assert!(record.is_legacy());

        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let book = record.into_book(dec!(1000000), now);
        assert_eq!(book.username, "amy");
        assert_eq!(book.live_quote.ledger.len(), 1);
        assert_eq!(book.live_quote.ledger[0].status(), SettlementStatus::Settled);
        assert_eq!(book.live_quote.starting_balance, dec!(1000000));
        assert!(book.practice.ledger.is_empty());
        assert_eq!(book.practice.balance, dec!(1000000));
    }

    #[test]
    fn dual_mode_shape_survives_a_write_and_read() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let mut book = UserBook::new("bo", dec!(500000), now);
        book.practice.frozen = true;

        let json = serde_json::to_string(&DualModeRecord::from(&book)).unwrap();
        let record: StoredRecord = serde_json::from_str(&json).unwrap();
        assert!(!record.is_legacy());
        assert_eq!(record.into_book(dec!(1), now), book);
    }

    const CLIENT_LEGACY: &str = r#"{
        "username": "amy",
        "balance": 899858,
        "pendingSettlementCash": 0,
        "holdings": [{"symbol": "2330", "name": "TSMC", "shares": 1000, "averagePrice": 100, "currentPrice": 104.5}],
        "history": [{
            "id": "k3j2h1",
            "symbol": "2330",
            "name": "TSMC",
            "type": "BUY",
            "mode": "WHOLE",
            "shares": 1000,
            "price": 100,
            "fee": 142,
            "tax": 0,
            "totalAmount": 100000,
            "timestamp": 1709517600000,
            "settlementDate": 1709690400000,
            "isSettled": true
        }, {
            "id": "k3j2h2",
            "symbol": "2330",
            "name": "TSMC",
            "type": "SELL",
            "mode": "ODD",
            "shares": 10,
            "price": 105,
            "fee": 20,
            "tax": 3,
            "totalAmount": 1050,
            "timestamp": 1709604000000,
            "settlementDate": 1709776800000,
            "isSettled": false
        }],
        "isBankrupt": true,
        "lastUpdate": 1709604000000
    }"#;

    #[test]
    fn client_legacy_shape_is_read_with_its_own_keys() {
        let record: StoredRecord = serde_json::from_str(CLIENT_LEGACY).unwrap();
        assert!(matches!(record, StoredRecord::LegacySingleMode(_)));

        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let book = record.into_book(dec!(1000000), now);
        let live = &book.live_quote;
        assert!(live.frozen);
        assert_eq!(book.last_update, Utc.with_ymd_and_hms(2024, 3, 5, 2, 0, 0).unwrap());

        let buy = &live.ledger[0];
        assert_eq!(buy.side, Side::Buy);
        assert_eq!(buy.lot_mode, LotMode::Whole);
        assert_eq!(buy.gross_amount, dec!(100000));
        assert_eq!(buy.fee, dec!(142));
        assert_eq!(buy.created_at, Utc.with_ymd_and_hms(2024, 3, 4, 2, 0, 0).unwrap());
        assert_eq!(buy.settles_at, Utc.with_ymd_and_hms(2024, 3, 6, 2, 0, 0).unwrap());
        assert_eq!(buy.status(), SettlementStatus::Settled);

        let sell = &live.ledger[1];
        assert_eq!(sell.side, Side::Sell);
        assert_eq!(sell.tax, dec!(3));
        assert_eq!(sell.status(), SettlementStatus::Pending);

        // Stored holdings are dropped; the ledger is the source of truth.
        assert!(live.positions.is_empty());
    }

    #[test]
    fn client_dual_mode_shape_maps_real_and_simulation_modes() {
        let json = r#"{
            "username": "bo",
            "realMode": {"balance": 1000000, "pendingSettlementCash": 0, "holdings": [], "history": [], "isBankrupt": false},
            "simulationMode": {"balance": 500, "pendingSettlementCash": 0, "holdings": [], "history": [], "isBankrupt": true},
            "lastUpdate": 1709517600000
        }"#;
        let record: StoredRecord = serde_json::from_str(json).unwrap();
        assert!(record.is_legacy());

        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let book = record.into_book(dec!(1000000), now);
        assert!(!book.live_quote.frozen);
        assert!(book.practice.frozen);
        assert_eq!(book.practice.balance, dec!(500));
        assert_eq!(book.last_update, Utc.with_ymd_and_hms(2024, 3, 4, 2, 0, 0).unwrap());
    }
}
