use crate::enums::{SettlementStatus, TradingMode};
use crate::structs::{Position, Transaction};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One trading mode's account. `balance` and `positions` are projections of
/// `ledger` and are only ever written by re-running the projection engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub starting_balance: Decimal,
    pub balance: Decimal,
    pub positions: BTreeMap<String, Position>,
    /// Most recent first.
    pub ledger: Vec<Transaction>,
    pub frozen: bool,
    pub last_update: DateTime<Utc>,
    /// Bumped by every reset. Copies from an older generation describe an
    /// account that no longer exists.
    pub generation: u64,
}

impl Account {
    /// A fresh account with no history.
    pub fn new(starting_balance: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            starting_balance,
            balance: starting_balance,
            positions: BTreeMap::new(),
            ledger: Vec::new(),
            frozen: false,
            last_update: now,
            generation: 0,
        }
    }

    /// A fresh account that supersedes this one.
    pub fn reset(&self, starting_balance: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            generation: self.generation.saturating_add(1),
            ..Self::new(starting_balance, now)
        }
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn held_shares(&self, symbol: &str) -> u64 {
        self.position(symbol).map(|p| p.shares).unwrap_or(0)
    }

    pub fn has_default(&self) -> bool {
        self.ledger
            .iter()
            .any(|tx| tx.status() == SettlementStatus::Defaulted)
    }

    /// Restores the presentation order: newest first, ties by id descending.
    pub fn sort_for_presentation(&mut self) {
        self.ledger.sort_by(presentation_cmp);
    }
}

/// Most-recent-first ordering used for display and positional change checks.
pub fn presentation_cmp(a: &Transaction, b: &Transaction) -> Ordering {
    b.canonical_cmp(a)
}

/// The canonical in-memory shape of everything one user owns: two independent
/// accounts keyed by trading mode.
#[derive(Debug, Clone, PartialEq)]
pub struct UserBook {
    pub username: String,
    pub live_quote: Account,
    pub practice: Account,
    pub last_update: DateTime<Utc>,
}

impl UserBook {
    pub fn new(username: impl Into<String>, starting_balance: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            username: username.into(),
            live_quote: Account::new(starting_balance, now),
            practice: Account::new(starting_balance, now),
            last_update: now,
        }
    }

    pub fn account(&self, mode: TradingMode) -> &Account {
        match mode {
            TradingMode::LiveQuote => &self.live_quote,
            TradingMode::Practice => &self.practice,
        }
    }

    pub fn account_mut(&mut self, mode: TradingMode) -> &mut Account {
        match mode {
            TradingMode::LiveQuote => &mut self.live_quote,
            TradingMode::Practice => &mut self.practice,
        }
    }
}
