use crate::projection::{Projection, canonical_order, project};
use chrono::{DateTime, Utc};
use core_types::{Account, SettlementStatus, Side, Transaction};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// The result of one settlement pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementPass {
    /// The ledger with updated statuses, in the order it was given.
    pub ledger: Vec<Transaction>,
    /// Authoritative balance and positions re-projected from `ledger`.
    pub projection: Projection,
    pub settled: Vec<String>,
    pub defaulted: Vec<String>,
}

impl SettlementPass {
    /// Whether any transaction changed status.
    pub fn changed(&self) -> bool {
        !self.settled.is_empty() || !self.defaulted.is_empty()
    }

    /// Whether this pass recorded a new default.
    pub fn newly_defaulted(&self) -> bool {
        !self.defaulted.is_empty()
    }

    /// Writes the pass into `account`: the updated statuses, the projection
    /// computed from them, and a frozen flag raised by any default.
    pub fn apply_to(&self, account: &mut Account) {
        account.ledger = self.ledger.clone();
        account.balance = self.projection.balance;
        account.positions = self.projection.positions.clone();
        account.frozen = account.frozen || account.has_default();
        account.sort_for_presentation();
    }
}

/// Settles every pending transaction whose settlement time is at or before `now`.
///
/// Due transactions are evaluated in canonical order against a running cash
/// balance that replays every earlier transaction. A BUY whose cost would take
/// that running balance below zero defaults; every other due transaction
/// settles. The running balance only decides settle-versus-default: the
/// returned balance and positions come from a full re-projection.
///
/// Running the pass again with nothing newly due changes nothing.
pub fn process_settlements(
    ledger: &[Transaction],
    starting_balance: Decimal,
    now: DateTime<Utc>,
) -> SettlementPass {
    let mut outcomes: HashMap<&str, SettlementStatus> = HashMap::new();
    let mut settled = Vec::new();
    let mut defaulted = Vec::new();
    let mut running = starting_balance;

    for tx in canonical_order(ledger) {
        running = running.saturating_add(tx.cash_effect());
        if !tx.is_due(now) {
            continue;
        }
        let outcome = match tx.side {
            Side::Buy if running < Decimal::ZERO => SettlementStatus::Defaulted,
            Side::Buy | Side::Sell => SettlementStatus::Settled,
        };
        outcomes.insert(tx.id.as_str(), outcome);
    }

    let mut updated = ledger.to_vec();
    for tx in updated.iter_mut() {
        let Some(outcome) = outcomes.get(tx.id.as_str()).copied() else {
            continue;
        };
        if tx.transition(outcome).is_err() {
            continue;
        }
        match outcome {
            SettlementStatus::Defaulted => {
                tracing::warn!(tx_id = %tx.id, symbol = %tx.symbol, "settlement shortfall, transaction defaulted");
                defaulted.push(tx.id.clone());
            }
            _ => settled.push(tx.id.clone()),
        }
    }

    let projection = project(&updated, starting_balance);
    SettlementPass {
        ledger: updated,
        projection,
        settled,
        defaulted,
    }
}
