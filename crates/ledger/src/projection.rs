//! The ledger projection engine.
//!
//! Cash and positions are pure functions of the transaction list. They are
//! recomputed from scratch after every ledger change; nothing in the system
//! is allowed to adjust them incrementally.

use core_types::{Account, Position, Side, Transaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Derived state of one ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub balance: Decimal,
    pub positions: BTreeMap<String, Position>,
}

/// Cash still moving through T+2 settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PendingSettlement {
    /// Owed on pending buys: gross plus fee.
    pub payable: Decimal,
    /// Due from pending sells: gross less fee and tax.
    pub receivable: Decimal,
}

/// The ledger in replay order: creation time ascending, ties by id.
pub fn canonical_order(ledger: &[Transaction]) -> Vec<&Transaction> {
    let mut ordered: Vec<&Transaction> = ledger.iter().collect();
    ordered.sort_by(|a, b| a.canonical_cmp(b));
    ordered
}

/// Cash after replaying every transaction, whatever its settlement status.
///
/// A negative result means the history contains a shortfall; it is clamped to
/// zero and the account's frozen flag carries the consequence.
pub fn project_balance(ledger: &[Transaction], starting_balance: Decimal) -> Decimal {
    let balance = canonical_order(ledger)
        .into_iter()
        .fold(starting_balance, |cash, tx| cash.saturating_add(tx.cash_effect()));
    balance.max(Decimal::ZERO)
}

#[derive(Debug)]
struct Holding<'a> {
    name: &'a str,
    shares: i64,
    cost: Decimal,
}

/// Open positions after replaying the ledger.
///
/// Buys add shares and their gross amount to the cost basis. Sells remove
/// shares and shrink the cost basis in proportion to the shares left; there is
/// no lot tracking. A position that reaches zero shares or fewer is dropped,
/// and a sell with no open position is ignored.
pub fn project_positions(ledger: &[Transaction]) -> BTreeMap<String, Position> {
    let mut holdings: BTreeMap<&str, Holding<'_>> = BTreeMap::new();

    for tx in canonical_order(ledger) {
        let shares = i64::try_from(tx.shares).unwrap_or(i64::MAX);
        match tx.side {
            Side::Buy => {
                let holding = holdings.entry(tx.symbol.as_str()).or_insert(Holding {
                    name: &tx.name,
                    shares: 0,
                    cost: Decimal::ZERO,
                });
                holding.name = &tx.name;
                holding.shares = holding.shares.saturating_add(shares);
                holding.cost = holding.cost.saturating_add(tx.gross_amount);
            }
            Side::Sell => {
                let Some(holding) = holdings.get_mut(tx.symbol.as_str()) else {
                    continue;
                };
                let remaining = holding.shares - shares;
                if remaining <= 0 {
                    holdings.remove(tx.symbol.as_str());
                    continue;
                }
                let kept = Decimal::from(remaining);
                let held = Decimal::from(holding.shares);
                holding.cost = match holding.cost.checked_mul(kept) {
                    Some(scaled) => scaled / held,
                    None => (holding.cost / held).saturating_mul(kept),
                };
                holding.shares = remaining;
            }
        }
    }

    holdings
        .into_iter()
        .filter_map(|(symbol, h)| {
            let shares = u64::try_from(h.shares).ok().filter(|s| *s > 0)?;
            Some((
                symbol.to_string(),
                Position {
                    symbol: symbol.to_string(),
                    name: h.name.to_string(),
                    shares,
                    cost_basis: h.cost,
                    average_price: h.cost / Decimal::from(shares),
                },
            ))
        })
        .collect()
}

/// Balance and positions in one call.
pub fn project(ledger: &[Transaction], starting_balance: Decimal) -> Projection {
    Projection {
        balance: project_balance(ledger, starting_balance),
        positions: project_positions(ledger),
    }
}

/// Overwrites an account's derived fields from its own ledger and restores the
/// presentation order. Balance and positions are only written here or from a
/// settlement pass's own projection.
pub fn reproject(account: &mut Account) {
    let Projection { balance, positions } = project(&account.ledger, account.starting_balance);
    account.balance = balance;
    account.positions = positions;
    account.frozen = account.frozen || account.has_default();
    account.sort_for_presentation();
}

/// Totals of the cash effects of transactions still awaiting settlement.
pub fn pending_settlement(ledger: &[Transaction]) -> PendingSettlement {
    ledger
        .iter()
        .filter(|tx| tx.is_pending())
        .fold(PendingSettlement::default(), |mut acc, tx| {
            let effect = tx.cash_effect();
            match tx.side {
                Side::Buy => acc.payable = acc.payable.saturating_sub(effect),
                Side::Sell => acc.receivable = acc.receivable.saturating_add(effect),
            }
            acc
        })
}
