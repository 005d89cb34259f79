use crate::enums::{LotMode, SettlementStatus, Side};
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// What the user asked to trade, already converted to raw shares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeTicket {
    pub symbol: String,
    pub name: String,
    pub side: Side,
    pub lot_mode: LotMode,
    pub shares: u64,
    pub price: Decimal,
}

/// Monetary effects of a trade, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub gross: Decimal,
    pub fee: Decimal,
    pub tax: Decimal,
}

impl FeeBreakdown {
    /// Cash that leaves (BUY) or enters (SELL) the account, as a signed amount.
    /// Saturates rather than overflowing on amounts read back from storage.
    pub fn cash_effect(&self, side: Side) -> Decimal {
        match side {
            Side::Buy => -self.gross.saturating_add(self.fee),
            Side::Sell => self.gross.saturating_sub(self.fee).saturating_sub(self.tax),
        }
    }

    /// The unsigned amount shown to the user when confirming an order.
    pub fn order_total(&self, side: Side) -> Decimal {
        self.cash_effect(side).abs()
    }
}

/// A single executed trade in an account's ledger.
///
/// Everything except the settlement status is fixed at creation. The status only
/// ever moves `Pending -> Settled` or `Pending -> Defaulted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub side: Side,
    pub lot_mode: LotMode,
    pub shares: u64,
    pub price: Decimal,
    pub fee: Decimal,
    pub tax: Decimal,
    pub gross_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub settles_at: DateTime<Utc>,
    #[serde(default)]
    status: SettlementStatus,
}

impl Transaction {
    /// Creates a new, unsettled transaction.
    pub fn pending(
        id: impl Into<String>,
        ticket: &TradeTicket,
        costs: FeeBreakdown,
        created_at: DateTime<Utc>,
        settles_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: ticket.symbol.clone(),
            name: ticket.name.clone(),
            side: ticket.side,
            lot_mode: ticket.lot_mode,
            shares: ticket.shares,
            price: ticket.price,
            fee: costs.fee,
            tax: costs.tax,
            gross_amount: costs.gross,
            created_at,
            settles_at: settles_at.max(created_at),
            status: SettlementStatus::Pending,
        }
    }

    pub fn status(&self) -> SettlementStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == SettlementStatus::Pending
    }

    /// Whether the transaction is still pending and its settlement time has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && now >= self.settles_at
    }

    pub fn costs(&self) -> FeeBreakdown {
        FeeBreakdown {
            gross: self.gross_amount,
            fee: self.fee,
            tax: self.tax,
        }
    }

    /// Signed cash effect: negative for a BUY, positive for a SELL.
    pub fn cash_effect(&self) -> Decimal {
        self.costs().cash_effect(self.side)
    }

    /// Moves a pending transaction to a terminal status.
    pub fn transition(&mut self, to: SettlementStatus) -> Result<(), CoreError> {
        if self.status != SettlementStatus::Pending || to == SettlementStatus::Pending {
            return Err(CoreError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Canonical replay order: creation time ascending, ties broken by id.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// A holding derived from the ledger. Never persisted as a source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub name: String,
    pub shares: u64,
    /// Remaining cost basis after proportional reduction on sells.
    pub cost_basis: Decimal,
    pub average_price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn ticket(side: Side) -> TradeTicket {
        TradeTicket {
            symbol: "2330".to_string(),
            name: "TSMC".to_string(),
            side,
            lot_mode: LotMode::Whole,
            shares: 1000,
            price: dec!(100),
        }
    }

    #[test]
    fn status_only_moves_forward_from_pending() {
        let at = Utc.with_ymd_and_hms(2024, 3, 4, 2, 0, 0).unwrap();
        let costs = FeeBreakdown { gross: dec!(100000), fee: dec!(142), tax: dec!(0) };
        let mut tx = Transaction::pending("a", &ticket(Side::Buy), costs, at, at);

        assert!(tx.transition(SettlementStatus::Pending).is_err());
        tx.transition(SettlementStatus::Defaulted).unwrap();
        assert_eq!(tx.status(), SettlementStatus::Defaulted);
        assert!(tx.transition(SettlementStatus::Settled).is_err());
        assert_eq!(tx.status(), SettlementStatus::Defaulted);
    }

    #[test]
    fn cash_effect_sign_follows_side() {
        let costs = FeeBreakdown { gross: dec!(110000), fee: dec!(156), tax: dec!(330) };
        assert_eq!(costs.cash_effect(Side::Sell), dec!(109514));
        assert_eq!(costs.cash_effect(Side::Buy), dec!(-110156));
        assert_eq!(costs.order_total(Side::Buy), dec!(110156));
    }
}
