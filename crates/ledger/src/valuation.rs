use core_types::Account;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single position marked to a quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionValuation {
    pub symbol: String,
    pub shares: u64,
    pub average_price: Decimal,
    pub mark_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
    /// False when no quote was available and the average cost was used instead.
    pub quoted: bool,
}

/// Cash plus the marked value of every open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub cash: Decimal,
    pub positions: Vec<PositionValuation>,
    pub total_equity: Decimal,
}

/// Marks every position of `account` to `quotes`.
///
/// A symbol without a quote is valued at its average cost, so it contributes
/// no unrealized P&L rather than dropping out of equity.
pub fn valuate(account: &Account, quotes: &HashMap<String, Decimal>) -> Valuation {
    let positions: Vec<PositionValuation> = account
        .positions
        .values()
        .map(|p| {
            let quote = quotes.get(&p.symbol).copied();
            let mark_price = quote.unwrap_or(p.average_price);
            let shares = Decimal::from(p.shares);
            let market_value = mark_price.saturating_mul(shares);
            PositionValuation {
                symbol: p.symbol.clone(),
                shares: p.shares,
                average_price: p.average_price,
                mark_price,
                market_value,
                unrealized_pnl: market_value.saturating_sub(p.cost_basis),
                quoted: quote.is_some(),
            }
        })
        .collect();

    let total_equity = positions
        .iter()
        .fold(account.balance, |equity, p| equity.saturating_add(p.market_value));
    Valuation {
        cash: account.balance,
        positions,
        total_equity,
    }
}
