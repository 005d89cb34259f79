use crate::projection::reproject;
use core_types::{TradingMode, UserBook};
use rust_decimal::Decimal;

/// Re-projects both accounts of a freshly loaded book.
///
/// Stored balances and positions are never trusted: whatever an older writer
/// left behind is overwritten from the ledger. Returns the modes whose stored
/// values disagreed with the ledger by more than `epsilon`.
pub fn repair_book(book: &mut UserBook, epsilon: Decimal) -> Vec<TradingMode> {
    let mut repaired = Vec::new();
    for mode in TradingMode::ALL {
        let account = book.account_mut(mode);
        let stored_balance = account.balance;
        let stored_positions = account.positions.clone();

        reproject(account);

        let balance_drift = account.balance.saturating_sub(stored_balance).abs();
        let positions_drift = stored_positions.len() != account.positions.len()
            || account.positions.values().any(|p| {
                stored_positions
                    .get(&p.symbol)
                    .is_none_or(|old| old.shares != p.shares)
            });
        if balance_drift > epsilon || positions_drift {
            tracing::debug!(
                user = %book.username,
                %mode,
                stored = %stored_balance,
                derived = %book.account(mode).balance,
                "stored account disagreed with its ledger, re-projected"
            );
            repaired.push(mode);
        }
    }
    repaired
}
