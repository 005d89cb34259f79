use chrono::{DateTime, Utc};
use core_types::{Account, FeeBreakdown, LotMode, Side, TradeTicket, TradingMode};
use ledger::FeeSchedule;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the UI asks for, in the user's own units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub mode: TradingMode,
    pub symbol: String,
    pub name: String,
    pub side: Side,
    pub lot_mode: LotMode,
    /// Lots for `LotMode::Whole`, shares for `LotMode::Odd`.
    pub quantity: u64,
    pub quoted_price: Decimal,
}

/// A priced order awaiting the user's confirmation. Producing one does not
/// touch the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrderQuote {
    pub mode: TradingMode,
    pub ticket: TradeTicket,
    pub costs: FeeBreakdown,
    /// Gross plus fee for a buy, gross less fee and tax for a sell.
    pub total: Decimal,
    pub quoted_at: DateTime<Utc>,
}

/// Why an order was refused. Nothing is mutated when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderRejection {
    #[error("The {mode} account is frozen after a settlement default")]
    AccountFrozen { mode: TradingMode },

    #[error("Order quantity must be greater than zero")]
    NonPositiveQuantity,

    #[error("Order price must be greater than zero, got {0}")]
    NonPositivePrice(Decimal),

    #[error("Order symbol must not be empty")]
    EmptySymbol,

    #[error("Order amount is too large to process")]
    AmountOutOfRange,

    #[error("Insufficient funds. Required: {required}, Available: {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("Insufficient shares of {symbol}. Requested: {requested}, Held: {held}")]
    InsufficientShares { symbol: String, requested: u64, held: u64 },
}

/// Converts a request into a ticket in raw shares, rejecting malformed input.
pub fn ticket_for(request: &OrderRequest, lot_size: u64) -> Result<TradeTicket, OrderRejection> {
    let shares = request
        .lot_mode
        .to_shares(request.quantity, lot_size)
        .ok_or(OrderRejection::AmountOutOfRange)?;
    validate_ticket(&TradeTicket {
        symbol: request.symbol.clone(),
        name: request.name.clone(),
        side: request.side,
        lot_mode: request.lot_mode,
        shares,
        price: request.quoted_price,
    })
}

/// Normalizes a ticket and checks it is well formed. Tickets that come back
/// inside a quote go through here again, since a quote may have been edited
/// or deserialized in between.
pub fn validate_ticket(ticket: &TradeTicket) -> Result<TradeTicket, OrderRejection> {
    let symbol = ticket.symbol.trim();
    if symbol.is_empty() {
        return Err(OrderRejection::EmptySymbol);
    }
    if ticket.price <= Decimal::ZERO {
        return Err(OrderRejection::NonPositivePrice(ticket.price));
    }
    if ticket.shares == 0 {
        return Err(OrderRejection::NonPositiveQuantity);
    }
    let name = match ticket.name.trim() {
        "" => symbol,
        name => name,
    };
    Ok(TradeTicket {
        symbol: symbol.to_string(),
        name: name.to_string(),
        side: ticket.side,
        lot_mode: ticket.lot_mode,
        shares: ticket.shares,
        price: ticket.price,
    })
}

/// Prices a validated ticket, refusing amounts too large to represent.
pub fn price_ticket(fees: &FeeSchedule, ticket: &TradeTicket) -> Result<FeeBreakdown, OrderRejection> {
    fees.quote(ticket.price, ticket.shares, ticket.side)
        .ok_or(OrderRejection::AmountOutOfRange)
}

/// Checks an order against the account as it is right now.
pub fn check_order(
    mode: TradingMode,
    account: &Account,
    ticket: &TradeTicket,
    costs: &FeeBreakdown,
) -> Result<(), OrderRejection> {
    if account.frozen {
        return Err(OrderRejection::AccountFrozen { mode });
    }
    match ticket.side {
        Side::Buy => {
            let required = costs.order_total(Side::Buy);
            if account.balance < required {
                return Err(OrderRejection::InsufficientFunds {
                    required,
                    available: account.balance,
                });
            }
        }
        Side::Sell => {
            let held = account.held_shares(&ticket.symbol);
            if held < ticket.shares {
                return Err(OrderRejection::InsufficientShares {
                    symbol: ticket.symbol.clone(),
                    requested: ticket.shares,
                    held,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(lot_mode: LotMode, quantity: u64) -> OrderRequest {
        OrderRequest {
            mode: TradingMode::Practice,
            symbol: " 2330 ".to_string(),
            name: String::new(),
            side: Side::Buy,
            lot_mode,
            quantity,
            quoted_price: dec!(100),
        }
    }

    #[test]
    fn whole_lots_are_multiplied_by_lot_size() {
        let ticket = ticket_for(&request(LotMode::Whole, 3), 1000).unwrap();
        assert_eq!(ticket.shares, 3000);
        assert_eq!(ticket.symbol, "2330");
        assert_eq!(ticket.name, "2330");
        assert_eq!(ticket_for(&request(LotMode::Odd, 3), 1000).unwrap().shares, 3);
    }

    #[test]
    fn malformed_requests_are_rejected() {
        assert_eq!(
            ticket_for(&request(LotMode::Odd, 0), 1000),
            Err(OrderRejection::NonPositiveQuantity)
        );
        let mut zero_price = request(LotMode::Odd, 1);
        zero_price.quoted_price = Decimal::ZERO;
        assert!(matches!(
            ticket_for(&zero_price, 1000),
            Err(OrderRejection::NonPositivePrice(_))
        ));
        let mut blank = request(LotMode::Odd, 1);
        blank.symbol = "  ".to_string();
        assert_eq!(ticket_for(&blank, 1000), Err(OrderRejection::EmptySymbol));
    }

    #[test]
    fn lot_count_overflowing_shares_is_out_of_range() {
        assert_eq!(
            ticket_for(&request(LotMode::Whole, u64::MAX / 10), 1000),
            Err(OrderRejection::AmountOutOfRange)
        );
    }

    #[test]
    fn huge_price_is_refused_instead_of_overflowing() {
        let fees = FeeSchedule::new(dec!(0.001425), dec!(0.003)).unwrap();
        let mut big = request(LotMode::Whole, 10);
        big.quoted_price = dec!(10000000000000000000000000);
        let ticket = ticket_for(&big, 1000).unwrap();
        assert_eq!(price_ticket(&fees, &ticket), Err(OrderRejection::AmountOutOfRange));
    }

    #[test]
    fn returned_tickets_are_validated_again() {
        let mut ticket = ticket_for(&request(LotMode::Odd, 5), 1000).unwrap();
        ticket.symbol = " ".to_string();
        assert_eq!(validate_ticket(&ticket), Err(OrderRejection::EmptySymbol));
    }
}
