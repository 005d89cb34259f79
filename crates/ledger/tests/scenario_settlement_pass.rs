//! Scenario: T+2 settlement pass.
//!
//! # Invariants under test
//!
//! 1. Nothing due means nothing changes (a second pass is a no-op).
//! 2. A due BUY the running balance cannot cover defaults; the balance is
//!    still the clamped re-projection.
//! 3. SELLs always settle, and settle-vs-default follows canonical order.
//! 4. Terminal statuses are never revisited.
//! 5. Amounts at the edge of the decimal range saturate instead of panicking.

use chrono::{DateTime, Duration, TimeZone, Utc};
use core_types::{Account, FeeBreakdown, LotMode, SettlementStatus, Side, TradeTicket, Transaction};
use ledger::{FeeSchedule, SettlementCalendar, pending_settlement, process_settlements};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn t0() -> DateTime<Utc> {
    // Monday 10:00 Taipei.
    Utc.with_ymd_and_hms(2024, 3, 4, 2, 0, 0).unwrap()
}

fn trade(id: &str, minutes: i64, side: Side, shares: u64, price: Decimal) -> Transaction {
    let fees = FeeSchedule::new(dec!(0.001425), dec!(0.003)).unwrap();
    let calendar = SettlementCalendar::new(10, 8).unwrap();
    let ticket = TradeTicket {
        symbol: "2330".to_string(),
        name: "TSMC".to_string(),
        side,
        lot_mode: LotMode::Whole,
        shares,
        price,
    };
    let at = t0() + Duration::minutes(minutes);
    Transaction::pending(id, &ticket, fees.quote(price, shares, side).unwrap(), at, calendar.settlement_for(at))
}

fn status_of(ledger: &[Transaction], id: &str) -> SettlementStatus {
    ledger.iter().find(|tx| tx.id == id).unwrap().status()
}

#[test]
fn nothing_due_is_a_no_op() {
    let ledger = vec![trade("a", 0, Side::Buy, 1000, dec!(100))];
    let pass = process_settlements(&ledger, dec!(1000000), t0() + Duration::days(1));
    assert!(!pass.changed());
    assert_eq!(pass.ledger, ledger);
    assert_eq!(pass.projection.balance, dec!(899858));
}

#[test]
fn covered_buy_settles_and_second_pass_is_idempotent() {
    let ledger = vec![trade("a", 0, Side::Buy, 1000, dec!(100))];
    let later = t0() + Duration::days(3);

    let first = process_settlements(&ledger, dec!(1000000), later);
    assert_eq!(first.settled, vec!["a".to_string()]);
    assert!(!first.newly_defaulted());
    assert_eq!(status_of(&first.ledger, "a"), SettlementStatus::Settled);

    let second = process_settlements(&first.ledger, dec!(1000000), later + Duration::hours(1));
    assert!(!second.changed());
    assert_eq!(second.ledger, first.ledger);
    assert_eq!(second.projection, first.projection);
}

#[test]
fn uncovered_buy_defaults_and_balance_is_clamped() {
    // Two devices each spent most of the cash; the later buy cannot be covered.
    let ledger = vec![
        trade("a", 0, Side::Buy, 1000, dec!(600)),
        trade("b", 1, Side::Buy, 1000, dec!(500)),
    ];
    let pass = process_settlements(&ledger, dec!(1000000), t0() + Duration::days(3));

    assert_eq!(status_of(&pass.ledger, "a"), SettlementStatus::Settled);
    assert_eq!(status_of(&pass.ledger, "b"), SettlementStatus::Defaulted);
    assert!(pass.newly_defaulted());
    assert_eq!(pass.projection.balance, Decimal::ZERO);
    // The defaulted buy still counts towards the position.
    assert_eq!(pass.projection.positions["2330"].shares, 2000);
}

#[test]
fn sell_always_settles_and_earlier_sell_funds_later_buy() {
    let ledger = vec![
        trade("a", 0, Side::Buy, 1000, dec!(900)),
        trade("b", 1, Side::Sell, 1000, dec!(950)),
        trade("c", 2, Side::Buy, 1000, dec!(100)),
    ];
    let pass = process_settlements(&ledger, dec!(1000000), t0() + Duration::days(3));
    assert!(pass.defaulted.is_empty());
    assert_eq!(pass.settled.len(), 3);
}

#[test]
fn defaulted_transaction_is_never_reconsidered() {
    let ledger = vec![
        trade("a", 0, Side::Buy, 1000, dec!(600)),
        trade("b", 1, Side::Buy, 1000, dec!(500)),
    ];
    let later = t0() + Duration::days(3);
    let first = process_settlements(&ledger, dec!(1000000), later);
    let second = process_settlements(&first.ledger, dec!(5000000), later);
    assert!(!second.changed());
    assert_eq!(status_of(&second.ledger, "b"), SettlementStatus::Defaulted);
}

#[test]
fn applying_a_pass_writes_its_projection_and_freezes() {
    let ledger = vec![
        trade("a", 0, Side::Buy, 1000, dec!(600)),
        trade("b", 1, Side::Buy, 1000, dec!(500)),
    ];
    let mut account = Account::new(dec!(1000000), t0());
    account.ledger = ledger.clone();

    let pass = process_settlements(&ledger, dec!(1000000), t0() + Duration::days(3));
    pass.apply_to(&mut account);

    assert!(account.frozen);
    assert_eq!(account.balance, pass.projection.balance);
    assert_eq!(account.positions, pass.projection.positions);
    // Newest first after applying.
    assert_eq!(account.ledger[0].id, "b");
}

#[test]
fn oversized_stored_amounts_saturate() {
    let ticket = TradeTicket {
        symbol: "2330".to_string(),
        name: "TSMC".to_string(),
        side: Side::Buy,
        lot_mode: LotMode::Odd,
        shares: u64::MAX,
        price: Decimal::MAX,
    };
    let costs = FeeBreakdown { gross: Decimal::MAX, fee: Decimal::MAX, tax: Decimal::ZERO };
    let huge = |id: &str| Transaction::pending(id, &ticket, costs, t0(), t0() + Duration::days(2));
    let ledger = vec![huge("x"), huge("y")];

    let pass = process_settlements(&ledger, dec!(1000000), t0() + Duration::days(3));
    assert_eq!(pass.defaulted.len(), 2);
    assert_eq!(pass.projection.balance, Decimal::ZERO);
    assert_eq!(pass.projection.positions["2330"].cost_basis, Decimal::MAX);
    assert_eq!(pending_settlement(&ledger).payable, Decimal::MAX);
}
