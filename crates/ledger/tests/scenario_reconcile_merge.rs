//! Scenario: merging a local and a remote copy of one account.
//!
//! # Invariants under test
//!
//! 1. Disjoint ledgers merge to the full union, newest first.
//! 2. Merging an account with itself changes nothing.
//! 3. Shared ids are never duplicated and the local copy wins.
//! 4. A freeze on either side survives the merge.
//! 5. Loading re-projects stored balances that disagree with the ledger.
//! 6. A copy from before a reset never brings the discarded history back,
//!    and a copy from after a reset replaces the older local account.

use chrono::{DateTime, Duration, TimeZone, Utc};
use core_types::{Account, LotMode, SettlementStatus, Side, TradeTicket, TradingMode, Transaction, UserBook};
use ledger::{FeeSchedule, reconcile, repair_book, reproject};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const EPS: Decimal = dec!(0.01);

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 2, 0, 0).unwrap()
}

fn trade(id: &str, minutes: i64, symbol: &str, side: Side, shares: u64, price: Decimal) -> Transaction {
    let fees = FeeSchedule::new(dec!(0.001425), dec!(0.003)).unwrap();
    let ticket = TradeTicket {
        symbol: symbol.to_string(),
        name: symbol.to_string(),
        side,
        lot_mode: LotMode::Odd,
        shares,
        price,
    };
    let at = t0() + Duration::minutes(minutes);
    Transaction::pending(id, &ticket, fees.quote(price, shares, side).unwrap(), at, at + Duration::days(2))
}

fn account(ledger: Vec<Transaction>) -> Account {
    let mut account = Account::new(dec!(1000000), t0());
    account.ledger = ledger;
    reproject(&mut account);
    account
}

#[test]
fn disjoint_ledgers_merge_to_their_union() {
    let local = account(vec![
        trade("l1", 0, "2330", Side::Buy, 100, dec!(500)),
        trade("l2", 30, "2330", Side::Sell, 50, dec!(510)),
    ]);
    let remote = account(vec![
        trade("r1", 10, "2317", Side::Buy, 200, dec!(100)),
        trade("r2", 20, "2454", Side::Buy, 10, dec!(1000)),
        trade("r3", 40, "2317", Side::Sell, 200, dec!(105)),
    ]);

    let merged = reconcile(&local, &remote, EPS);
    assert!(merged.changed);
    assert_eq!(merged.added, 3);

    let ids: Vec<&str> = merged.account.ledger.iter().map(|tx| tx.id.as_str()).collect();
    assert_eq!(ids, vec!["r3", "l2", "r2", "r1", "l1"]);

    let all: Vec<Transaction> = local.ledger.iter().chain(&remote.ledger).cloned().collect();
    let expected = account(all);
    assert_eq!(merged.account.balance, expected.balance);
    assert_eq!(merged.account.positions, expected.positions);
}

#[test]
fn merging_with_itself_is_a_no_op() {
    let local = account(vec![
        trade("a", 0, "2330", Side::Buy, 100, dec!(500)),
        trade("b", 5, "2317", Side::Buy, 300, dec!(33.3)),
    ]);
    let merged = reconcile(&local, &local, EPS);
    assert!(!merged.changed);
    assert_eq!(merged.added, 0);
    assert_eq!(merged.account, local);
}

#[test]
fn shared_ids_are_not_duplicated_and_local_copy_wins() {
    let shared = trade("s", 0, "2330", Side::Buy, 100, dec!(500));
    let mut settled = shared.clone();
    settled.transition(SettlementStatus::Settled).unwrap();

    let local = account(vec![shared]);
    let remote = account(vec![settled, trade("r", 10, "2330", Side::Buy, 100, dec!(505))]);

    let merged = reconcile(&local, &remote, EPS);
    assert_eq!(merged.account.ledger.len(), 2);
    assert_eq!(merged.added, 1);
    let kept = merged.account.ledger.iter().find(|tx| tx.id == "s").unwrap();
    assert_eq!(kept.status(), SettlementStatus::Pending);
}

#[test]
fn remote_freeze_is_never_merged_away() {
    let local = account(vec![trade("a", 0, "2330", Side::Buy, 100, dec!(500))]);
    let mut remote = local.clone();
    remote.frozen = true;

    let merged = reconcile(&local, &remote, EPS);
    assert!(merged.account.frozen);
    assert!(merged.changed);

    let back = reconcile(&merged.account, &local, EPS);
    assert!(back.account.frozen);
    assert!(!back.changed);
}

#[test]
fn loading_overwrites_drifted_stored_values() {
    let mut book = UserBook::new("amy", dec!(1000000), t0());
    book.live_quote.ledger = vec![trade("a", 0, "2330", Side::Buy, 1000, dec!(100))];
    book.live_quote.balance = dec!(1000000);
    book.practice.balance = dec!(1000000);

    let repaired = repair_book(&mut book, EPS);
    assert_eq!(repaired, vec![TradingMode::LiveQuote]);
    assert_eq!(book.live_quote.balance, dec!(899858));
    assert_eq!(book.live_quote.positions["2330"].shares, 1000);
}

#[test]
fn copy_from_before_a_reset_is_ignored() {
    let stale = account(vec![trade("a", 0, "2330", Side::Buy, 100, dec!(500))]);
    let mut stale = stale;
    stale.frozen = true;
    let fresh = stale.reset(dec!(1000000), t0() + Duration::hours(1));
    assert_eq!(fresh.generation, 1);

    let merged = reconcile(&fresh, &stale, EPS);
    assert!(!merged.changed);
    assert_eq!(merged.added, 0);
    assert!(merged.account.ledger.is_empty());
    assert!(!merged.account.frozen);
    assert_eq!(merged.account.balance, dec!(1000000));
}

#[test]
fn copy_from_after_a_reset_replaces_the_local_account() {
    let local = account(vec![
        trade("a", 0, "2330", Side::Buy, 100, dec!(500)),
        trade("b", 10, "2317", Side::Buy, 200, dec!(100)),
    ]);
    let mut remote = local.reset(dec!(1000000), t0() + Duration::hours(1));
    remote.ledger = vec![trade("c", 70, "2454", Side::Buy, 10, dec!(1000))];
    reproject(&mut remote);

    let merged = reconcile(&local, &remote, EPS);
    assert!(merged.changed);
    assert_eq!(merged.added, 1);
    assert_eq!(merged.account.generation, 1);
    let ids: Vec<&str> = merged.account.ledger.iter().map(|tx| tx.id.as_str()).collect();
    assert_eq!(ids, vec!["c"]);
    assert!(!merged.account.positions.contains_key("2330"));
    assert_eq!(merged.account.balance, remote.balance);

    // Once both sides agree on the generation, the usual union applies.
    let again = reconcile(&merged.account, &remote, EPS);
    assert!(!again.changed);
}
