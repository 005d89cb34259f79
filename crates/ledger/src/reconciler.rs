use crate::projection::reproject;
use core_types::{Account, Position, Transaction};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};

/// Outcome of merging a remote copy of an account into the local one.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// The merged account, re-projected and in presentation order.
    pub account: Account,
    /// Transactions that were only present remotely.
    pub added: usize,
    /// Whether the merged account differs from the local one.
    pub changed: bool,
}

/// Merges `remote` into `local` with no loss and no duplication.
///
/// Copies from different reset generations are not merged: the newer
/// generation is taken as it is.
///
/// Transactions are unioned by id; when both sides hold an id the local copy
/// wins. The union is re-projected from the local starting balance and the
/// frozen flag is the OR of both sides, so a freeze seen anywhere sticks.
///
/// `changed` compares against `local` as it was: ledger length, the
/// `(created_at, id)` pair at every position, frozen flag, each position's
/// shares and average price, and the balance. Prices and balance use `epsilon`.
pub fn reconcile(local: &Account, remote: &Account, epsilon: Decimal) -> Reconciliation {
    if remote.generation < local.generation {
        tracing::debug!(
            local_generation = local.generation,
            remote_generation = remote.generation,
            "remote copy predates a reset, ignored"
        );
        return Reconciliation { account: local.clone(), added: 0, changed: false };
    }
    if remote.generation > local.generation {
        return adopt_remote(local, remote);
    }

    let local_ids: HashSet<&str> = local.ledger.iter().map(|tx| tx.id.as_str()).collect();

    let mut ledger = local.ledger.clone();
    let mut added = 0;
    let mut seen_remote: HashSet<&str> = HashSet::new();
    for tx in &remote.ledger {
        if local_ids.contains(tx.id.as_str()) || !seen_remote.insert(tx.id.as_str()) {
            continue;
        }
        ledger.push(tx.clone());
        added += 1;
    }

    let mut account = Account {
        ledger,
        frozen: local.frozen || remote.frozen,
        last_update: local.last_update.max(remote.last_update),
        ..local.clone()
    };
    reproject(&mut account);

    let changed = ledger_changed(&local.ledger, &account.ledger)
        || positions_changed(&local.positions, &account.positions, epsilon)
        || account.balance.saturating_sub(local.balance).abs() > epsilon
        || account.frozen != local.frozen;

    if changed {
        tracing::debug!(
            added,
            local_len = local.ledger.len(),
            remote_len = remote.ledger.len(),
            merged_len = account.ledger.len(),
            balance = %account.balance,
            "merge changed local state"
        );
    }

    Reconciliation { account, added, changed }
}

/// The remote side was reset after the local copy was written: the local
/// history belongs to a discarded account and the remote account replaces it.
fn adopt_remote(local: &Account, remote: &Account) -> Reconciliation {
    let local_ids: HashSet<&str> = local.ledger.iter().map(|tx| tx.id.as_str()).collect();
    let added = remote
        .ledger
        .iter()
        .filter(|tx| !local_ids.contains(tx.id.as_str()))
        .count();

    let mut account = remote.clone();
    account.last_update = local.last_update.max(remote.last_update);
    reproject(&mut account);
    tracing::debug!(
        local_generation = local.generation,
        remote_generation = remote.generation,
        merged_len = account.ledger.len(),
        "remote copy was reset, adopted"
    );
    Reconciliation { account, added, changed: true }
}

fn ledger_changed(before: &[Transaction], after: &[Transaction]) -> bool {
    before.len() != after.len()
        || before
            .iter()
            .zip(after)
            .any(|(a, b)| a.id != b.id || a.created_at != b.created_at)
}

fn positions_changed(
    before: &BTreeMap<String, Position>,
    after: &BTreeMap<String, Position>,
    epsilon: Decimal,
) -> bool {
    before.len() != after.len()
        || after.values().any(|p| match before.get(&p.symbol) {
            Some(old) => {
                old.shares != p.shares
                    || old.average_price.saturating_sub(p.average_price).abs() > epsilon
            }
            None => true,
        })
}
