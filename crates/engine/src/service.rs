use crate::clock::Clock;
use crate::error::EngineError;
use crate::orders::{
    OrderRejection, OrderRequest, PendingOrderQuote, check_order, price_ticket, ticket_for,
    validate_ticket,
};
use configuration::{ServiceSettings, TradingSettings};
use core_types::{
    DualModeRecord, Position, StoredRecord, TradingMode, Transaction, UserBook,
};
use database::{DbError, RemoteLedger, Storage};
use events::{AccountEvent, EventEnvelope, StorageOperation};
use ledger::{
    FeeSchedule, PendingSettlement, SettlementCalendar, Valuation, pending_settlement,
    process_settlements, reconcile, repair_book, reproject, valuate,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Everything the service needs to price, settle and merge, resolved once
/// from configuration.
#[derive(Debug, Clone)]
pub struct ServiceParams {
    pub fees: FeeSchedule,
    pub calendar: SettlementCalendar,
    pub starting_balance: Decimal,
    pub lot_size: u64,
    pub io_timeout: Duration,
    pub change_epsilon: Decimal,
}

impl ServiceParams {
    pub fn from_settings(
        trading: &TradingSettings,
        service: &ServiceSettings,
    ) -> Result<Self, EngineError> {
        if trading.lot_size == 0 {
            return Err(EngineError::Configuration("lot_size must be greater than 0".to_string()));
        }
        Ok(Self {
            fees: FeeSchedule::new(trading.fee_rate, trading.tax_rate)?,
            calendar: SettlementCalendar::new(trading.settlement_hour, trading.utc_offset_hours)?,
            starting_balance: trading.starting_balance,
            lot_size: trading.lot_size,
            io_timeout: service.io_timeout(),
            change_epsilon: service.change_epsilon,
        })
    }
}

/// Read-only view of one mode's account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub mode: TradingMode,
    pub balance: Decimal,
    pub positions: Vec<Position>,
    /// Most recent first.
    pub ledger: Vec<Transaction>,
    pub frozen: bool,
    pub pending: PendingSettlement,
    pub last_update: chrono::DateTime<chrono::Utc>,
}

/// What a settlement pass did across both modes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub settled: Vec<String>,
    pub defaulted: Vec<String>,
    pub changed: bool,
    pub newly_defaulted: bool,
    pub persisted: bool,
}

/// What a remote merge did across both modes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub changed_modes: Vec<TradingMode>,
    pub added: usize,
    pub persisted: bool,
    /// Set when the remote replica could not be reached; local state was kept.
    pub degraded: Option<String>,
}

impl SyncReport {
    pub fn changed(&self) -> bool {
        !self.changed_modes.is_empty()
    }
}

/// The single owner of one user's accounts for the active session.
///
/// Every mutating operation takes the same lock for its whole
/// read-modify-write, including the save, so `confirm_order`, `tick`, `sync`
/// and `reset_mode` never interleave and writes reach storage in order.
pub struct AccountService {
    user: String,
    params: ServiceParams,
    storage: Arc<dyn Storage>,
    remote: Option<Arc<dyn RemoteLedger>>,
    clock: Arc<dyn Clock>,
    book: Mutex<UserBook>,
    events: broadcast::Sender<EventEnvelope>,
}

impl AccountService {
    /// Loads (or creates) the user's record and re-projects it.
    ///
    /// A legacy single-mode record is accepted and upgraded by the first save.
    /// A user with no record gets a fresh dual-mode record, saved immediately.
    pub async fn open(
        user: impl Into<String>,
        params: ServiceParams,
        storage: Arc<dyn Storage>,
        remote: Option<Arc<dyn RemoteLedger>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        let user = user.into();
        let now = clock.now();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let loaded = bounded(params.io_timeout, "load", storage.load(&user)).await?;
        let (book, bootstrap) = match loaded {
            Some(record) => {
                if record.is_legacy() {
                    tracing::info!(%user, "loaded legacy record, will upgrade on next save");
                }
                let mut book = record.into_book(params.starting_balance, now);
                book.username = user.clone();
                repair_book(&mut book, params.change_epsilon);
                (book, false)
            }
            None => {
                tracing::info!(%user, "no stored record, creating a fresh one");
                (UserBook::new(user.clone(), params.starting_balance, now), true)
            }
        };

        let service = Self {
            user,
            params,
            storage,
            remote,
            clock,
            book: Mutex::new(book),
            events,
        };
        if bootstrap {
            let mut book = service.book.lock().await;
            service.persist(&mut book).await;
        }
        Ok(service)
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn params(&self) -> &ServiceParams {
        &self.params
    }

    /// Subscribes to notable events: confirmations, settlements, defaults,
    /// merges, resets and degraded storage.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    /// Prices an order and checks it against the current account. The ledger
    /// is not touched; the quote must be passed to `confirm_order`.
    pub async fn place_order(
        &self,
        request: &OrderRequest,
    ) -> Result<PendingOrderQuote, OrderRejection> {
        let ticket = ticket_for(request, self.params.lot_size)?;
        let costs = price_ticket(&self.params.fees, &ticket)?;

        let book = self.book.lock().await;
        check_order(request.mode, book.account(request.mode), &ticket, &costs)?;

        Ok(PendingOrderQuote {
            mode: request.mode,
            total: costs.order_total(ticket.side),
            ticket,
            costs,
            quoted_at: self.clock.now(),
        })
    }

    /// Re-checks a quote against the account as it is now, then appends it to
    /// the ledger, re-projects and persists.
    pub async fn confirm_order(
        &self,
        quote: &PendingOrderQuote,
    ) -> Result<Transaction, OrderRejection> {
        let mode = quote.mode;
        let ticket = validate_ticket(&quote.ticket)?;
        // The quote's amounts are recomputed rather than trusted.
        let costs = price_ticket(&self.params.fees, &ticket)?;

        let mut book = self.book.lock().await;
        check_order(mode, book.account(mode), &ticket, &costs)?;

        let now = self.clock.now();
        let transaction = Transaction::pending(
            Uuid::new_v4().simple().to_string(),
            &ticket,
            costs,
            now,
            self.params.calendar.settlement_for(now),
        );

        let account = book.account_mut(mode);
        account.ledger.push(transaction.clone());
        account.last_update = now;
        reproject(account);
        let balance = account.balance;

        tracing::info!(
            user = %self.user,
            %mode,
            tx_id = %transaction.id,
            symbol = %transaction.symbol,
            side = %transaction.side,
            shares = transaction.shares,
            %balance,
            "order confirmed"
        );
        self.persist(&mut book).await;
        drop(book);

        self.emit(AccountEvent::OrderConfirmed {
            mode,
            transaction: transaction.clone(),
            balance,
        });
        Ok(transaction)
    }

    /// Runs one settlement pass over both modes and persists only if a status
    /// changed.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();
        let mut events = Vec::new();

        let mut book = self.book.lock().await;
        let now = self.clock.now();
        for mode in TradingMode::ALL {
            let account = book.account_mut(mode);
            let pass = process_settlements(&account.ledger, account.starting_balance, now);
            if !pass.changed() {
                continue;
            }

            pass.apply_to(account);
            account.last_update = now;

            tracing::debug!(
                user = %self.user,
                %mode,
                settled = pass.settled.len(),
                defaulted = pass.defaulted.len(),
                "settlement pass applied"
            );
            if !pass.defaulted.is_empty() {
                tracing::warn!(
                    user = %self.user,
                    %mode,
                    transactions = ?pass.defaulted,
                    "settlement default, account frozen"
                );
                events.push(AccountEvent::AccountDefaulted {
                    mode,
                    transaction_ids: pass.defaulted.clone(),
                });
                report.newly_defaulted = true;
            }
            events.push(AccountEvent::SettlementProcessed {
                mode,
                settled: pass.settled.clone(),
                defaulted: pass.defaulted.clone(),
            });
            report.settled.extend(pass.settled);
            report.defaulted.extend(pass.defaulted);
            report.changed = true;
        }

        if report.changed {
            report.persisted = self.persist(&mut book).await;
        }
        drop(book);

        for event in events {
            self.emit(event);
        }
        report
    }

    /// Fetches the remote replica and merges it into both modes. The fetch runs
    /// before the lock is taken; merge, state update and save run under it.
    pub async fn sync(&self) -> SyncReport {
        let mut report = SyncReport::default();
        let Some(remote) = &self.remote else {
            return report;
        };

        let fetched = bounded(self.params.io_timeout, "fetch_remote", remote.fetch_remote(&self.user)).await;
        let record = match fetched {
            Ok(Some(record)) => record,
            Ok(None) => return report,
            Err(e) => {
                tracing::warn!(user = %self.user, error = %e, "remote fetch failed, keeping local state");
                self.emit(AccountEvent::StorageDegraded {
                    operation: StorageOperation::FetchRemote,
                    reason: e.to_string(),
                });
                report.degraded = Some(e.to_string());
                return report;
            }
        };
        let remote_book = self.resolve_remote(record);

        let mut events = Vec::new();
        let mut book = self.book.lock().await;
        for mode in TradingMode::ALL {
            let merged = reconcile(
                book.account(mode),
                remote_book.account(mode),
                self.params.change_epsilon,
            );
            if !merged.changed {
                continue;
            }
            tracing::info!(
                user = %self.user,
                %mode,
                added = merged.added,
                balance = %merged.account.balance,
                frozen = merged.account.frozen,
                "merged remote ledger"
            );
            events.push(AccountEvent::LedgerSynced {
                mode,
                added: merged.added,
                balance: merged.account.balance,
            });
            report.added += merged.added;
            report.changed_modes.push(mode);
            *book.account_mut(mode) = merged.account;
        }

        if report.changed() {
            report.persisted = self.persist(&mut book).await;
        }
        drop(book);

        for event in events {
            self.emit(event);
        }
        report
    }

    /// Replaces one mode's account with a fresh one of the next generation, so
    /// a later sync cannot merge the discarded history back in. The other mode
    /// is untouched.
    pub async fn reset_mode(&self, mode: TradingMode) -> bool {
        let mut book = self.book.lock().await;
        let now = self.clock.now();
        let fresh = book.account(mode).reset(self.params.starting_balance, now);
        let generation = fresh.generation;
        *book.account_mut(mode) = fresh;
        tracing::info!(user = %self.user, %mode, generation, "mode reset");
        let persisted = self.persist(&mut book).await;
        drop(book);

        self.emit(AccountEvent::ModeReset { mode });
        persisted
    }

    pub async fn current_state(&self, mode: TradingMode) -> AccountSnapshot {
        let book = self.book.lock().await;
        let account = book.account(mode);
        AccountSnapshot {
            mode,
            balance: account.balance,
            positions: account.positions.values().cloned().collect(),
            ledger: account.ledger.clone(),
            frozen: account.frozen,
            pending: pending_settlement(&account.ledger),
            last_update: account.last_update,
        }
    }

    /// Marks one mode's positions at the given prices.
    pub async fn valuation(&self, mode: TradingMode, quotes: &HashMap<String, Decimal>) -> Valuation {
        let book = self.book.lock().await;
        valuate(book.account(mode), quotes)
    }

    fn resolve_remote(&self, record: StoredRecord) -> UserBook {
        let mut remote = record.into_book(self.params.starting_balance, self.clock.now());
        repair_book(&mut remote, self.params.change_epsilon);
        remote
    }

    /// Saves the whole book. Failures are logged and announced, never
    /// propagated: the in-memory book stays authoritative and the next
    /// mutation, tick or sync writes it again.
    async fn persist(&self, book: &mut UserBook) -> bool {
        book.last_update = self.clock.now();
        let record = DualModeRecord::from(&*book);
        match bounded(self.params.io_timeout, "save", self.storage.save(&record)).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(user = %self.user, error = %e, "save failed, keeping in-memory state");
                self.emit(AccountEvent::StorageDegraded {
                    operation: StorageOperation::Save,
                    reason: e.to_string(),
                });
                false
            }
        }
    }

    fn emit(&self, event: AccountEvent) {
        let envelope = EventEnvelope {
            user: self.user.clone(),
            at: self.clock.now(),
            event,
        };
        // No subscribers is fine.
        let _ = self.events.send(envelope);
    }
}

/// Bounds a collaborator call by `limit`.
async fn bounded<T>(
    limit: Duration,
    operation: &'static str,
    call: impl Future<Output = Result<T, DbError>>,
) -> Result<T, EngineError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(EngineError::Timeout {
            operation,
            after_ms: limit.as_millis(),
        }),
    }
}
