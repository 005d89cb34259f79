use crate::service::AccountService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// Drives settlement and remote sync for one open account session.
///
/// Both timers run inside one task. Each pass goes through the service, so
/// they serialize with user actions on the service's lock and never overlap
/// with each other.
pub struct BackgroundScheduler {
    service: Arc<AccountService>,
    tick_every: Duration,
    sync_every: Duration,
}

impl BackgroundScheduler {
    pub fn new(service: Arc<AccountService>, tick_every: Duration, sync_every: Duration) -> Self {
        Self {
            service,
            tick_every,
            sync_every,
        }
    }

    /// Runs until `shutdown` flips to `true` or its sender is dropped.
    pub async fn start(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            user = %self.service.user(),
            tick_secs = self.tick_every.as_secs(),
            sync_secs = self.sync_every.as_secs(),
            "starting background settlement and sync"
        );
        let mut tick_timer = interval(self.tick_every);
        let mut sync_timer = interval(self.sync_every);
        // A slow save must not cause a burst of catch-up passes.
        tick_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        sync_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick_timer.tick() => {
                    let report = self.service.tick().await;
                    if report.changed && !report.persisted {
                        tracing::warn!(user = %self.service.user(), "settlement applied but not yet persisted");
                    }
                }
                _ = sync_timer.tick() => {
                    let report = self.service.sync().await;
                    if report.changed() {
                        tracing::debug!(
                            user = %self.service.user(),
                            added = report.added,
                            modes = ?report.changed_modes,
                            "background sync merged remote state"
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!(user = %self.service.user(), "background tasks stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.start(shutdown))
    }
}
