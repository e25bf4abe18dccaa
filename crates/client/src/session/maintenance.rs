//! Background session upkeep: token-age checks and post-outage revalidation.

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::SessionStore;
use crate::api::AuthBackend;
use crate::health::BackendStatus;

impl<B: AuthBackend> SessionStore<B> {
    /// Run until `shutdown` flips (or its sender is dropped).
    ///
    /// Every `check_interval` the token-age policy is applied. When `health`
    /// reports the backend back `Up` after `Down` or `GaveUp`, the token is
    /// verified again.
    pub async fn run_maintenance(
        &self,
        mut health: watch::Receiver<BackendStatus>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(self.inner.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        let mut in_outage = health.borrow_and_update().is_outage();
        let mut health_open = true;
        debug!(interval = ?self.inner.check_interval, "Session maintenance started");

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    self.enforce_token_policy(Utc::now()).await;
                }
                changed = health.changed(), if health_open => {
                    if changed.is_err() {
                        health_open = false;
                        continue;
                    }
                    let status = *health.borrow_and_update();
                    if status.is_outage() {
                        in_outage = true;
                    } else if status == BackendStatus::Up && in_outage {
                        in_outage = false;
                        info!("Backend recovered, revalidating session");
                        self.revalidate().await;
                    }
                }
            }
        }

        debug!("Session maintenance stopped");
    }
}
