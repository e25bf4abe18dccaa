//! Backend health monitor.
//!
//! Probes `GET /health` on a fixed interval. After `failure_threshold`
//! consecutive failures the backend is reported `Down` with a warning
//! notice and the monitor switches to passive recovery pings; success
//! reports `Up` again, exhaustion reports `GaveUp` and ends the loop.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::api::AuthBackend;
use crate::config::HealthConfig;
use crate::events::{EventBus, NoticeLevel};

/// Observed backend availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendStatus {
    /// No probe has completed yet.
    #[default]
    Unknown,
    Up,
    /// Failure threshold reached; recovery pings in progress.
    Down,
    /// Recovery pings exhausted; the monitor has stopped.
    GaveUp,
}

impl BackendStatus {
    #[must_use]
    pub const fn is_outage(self) -> bool {
        matches!(self, Self::Down | Self::GaveUp)
    }
}

impl std::fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Unknown => "unknown",
            Self::Up => "up",
            Self::Down => "down",
            Self::GaveUp => "gave-up",
        };
        f.write_str(text)
    }
}

/// Periodic liveness checker.
pub struct HealthMonitor<B> {
    inner: Arc<HealthInner<B>>,
}

impl<B> Clone for HealthMonitor<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct HealthInner<B> {
    backend: Arc<B>,
    events: EventBus,
    config: HealthConfig,
    status: watch::Sender<BackendStatus>,
}

impl<B> std::fmt::Debug for HealthMonitor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("status", &*self.inner.status.borrow())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<B: AuthBackend> HealthMonitor<B> {
    pub fn new(backend: Arc<B>, events: EventBus, config: HealthConfig) -> Self {
        Self {
            inner: Arc::new(HealthInner {
                backend,
                events,
                config,
                status: watch::Sender::new(BackendStatus::Unknown),
            }),
        }
    }

    /// Receiver notified on every status change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BackendStatus> {
        self.inner.status.subscribe()
    }

    #[must_use]
    pub fn status(&self) -> BackendStatus {
        *self.inner.status.borrow()
    }

    /// Probe once. Returns whether the backend answered.
    pub async fn probe(&self) -> bool {
        match self.inner.backend.health().await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Health probe failed");
                false
            }
        }
    }

    /// Poll until `shutdown` flips or recovery is abandoned.
    #[instrument(skip_all)]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let config = self.inner.config;
        let mut ticker = tokio::time::interval(config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0_u32;

        info!(interval = ?config.interval, "Health monitor started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }

            if self.probe().await {
                failures = 0;
                self.set_status(BackendStatus::Up);
                continue;
            }

            failures += 1;
            debug!(failures, threshold = config.failure_threshold, "Backend unreachable");
            if failures < config.failure_threshold.max(1) {
                continue;
            }

            warn!(failures, "Backend down, starting recovery");
            self.set_status(BackendStatus::Down);
            self.inner.events.notify(
                NoticeLevel::Warning,
                "Connection to the server was lost. Trying to reconnect...",
            );

            match self.recover(&mut shutdown).await {
                Some(true) => {
                    failures = 0;
                    ticker.reset();
                }
                Some(false) => {
                    self.give_up();
                    return;
                }
                None => break,
            }
        }
        debug!("Health monitor stopped");
    }

    /// Passive recovery pings. `Some(recovered)`, or `None` on shutdown.
    async fn recover(&self, shutdown: &mut watch::Receiver<bool>) -> Option<bool> {
        let config = self.inner.config;
        for attempt in 1..=config.recovery_attempts {
            tokio::select! {
                _ = shutdown.changed() => return None,
                () = tokio::time::sleep(config.recovery_interval) => {}
            }
            if self.probe().await {
                info!(attempt, "Backend reachable again");
                self.set_status(BackendStatus::Up);
                self.inner
                    .events
                    .notify(NoticeLevel::Success, "Reconnected to the server.");
                return Some(true);
            }
            debug!(attempt, attempts = config.recovery_attempts, "Recovery ping failed");
        }
        Some(false)
    }

    fn give_up(&self) {
        warn!("Backend still unreachable, giving up");
        self.set_status(BackendStatus::GaveUp);
        self.inner.events.notify(
            NoticeLevel::Error,
            "The server is still unreachable. Please check your connection and restart the app.",
        );
    }

    fn set_status(&self, status: BackendStatus) {
        self.inner.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            debug!(from = %current, to = %status, "Backend status changed");
            *current = status;
            true
        });
    }
}
