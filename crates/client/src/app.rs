//! Application container.
//!
//! [`FarmConnect`] owns every store and shares one [`EventBus`] between
//! them. Nothing runs in the background until [`FarmConnect::start`], and
//! everything it spawns is stopped through the returned [`Maintenance`].

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, AuthBackend};
use crate::cart::CartStore;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::events::EventBus;
use crate::health::HealthMonitor;
use crate::notifications::NotificationInbox;
use crate::session::{SessionState, SessionStore};
use crate::storage::Storage;
use crate::wishlist::WishlistStore;

/// Every client-side store, wired together.
pub struct FarmConnect<B = ApiClient> {
    config: ClientConfig,
    events: EventBus,
    session: SessionStore<B>,
    cart: CartStore,
    wishlist: WishlistStore,
    notifications: NotificationInbox,
    health: HealthMonitor<B>,
}

impl<B> std::fmt::Debug for FarmConnect<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FarmConnect")
            .field("api_url", &self.config.api_url.as_str())
            .field("session", &self.session)
            .field("cart", &self.cart)
            .field("health", &self.health)
            .finish_non_exhaustive()
    }
}

impl FarmConnect<ApiClient> {
    /// Build the container around the REST client.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the HTTP client cannot be built.
    pub fn connect(config: ClientConfig, storage: Arc<dyn Storage>) -> Result<Self> {
        let backend = Arc::new(ApiClient::new(&config)?);
        Ok(Self::new(config, storage, backend))
    }
}

impl<B: AuthBackend> FarmConnect<B> {
    /// Construct every store. Cart and wishlist load from `storage` here;
    /// the session is restored by [`SessionStore::initialize`].
    pub fn new(config: ClientConfig, storage: Arc<dyn Storage>, backend: Arc<B>) -> Self {
        let events = EventBus::default();
        let session = SessionStore::new(
            Arc::clone(&backend),
            Arc::clone(&storage),
            events.clone(),
            &config,
        );
        let cart = CartStore::load(Arc::clone(&storage), events.clone());
        let wishlist = WishlistStore::load(storage, events.clone());
        let notifications = NotificationInbox::new(events.clone());
        let health = HealthMonitor::new(backend, events.clone(), config.health);

        Self {
            config,
            events,
            session,
            cart,
            wishlist,
            notifications,
            health,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    #[must_use]
    pub const fn session(&self) -> &SessionStore<B> {
        &self.session
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    #[must_use]
    pub const fn wishlist(&self) -> &WishlistStore {
        &self.wishlist
    }

    #[must_use]
    pub const fn notifications(&self) -> &NotificationInbox {
        &self.notifications
    }

    #[must_use]
    pub const fn health(&self) -> &HealthMonitor<B> {
        &self.health
    }

    /// Spawn the health monitor, session maintenance and the inbox/session
    /// sync. Must be called from within a Tokio runtime.
    pub fn start(&self) -> Maintenance {
        let (shutdown, shutdown_rx) = watch::channel(false);

        let health_task = {
            let health = self.health.clone();
            let shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move { health.run(shutdown_rx).await })
        };

        let session_task = {
            let session = self.session.clone();
            let health_rx = self.health.subscribe();
            let shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move { session.run_maintenance(health_rx, shutdown_rx).await })
        };

        let inbox_task = tokio::spawn(sync_inbox(
            self.notifications.clone(),
            self.session.subscribe(),
            shutdown_rx,
        ));

        info!("Background maintenance started");
        Maintenance {
            shutdown,
            tasks: vec![health_task, session_task, inbox_task],
        }
    }
}

/// Keep the inbox joined to whoever is signed in.
async fn sync_inbox(
    inbox: NotificationInbox,
    mut session: watch::Receiver<SessionState>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let user = session
            .borrow_and_update()
            .session()
            .map(|s| s.user.id.clone());
        match user {
            Some(user_id) => inbox.join(user_id),
            None => inbox.leave(),
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            changed = session.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    debug!("Inbox sync stopped");
}

/// Handle to the background tasks spawned by [`FarmConnect::start`].
///
/// [`Maintenance::shutdown`] stops and joins them; dropping the handle
/// aborts them.
#[derive(Debug)]
pub struct Maintenance {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Maintenance {
    /// Signal every task to stop and wait for them.
    pub async fn shutdown(mut self) {
        // Tasks that already finished have dropped their receivers.
        let _ = self.shutdown.send(true);
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                warn!(error = %e, "Maintenance task ended abnormally");
            }
        }
        info!("Background maintenance stopped");
    }

    /// Number of tasks still running.
    #[must_use]
    pub fn running(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }
}

impl Drop for Maintenance {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
