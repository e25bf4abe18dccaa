//! `watch`: restore the session, start background maintenance and log every
//! app event until Ctrl-C.

use farm_connect_client::{AppEvent, FarmConnect, NoticeLevel};
use tokio::sync::broadcast::error::RecvError;

use super::CommandError;

pub async fn run(app: &FarmConnect) -> Result<(), CommandError> {
    let mut events = app.events().subscribe();

    let status = app.session().initialize().await;
    tracing::info!("Session: {status}");

    let maintenance = app.start();
    tracing::info!("Watching {} (Ctrl-C to stop)", app.config().api_url);

    let outcome = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => break signal,
            event = events.recv() => match event {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(n)) => tracing::warn!("Missed {n} events"),
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    maintenance.shutdown().await;
    outcome?;
    Ok(())
}

fn log_event(event: &AppEvent) {
    match event {
        AppEvent::ShowNotification(notice) => match notice.level {
            NoticeLevel::Error => tracing::error!("{}", notice.message),
            NoticeLevel::Warning => tracing::warn!("{}", notice.message),
            NoticeLevel::Info | NoticeLevel::Success => tracing::info!("{}", notice.message),
        },
        AppEvent::SessionChanged(status) => tracing::info!("Session: {status}"),
        AppEvent::LoginRequired { reason } => {
            tracing::warn!("Signed out ({reason}). Run `fc-cli login` to sign in again.");
        }
        AppEvent::CartUpdated(items) => tracing::info!("Cart now has {} line(s)", items.len()),
        AppEvent::WishlistUpdated(items) => {
            tracing::info!("Wishlist now has {} item(s)", items.len());
        }
        AppEvent::GlobalSearch(query) => tracing::info!("Search: {query}"),
        AppEvent::NotificationReceived(n) => tracing::info!("Notification: {}", n.message),
        AppEvent::NotificationRead { id, .. } => tracing::debug!("Notification {id} read"),
    }
}
