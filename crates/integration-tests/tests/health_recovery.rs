//! Health monitor and session maintenance running together.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use farm_connect_client::{
    AppEvent, BackendStatus, Credentials, FarmConnect, MemoryStorage, NoticeLevel, SessionStatus,
};
use farm_connect_integration_tests::{MockBackend, eventually};

const WAIT: Duration = Duration::from_secs(3);

async fn signed_in_app(mock: &MockBackend) -> FarmConnect {
    let app = FarmConnect::connect(mock.config().unwrap(), Arc::new(MemoryStorage::new())).unwrap();
    let creds = Credentials::new("buyer@farm.com", "hunter22").unwrap();
    app.session().login(&creds, true).await.unwrap();
    app
}

#[tokio::test]
async fn test_recovery_revalidates_session() {
    let mock = MockBackend::start().await.unwrap();
    // Two failed probes declare the outage, one failed recovery ping, then back up.
    mock.queue_health(&[
        StatusCode::SERVICE_UNAVAILABLE,
        StatusCode::SERVICE_UNAVAILABLE,
        StatusCode::SERVICE_UNAVAILABLE,
    ]);
    let app = signed_in_app(&mock).await;
    let mut events = app.events().subscribe();

    let maintenance = app.start();
    assert!(eventually(WAIT, || mock.verify_calls() >= 1).await);
    assert_eq!(app.health().status(), BackendStatus::Up);
    assert_eq!(app.session().status(), SessionStatus::Authenticated);
    maintenance.shutdown().await;

    let mut notices = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let AppEvent::ShowNotification(notice) = event {
            notices.push(notice.level);
        }
    }
    assert_eq!(notices, vec![NoticeLevel::Warning, NoticeLevel::Success]);
}

#[tokio::test]
async fn test_recovery_with_revoked_token_logs_out() {
    let mock = MockBackend::start().await.unwrap();
    mock.queue_health(&[StatusCode::SERVICE_UNAVAILABLE, StatusCode::SERVICE_UNAVAILABLE]);
    mock.set_verify_default(StatusCode::UNAUTHORIZED);
    let app = signed_in_app(&mock).await;

    let maintenance = app.start();
    assert!(eventually(WAIT, || !app.session().is_authenticated()).await);
    assert_eq!(mock.verify_calls(), 1);
    maintenance.shutdown().await;
}

#[tokio::test]
async fn test_monitor_gives_up_and_stops_probing() {
    let mock = MockBackend::start().await.unwrap();
    mock.set_health_default(StatusCode::SERVICE_UNAVAILABLE);
    let app = signed_in_app(&mock).await;

    let maintenance = app.start();
    assert!(eventually(WAIT, || app.health().status() == BackendStatus::GaveUp).await);

    // failure threshold + recovery attempts, then nothing more
    let calls = mock.health_calls();
    assert_eq!(calls, 2 + 3);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(mock.health_calls(), calls);

    // The session is not touched by an outage alone.
    assert!(app.session().is_authenticated());
    maintenance.shutdown().await;
}

#[tokio::test]
async fn test_dropping_maintenance_aborts_tasks() {
    let mock = MockBackend::start().await.unwrap();
    let app = signed_in_app(&mock).await;

    let maintenance = app.start();
    assert!(eventually(WAIT, || mock.health_calls() >= 2).await);
    drop(maintenance);

    tokio::time::sleep(Duration::from_millis(30)).await;
    let calls = mock.health_calls();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(mock.health_calls(), calls);
}
