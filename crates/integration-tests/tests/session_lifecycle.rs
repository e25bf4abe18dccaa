//! Session lifecycle against the mock backend over real HTTP.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::http::StatusCode;
use farm_connect_client::storage::keys;
use farm_connect_client::{
    AppEvent, ApiError, Credentials, FarmConnect, FileStorage, LogoutReason, Registration,
    SessionError, SessionStatus, Storage,
};
use farm_connect_integration_tests::{MockBackend, WRONG_PASSWORD};
use secrecy::ExposeSecret;

fn open(mock: &MockBackend, dir: &std::path::Path) -> (Arc<FileStorage>, FarmConnect) {
    let storage = Arc::new(FileStorage::open(dir).unwrap());
    let app = FarmConnect::connect(mock.config().unwrap(), Arc::clone(&storage) as Arc<dyn Storage>)
        .unwrap();
    (storage, app)
}

async fn signed_in(mock: &MockBackend, dir: &std::path::Path, remember: bool) {
    let (_, app) = open(mock, dir);
    let creds = Credentials::new("buyer@farm.com", "hunter22").unwrap();
    app.session().login(&creds, remember).await.unwrap();
}

// =============================================================================
// Login / Logout
// =============================================================================

#[tokio::test]
async fn test_login_persists_session_and_logout_clears_it() {
    let mock = MockBackend::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let (storage, app) = open(&mock, dir.path());

    let creds = Credentials::new("buyer@farm.com", "hunter22").unwrap();
    let user = app.session().login(&creds, true).await.unwrap();

    assert_eq!(user.email.as_str(), "buyer@farm.com");
    assert!(app.session().is_authenticated());
    assert_eq!(storage.get(keys::TOKEN).unwrap().as_deref(), Some("token-0"));
    assert_eq!(storage.get(keys::REMEMBER_ME).unwrap().as_deref(), Some("true"));
    assert!(storage.get(keys::TOKEN_TIMESTAMP).unwrap().is_some());

    app.session().logout();
    assert!(!app.session().is_authenticated());
    for key in keys::SESSION {
        assert_eq!(storage.get(key).unwrap(), None, "{key} should be cleared");
    }

    // Idempotent
    app.session().logout();
    assert_eq!(app.session().status(), SessionStatus::Unauthenticated);
}

#[tokio::test]
async fn test_wrong_password_is_reported_without_state_change() {
    let mock = MockBackend::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let (storage, app) = open(&mock, dir.path());

    let creds = Credentials::new("buyer@farm.com", WRONG_PASSWORD).unwrap();
    let err = app.session().login(&creds, false).await.unwrap_err();

    match err {
        SessionError::Api(ApiError::Unauthorized(message)) => {
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(app.session().status(), SessionStatus::Unauthenticated);
    assert_eq!(storage.get(keys::TOKEN).unwrap(), None);
}

#[tokio::test]
async fn test_register_signs_in_with_role() {
    let mock = MockBackend::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let (_, app) = open(&mock, dir.path());

    let form = Registration::new("Rosa", "rosa@orchard.farm", "secret1", "secret1", "farmer")
        .unwrap()
        .with_phone("555-0100");
    let user = app.session().register(&form, false).await.unwrap();

    assert_eq!(user.name, "Rosa");
    assert_eq!(user.role.to_string(), "farmer");
    assert_eq!(app.session().status(), SessionStatus::Authenticated);
}

// =============================================================================
// Restore and verification
// =============================================================================

#[tokio::test]
async fn test_restart_restores_and_verifies_session() {
    let mock = MockBackend::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    signed_in(&mock, dir.path(), true).await;

    let (_, app) = open(&mock, dir.path());
    assert_eq!(app.session().status(), SessionStatus::Unauthenticated);

    assert_eq!(app.session().initialize().await, SessionStatus::Authenticated);
    assert_eq!(mock.verify_calls(), 1);
    assert_eq!(app.session().token().unwrap().expose_secret(), "token-0");
}

#[tokio::test]
async fn test_network_failures_then_success_takes_n_plus_one_attempts() {
    let mock = MockBackend::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    signed_in(&mock, dir.path(), false).await;
    mock.queue_verify(&[StatusCode::SERVICE_UNAVAILABLE, StatusCode::BAD_GATEWAY]);

    let (_, app) = open(&mock, dir.path());
    assert_eq!(app.session().initialize().await, SessionStatus::Authenticated);
    assert_eq!(mock.verify_calls(), 3);
}

#[tokio::test]
async fn test_unauthorized_takes_one_attempt_and_logs_out() {
    let mock = MockBackend::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    signed_in(&mock, dir.path(), true).await;
    mock.set_verify_default(StatusCode::UNAUTHORIZED);

    let (storage, app) = open(&mock, dir.path());
    let mut events = app.events().subscribe();

    assert_eq!(app.session().initialize().await, SessionStatus::Rejected);
    assert_eq!(mock.verify_calls(), 1);
    assert!(!app.session().is_authenticated());
    assert_eq!(storage.get(keys::TOKEN).unwrap(), None);

    let mut login_required = false;
    while let Ok(event) = events.try_recv() {
        if let AppEvent::LoginRequired { reason } = event {
            assert_eq!(reason, LogoutReason::TokenRejected);
            login_required = true;
        }
    }
    assert!(login_required);
}

#[tokio::test]
async fn test_unreachable_backend_keeps_session_pending() {
    let mock = MockBackend::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    signed_in(&mock, dir.path(), false).await;
    mock.set_verify_default(StatusCode::SERVICE_UNAVAILABLE);

    let (storage, app) = open(&mock, dir.path());
    assert_eq!(
        app.session().initialize().await,
        SessionStatus::PendingVerification
    );
    assert_eq!(mock.verify_calls(), 3);
    assert!(app.session().is_authenticated());
    assert!(storage.get(keys::TOKEN).unwrap().is_some());
}

#[tokio::test]
async fn test_corrupt_user_record_is_discarded() {
    let mock = MockBackend::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    signed_in(&mock, dir.path(), false).await;

    let (storage, app) = open(&mock, dir.path());
    storage.set(keys::USER, "{\"name\": ").unwrap();

    assert_eq!(app.session().initialize().await, SessionStatus::Unauthenticated);
    assert_eq!(mock.verify_calls(), 0);
    assert_eq!(storage.get(keys::TOKEN).unwrap(), None);
}

// =============================================================================
// Profile
// =============================================================================

#[tokio::test]
async fn test_refresh_profile_updates_user() {
    let mock = MockBackend::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let (_, app) = open(&mock, dir.path());
    let creds = Credentials::new("buyer@farm.com", "hunter22").unwrap();
    app.session().login(&creds, false).await.unwrap();

    let user = app.session().refresh_profile().await.unwrap();
    assert_eq!(user.name, "Profile Name");
    assert_eq!(app.session().current_user().unwrap().name, "Profile Name");
}

#[tokio::test]
async fn test_refresh_profile_with_revoked_token_ends_session() {
    let mock = MockBackend::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let (_, app) = open(&mock, dir.path());
    let creds = Credentials::new("buyer@farm.com", "hunter22").unwrap();
    app.session().login(&creds, false).await.unwrap();
    mock.set_profile_default(StatusCode::UNAUTHORIZED);

    let err = app.session().refresh_profile().await.unwrap_err();
    assert!(matches!(err, SessionError::Api(ApiError::Unauthorized(_))));
    assert!(!app.session().is_authenticated());
}
