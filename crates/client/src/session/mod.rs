//! Session store.
//!
//! # Lifecycle
//!
//! - [`SessionStore::initialize`] restores a stored token optimistically
//!   (`PendingVerification` counts as signed in) and verifies it with
//!   retry-and-backoff. A 401 ends the session at once; network trouble keeps
//!   it until the backend can answer.
//! - [`SessionStore::login`] / [`SessionStore::register`] persist a fresh
//!   session.
//! - [`SessionStore::logout`] and every forced logout clear the session keys
//!   and are idempotent.
//! - The maintenance loop ([`SessionStore::run_maintenance`]) applies the
//!   token-age policy and revalidates after a backend outage.
//!
//! State lives in a `tokio::sync::watch` channel so observers can react to
//! transitions; transitions that touch storage run inside the channel's
//! write lock so they never interleave.

mod maintenance;
mod persist;
mod policy;
mod state;

pub use policy::{TokenAction, TokenPolicy};
pub use state::{LogoutReason, Session, SessionState, SessionStatus};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use farm_connect_core::User;
use parking_lot::Mutex;
use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiError, AuthBackend, AuthResponse};
use crate::config::{ClientConfig, VerificationConfig};
use crate::events::{AppEvent, EventBus};
use crate::forms::{Credentials, Registration};
use crate::storage::Storage;

/// Errors returned by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("not signed in")]
    NotAuthenticated,
}

/// Result of verifying a token with retries.
#[derive(Debug)]
enum Verification {
    /// The backend accepted the token, possibly returning a fresher user record.
    Confirmed(Option<User>),
    /// The backend rejected the token.
    Rejected,
    /// Every attempt failed for non-auth reasons.
    Unreachable,
}

/// Reactive store for the authenticated identity.
pub struct SessionStore<B> {
    inner: Arc<SessionInner<B>>,
}

impl<B> Clone for SessionStore<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SessionInner<B> {
    backend: Arc<B>,
    storage: Arc<dyn Storage>,
    events: EventBus,
    verification: VerificationConfig,
    policy: TokenPolicy,
    check_interval: Duration,
    state: watch::Sender<SessionState>,
    last_verified: Mutex<Option<DateTime<Utc>>>,
}

impl<B> std::fmt::Debug for SessionStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("status", &self.inner.state.borrow().status())
            .field("last_verified", &*self.inner.last_verified.lock())
            .finish_non_exhaustive()
    }
}

impl<B: AuthBackend> SessionStore<B> {
    /// Create a store in the `Unauthenticated` state. Call [`Self::initialize`]
    /// to restore a persisted session.
    pub fn new(
        backend: Arc<B>,
        storage: Arc<dyn Storage>,
        events: EventBus,
        config: &ClientConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                backend,
                storage,
                events,
                verification: config.verification,
                policy: TokenPolicy::from(&config.token_policy),
                check_interval: config.token_policy.check_interval,
                state: watch::Sender::new(SessionState::Unauthenticated),
                last_verified: Mutex::new(None),
            }),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Receiver notified on every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().status()
    }

    /// True while a session is live, including one pending verification.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.inner.state.borrow().session().map(|s| s.user.clone())
    }

    /// Bearer token of the live session.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.inner.state.borrow().session().map(|s| s.token.clone())
    }

    /// When the backend last confirmed the token.
    #[must_use]
    pub fn last_verified(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_verified.lock()
    }

    fn current_session(&self) -> Option<Session> {
        self.inner.state.borrow().session().cloned()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Restore the persisted session and verify its token.
    ///
    /// Does nothing when a session is already live.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> SessionStatus {
        if self.is_authenticated() {
            debug!("Session already live, skipping restore");
            return self.status();
        }

        let session = match persist::load(self.inner.storage.as_ref()) {
            Ok(Some(session)) => session,
            Ok(None) => {
                debug!("No stored session");
                return self.status();
            }
            Err(e) => {
                warn!(error = %e, "Stored session is unreadable, clearing it");
                if let Err(e) = persist::clear(self.inner.storage.as_ref()) {
                    warn!(error = %e, "Failed to clear unreadable session");
                }
                return self.status();
            }
        };

        info!(user_id = %session.user.id, "Restored stored session, verifying token");
        let token = session.token.clone();
        self.inner
            .state
            .send_replace(SessionState::PendingVerification(session));
        self.inner
            .events
            .publish(AppEvent::SessionChanged(SessionStatus::PendingVerification));

        self.verify_session(&token, LogoutReason::TokenRejected).await
    }

    /// Sign in with validated credentials.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Api` if the backend refuses or cannot be reached.
    /// Session state is unchanged on error.
    #[instrument(skip(self, credentials), fields(email = %credentials.email()))]
    pub async fn login(
        &self,
        credentials: &Credentials,
        remember_me: bool,
    ) -> Result<User, SessionError> {
        let response = self.inner.backend.login(credentials).await?;
        Ok(self.establish(response, remember_me))
    }

    /// Create an account and sign in to it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Api` if the backend refuses or cannot be reached.
    #[instrument(skip(self, registration), fields(email = %registration.email(), role = %registration.role()))]
    pub async fn register(
        &self,
        registration: &Registration,
        remember_me: bool,
    ) -> Result<User, SessionError> {
        let response = self.inner.backend.register(registration).await?;
        Ok(self.establish(response, remember_me))
    }

    /// Sign out. Clears every session key; calling it again is a no-op.
    pub fn logout(&self) {
        self.end_session(LogoutReason::UserRequested, None);
    }

    /// Verify the live token again (after a backend outage).
    #[instrument(skip(self))]
    pub async fn revalidate(&self) -> SessionStatus {
        match self.current_session() {
            Some(session) => {
                self.verify_session(&session.token, LogoutReason::TokenRejected)
                    .await
            }
            None => self.status(),
        }
    }

    /// Fetch the profile and update the stored user.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAuthenticated` without a live session, or
    /// `SessionError::Api` if the request fails. A rejected token also ends
    /// the session.
    #[instrument(skip(self))]
    pub async fn refresh_profile(&self) -> Result<User, SessionError> {
        let session = self
            .current_session()
            .ok_or(SessionError::NotAuthenticated)?;

        match self.inner.backend.profile(&session.token).await {
            Ok(user) => {
                let updated = user.clone();
                // A profile answered for this token also confirms the token.
                let previous = self.update_if_current(&session.token, |current, storage| {
                    if let Err(e) = persist::save_user(storage, &updated) {
                        warn!(error = %e, "Failed to persist refreshed profile");
                    }
                    let mut next = current.clone();
                    next.user = updated;
                    SessionState::Authenticated(next)
                });
                if let Some(previous) = previous {
                    *self.inner.last_verified.lock() = Some(Utc::now());
                    if previous != SessionStatus::Authenticated {
                        self.inner
                            .events
                            .publish(AppEvent::SessionChanged(SessionStatus::Authenticated));
                    }
                }
                debug!(user_id = %user.id, "Profile refreshed");
                Ok(user)
            }
            Err(e) => {
                if e.is_auth_rejection() {
                    self.end_session(LogoutReason::TokenRejected, Some(&session.token));
                }
                Err(e.into())
            }
        }
    }

    /// Apply the token-age policy at `now`.
    pub async fn enforce_token_policy(&self, now: DateTime<Utc>) -> TokenAction {
        let Some(session) = self.current_session() else {
            return TokenAction::Keep;
        };
        let last_verified = self.last_verified().unwrap_or(session.issued_at);

        let action = self.inner.policy.evaluate(&session, last_verified, now);
        match action {
            TokenAction::Keep => {}
            TokenAction::Expire => {
                info!(user_id = %session.user.id, "Session expired");
                self.end_session(LogoutReason::SessionExpired, Some(&session.token));
            }
            TokenAction::Revalidate => {
                debug!(user_id = %session.user.id, "Token due for revalidation");
                self.verify_session(&session.token, LogoutReason::RevalidationFailed)
                    .await;
            }
        }
        action
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    fn establish(&self, response: AuthResponse, remember_me: bool) -> User {
        let now = Utc::now();
        let session = Session {
            token: response.token,
            user: response.user,
            issued_at: now,
            remember_me,
        };
        let user = session.user.clone();

        let storage = self.inner.storage.as_ref();
        self.inner.state.send_modify(|state| {
            if let Err(e) = persist::save(storage, &session) {
                warn!(error = %e, "Failed to persist session, it will not survive a restart");
            }
            *state = SessionState::Authenticated(session);
        });
        *self.inner.last_verified.lock() = Some(now);

        info!(user_id = %user.id, role = %user.role, remember_me, "Signed in");
        self.inner
            .events
            .publish(AppEvent::SessionChanged(SessionStatus::Authenticated));
        user
    }

    /// Verify `token` and apply the outcome if it is still the live token.
    async fn verify_session(&self, token: &SecretString, on_reject: LogoutReason) -> SessionStatus {
        match self.verify_with_retry(token).await {
            Verification::Confirmed(user) => {
                let confirmed = self.update_if_current(token, |current, storage| {
                    let mut next = current.clone();
                    if let Some(user) = user {
                        if let Err(e) = persist::save_user(storage, &user) {
                            warn!(error = %e, "Failed to persist verified user");
                        }
                        next.user = user;
                    }
                    SessionState::Authenticated(next)
                });
                if let Some(previous) = confirmed {
                    *self.inner.last_verified.lock() = Some(Utc::now());
                    if previous != SessionStatus::Authenticated {
                        info!("Session verified");
                        self.inner
                            .events
                            .publish(AppEvent::SessionChanged(SessionStatus::Authenticated));
                    }
                }
            }
            Verification::Rejected => {
                self.end_session(on_reject, Some(token));
            }
            Verification::Unreachable if self.inner.verification.strict => {
                self.end_session(LogoutReason::VerificationUnavailable, Some(token));
            }
            Verification::Unreachable => {
                warn!("Token could not be verified, keeping the session for now");
            }
        }
        self.status()
    }

    /// Verify with retry and linear backoff (`base_delay * attempt`).
    ///
    /// An auth rejection is final and is never retried. Other errors that a
    /// retry cannot fix (a 4xx, a malformed body) stop the attempts early and
    /// count as unreachable.
    async fn verify_with_retry(&self, token: &SecretString) -> Verification {
        let VerificationConfig {
            attempts,
            base_delay,
            ..
        } = self.inner.verification;
        let attempts = attempts.max(1);

        for attempt in 1..=attempts {
            match self.inner.backend.verify(token).await {
                Ok(user) => {
                    debug!(attempt, "Token verified");
                    return Verification::Confirmed(user);
                }
                Err(e) if e.is_auth_rejection() => {
                    info!(attempt, error = %e, "Token rejected by backend");
                    return Verification::Rejected;
                }
                Err(e) if !e.is_transient() => {
                    warn!(attempt, error = %e, "Token verification failed, not retrying");
                    return Verification::Unreachable;
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "Token verification failed");
                    if attempt < attempts {
                        tokio::time::sleep(base_delay * attempt).await;
                    }
                }
            }
        }
        Verification::Unreachable
    }

    /// Replace the live session with `f(session)` if it still carries `token`.
    ///
    /// Returns the previous status when the state was replaced.
    fn update_if_current(
        &self,
        token: &SecretString,
        f: impl FnOnce(&Session, &dyn Storage) -> SessionState,
    ) -> Option<SessionStatus> {
        let storage = self.inner.storage.as_ref();
        let mut previous = None;
        self.inner.state.send_if_modified(|state| {
            let next = match state.session() {
                Some(current) if current.same_token(token) => f(current, storage),
                _ => return false,
            };
            previous = Some(state.status());
            *state = next;
            true
        });
        previous
    }

    /// End the session, clearing every session key.
    ///
    /// With `expected`, only a session still carrying that token is ended, so a
    /// late verification result never logs out a newer login. Returns whether
    /// anything changed.
    fn end_session(&self, reason: LogoutReason, expected: Option<&SecretString>) -> bool {
        let storage = self.inner.storage.as_ref();
        let mut ended = None;

        self.inner.state.send_if_modified(|state| {
            if let Some(token) = expected
                && !state.session().is_some_and(|s| s.same_token(token))
            {
                return false;
            }

            let _ = persist::clear(storage);

            let next = match reason {
                LogoutReason::TokenRejected => SessionState::Rejected { reason },
                _ => SessionState::Unauthenticated,
            };
            let was_live = state.is_authenticated();
            let changed = was_live || state.status() != next.status();
            *state = next;
            if changed {
                ended = Some(was_live);
            }
            changed
        });

        let Some(was_live) = ended else {
            debug!(%reason, "No session to end");
            return false;
        };

        *self.inner.last_verified.lock() = None;
        let status = self.status();
        info!(%reason, %status, "Session ended");
        self.inner.events.publish(AppEvent::SessionChanged(status));
        if was_live && reason != LogoutReason::UserRequested {
            self.inner.events.publish(AppEvent::LoginRequired { reason });
        }
        true
    }
}
