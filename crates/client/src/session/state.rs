//! Session record and the session state machine.

use std::time::Duration;

use chrono::{DateTime, Utc};
use farm_connect_core::User;
use secrecy::{ExposeSecret, SecretString};

/// The client-held record of an authenticated identity and its bearer token.
#[derive(Debug, Clone)]
pub struct Session {
    /// Bearer token.
    pub token: SecretString,
    /// Authenticated user.
    pub user: User,
    /// When the token was issued to this client.
    pub issued_at: DateTime<Utc>,
    /// Whether the user asked to stay signed in.
    pub remember_me: bool,
}

impl Session {
    /// Time elapsed since the token was issued (zero if the clock went backwards).
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.issued_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether both sessions carry the same token.
    #[must_use]
    pub fn same_token(&self, other: &SecretString) -> bool {
        self.token.expose_secret() == other.expose_secret()
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user logged out.
    UserRequested,
    /// The backend rejected the token (401 or invalid).
    TokenRejected,
    /// A non-remember-me session outlived its lifetime.
    SessionExpired,
    /// An age-triggered revalidation failed.
    RevalidationFailed,
    /// Strict mode: the token could never be verified.
    VerificationUnavailable,
}

impl std::fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::UserRequested => "logged out",
            Self::TokenRejected => "session is no longer valid",
            Self::SessionExpired => "session expired",
            Self::RevalidationFailed => "session could not be revalidated",
            Self::VerificationUnavailable => "session could not be verified",
        };
        f.write_str(text)
    }
}

/// Session lifecycle states.
///
/// ```text
/// Unauthenticated ──initialize (stored token)──▶ PendingVerification
/// PendingVerification ──verified──▶ Authenticated
/// PendingVerification ──401/invalid──▶ Rejected
/// any ──login/register──▶ Authenticated
/// any ──logout/expiry──▶ Unauthenticated
/// ```
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// No session.
    #[default]
    Unauthenticated,
    /// Restored from storage and treated as signed in while the token is checked.
    PendingVerification(Session),
    /// Token confirmed by the backend (or freshly issued).
    Authenticated(Session),
    /// The backend rejected the restored token; storage has been cleared.
    Rejected { reason: LogoutReason },
}

/// Secret-free view of [`SessionState`] for events and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    PendingVerification,
    Authenticated,
    Rejected,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::PendingVerification => "pending-verification",
            Self::Authenticated => "authenticated",
            Self::Rejected => "rejected",
        };
        f.write_str(text)
    }
}

impl SessionState {
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        match self {
            Self::Unauthenticated => SessionStatus::Unauthenticated,
            Self::PendingVerification(_) => SessionStatus::PendingVerification,
            Self::Authenticated(_) => SessionStatus::Authenticated,
            Self::Rejected { .. } => SessionStatus::Rejected,
        }
    }

    /// The live session, if any.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        match self {
            Self::PendingVerification(session) | Self::Authenticated(session) => Some(session),
            Self::Unauthenticated | Self::Rejected { .. } => None,
        }
    }

    /// Optimistic check: a pending session counts as signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;
    use farm_connect_core::{Email, UserRole};

    use super::*;

    fn sample_session(issued_at: DateTime<Utc>, remember_me: bool) -> Session {
        Session {
            token: SecretString::from("tok-123"),
            user: User {
                id: "u1".into(),
                name: "Mara".to_string(),
                email: Email::parse("mara@farm.com").unwrap(),
                role: UserRole::Buyer,
            },
            issued_at,
            remember_me,
        }
    }

    #[test]
    fn test_pending_counts_as_authenticated() {
        let session = sample_session(Utc::now(), false);
        assert!(SessionState::PendingVerification(session.clone()).is_authenticated());
        assert!(SessionState::Authenticated(session).is_authenticated());
        assert!(!SessionState::Unauthenticated.is_authenticated());
        assert!(
            !SessionState::Rejected {
                reason: LogoutReason::TokenRejected
            }
            .is_authenticated()
        );
    }

    #[test]
    fn test_age_never_negative() {
        let now = Utc::now();
        let future = sample_session(now + TimeDelta::hours(1), false);
        assert_eq!(future.age(now), Duration::ZERO);

        let past = sample_session(now - TimeDelta::minutes(90), false);
        assert_eq!(past.age(now), Duration::from_secs(90 * 60));
    }

    #[test]
    fn test_debug_hides_token() {
        let state = SessionState::Authenticated(sample_session(Utc::now(), true));
        assert!(!format!("{state:?}").contains("tok-123"));
        assert_eq!(state.status().to_string(), "authenticated");
    }
}
