//! Token-age policy.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::Session;
use crate::config::TokenPolicyConfig;

/// What the periodic token check should do with the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAction {
    /// Nothing to do.
    Keep,
    /// Non-remember-me session past its lifetime: log out.
    Expire,
    /// Token not verified recently: verify it again.
    Revalidate,
}

/// Age limits applied to a live session.
#[derive(Debug, Clone, Copy)]
pub struct TokenPolicy {
    pub session_max_age: Duration,
    pub refresh_after: Duration,
}

impl From<&TokenPolicyConfig> for TokenPolicy {
    fn from(config: &TokenPolicyConfig) -> Self {
        Self {
            session_max_age: config.session_max_age,
            refresh_after: config.refresh_after,
        }
    }
}

impl TokenPolicy {
    /// Decide what to do with `session`, last verified at `last_verified`.
    ///
    /// Expiry wins over revalidation; remember-me sessions never expire here.
    #[must_use]
    pub fn evaluate(
        &self,
        session: &Session,
        last_verified: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> TokenAction {
        if !session.remember_me && session.age(now) > self.session_max_age {
            return TokenAction::Expire;
        }
        let since_verified = (now - last_verified).to_std().unwrap_or(Duration::ZERO);
        if since_verified > self.refresh_after {
            TokenAction::Revalidate
        } else {
            TokenAction::Keep
        }
    }
}
