//! Admin session guard and auth-state events.
//!
//! A request's session is resolved once from the cookie into an
//! [`AdminSession`]. Sign-in and sign-out are published on an in-process
//! broadcast channel; long-lived admin pages hold an [`AuthSubscription`] and
//! feed those events through [`GuardState`].

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};

use crate::remote::{Access, AuthUser};

const EVENT_CAPACITY: usize = 64;
/// Longest access-token lifetime the auth provider issues (one week).
/// A revoked token older than this has expired at the provider anyway.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// A signed-in admin, passed explicitly to every admin handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub token: String,
    pub user: AuthUser,
}

impl AdminSession {
    pub fn access(&self) -> Access<'_> {
        Access::User(&self.token)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn email(&self) -> &str {
        self.user.email.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(AdminSession),
    SignedOut { token: String },
}

/// Session guard state for one admin view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Loading,
    Authenticated(AdminSession),
    Unauthenticated,
}

impl GuardState {
    /// Applies the result of the initial cookie lookup.
    pub fn resolve(self, session: Option<AdminSession>) -> Self {
        match (self, session) {
            (GuardState::Loading, Some(session)) => GuardState::Authenticated(session),
            (GuardState::Loading, None) => GuardState::Unauthenticated,
            (state, _) => state,
        }
    }

    /// Applies a later auth-state change. Events for other sessions are ignored.
    pub fn on_event(self, event: &AuthEvent) -> Self {
        match (self, event) {
            (GuardState::Authenticated(current), AuthEvent::SignedOut { token })
                if &current.token == token =>
            {
                GuardState::Unauthenticated
            }
            (GuardState::Loading | GuardState::Unauthenticated, AuthEvent::SignedIn(session)) => {
                GuardState::Authenticated(session.clone())
            }
            (state, _) => state,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, GuardState::Authenticated(_))
    }

    pub fn session(self) -> Option<AdminSession> {
        match self {
            GuardState::Authenticated(session) => Some(session),
            _ => None,
        }
    }
}

/// Auth-event channel plus the set of tokens that were signed out here.
#[derive(Clone)]
pub struct SessionRegistry {
    events: broadcast::Sender<AuthEvent>,
    revoked: Arc<RwLock<HashMap<String, Instant>>>,
    retention: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_retention(MAX_TOKEN_LIFETIME)
    }

    fn with_retention(retention: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            events,
            revoked: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            receiver: self.events.subscribe(),
        }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn signed_in(&self, session: AdminSession) {
        self.publish(AuthEvent::SignedIn(session));
    }

    /// Remembers the token as revoked and tells open admin views.
    /// Revocations older than the retention window are forgotten here.
    pub async fn signed_out(&self, token: &str) {
        let now = Instant::now();
        {
            let mut revoked = self.revoked.write().await;
            revoked.retain(|_, revoked_at| now.duration_since(*revoked_at) < self.retention);
            revoked.insert(token.to_string(), now);
        }
        self.publish(AuthEvent::SignedOut {
            token: token.to_string(),
        });
    }

    pub async fn is_revoked(&self, token: &str) -> bool {
        self.revoked.read().await.contains_key(token)
    }

    #[cfg(test)]
    async fn revoked_count(&self) -> usize {
        self.revoked.read().await.len()
    }

    fn publish(&self, event: AuthEvent) {
        // No receivers is fine: nobody has an admin page open.
        if self.events.send(event).is_err() {
            debug!("auth event published without subscribers");
        }
    }
}

/// Live subscription to auth-state changes. Dropping it unsubscribes.
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthEvent>,
}

impl AuthSubscription {
    /// Next event, skipping any this subscriber lagged behind on.
    /// `None` once the registry is gone.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "auth subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        debug!("auth subscription released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(token: &str) -> AdminSession {
        AdminSession {
            token: token.to_string(),
            user: AuthUser {
                id: "user-1".into(),
                email: Some("admin@example.com".into()),
            },
        }
    }

    #[test]
    fn loading_resolves_to_one_of_two_states() {
        assert_eq!(
            GuardState::Loading.resolve(Some(session("t"))),
            GuardState::Authenticated(session("t"))
        );
        assert_eq!(GuardState::Loading.resolve(None), GuardState::Unauthenticated);
    }

    #[test]
    fn sign_out_of_this_session_unauthenticates() {
        let state = GuardState::Authenticated(session("t"));
        let other = AuthEvent::SignedOut {
            token: "someone-else".into(),
        };
        let state = state.on_event(&other);
        assert!(state.is_authenticated());

        let mine = AuthEvent::SignedOut { token: "t".into() };
        assert_eq!(state.on_event(&mine), GuardState::Unauthenticated);
    }

    #[test]
    fn sign_in_event_authenticates() {
        let state = GuardState::Unauthenticated.on_event(&AuthEvent::SignedIn(session("n")));
        assert_eq!(state.session(), Some(session("n")));
    }

    #[tokio::test]
    async fn subscribers_receive_sign_out_and_token_is_revoked() {
        let registry = SessionRegistry::new();
        let mut subscription = registry.subscribe();
        registry.signed_out("t").await;

        assert_eq!(
            subscription.recv().await,
            Some(AuthEvent::SignedOut { token: "t".into() })
        );
        assert!(registry.is_revoked("t").await);
        assert!(!registry.is_revoked("other").await);
    }

    #[tokio::test]
    async fn stale_revocations_are_pruned() {
        let registry = SessionRegistry::new();
        for index in 0..100 {
            registry.signed_out(&format!("t{index}")).await;
        }
        assert_eq!(registry.revoked_count().await, 100);

        let registry = SessionRegistry::with_retention(Duration::ZERO);
        for index in 0..10_000 {
            registry.signed_out(&format!("t{index}")).await;
        }
        assert_eq!(registry.revoked_count().await, 1);
        assert!(registry.is_revoked("t9999").await);
        assert!(!registry.is_revoked("t0").await);
    }

    #[tokio::test]
    async fn dropping_subscription_unsubscribes() {
        let registry = SessionRegistry::new();
        let first = registry.subscribe();
        let second = registry.subscribe();
        assert_eq!(registry.subscriber_count(), 2);
        drop(first);
        assert_eq!(registry.subscriber_count(), 1);
        drop(second);
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_missed_events() {
        let registry = SessionRegistry::new();
        let mut subscription = registry.subscribe();
        for index in 0..(EVENT_CAPACITY + 5) {
            registry.signed_in(session(&format!("t{index}")));
        }
        registry.signed_out("last").await;

        let first = subscription.recv().await;
        assert_ne!(first, Some(AuthEvent::SignedIn(session("t0"))));
        loop {
            match subscription.recv().await {
                Some(AuthEvent::SignedOut { token }) => {
                    assert_eq!(token, "last");
                    break;
                }
                Some(AuthEvent::SignedIn(_)) => continue,
                None => panic!("registry closed before sign-out arrived"),
            }
        }
    }
}
