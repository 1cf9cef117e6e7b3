use std::convert::Infallible;

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use axum_extra::extract::cookie::CookieJar;
use futures::stream::{self, Stream};
use tracing::debug;

use crate::web::{
    AppState,
    auth::LOGIN_PATH,
    session::{AuthSubscription, GuardState},
};

use super::auth::require_admin;

/// Server-sent events for an open admin page.
///
/// Emits a single `signed_out` event (data: the login path) once the page's
/// session is signed out, then ends the stream.
pub async fn session_events(State(state): State<AppState>, jar: CookieJar) -> Response {
    let session = match require_admin(&state, &jar).await {
        Ok(session) => session,
        Err(_) => return StatusCode::UNAUTHORIZED.into_response(),
    };

    debug!(user_id = %session.user.id, "admin page subscribed to auth events");
    let subscription = state.sessions().subscribe();
    let guard = GuardState::Authenticated(session);

    Sse::new(sign_out_stream(subscription, guard))
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn sign_out_stream(
    subscription: AuthSubscription,
    guard: GuardState,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(Some((subscription, guard)), |pending| async move {
        let (mut subscription, mut guard) = pending?;
        while let Some(event) = subscription.recv().await {
            guard = guard.on_event(&event);
            if !guard.is_authenticated() {
                let signed_out = Event::default().event("signed_out").data(LOGIN_PATH);
                return Some((Ok(signed_out), None));
            }
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::{
        remote::AuthUser,
        web::session::{AdminSession, SessionRegistry},
    };

    fn session(token: &str) -> AdminSession {
        AdminSession {
            token: token.into(),
            user: AuthUser {
                id: "admin".into(),
                email: Some("admin@example.com".into()),
            },
        }
    }

    #[tokio::test]
    async fn stream_ends_after_own_sign_out() {
        let registry = SessionRegistry::new();
        let stream = sign_out_stream(
            registry.subscribe(),
            GuardState::Authenticated(session("mine")),
        );
        futures::pin_mut!(stream);

        registry.signed_in(session("other"));
        registry.signed_out("someone-else").await;
        registry.signed_out("mine").await;

        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_none());
        assert_eq!(registry.subscriber_count(), 0);
    }
}
