use axum::response::Redirect;
use axum_extra::extract::cookie::CookieJar;

use crate::web::{
    AdminSession, AppState,
    auth::{LOGIN_PATH, resolve_session},
    session::GuardState,
};

/// Admin page guard: the session, or a redirect to the login page.
pub async fn require_admin(state: &AppState, jar: &CookieJar) -> Result<AdminSession, Redirect> {
    let guard = GuardState::Loading.resolve(resolve_session(state, jar).await);
    guard.session().ok_or_else(|| Redirect::to(LOGIN_PATH))
}
