use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cookie::time::Duration as CookieDuration;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::web::{AdminSession, AppState, render_login_page};

pub const SESSION_COOKIE: &str = "apex_session";
pub const LOGIN_PATH: &str = "/admin/login";
pub const DASHBOARD_PATH: &str = "/admin/dashboard";
/// Cookie lifetime when the provider does not say how long the token lives.
const DEFAULT_SESSION_TTL_SECS: i64 = 3600;

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Html<String>, Redirect> {
    if let Some(redirect) = redirect_if_authenticated(&state, &jar).await {
        return Err(redirect);
    }

    Ok(Html(render_login_page(None, "")))
}

pub async fn process_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect), (StatusCode, Html<String>)> {
    let email = form.email.trim();
    if email.is_empty() || form.password.is_empty() {
        return Err(invalid_credentials(email));
    }

    let session = match state
        .backend()
        .sign_in_with_password(email, &form.password)
        .await
    {
        Ok(session) => session,
        Err(err) if matches!(err.status(), 400 | 401 | 403 | 422) => {
            warn!(%err, "admin sign-in rejected");
            return Err(invalid_credentials(email));
        }
        Err(err) => {
            error!(?err, "failed to sign in admin");
            return Err(server_error(email));
        }
    };

    let ttl = session
        .expires_in
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_SESSION_TTL_SECS);
    let mut cookie = Cookie::new(SESSION_COOKIE, session.access_token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(CookieDuration::seconds(ttl));

    info!(user_id = %session.user.id, "admin signed in");
    state.sessions().signed_in(AdminSession {
        token: session.access_token,
        user: session.user,
    });

    Ok((jar.add(cookie), Redirect::to(DASHBOARD_PATH)))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let mut jar = jar;

    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let token = cookie.value().to_string();
        if let Err(err) = state.backend().sign_out(&token).await {
            error!(?err, "failed to sign out at the provider");
        }
        state.sessions().signed_out(&token).await;
        info!("admin signed out");
    }

    let mut removal = Cookie::new(SESSION_COOKIE, "");
    removal.set_path("/");
    removal.set_http_only(true);
    removal.set_same_site(SameSite::Lax);
    removal.set_max_age(CookieDuration::seconds(0));
    jar = jar.remove(removal);

    (jar, Redirect::to(LOGIN_PATH))
}

/// Cookie → provider lookup. `None` for a missing, revoked or unknown token.
pub async fn resolve_session(state: &AppState, jar: &CookieJar) -> Option<AdminSession> {
    let token = jar.get(SESSION_COOKIE)?.value().to_string();
    if token.is_empty() || state.sessions().is_revoked(&token).await {
        return None;
    }

    match state.backend().get_user(&token).await {
        Ok(Some(user)) => Some(AdminSession { token, user }),
        Ok(None) => None,
        Err(err) => {
            error!(?err, "failed to validate admin session");
            None
        }
    }
}

pub async fn redirect_if_authenticated(state: &AppState, jar: &CookieJar) -> Option<Redirect> {
    resolve_session(state, jar)
        .await
        .map(|_| Redirect::to(DASHBOARD_PATH))
}

fn invalid_credentials(email: &str) -> (StatusCode, Html<String>) {
    (
        StatusCode::UNAUTHORIZED,
        Html(render_login_page(
            Some("Email ou mot de passe incorrect."),
            email,
        )),
    )
}

fn server_error(email: &str) -> (StatusCode, Html<String>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(render_login_page(
            Some("Service d'authentification indisponible. Réessayez plus tard."),
            email,
        )),
    )
}
