use axum::{
    Router,
    extract::{DefaultBodyLimit, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::warn;

use crate::web::{AppState, admin, auth, public};

const ROBOTS_TXT_BODY: &str = include_str!("../../robots.txt");
/// Room for the non-file fields of a multipart form.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config().max_upload_bytes + FORM_OVERHEAD_BYTES;
    let serves_local_storage = state.serves_local_storage();

    let router = Router::new()
        .route("/", get(public::home))
        .route("/level/:level_id", get(public::level_page))
        .route("/group/:group_id", get(public::group_page))
        .route("/module/:module_id", get(public::module_page))
        .route("/healthz", get(healthz))
        .route("/robots.txt", get(robots_txt))
        .route("/admin", get(admin::admin_root))
        .route(
            "/admin/login",
            get(auth::login_page).post(auth::process_login),
        )
        .route("/admin/logout", post(auth::logout))
        .route("/admin/session/events", get(admin::session_events))
        .route("/admin/dashboard", get(admin::dashboard))
        .route(
            "/admin/levels",
            get(admin::levels_page).post(admin::save_level),
        )
        .route("/admin/levels/delete", post(admin::delete_level))
        .route(
            "/admin/groups",
            get(admin::groups_page).post(admin::save_group),
        )
        .route("/admin/groups/delete", post(admin::delete_group))
        .route(
            "/admin/modules",
            get(admin::modules_page).post(admin::save_module),
        )
        .route(
            "/admin/modules/repair",
            post(admin::repair_module_sections),
        )
        .route("/admin/modules/delete", post(admin::delete_module))
        .route(
            "/admin/announcements",
            get(admin::announcements_page).post(admin::publish_announcement),
        )
        .route(
            "/admin/announcements/delete",
            post(admin::delete_announcement),
        )
        .route(
            "/admin/files",
            get(admin::files_page).post(admin::upload_file),
        )
        .route("/admin/files/delete", post(admin::delete_file))
        .route(
            "/admin/settings",
            get(admin::settings_page).post(admin::save_settings),
        )
        .route("/admin/settings/account", post(admin::update_account));

    let router = if serves_local_storage {
        router.route("/local-storage/:bucket/*path", get(local_object))
    } else {
        router
    };

    router
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn robots_txt() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        ROBOTS_TXT_BODY,
    )
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

async fn not_found(State(state): State<AppState>) -> impl IntoResponse {
    let settings = public::load_settings(&state).await;
    public::not_found(&settings)
}

/// Serves objects held by the in-memory backend under their public URL.
async fn local_object(
    State(state): State<AppState>,
    Path((bucket, path)): Path<(String, String)>,
) -> Response {
    if bucket != state.config().bucket {
        return StatusCode::NOT_FOUND.into_response();
    }

    match state.backend().download(&path).await {
        Ok(object) => ([(header::CONTENT_TYPE, object.content_type)], object.bytes).into_response(),
        Err(err) => {
            warn!(%err, %path, "local object not served");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, Response as HttpResponse},
    };
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::{BackendKind, PortalConfig},
        content::test_support::{ADMIN_EMAIL, ADMIN_PASSWORD, backend_with_admin},
        remote::{Access, MemoryBackend, TableApi},
        web::auth::SESSION_COOKIE,
    };

    fn memory_config() -> PortalConfig {
        PortalConfig::from_lookup(|key| match key {
            "PORTAL_BACKEND" => Some("memory".to_string()),
            _ => None,
        })
        .unwrap()
    }

    async fn app() -> (Router, Arc<MemoryBackend>, String) {
        let (backend, token) = backend_with_admin().await;
        let config = memory_config();
        assert_eq!(config.backend, BackendKind::Memory);
        let state = AppState::with_backend(backend.clone(), config);
        (build_router(state), backend, token)
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = cookie {
            builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}={token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn location(response: &HttpResponse<Body>) -> Option<&str> {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    async fn body_text(response: HttpResponse<Body>) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn login(router: &Router) -> String {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(format!(
                        "email={}&password={}",
                        ADMIN_EMAIL.replace('@', "%40"),
                        ADMIN_PASSWORD
                    )))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(location(&response), Some("/admin/dashboard"));
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .unwrap()
            .to_string();
        let pair = cookie.split(';').next().unwrap();
        pair.trim_start_matches(&format!("{SESSION_COOKIE}="))
            .to_string()
    }

    #[tokio::test]
    async fn admin_pages_redirect_to_login_without_session() {
        let (router, _backend, _token) = app().await;
        for uri in [
            "/admin/dashboard",
            "/admin/levels",
            "/admin/groups",
            "/admin/modules",
            "/admin/announcements",
            "/admin/files",
            "/admin/settings",
        ] {
            let response = router.clone().oneshot(get_request(uri, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(location(&response), Some("/admin/login"), "{uri}");
        }

        let response = router
            .clone()
            .oneshot(get_request("/admin/levels", Some("forged-token")))
            .await
            .unwrap();
        assert_eq!(location(&response), Some("/admin/login"));

        let response = router
            .oneshot(get_request("/admin/login", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn signed_in_admin_skips_login_page() {
        let (router, _backend, _token) = app().await;
        let token = login(&router).await;

        let response = router
            .clone()
            .oneshot(get_request("/admin/login", Some(&token)))
            .await
            .unwrap();
        assert_eq!(location(&response), Some("/admin/dashboard"));

        let response = router
            .oneshot(get_request("/admin/dashboard", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Tableau de bord"));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected_with_401() {
        let (router, _backend, _token) = app().await;
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("email=admin%40example.com&password=nope"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_text(response).await.contains("Email ou mot de passe incorrect"));
    }

    #[tokio::test]
    async fn signed_out_token_is_refused() {
        let (router, _backend, _token) = app().await;
        let token = login(&router).await;

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/logout")
                    .header(header::COOKIE, format!("{SESSION_COOKIE}={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(location(&response), Some("/admin/login"));

        let response = router
            .oneshot(get_request("/admin/dashboard", Some(&token)))
            .await
            .unwrap();
        assert_eq!(location(&response), Some("/admin/login"));
    }

    #[tokio::test]
    async fn admin_root_goes_to_dashboard() {
        let (router, _backend, _token) = app().await;
        let response = router.oneshot(get_request("/admin", None)).await.unwrap();
        assert_eq!(location(&response), Some("/admin/dashboard"));
    }

    #[tokio::test]
    async fn home_lists_only_active_levels() {
        let (router, backend, token) = app().await;
        backend
            .insert(
                Access::User(&token),
                "levels",
                vec![
                    json!({"name": "Licence 1", "is_active": true}),
                    json!({"name": "Archive 2019", "is_active": false}),
                ],
            )
            .await
            .unwrap();

        let response = router.oneshot(get_request("/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Licence 1"));
        assert!(!html.contains("Archive 2019"));
    }

    #[tokio::test]
    async fn unknown_ids_render_not_found() {
        let (router, _backend, _token) = app().await;
        for uri in [
            format!("/level/{}", uuid::Uuid::new_v4()),
            "/group/not-a-uuid".to_string(),
            format!("/module/{}", uuid::Uuid::new_v4()),
            "/nowhere".to_string(),
        ] {
            let response = router.clone().oneshot(get_request(&uri, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn module_creation_through_the_form_adds_sections() {
        let (router, backend, token) = app().await;
        let level = backend
            .insert(Access::User(&token), "levels", vec![json!({"name": "L1"})])
            .await
            .unwrap();
        let level_id = level[0]["id"].as_str().unwrap().to_string();
        let group = backend
            .insert(
                Access::User(&token),
                "groups",
                vec![json!({"name": "G1", "level_id": level_id})],
            )
            .await
            .unwrap();
        let group_id = group[0]["id"].as_str().unwrap().to_string();

        let session = login(&router).await;
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/modules")
                    .header(header::COOKIE, format!("{SESSION_COOKIE}={session}"))
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(format!("group_id={group_id}&name=Algebre")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            location(&response),
            Some(format!("/admin/modules?group={group_id}&status=module_created").as_str())
        );

        let sections = backend.rows("module_sections").await;
        let names: Vec<&str> = sections
            .iter()
            .filter_map(|row| row["name"].as_str())
            .collect();
        assert_eq!(names.len(), 4);
        for expected in ["Cours", "TP", "TD", "Examens"] {
            assert!(names.contains(&expected));
        }
    }

    #[tokio::test]
    async fn robots_and_health_are_public() {
        let (router, _backend, _token) = app().await;
        let response = router
            .clone()
            .oneshot(get_request("/healthz", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router.oneshot(get_request("/robots.txt", None)).await.unwrap();
        assert!(body_text(response).await.contains("Disallow: /admin"));
    }
}
