//! Read-only pages. Every fetch here uses anonymous access.

mod group;
mod home;
mod level;
mod module;

use std::borrow::Cow;

use axum::{http::StatusCode, response::Html};
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    content::{
        ContentError,
        settings::{SiteSettings, fetch_settings},
    },
    web::{
        AppState,
        templates::{PublicPageLayout, render_error_page, render_not_found_page, render_public_page},
    },
};

pub use group::group_page;
pub use home::home;
pub use level::level_page;
pub(crate) use level::render_announcement;
pub use module::module_page;

pub type PageResult = Result<Html<String>, (StatusCode, Html<String>)>;

/// Site settings for the shell; a failing read falls back to the defaults.
pub(crate) async fn load_settings(state: &AppState) -> SiteSettings {
    match fetch_settings(state.backend()).await {
        Ok(settings) => settings,
        Err(err) => {
            warn!(?err, "failed to load site settings; using defaults");
            SiteSettings::default()
        }
    }
}

pub(crate) fn page(
    settings: &SiteSettings,
    meta_title: &str,
    body_html: String,
    body_scripts: Vec<Cow<'_, str>>,
) -> Html<String> {
    Html(render_public_page(PublicPageLayout {
        meta_title,
        settings,
        body_html: Cow::Owned(body_html),
        body_scripts,
    }))
}

pub(crate) fn not_found(settings: &SiteSettings) -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, Html(render_not_found_page(settings)))
}

/// 404 for missing rows, 500 (logged) for everything else.
pub(crate) fn failure(
    settings: &SiteSettings,
    err: ContentError,
    context: &'static str,
) -> (StatusCode, Html<String>) {
    match err {
        ContentError::NotFound(_) => not_found(settings),
        err => {
            error!(?err, context, "public page failed to load");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_error_page(settings)),
            )
        }
    }
}

pub(crate) fn parse_path_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

pub(crate) fn render_description(description: Option<&str>) -> String {
    description
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| format!("<p>{}</p>", crate::web::escape_html(text)))
        .unwrap_or_default()
}
