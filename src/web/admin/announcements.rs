use std::borrow::Cow;

use axum::{
    extract::{Form, Multipart, Query, State},
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    content::{
        announcements::{
            self, AnnouncementDraft, AnnouncementMode, Attachment, fetch_announcements,
        },
        levels::fetch_levels_by_name,
        models::{Announcement, Level},
    },
    web::{
        AppState,
        admin_utils::{
            AdminQuery, parse_uuid, redirect_with_error, redirect_with_error_code,
            redirect_with_status, with_param,
        },
        escape_html,
        public::render_announcement,
        templates::{AUDIO_PLAYER_SCRIPT, AdminNav, RECORDER_SCRIPT},
        uploads::{FileFieldConfig, ReceivedFile, read_upload_form},
    },
};

use super::{
    AdminPageResult, AdminView, auth::require_admin, load_failure_flash, render_delete_form,
    render_options,
};

const PAGE: &str = "/admin/announcements";

#[derive(Deserialize)]
pub(crate) struct AnnouncementDeleteForm {
    id: String,
    #[serde(default)]
    level_id: Option<String>,
}

fn page_for(level_id: Option<Uuid>) -> String {
    match level_id {
        Some(id) => with_param(PAGE, "level", &id.to_string()),
        None => PAGE.to_string(),
    }
}

pub async fn announcements_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<AdminQuery>,
) -> AdminPageResult {
    let session = require_admin(&state, &jar).await?;
    let backend = state.backend();
    let access = session.access();

    let mut flash_html = params.flash_html();
    let levels = fetch_levels_by_name(backend, access)
        .await
        .unwrap_or_else(|err| {
            flash_html.push_str(&load_failure_flash(&err, "announcement levels"));
            Vec::new()
        });

    let requested = parse_uuid(params.level.as_deref());
    let selected = requested
        .and_then(|id| levels.iter().find(|level| level.id == id))
        .or_else(|| levels.first());

    let items = match selected {
        Some(level) => fetch_announcements(backend, access, level.id)
            .await
            .unwrap_or_else(|err| {
                flash_html.push_str(&load_failure_flash(&err, "announcements"));
                Vec::new()
            }),
        None => Vec::new(),
    };

    let body = match selected {
        None => r#"<section class="panel"><p class="muted">Créez d'abord un niveau pour publier des annonces.</p></section>"#
            .to_string(),
        Some(level) => format!(
            "{selector}\n{form}\n{list}",
            selector = render_level_selector(&levels, level.id),
            form = render_announcement_form(level),
            list = render_announcement_list(level.id, &items),
        ),
    };

    let view = AdminView {
        session: &session,
        nav: AdminNav::Announcements,
        heading: "Annonces",
        note: "Message écrit ou note vocale, avec une image facultative.",
    };
    Ok(view.render(
        flash_html,
        body,
        vec![
            Cow::Borrowed(RECORDER_SCRIPT),
            Cow::Borrowed(AUDIO_PLAYER_SCRIPT),
        ],
    ))
}

fn render_level_selector(levels: &[Level], selected: Uuid) -> String {
    let options = render_options(
        levels.iter().map(|level| (level.id, level.name.as_str())),
        Some(selected),
    );
    format!(
        r#"<form class="selector" method="get" action="{PAGE}">
    <div class="field">
        <label for="announcement-level">Niveau</label>
        <select id="announcement-level" name="level" onchange="this.form.submit()">{options}</select>
    </div>
    <noscript><button type="submit" class="btn-secondary">Afficher</button></noscript>
</form>"#
    )
}

fn render_announcement_form(level: &Level) -> String {
    format!(
        r#"<section class="panel">
    <h2>Nouvelle annonce · {level_name}</h2>
    <form id="announcement-form" method="post" action="{PAGE}" enctype="multipart/form-data" data-busy-label="Publication...">
        <input type="hidden" name="level_id" value="{level_id}">
        <div class="mode-switch">
            <label><input type="radio" name="mode" value="text" checked> ✍️ Texte</label>
            <label><input type="radio" name="mode" value="audio"> 🎙️ Vocal</label>
        </div>
        <div data-mode-panel="text">
            <div class="field">
                <label for="announcement-content">Message</label>
                <textarea id="announcement-content" name="content" placeholder="Écrivez votre annonce..."></textarea>
            </div>
        </div>
        <div data-mode-panel="audio" hidden>
            <div class="recorder">
                <button type="button" class="btn-secondary" data-record-toggle>● Enregistrer</button>
                <span class="muted">ou</span>
                <input type="file" name="audio" accept="audio/*" data-audio-input>
            </div>
            <audio controls hidden data-audio-preview></audio>
            <button type="button" class="btn-sm btn-secondary" hidden data-audio-clear>Retirer l'audio</button>
        </div>
        <div class="field">
            <label for="announcement-image">Image (facultatif)</label>
            <input id="announcement-image" type="file" name="image" accept="image/*" data-image-input>
            <img class="preview-image" alt="Aperçu" hidden data-image-preview>
        </div>
        <button type="submit" data-submit>Publier</button>
    </form>
</section>"#,
        level_name = escape_html(&level.name),
        level_id = level.id,
    )
}

fn render_announcement_list(level_id: Uuid, items: &[Announcement]) -> String {
    if items.is_empty() {
        return r#"<section class="panel"><p class="muted">Aucune annonce pour ce niveau.</p></section>"#
            .to_string();
    }

    let rows = items
        .iter()
        .map(|item| {
            format!(
                r#"<tr class="announcement-row"><td>{preview}</td><td class="actions">{delete}</td></tr>"#,
                preview = render_announcement(item, false),
                delete = render_delete_form(
                    "/admin/announcements/delete",
                    &[
                        ("id", item.id.to_string()),
                        ("level_id", level_id.to_string()),
                    ],
                    "Êtes-vous sûr de vouloir supprimer cette annonce ?",
                ),
            )
        })
        .collect::<String>();

    format!(
        r#"<table>
    <thead><tr><th>Annonces publiées</th><th></th></tr></thead>
    <tbody>{rows}</tbody>
</table>"#
    )
}

fn into_attachment(file: ReceivedFile) -> Attachment {
    Attachment {
        file_name: file.original_name,
        content_type: file.content_type,
        bytes: file.bytes,
    }
}

pub async fn publish_announcement(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Redirect, Redirect> {
    let session = require_admin(&state, &jar).await?;

    let max_bytes = state.config().max_upload_bytes;
    let mut form = match read_upload_form(
        multipart,
        &[
            FileFieldConfig::new("audio", max_bytes),
            FileFieldConfig::new("image", max_bytes),
        ],
    )
    .await
    {
        Ok(form) => form,
        Err(err) => {
            warn!(%err, "announcement form rejected");
            return Ok(redirect_with_error_code(PAGE, err.code()));
        }
    };

    let level_id = parse_uuid(form.first_text("level_id"));
    let target = page_for(level_id);
    let draft = AnnouncementDraft {
        level_id,
        mode: AnnouncementMode::parse(form.first_text("mode")),
        content: form.first_text("content").unwrap_or_default().to_string(),
        audio: form.take_file("audio").map(into_attachment),
        image: form.take_file("image").map(into_attachment),
    };

    match announcements::publish_announcement(state.backend(), session.token(), draft, Utc::now())
        .await
    {
        Ok(_) => Ok(redirect_with_status(&target, "announcement_published")),
        Err(err) => Ok(redirect_with_error(&target, &err, "publish announcement")),
    }
}

pub async fn delete_announcement(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<AnnouncementDeleteForm>,
) -> Result<Redirect, Redirect> {
    let session = require_admin(&state, &jar).await?;

    let target = page_for(parse_uuid(form.level_id.as_deref()));
    let Some(id) = parse_uuid(Some(&form.id)) else {
        return Ok(redirect_with_error_code(&target, "not_found"));
    };

    match announcements::delete_announcement(state.backend(), session.token(), id).await {
        Ok(()) => Ok(redirect_with_status(&target, "announcement_deleted")),
        Err(err) => Ok(redirect_with_error(&target, &err, "delete announcement")),
    }
}
