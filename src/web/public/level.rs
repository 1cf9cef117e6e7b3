use std::borrow::Cow;

use axum::extract::{Path, State};

use super::{PageResult, failure, load_settings, not_found, page, parse_path_id, render_description};
use crate::{
    content::{
        announcements::fetch_announcements, groups::fetch_groups_for_level, levels::fetch_level,
        models::Announcement,
    },
    remote::Access,
    web::{
        AppState, escape_html,
        templates::{AUDIO_PLAYER_SCRIPT, format_timestamp, render_breadcrumbs},
    },
};

pub async fn level_page(State(state): State<AppState>, Path(level_id): Path<String>) -> PageResult {
    let settings = load_settings(&state).await;
    let Some(level_id) = parse_path_id(&level_id) else {
        return Err(not_found(&settings));
    };

    let backend = state.backend();
    let access = Access::Anonymous;
    let level = fetch_level(backend, access, level_id)
        .await
        .map_err(|err| failure(&settings, err, "level"))?;
    let (groups, announcements) = tokio::try_join!(
        fetch_groups_for_level(backend, access, level_id),
        fetch_announcements(backend, access, level_id),
    )
    .map_err(|err| failure(&settings, err, "level contents"))?;

    let groups_html = if groups.is_empty() {
        r#"<div class="empty">Aucun groupe pour ce niveau.</div>"#.to_string()
    } else {
        let items = groups
            .iter()
            .map(|group| {
                format!(
                    r#"<a class="card" href="/group/{id}"><h3>{name}</h3>{description}<span class="cta">Voir les modules →</span></a>"#,
                    id = group.id,
                    name = escape_html(&group.name),
                    description = render_description(group.description.as_deref()),
                )
            })
            .collect::<String>();
        format!(r#"<div class="card-grid">{items}</div>"#)
    };

    let has_audio = announcements.iter().any(|item| item.audio_url.is_some());
    let announcements_html = render_announcement_feed(&announcements);

    let body = format!(
        r#"{breadcrumbs}
<h2 class="page-title">{name}</h2>
<div class="page-lead">{description}</div>
<div class="two-columns">
    <section>
        <h3>Groupes</h3>
        {groups_html}
    </section>
    <aside>
        <h3>Annonces</h3>
        {announcements_html}
    </aside>
</div>"#,
        breadcrumbs = render_breadcrumbs(&[("/", "Accueil"), ("", &level.name)]),
        name = escape_html(&level.name),
        description = render_description(level.description.as_deref()),
    );

    let scripts = if has_audio {
        vec![Cow::Borrowed(AUDIO_PLAYER_SCRIPT)]
    } else {
        Vec::new()
    };
    Ok(page(&settings, &level.name, body, scripts))
}

/// Newest announcement up front, older ones folded away.
fn render_announcement_feed(announcements: &[Announcement]) -> String {
    let Some((latest, older)) = announcements.split_first() else {
        return r#"<div class="empty">Aucune annonce pour le moment.</div>"#.to_string();
    };

    let mut html = render_announcement(latest, true);
    if !older.is_empty() {
        let items = older
            .iter()
            .map(|item| render_announcement(item, false))
            .collect::<String>();
        html.push_str(&format!(
            r#"<details class="older"><summary>Anciennes annonces ({count})</summary>{items}</details>"#,
            count = older.len(),
        ));
    }
    html
}

pub(crate) fn render_announcement(announcement: &Announcement, featured: bool) -> String {
    let content_html = announcement
        .content
        .as_deref()
        .filter(|content| !content.trim().is_empty() && announcement.audio_url.is_none())
        .map(|content| format!("<p>{}</p>", escape_html(content)))
        .unwrap_or_default();
    let audio_html = announcement
        .audio_url
        .as_deref()
        .map(render_audio_player)
        .unwrap_or_default();
    let image_html = announcement
        .image_url
        .as_deref()
        .map(|url| {
            format!(
                r#"<img src="{src}" alt="Image de l'annonce" loading="lazy">"#,
                src = escape_html(url)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<article class="announcement{class}"><time>{date}</time><strong>{title}</strong>{content_html}{audio_html}{image_html}</article>"#,
        class = if featured { " featured" } else { "" },
        date = format_timestamp(&announcement.created_at),
        title = escape_html(announcement.title.as_deref().unwrap_or("Annonce")),
    )
}

pub(crate) fn render_audio_player(url: &str) -> String {
    format!(
        r#"<div class="audio-player" data-src="{src}"><button type="button" data-audio-toggle aria-label="Lecture">▶</button><div class="audio-track" data-audio-track><div class="audio-progress" data-audio-progress></div></div><span class="audio-time" data-audio-time>0:00</span></div>"#,
        src = escape_html(url),
    )
}
