use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use super::{PageResult, failure, load_settings, not_found, page, parse_path_id, render_description};
use crate::{
    content::{
        files::fetch_files_for_section,
        models::{FileEntry, Section},
        modules::{fetch_module_context, fetch_sections},
    },
    remote::Access,
    web::{
        AppState, escape_html,
        templates::{format_timestamp, render_breadcrumbs},
    },
};

#[derive(Debug, Default, Deserialize)]
pub struct ModuleQuery {
    pub section: Option<String>,
}

pub async fn module_page(
    State(state): State<AppState>,
    Path(module_id): Path<String>,
    Query(query): Query<ModuleQuery>,
) -> PageResult {
    let settings = load_settings(&state).await;
    let Some(module_id) = parse_path_id(&module_id) else {
        return Err(not_found(&settings));
    };

    let backend = state.backend();
    let access = Access::Anonymous;
    let (context, sections) = tokio::try_join!(
        fetch_module_context(backend, access, module_id),
        fetch_sections(backend, access, module_id),
    )
    .map_err(|err| failure(&settings, err, "module"))?;

    let requested = query.section.as_deref().and_then(parse_path_id);
    let active = select_section(&sections, requested);
    let files = match active {
        Some(section) => fetch_files_for_section(backend, access, section.id)
            .await
            .map_err(|err| failure(&settings, err, "module files"))?,
        None => Vec::new(),
    };

    let tabs_html = sections
        .iter()
        .map(|section| {
            format!(
                r#"<a href="/module/{module_id}?section={id}"{class}>{name}</a>"#,
                id = section.id,
                class = if active.is_some_and(|current| current.id == section.id) {
                    r#" class="active""#
                } else {
                    ""
                },
                name = escape_html(&section.name),
            )
        })
        .collect::<String>();

    let files_html = match active {
        None => r#"<div class="empty">Ce module n'a pas encore de sections.</div>"#.to_string(),
        Some(_) if files.is_empty() => {
            r#"<div class="empty">Aucun fichier dans cette section.</div>"#.to_string()
        }
        Some(_) => render_file_list(&files),
    };

    let level_href = format!("/level/{}", context.level.id);
    let group_href = format!("/group/{}", context.group.id);
    let body = format!(
        r#"{breadcrumbs}
<h2 class="page-title">{name}</h2>
<div class="page-lead">{description}</div>
<nav class="section-tabs">{tabs_html}</nav>
{files_html}"#,
        breadcrumbs = render_breadcrumbs(&[
            ("/", "Accueil"),
            (&level_href, &context.level.name),
            (&group_href, &context.group.name),
            ("", &context.module.name),
        ]),
        name = escape_html(&context.module.name),
        description = render_description(context.module.description.as_deref()),
    );

    Ok(page(&settings, &context.module.name, body, Vec::new()))
}

/// The requested tab when it belongs to the module, else the first one.
fn select_section(sections: &[Section], requested: Option<Uuid>) -> Option<&Section> {
    requested
        .and_then(|id| sections.iter().find(|section| section.id == id))
        .or_else(|| sections.first())
}

fn render_file_list(files: &[FileEntry]) -> String {
    let items = files
        .iter()
        .map(|file| {
            format!(
                r#"<li><span class="file-icon">{icon}</span><div class="file-meta"><strong>{title}</strong><span>{kind} · {date}</span></div><a class="download" href="{href}" target="_blank" rel="noopener noreferrer" download>Télécharger</a></li>"#,
                icon = file.file_type.icon(),
                title = escape_html(&file.title),
                kind = file.file_type.label_fr(),
                date = format_timestamp(&file.created_at),
                href = escape_html(&file.file_url),
            )
        })
        .collect::<String>();
    format!(r#"<ul class="file-list">{items}</ul>"#)
}
