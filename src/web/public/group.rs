use axum::extract::{Path, State};

use super::{PageResult, failure, load_settings, not_found, page, parse_path_id, render_description};
use crate::{
    content::{groups::fetch_group_context, modules::fetch_modules_for_group},
    remote::Access,
    web::{AppState, escape_html, templates::render_breadcrumbs},
};

pub async fn group_page(State(state): State<AppState>, Path(group_id): Path<String>) -> PageResult {
    let settings = load_settings(&state).await;
    let Some(group_id) = parse_path_id(&group_id) else {
        return Err(not_found(&settings));
    };

    let backend = state.backend();
    let access = Access::Anonymous;
    let (context, modules) = tokio::try_join!(
        fetch_group_context(backend, access, group_id),
        fetch_modules_for_group(backend, access, group_id),
    )
    .map_err(|err| failure(&settings, err, "group"))?;

    let modules_html = if modules.is_empty() {
        r#"<div class="empty">Aucun module dans ce groupe.</div>"#.to_string()
    } else {
        let items = modules
            .iter()
            .map(|module| {
                format!(
                    r#"<a class="card" href="/module/{id}"><h3>{name}</h3>{description}<span class="cta">Ouvrir →</span></a>"#,
                    id = module.id,
                    name = escape_html(&module.name),
                    description = render_description(module.description.as_deref()),
                )
            })
            .collect::<String>();
        format!(r#"<div class="card-grid">{items}</div>"#)
    };

    let level_href = format!("/level/{}", context.level.id);
    let body = format!(
        r#"{breadcrumbs}
<h2 class="page-title">{name}</h2>
<div class="page-lead">{description}</div>
{modules_html}"#,
        breadcrumbs = render_breadcrumbs(&[
            ("/", "Accueil"),
            (&level_href, &context.level.name),
            ("", &context.group.name),
        ]),
        name = escape_html(&context.group.name),
        description = render_description(context.group.description.as_deref()),
    );

    Ok(page(&settings, &context.group.name, body, Vec::new()))
}
