use axum::extract::State;

use super::{PageResult, failure, load_settings, page, render_description};
use crate::{
    content::levels::fetch_active_levels,
    web::{AppState, escape_html},
};

pub async fn home(State(state): State<AppState>) -> PageResult {
    let settings = load_settings(&state).await;
    let levels = fetch_active_levels(state.backend())
        .await
        .map_err(|err| failure(&settings, err, "home levels"))?;

    let cards = if levels.is_empty() {
        r#"<div class="empty">Aucun niveau disponible pour le moment.</div>"#.to_string()
    } else {
        let items = levels
            .iter()
            .map(|level| {
                format!(
                    r#"<a class="card" href="/level/{id}"><h3>{name}</h3>{description}<span class="cta">Accéder →</span></a>"#,
                    id = level.id,
                    name = escape_html(&level.name),
                    description = render_description(level.description.as_deref()),
                )
            })
            .collect::<String>();
        format!(r#"<div class="card-grid">{items}</div>"#)
    };

    let body = format!(
        r#"<h2 class="page-title">Choisissez votre niveau</h2>
<p class="page-lead">Cours, travaux pratiques, travaux dirigés et examens, classés par niveau.</p>
{cards}"#
    );

    Ok(page(&settings, "", body, Vec::new()))
}
