use axum::{
    extract::{Query, State},
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    content::stats::fetch_dashboard_stats,
    web::{AppState, admin_utils::AdminQuery, escape_html, templates::AdminNav},
};

use super::{AdminPageResult, AdminView, auth::require_admin, load_failure_flash};

pub async fn admin_root() -> Redirect {
    Redirect::to(AdminNav::Dashboard.path())
}

pub async fn dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<AdminQuery>,
) -> AdminPageResult {
    let session = require_admin(&state, &jar).await?;

    let mut flash_html = params.flash_html();
    let stats = match fetch_dashboard_stats(state.backend(), session.access()).await {
        Ok(stats) => Some(stats),
        Err(err) => {
            flash_html.push_str(&load_failure_flash(&err, "dashboard counters"));
            None
        }
    };

    let stat_cards = [
        ("Niveaux", stats.map(|s| s.levels), AdminNav::Levels),
        ("Groupes", stats.map(|s| s.groups), AdminNav::Groups),
        ("Modules", stats.map(|s| s.modules), AdminNav::Modules),
        ("Fichiers", stats.map(|s| s.files), AdminNav::Files),
    ]
    .into_iter()
    .map(|(label, value, nav)| {
        format!(
            r#"<a class="stat-card" href="{href}" style="text-decoration:none;color:inherit;"><span>{label}</span><strong>{value}</strong></a>"#,
            href = nav.path(),
            value = value.map(|v| v.to_string()).unwrap_or_else(|| "–".into()),
        )
    })
    .collect::<String>();

    let body = format!(
        r#"<div class="stats-grid">{stat_cards}</div>
<section class="panel">
    <h2>Bienvenue, {email}</h2>
    <p class="muted">Organisez le contenu par niveaux, groupes et modules. Chaque module reçoit automatiquement les sections Cours, TP, TD et Examens.</p>
    <p><a class="btn-link" href="/admin/levels">Gérer les niveaux</a> · <a class="btn-link" href="/admin/files">Ajouter des fichiers</a> · <a class="btn-link" href="/admin/announcements">Publier une annonce</a> · <a class="btn-link" href="/" target="_blank">Voir le site</a></p>
</section>"#,
        email = escape_html(session.email()),
    );

    let view = AdminView {
        session: &session,
        nav: AdminNav::Dashboard,
        heading: "Tableau de bord",
        note: "Vue d'ensemble du contenu publié.",
    };
    Ok(view.render(flash_html, body, Vec::new()))
}
