use axum::{
    extract::{Form, Query, State},
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::{
    content::levels::{self, LevelInput, LevelWithGroupCount, fetch_levels_with_group_counts},
    web::{
        AppState,
        admin_utils::{
            AdminQuery, parse_uuid, redirect_with_error, redirect_with_error_code,
            redirect_with_status,
        },
        escape_html,
        templates::{AdminNav, format_timestamp},
    },
};

use super::{AdminPageResult, AdminView, auth::require_admin, load_failure_flash, render_delete_form};

const PAGE: &str = "/admin/levels";

#[derive(Deserialize)]
pub(crate) struct LevelForm {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    is_active: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct LevelDeleteForm {
    id: String,
}

pub async fn levels_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<AdminQuery>,
) -> AdminPageResult {
    let session = require_admin(&state, &jar).await?;

    let mut flash_html = params.flash_html();
    let levels = fetch_levels_with_group_counts(state.backend(), session.access())
        .await
        .unwrap_or_else(|err| {
            flash_html.push_str(&load_failure_flash(&err, "levels"));
            Vec::new()
        });

    let editing = params
        .edit_id()
        .and_then(|id| levels.iter().find(|entry| entry.level.id == id));

    let body = format!(
        "{form}\n{table}",
        form = render_level_form(editing),
        table = render_level_table(&levels),
    );

    let view = AdminView {
        session: &session,
        nav: AdminNav::Levels,
        heading: "Niveaux",
        note: "Les niveaux inactifs sont masqués sur le site public.",
    };
    Ok(view.render(flash_html, body, Vec::new()))
}

fn render_level_form(editing: Option<&LevelWithGroupCount>) -> String {
    let level = editing.map(|entry| &entry.level);
    let (title, submit) = match level {
        Some(_) => ("Modifier le niveau", "Enregistrer"),
        None => ("Nouveau niveau", "Créer le niveau"),
    };
    let id_field = level
        .map(|level| format!(r#"<input type="hidden" name="id" value="{}">"#, level.id))
        .unwrap_or_default();
    let cancel = if level.is_some() {
        format!(r#" <a class="btn-link" href="{PAGE}">Annuler</a>"#)
    } else {
        String::new()
    };
    let checked = level.map(|level| level.is_active).unwrap_or(true);

    format!(
        r#"<section class="panel">
    <h2>{title}</h2>
    <form method="post" action="{PAGE}" data-busy-label="Enregistrement...">
        {id_field}
        <div class="field">
            <label for="level-name">Nom</label>
            <input id="level-name" name="name" value="{name}" required>
        </div>
        <div class="field">
            <label for="level-description">Description</label>
            <textarea id="level-description" name="description">{description}</textarea>
        </div>
        <div class="field checkbox">
            <label><input type="checkbox" name="is_active" value="on"{checked}> Actif (visible sur le site)</label>
        </div>
        <button type="submit">{submit}</button>{cancel}
    </form>
</section>"#,
        name = escape_html(level.map(|level| level.name.as_str()).unwrap_or_default()),
        description = escape_html(
            level
                .and_then(|level| level.description.as_deref())
                .unwrap_or_default()
        ),
        checked = if checked { " checked" } else { "" },
    )
}

fn render_level_table(levels: &[LevelWithGroupCount]) -> String {
    if levels.is_empty() {
        return r#"<section class="panel"><p class="muted">Aucun niveau pour le moment.</p></section>"#
            .to_string();
    }

    let rows = levels
        .iter()
        .map(|LevelWithGroupCount { level, group_count }| {
            let badge = if level.is_active {
                r#"<span class="badge active">Actif</span>"#
            } else {
                r#"<span class="badge inactive">Inactif</span>"#
            };
            format!(
                r#"<tr><td><strong>{name}</strong></td><td>{description}</td><td>{group_count}</td><td>{badge}</td><td>{created}</td><td class="actions"><a class="btn-link" href="{PAGE}?edit={id}">Modifier</a>{delete}</td></tr>"#,
                name = escape_html(&level.name),
                description = escape_html(level.description.as_deref().unwrap_or("")),
                created = format_timestamp(&level.created_at),
                id = level.id,
                delete = render_delete_form(
                    "/admin/levels/delete",
                    &[("id", level.id.to_string())],
                    "Supprimer ce niveau ? Ses groupes, modules, fichiers et annonces seront aussi supprimés.",
                ),
            )
        })
        .collect::<String>();

    format!(
        r#"<table>
    <thead><tr><th>Nom</th><th>Description</th><th>Groupes</th><th>Statut</th><th>Créé le</th><th></th></tr></thead>
    <tbody>{rows}</tbody>
</table>"#
    )
}

pub async fn save_level(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LevelForm>,
) -> Result<Redirect, Redirect> {
    let session = require_admin(&state, &jar).await?;

    let existing = parse_uuid(form.id.as_deref());
    let input = LevelInput {
        name: form.name,
        description: form.description,
        is_active: form.is_active.is_some(),
    };

    match levels::save_level(state.backend(), session.token(), existing, &input).await {
        Ok(_) if existing.is_some() => Ok(redirect_with_status(PAGE, "level_updated")),
        Ok(_) => Ok(redirect_with_status(PAGE, "level_created")),
        Err(err) => Ok(redirect_with_error(PAGE, &err, "save level")),
    }
}

pub async fn delete_level(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LevelDeleteForm>,
) -> Result<Redirect, Redirect> {
    let session = require_admin(&state, &jar).await?;

    let Some(id) = parse_uuid(Some(&form.id)) else {
        return Ok(redirect_with_error_code(PAGE, "not_found"));
    };

    match levels::delete_level(state.backend(), session.token(), id).await {
        Ok(()) => Ok(redirect_with_status(PAGE, "level_deleted")),
        Err(err) => Ok(redirect_with_error(PAGE, &err, "delete level")),
    }
}
