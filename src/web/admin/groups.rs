use axum::{
    extract::{Form, Query, State},
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::{
    content::{
        ContentResult,
        groups::{self, GroupInput, GroupListing, fetch_group_listing},
        levels::fetch_active_levels_for,
        models::Level,
    },
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

use super::{
    AdminPageResult, AdminView, auth::require_admin, load_failure_flash, render_delete_form,
    render_options,
};

const PAGE: &str = "/admin/groups";

#[derive(Deserialize)]
pub(crate) struct GroupForm {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    level_id: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct GroupDeleteForm {
    id: String,
}

pub async fn groups_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<AdminQuery>,
) -> AdminPageResult {
    let session = require_admin(&state, &jar).await?;

    let backend = state.backend();
    let access = session.access();
    let loaded: ContentResult<(Vec<GroupListing>, Vec<Level>)> = tokio::try_join!(
        fetch_group_listing(backend, access),
        fetch_active_levels_for(backend, access),
    );

    let mut flash_html = params.flash_html();
    let (groups, levels) = loaded.unwrap_or_else(|err| {
        flash_html.push_str(&load_failure_flash(&err, "groups"));
        (Vec::new(), Vec::new())
    });

    let editing = params
        .edit_id()
        .and_then(|id| groups.iter().find(|entry| entry.group.id == id));

    let body = format!(
        "{form}\n{table}",
        form = render_group_form(editing, &levels),
        table = render_group_table(&groups),
    );

    let view = AdminView {
        session: &session,
        nav: AdminNav::Groups,
        heading: "Groupes",
        note: "Chaque groupe appartient à un niveau actif.",
    };
    Ok(view.render(flash_html, body, Vec::new()))
}

fn render_group_form(editing: Option<&GroupListing>, levels: &[Level]) -> String {
    let group = editing.map(|entry| &entry.group);

    if levels.is_empty() && group.is_none() {
        return r#"<section class="panel"><h2>Nouveau groupe</h2><p class="muted">Créez d'abord un niveau actif.</p></section>"#
            .to_string();
    }

    let (title, submit) = match group {
        Some(_) => ("Modifier le groupe", "Enregistrer"),
        None => ("Nouveau groupe", "Créer le groupe"),
    };
    let id_field = group
        .map(|group| format!(r#"<input type="hidden" name="id" value="{}">"#, group.id))
        .unwrap_or_default();
    let cancel = if group.is_some() {
        format!(r#" <a class="btn-link" href="{PAGE}">Annuler</a>"#)
    } else {
        String::new()
    };
    let selected = group
        .map(|group| group.level_id)
        .or_else(|| levels.first().map(|level| level.id));
    let options = render_options(
        levels.iter().map(|level| (level.id, level.name.as_str())),
        selected,
    );

    format!(
        r#"<section class="panel">
    <h2>{title}</h2>
    <form method="post" action="{PAGE}" data-busy-label="Enregistrement...">
        {id_field}
        <div class="field">
            <label for="group-name">Nom</label>
            <input id="group-name" name="name" value="{name}" required>
        </div>
        <div class="field">
            <label for="group-level">Niveau</label>
            <select id="group-level" name="level_id" required>{options}</select>
        </div>
        <div class="field">
            <label for="group-description">Description</label>
            <textarea id="group-description" name="description">{description}</textarea>
        </div>
        <button type="submit">{submit}</button>{cancel}
    </form>
</section>"#,
        name = escape_html(group.map(|group| group.name.as_str()).unwrap_or_default()),
        description = escape_html(
            group
                .and_then(|group| group.description.as_deref())
                .unwrap_or_default()
        ),
    )
}

fn render_group_table(groups: &[GroupListing]) -> String {
    if groups.is_empty() {
        return r#"<section class="panel"><p class="muted">Aucun groupe pour le moment.</p></section>"#
            .to_string();
    }

    let rows = groups
        .iter()
        .map(|GroupListing { group, level_name }| {
            format!(
                r#"<tr><td><strong>{name}</strong></td><td>{level}</td><td>{description}</td><td>{created}</td><td class="actions"><a class="btn-link" href="{PAGE}?edit={id}">Modifier</a>{delete}</td></tr>"#,
                name = escape_html(&group.name),
                level = escape_html(level_name.as_deref().unwrap_or("-")),
                description = escape_html(group.description.as_deref().unwrap_or("")),
                created = format_timestamp(&group.created_at),
                id = group.id,
                delete = render_delete_form(
                    "/admin/groups/delete",
                    &[("id", group.id.to_string())],
                    "Supprimer ce groupe ? Ses modules et fichiers seront aussi supprimés.",
                ),
            )
        })
        .collect::<String>();

    format!(
        r#"<table>
    <thead><tr><th>Nom</th><th>Niveau</th><th>Description</th><th>Créé le</th><th></th></tr></thead>
    <tbody>{rows}</tbody>
</table>"#
    )
}

pub async fn save_group(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<GroupForm>,
) -> Result<Redirect, Redirect> {
    let session = require_admin(&state, &jar).await?;

    let existing = parse_uuid(form.id.as_deref());
    let input = GroupInput {
        name: form.name,
        level_id: parse_uuid(form.level_id.as_deref()),
        description: form.description,
    };

    match groups::save_group(state.backend(), session.token(), existing, &input).await {
        Ok(_) if existing.is_some() => Ok(redirect_with_status(PAGE, "group_updated")),
        Ok(_) => Ok(redirect_with_status(PAGE, "group_created")),
        Err(err) => Ok(redirect_with_error(PAGE, &err, "save group")),
    }
}

pub async fn delete_group(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<GroupDeleteForm>,
) -> Result<Redirect, Redirect> {
    let session = require_admin(&state, &jar).await?;

    let Some(id) = parse_uuid(Some(&form.id)) else {
        return Ok(redirect_with_error_code(PAGE, "not_found"));
    };

    match groups::delete_group(state.backend(), session.token(), id).await {
        Ok(()) => Ok(redirect_with_status(PAGE, "group_deleted")),
        Err(err) => Ok(redirect_with_error(PAGE, &err, "delete group")),
    }
}
