use axum::{
    extract::{Form, Query, State},
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    content::{
        groups::{GroupListing, fetch_groups_by_name},
        models::Module,
        modules::{
            self, ModuleInput, RepairOutcome, fetch_modules_for_group, repair_sections,
        },
    },
    web::{
        AppState,
        admin_utils::{
            AdminQuery, parse_uuid, redirect_with_error, redirect_with_error_code,
            redirect_with_status, with_param,
        },
        escape_html,
        templates::{AdminNav, format_timestamp},
    },
};

use super::{
    AdminPageResult, AdminView, auth::require_admin, load_failure_flash, render_delete_form,
};

const PAGE: &str = "/admin/modules";

#[derive(Deserialize)]
pub(crate) struct ModuleForm {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    group_id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ModuleActionForm {
    id: String,
    #[serde(default)]
    group_id: Option<String>,
}

/// Module list for one group, remembering the selection in the URL.
fn page_for(group_id: Option<Uuid>) -> String {
    match group_id {
        Some(id) => with_param(PAGE, "group", &id.to_string()),
        None => PAGE.to_string(),
    }
}

pub async fn modules_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<AdminQuery>,
) -> AdminPageResult {
    let session = require_admin(&state, &jar).await?;
    let backend = state.backend();
    let access = session.access();

    let mut flash_html = params.flash_html();
    let groups = fetch_groups_by_name(backend, access)
        .await
        .unwrap_or_else(|err| {
            flash_html.push_str(&load_failure_flash(&err, "module groups"));
            Vec::new()
        });

    let requested = parse_uuid(params.group.as_deref());
    let selected = requested
        .and_then(|id| groups.iter().find(|entry| entry.group.id == id))
        .or_else(|| groups.first());

    let modules = match selected {
        Some(entry) => fetch_modules_for_group(backend, access, entry.group.id)
            .await
            .unwrap_or_else(|err| {
                flash_html.push_str(&load_failure_flash(&err, "modules"));
                Vec::new()
            }),
        None => Vec::new(),
    };

    let body = match selected {
        None => r#"<section class="panel"><p class="muted">Créez d'abord un groupe pour pouvoir ajouter des modules.</p></section>"#
            .to_string(),
        Some(entry) => {
            let editing = params
                .edit_id()
                .and_then(|id| modules.iter().find(|module| module.id == id));
            format!(
                "{selector}\n{form}\n{table}",
                selector = render_group_selector(&groups, entry.group.id),
                form = render_module_form(entry, editing),
                table = render_module_table(entry.group.id, &modules),
            )
        }
    };

    let view = AdminView {
        session: &session,
        nav: AdminNav::Modules,
        heading: "Modules",
        note: "Chaque nouveau module reçoit les sections Cours, TP, TD et Examens.",
    };
    Ok(view.render(flash_html, body, Vec::new()))
}

fn render_group_selector(groups: &[GroupListing], selected: Uuid) -> String {
    let options = groups
        .iter()
        .map(|entry| {
            let label = match &entry.level_name {
                Some(level) => format!("{} · {}", level, entry.group.name),
                None => entry.group.name.clone(),
            };
            format!(
                r#"<option value="{id}"{selected}>{label}</option>"#,
                id = entry.group.id,
                selected = if entry.group.id == selected { " selected" } else { "" },
                label = escape_html(&label),
            )
        })
        .collect::<String>();

    format!(
        r#"<form class="selector" method="get" action="{PAGE}">
    <div class="field">
        <label for="module-group">Groupe</label>
        <select id="module-group" name="group" onchange="this.form.submit()">{options}</select>
    </div>
    <noscript><button type="submit" class="btn-secondary">Afficher</button></noscript>
</form>"#
    )
}

fn render_module_form(group: &GroupListing, editing: Option<&Module>) -> String {
    let (title, submit) = match editing {
        Some(_) => ("Modifier le module", "Enregistrer"),
        None => ("Nouveau module", "Créer le module"),
    };
    let id_field = editing
        .map(|module| format!(r#"<input type="hidden" name="id" value="{}">"#, module.id))
        .unwrap_or_default();
    let cancel = if editing.is_some() {
        format!(
            r#" <a class="btn-link" href="{href}">Annuler</a>"#,
            href = escape_html(&page_for(Some(group.group.id)))
        )
    } else {
        String::new()
    };

    format!(
        r#"<section class="panel">
    <h2>{title} · {group_name}</h2>
    <form method="post" action="{PAGE}" data-busy-label="Enregistrement...">
        {id_field}
        <input type="hidden" name="group_id" value="{group_id}">
        <div class="field">
            <label for="module-name">Nom</label>
            <input id="module-name" name="name" value="{name}" required>
        </div>
        <div class="field">
            <label for="module-description">Description</label>
            <textarea id="module-description" name="description">{description}</textarea>
        </div>
        <button type="submit">{submit}</button>{cancel}
    </form>
</section>"#,
        group_name = escape_html(&group.group.name),
        group_id = group.group.id,
        name = escape_html(editing.map(|module| module.name.as_str()).unwrap_or_default()),
        description = escape_html(
            editing
                .and_then(|module| module.description.as_deref())
                .unwrap_or_default()
        ),
    )
}

fn render_module_table(group_id: Uuid, modules: &[Module]) -> String {
    if modules.is_empty() {
        return r#"<section class="panel"><p class="muted">Aucun module dans ce groupe.</p></section>"#
            .to_string();
    }

    let rows = modules
        .iter()
        .map(|module| {
            let hidden = [
                ("id", module.id.to_string()),
                ("group_id", group_id.to_string()),
            ];
            format!(
                r#"<tr><td><strong>{name}</strong></td><td>{description}</td><td>{created}</td><td class="actions"><a class="btn-link" href="{edit_href}">Modifier</a><form class="inline-form" method="post" action="/admin/modules/repair" data-busy-label="Réparation..."><input type="hidden" name="id" value="{id}"><input type="hidden" name="group_id" value="{group_id}"><button type="submit" class="btn-sm btn-secondary">Réparer les sections</button></form>{delete}</td></tr>"#,
                name = escape_html(&module.name),
                description = escape_html(module.description.as_deref().unwrap_or("")),
                created = format_timestamp(&module.created_at),
                edit_href = escape_html(&with_param(
                    &page_for(Some(group_id)),
                    "edit",
                    &module.id.to_string()
                )),
                id = module.id,
                delete = render_delete_form(
                    "/admin/modules/delete",
                    &hidden,
                    "Supprimer ce module ? Ses sections et fichiers seront aussi supprimés.",
                ),
            )
        })
        .collect::<String>();

    format!(
        r#"<table>
    <thead><tr><th>Nom</th><th>Description</th><th>Créé le</th><th></th></tr></thead>
    <tbody>{rows}</tbody>
</table>"#
    )
}

pub async fn save_module(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ModuleForm>,
) -> Result<Redirect, Redirect> {
    let session = require_admin(&state, &jar).await?;

    let existing = parse_uuid(form.id.as_deref());
    let group_id = parse_uuid(form.group_id.as_deref());
    let target = page_for(group_id);
    let input = ModuleInput {
        name: form.name,
        description: form.description,
        group_id,
    };

    let backend = state.backend();
    let result = match existing {
        Some(id) => modules::update_module(backend, session.token(), id, &input)
            .await
            .map(|_| "module_updated"),
        None => modules::create_module(backend, session.token(), &input)
            .await
            .map(|_| "module_created"),
    };

    match result {
        Ok(status) => Ok(redirect_with_status(&target, status)),
        Err(err) => Ok(redirect_with_error(&target, &err, "save module")),
    }
}

pub async fn repair_module_sections(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ModuleActionForm>,
) -> Result<Redirect, Redirect> {
    let session = require_admin(&state, &jar).await?;

    let target = page_for(parse_uuid(form.group_id.as_deref()));
    let Some(id) = parse_uuid(Some(&form.id)) else {
        return Ok(redirect_with_error_code(&target, "not_found"));
    };

    match repair_sections(state.backend(), session.token(), id).await {
        Ok(RepairOutcome::Created(_)) => Ok(redirect_with_status(&target, "sections_repaired")),
        Ok(RepairOutcome::AlreadyPresent) => Ok(redirect_with_status(&target, "sections_present")),
        Err(err) => Ok(redirect_with_error(&target, &err, "repair sections")),
    }
}

pub async fn delete_module(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ModuleActionForm>,
) -> Result<Redirect, Redirect> {
    let session = require_admin(&state, &jar).await?;

    let target = page_for(parse_uuid(form.group_id.as_deref()));
    let Some(id) = parse_uuid(Some(&form.id)) else {
        return Ok(redirect_with_error_code(&target, "not_found"));
    };

    match modules::delete_module(state.backend(), session.token(), id).await {
        Ok(()) => Ok(redirect_with_status(&target, "module_deleted")),
        Err(err) => Ok(redirect_with_error(&target, &err, "delete module")),
    }
}
