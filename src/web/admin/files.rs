use axum::{
    extract::{Form, Multipart, Query, State},
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    content::{
        files::{self, NewUpload, fetch_files_for_section},
        models::{FileEntry, Section},
        modules::{ModuleListing, fetch_module_listing, fetch_sections},
    },
    web::{
        AppState,
        admin_utils::{
            AdminQuery, parse_uuid, redirect_with_error, redirect_with_error_code,
            redirect_with_status, with_param,
        },
        escape_html,
        templates::{AdminNav, format_timestamp},
        uploads::{FileFieldConfig, read_upload_form},
    },
};

use super::{
    AdminPageResult, AdminView, auth::require_admin, load_failure_flash, render_delete_form,
};

const PAGE: &str = "/admin/files";

#[derive(Deserialize)]
pub(crate) struct FileDeleteForm {
    id: String,
    #[serde(default)]
    module_id: Option<String>,
    #[serde(default)]
    section_id: Option<String>,
}

/// The files screen with its module and section pickers preserved.
fn page_for(module_id: Option<Uuid>, section_id: Option<Uuid>) -> String {
    let mut target = PAGE.to_string();
    if let Some(module_id) = module_id {
        target = with_param(&target, "module", &module_id.to_string());
    }
    if let Some(section_id) = section_id {
        target = with_param(&target, "section", &section_id.to_string());
    }
    target
}

pub async fn files_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<AdminQuery>,
) -> AdminPageResult {
    let session = require_admin(&state, &jar).await?;
    let backend = state.backend();
    let access = session.access();

    let mut flash_html = params.flash_html();
    let modules = fetch_module_listing(backend, access)
        .await
        .unwrap_or_else(|err| {
            flash_html.push_str(&load_failure_flash(&err, "file modules"));
            Vec::new()
        });

    let requested_module = parse_uuid(params.module.as_deref());
    let module = requested_module
        .and_then(|id| modules.iter().find(|entry| entry.module.id == id))
        .or_else(|| modules.first());

    let sections = match module {
        Some(entry) => fetch_sections(backend, access, entry.module.id)
            .await
            .unwrap_or_else(|err| {
                flash_html.push_str(&load_failure_flash(&err, "file sections"));
                Vec::new()
            }),
        None => Vec::new(),
    };

    let requested_section = parse_uuid(params.section.as_deref());
    let section = requested_section
        .and_then(|id| sections.iter().find(|section| section.id == id))
        .or_else(|| sections.first());

    let entries = match section {
        Some(section) => fetch_files_for_section(backend, access, section.id)
            .await
            .unwrap_or_else(|err| {
                flash_html.push_str(&load_failure_flash(&err, "files"));
                Vec::new()
            }),
        None => Vec::new(),
    };

    let body = match (module, section) {
        (None, _) => r#"<section class="panel"><p class="muted">Créez d'abord un module pour pouvoir y déposer des fichiers.</p></section>"#
            .to_string(),
        (Some(module), None) => format!(
            r#"{selector}
<section class="panel"><p class="muted">Ce module n'a aucune section. Utilisez « Réparer les sections » sur la page <a class="btn-link" href="/admin/modules?group={group_id}">Modules</a>.</p></section>"#,
            selector = render_selector(&modules, module, &sections, None),
            group_id = module.module.group_id,
        ),
        (Some(module), Some(section)) => format!(
            "{selector}\n{form}\n{table}",
            selector = render_selector(&modules, module, &sections, Some(section)),
            form = render_upload_form(module, section),
            table = render_file_table(module.module.id, section.id, &entries),
        ),
    };

    let view = AdminView {
        session: &session,
        nav: AdminNav::Files,
        heading: "Fichiers",
        note: "Déposez les supports de cours dans la section voulue.",
    };
    Ok(view.render(flash_html, body, Vec::new()))
}

fn render_selector(
    modules: &[ModuleListing],
    current_module: &ModuleListing,
    sections: &[Section],
    current_section: Option<&Section>,
) -> String {
    let module_options = modules
        .iter()
        .map(|entry| {
            format!(
                r#"<option value="{id}"{selected}>{label}</option>"#,
                id = entry.module.id,
                selected = if entry.module.id == current_module.module.id {
                    " selected"
                } else {
                    ""
                },
                label = escape_html(&entry.path_label()),
            )
        })
        .collect::<String>();

    let section_field = if sections.is_empty() {
        String::new()
    } else {
        let options = sections
            .iter()
            .map(|section| {
                format!(
                    r#"<option value="{id}"{selected}>{name}</option>"#,
                    id = section.id,
                    selected = if current_section.is_some_and(|current| current.id == section.id) {
                        " selected"
                    } else {
                        ""
                    },
                    name = escape_html(&section.name),
                )
            })
            .collect::<String>();
        format!(
            r#"<div class="field">
        <label for="file-section">Section</label>
        <select id="file-section" name="section" onchange="this.form.submit()">{options}</select>
    </div>"#
        )
    };

    // Changing the module drops the section so the first one is picked.
    format!(
        r#"<form class="selector" method="get" action="{PAGE}">
    <div class="field">
        <label for="file-module">Module</label>
        <select id="file-module" name="module" onchange="var s=this.form.querySelector('#file-section'); if (s) s.disabled = true; this.form.submit()">{module_options}</select>
    </div>
    {section_field}
    <noscript><button type="submit" class="btn-secondary">Afficher</button></noscript>
</form>"#
    )
}

fn render_upload_form(module: &ModuleListing, section: &Section) -> String {
    format!(
        r#"<section class="panel">
    <h2>Ajouter un fichier · {section_name}</h2>
    <form method="post" action="{PAGE}" enctype="multipart/form-data" data-busy-label="Envoi...">
        <input type="hidden" name="module_id" value="{module_id}">
        <input type="hidden" name="section_id" value="{section_id}">
        <div class="field">
            <label for="file-title">Titre</label>
            <input id="file-title" name="title" required>
        </div>
        <div class="field">
            <label for="file-input">Fichier</label>
            <input id="file-input" type="file" name="file" required>
        </div>
        <button type="submit">Envoyer</button>
    </form>
</section>"#,
        section_name = escape_html(&section.name),
        module_id = module.module.id,
        section_id = section.id,
    )
}

fn render_file_table(module_id: Uuid, section_id: Uuid, entries: &[FileEntry]) -> String {
    if entries.is_empty() {
        return r#"<section class="panel"><p class="muted">Aucun fichier dans cette section.</p></section>"#
            .to_string();
    }

    let rows = entries
        .iter()
        .map(|entry| {
            format!(
                r#"<tr><td>{icon} <strong>{title}</strong></td><td>{kind}</td><td>{created}</td><td class="actions"><a class="btn-link" href="{href}" target="_blank" rel="noopener noreferrer">Ouvrir</a>{delete}</td></tr>"#,
                icon = entry.file_type.icon(),
                title = escape_html(&entry.title),
                kind = entry.file_type.label_fr(),
                created = format_timestamp(&entry.created_at),
                href = escape_html(&entry.file_url),
                delete = render_delete_form(
                    "/admin/files/delete",
                    &[
                        ("id", entry.id.to_string()),
                        ("module_id", module_id.to_string()),
                        ("section_id", section_id.to_string()),
                    ],
                    "Supprimer ce fichier ?",
                ),
            )
        })
        .collect::<String>();

    format!(
        r#"<table>
    <thead><tr><th>Titre</th><th>Type</th><th>Ajouté le</th><th></th></tr></thead>
    <tbody>{rows}</tbody>
</table>"#
    )
}

pub async fn upload_file(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Redirect, Redirect> {
    let session = require_admin(&state, &jar).await?;

    let max_bytes = state.config().max_upload_bytes;
    let mut form =
        match read_upload_form(multipart, &[FileFieldConfig::new("file", max_bytes)]).await {
            Ok(form) => form,
            Err(err) => {
                warn!(%err, "file upload form rejected");
                return Ok(redirect_with_error_code(PAGE, err.code()));
            }
        };

    let module_id = parse_uuid(form.first_text("module_id"));
    let section_id = parse_uuid(form.first_text("section_id"));
    let target = page_for(module_id, section_id);
    let title = form.first_text("title").unwrap_or_default().to_string();

    let upload = match form.take_file("file") {
        Some(file) => NewUpload {
            section_id,
            title,
            original_name: file.original_name,
            content_type: file.content_type,
            bytes: file.bytes,
        },
        None => NewUpload {
            section_id,
            title,
            original_name: String::new(),
            content_type: mime::APPLICATION_OCTET_STREAM.to_string(),
            bytes: Vec::new(),
        },
    };

    match files::upload_file(state.backend(), session.token(), upload).await {
        Ok(_) => Ok(redirect_with_status(&target, "file_uploaded")),
        Err(err) => Ok(redirect_with_error(&target, &err, "upload file")),
    }
}

pub async fn delete_file(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<FileDeleteForm>,
) -> Result<Redirect, Redirect> {
    let session = require_admin(&state, &jar).await?;

    let target = page_for(
        parse_uuid(form.module_id.as_deref()),
        parse_uuid(form.section_id.as_deref()),
    );
    let Some(id) = parse_uuid(Some(&form.id)) else {
        return Ok(redirect_with_error_code(&target, "not_found"));
    };

    match files::delete_file(state.backend(), session.token(), id).await {
        Ok(()) => Ok(redirect_with_status(&target, "file_deleted")),
        Err(err) => Ok(redirect_with_error(&target, &err, "delete file")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_keeps_selected_module_and_section() {
        let module = Uuid::new_v4();
        let section = Uuid::new_v4();
        assert_eq!(page_for(None, None), "/admin/files");
        assert_eq!(
            page_for(Some(module), Some(section)),
            format!("/admin/files?module={}&section={}", module, section)
        );
    }
}
