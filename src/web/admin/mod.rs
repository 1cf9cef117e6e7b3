mod announcements;
mod auth;
mod dashboard;
mod events;
mod files;
mod groups;
mod levels;
mod modules;
mod settings;

use std::borrow::Cow;

use axum::response::{Html, Redirect};
use tracing::error;
use uuid::Uuid;

use crate::{
    content::ContentError,
    web::{
        AdminSession,
        admin_utils::compose_flash_message,
        escape_html,
        templates::{AdminNav, AdminPageLayout, render_admin_page},
    },
};

pub use announcements::{announcements_page, delete_announcement, publish_announcement};
pub use dashboard::{admin_root, dashboard};
pub use events::session_events;
pub use files::{delete_file, files_page, upload_file};
pub use groups::{delete_group, groups_page, save_group};
pub use levels::{delete_level, levels_page, save_level};
pub use modules::{delete_module, modules_page, repair_module_sections, save_module};
pub use settings::{save_settings, settings_page, update_account};

pub type AdminPageResult = Result<Html<String>, Redirect>;

pub(crate) struct AdminView<'a> {
    pub session: &'a AdminSession,
    pub nav: AdminNav,
    pub heading: &'a str,
    pub note: &'a str,
}

impl AdminView<'_> {
    pub fn render(
        &self,
        flash_html: String,
        body_html: String,
        body_scripts: Vec<Cow<'static, str>>,
    ) -> Html<String> {
        Html(render_admin_page(AdminPageLayout {
            meta_title: self.nav.label(),
            page_heading: self.heading,
            page_note: self.note,
            active: self.nav,
            session: self.session,
            flash_html: Cow::Owned(flash_html),
            body_html: Cow::Owned(body_html),
            body_scripts,
        }))
    }
}

/// Logs a failed page load and turns it into an error banner.
pub(crate) fn load_failure_flash(err: &ContentError, context: &'static str) -> String {
    error!(?err, context, "admin page failed to load");
    compose_flash_message(None, Some(err.flash_code()), err.detail())
}

/// `<option>` list; `selected` falls back to nothing when absent.
pub(crate) fn render_options<'a>(
    items: impl IntoIterator<Item = (Uuid, &'a str)>,
    selected: Option<Uuid>,
) -> String {
    items
        .into_iter()
        .map(|(id, label)| {
            format!(
                r#"<option value="{id}"{selected}>{label}</option>"#,
                selected = if selected == Some(id) { " selected" } else { "" },
                label = escape_html(label),
            )
        })
        .collect()
}

/// Inline POST form with a browser confirmation before submitting.
pub(crate) fn render_delete_form(
    action: &str,
    hidden: &[(&str, String)],
    confirm: &str,
) -> String {
    let fields = hidden
        .iter()
        .map(|(name, value)| {
            format!(
                r#"<input type="hidden" name="{name}" value="{value}">"#,
                value = escape_html(value)
            )
        })
        .collect::<String>();
    format!(
        r#"<form class="inline-form" method="post" action="{action}" onsubmit="return confirm('{confirm}');">{fields}<button type="submit" class="btn-sm btn-danger">Supprimer</button></form>"#,
        confirm = escape_js_single_quoted(confirm),
    )
}

fn escape_js_single_quoted(text: &str) -> String {
    escape_html(&text.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_mark_selection() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let html = render_options([(a, "L1"), (b, "L2 & co")], Some(b));
        assert!(html.contains(&format!(r#"<option value="{a}">L1</option>"#)));
        assert!(html.contains(&format!(r#"<option value="{b}" selected>L2 &amp; co</option>"#)));
    }

    #[test]
    fn delete_form_escapes_confirm_text() {
        let html = render_delete_form(
            "/admin/announcements/delete",
            &[("id", "x".into())],
            "Êtes-vous sûr de vouloir supprimer cette annonce ?",
        );
        assert!(html.contains("return confirm('Êtes-vous sûr de vouloir supprimer cette annonce ?');"));

        let quoted = render_delete_form("/x", &[], "l'élément");
        assert!(quoted.contains(r"confirm('l\&#39;élément')"));
    }
}
