use axum::response::Redirect;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::{content::ContentError, web::escape_html};

/// Everything but RFC 3986 unreserved characters.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Query string shared by every admin page: flash codes plus the usual selectors.
#[derive(Debug, Default, Deserialize)]
pub struct AdminQuery {
    pub status: Option<String>,
    pub error: Option<String>,
    pub detail: Option<String>,
    pub edit: Option<String>,
    pub level: Option<String>,
    pub group: Option<String>,
    pub module: Option<String>,
    pub section: Option<String>,
}

impl AdminQuery {
    pub fn flash_html(&self) -> String {
        compose_flash_message(
            self.status.as_deref(),
            self.error.as_deref(),
            self.detail.as_deref(),
        )
    }

    pub fn edit_id(&self) -> Option<Uuid> {
        parse_uuid(self.edit.as_deref())
    }
}

/// Parses an optional form or query value as an id; blanks and garbage are `None`.
pub fn parse_uuid(value: Option<&str>) -> Option<Uuid> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| Uuid::parse_str(value).ok())
}

/// Appends `key=value` to a path that may already carry a query string.
pub fn with_param(path: &str, key: &str, value: &str) -> String {
    let joiner = if path.contains('?') { '&' } else { '?' };
    format!(
        "{path}{joiner}{key}={}",
        utf8_percent_encode(value, QUERY_VALUE)
    )
}

pub fn redirect_with_status(path: &str, status: &str) -> Redirect {
    Redirect::to(&with_param(path, "status", status))
}

pub fn redirect_with_error_code(path: &str, code: &str) -> Redirect {
    Redirect::to(&with_param(path, "error", code))
}

/// Logs the failure and redirects with its flash code and provider detail.
pub fn redirect_with_error(path: &str, err: &ContentError, action: &str) -> Redirect {
    if matches!(err, ContentError::Invalid(_)) {
        tracing::debug!(%err, action, "admin input rejected");
    } else {
        error!(?err, action, "admin action failed");
    }
    let mut target = with_param(path, "error", err.flash_code());
    if let Some(detail) = err.detail() {
        target = with_param(&target, "detail", detail);
    }
    Redirect::to(&target)
}

/// Compose a flash message HTML snippet for known admin status or error codes.
pub fn compose_flash_message(
    status: Option<&str>,
    error: Option<&str>,
    detail: Option<&str>,
) -> String {
    if let Some(status) = status {
        let message = match status {
            "level_created" => "Niveau créé avec succès",
            "level_updated" => "Niveau mis à jour avec succès",
            "level_deleted" => "Niveau supprimé avec succès",
            "group_created" => "Groupe créé avec succès",
            "group_updated" => "Groupe mis à jour avec succès",
            "group_deleted" => "Groupe supprimé avec succès",
            "module_created" => "Module créé avec ses 4 sections",
            "module_updated" => "Module mis à jour avec succès",
            "module_deleted" => "Module supprimé avec succès",
            "sections_repaired" => "Sections créées avec succès",
            "sections_present" => "Les sections existent déjà pour ce module",
            "file_uploaded" => "Fichier ajouté avec succès",
            "file_deleted" => "Fichier supprimé avec succès",
            "announcement_published" => "Annonce publiée avec succès",
            "announcement_deleted" => "Supprimée avec succès",
            "settings_saved" => "Paramètres enregistrés avec succès",
            "account_both" => {
                "Email et mot de passe mis à jour. Vérifiez votre boîte mail pour confirmer le nouvel email."
            }
            "account_email" => {
                "Email mis à jour. Vérifiez votre boîte mail pour confirmer le changement."
            }
            "account_password" => "Mot de passe mis à jour avec succès",
            "account_unchanged" => "Aucune modification à enregistrer",
            _ => "",
        };

        if !message.is_empty() {
            return format!(r#"<div class="flash success">{message}</div>"#);
        }
    }

    if let Some(error) = error {
        let message = match error {
            "name_missing" => "Veuillez saisir un nom.",
            "level_missing" => "Veuillez sélectionner un niveau.",
            "group_missing" => "Veuillez sélectionner un groupe.",
            "section_missing" => "Veuillez sélectionner une section.",
            "title_missing" => "Veuillez saisir un titre.",
            "file_missing" => "Veuillez sélectionner un fichier.",
            "content_missing" => "Veuillez saisir le contenu de l'annonce.",
            "audio_missing" => "Veuillez enregistrer ou choisir une note vocale.",
            "audio_invalid" => "Veuillez sélectionner un fichier audio valide",
            "image_invalid" => "Veuillez sélectionner une image valide",
            "url_invalid" => "Le lien de l'emploi du temps doit commencer par http:// ou https://.",
            "password_mismatch" => "Les mots de passe ne correspondent pas.",
            "password_short" => "Le mot de passe doit contenir au moins 6 caractères.",
            "upload_too_large" => "Le fichier dépasse la taille maximale autorisée.",
            "upload_invalid" => "Le formulaire envoyé est invalide.",
            "not_found" => "Élément introuvable. Il a peut-être déjà été supprimé.",
            "partial_sections" => {
                "Le module a été créé sans ses sections. Utilisez « Réparer les sections » sur la page Modules."
            }
            "partial_storage" => {
                "L'enregistrement a échoué et un fichier déposé n'a pas pu être retiré du stockage."
            }
            "service" => "Erreur du service de données.",
            _ => "Une erreur inattendue est survenue. Consultez les journaux.",
        };

        let detail_html = detail
            .filter(|detail| !detail.trim().is_empty())
            .map(|detail| format!("<small>{}</small>", escape_html(detail)))
            .unwrap_or_default();
        return format!(r#"<div class="flash error">{message}{detail_html}</div>"#);
    }

    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::ServiceError;

    #[test]
    fn known_status_renders_success_banner() {
        let html = compose_flash_message(Some("announcement_deleted"), None, None);
        assert_eq!(html, r#"<div class="flash success">Supprimée avec succès</div>"#);
    }

    #[test]
    fn unknown_status_falls_through_to_error() {
        assert_eq!(compose_flash_message(Some("nope"), None, None), "");
        let html = compose_flash_message(Some("nope"), Some("weird"), None);
        assert!(html.contains("flash error"));
    }

    #[test]
    fn only_section_leftovers_suggest_repair() {
        let sections = compose_flash_message(None, Some("partial_sections"), None);
        assert!(sections.contains("Réparer les sections"));
        let storage = compose_flash_message(None, Some("partial_storage"), None);
        assert!(storage.contains("stockage"));
        assert!(!storage.contains("Réparer"));
    }

    #[test]
    fn error_detail_is_escaped() {
        let html = compose_flash_message(None, Some("service"), Some("<b>boom</b>"));
        assert!(html.contains("<small>&lt;b&gt;boom&lt;/b&gt;</small>"));
    }

    #[test]
    fn params_are_appended_and_encoded() {
        assert_eq!(with_param("/admin/levels", "status", "level_created"), "/admin/levels?status=level_created");
        assert_eq!(
            with_param("/admin/files?module=m", "detail", "a b&c"),
            "/admin/files?module=m&detail=a%20b%26c"
        );
    }

    #[test]
    fn parse_uuid_ignores_blank_and_garbage() {
        let id = Uuid::new_v4();
        assert_eq!(parse_uuid(Some(&id.to_string())), Some(id));
        assert_eq!(parse_uuid(Some("  ")), None);
        assert_eq!(parse_uuid(Some("not-an-id")), None);
        assert_eq!(parse_uuid(None), None);
    }

    #[test]
    fn error_redirect_carries_detail() {
        let err = ContentError::Service(ServiceError::new(409, "still referenced"));
        let redirect = redirect_with_error("/admin/levels", &err, "delete level");
        let location = axum::response::IntoResponse::into_response(redirect)
            .headers()
            .get(axum::http::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        assert_eq!(
            location.as_deref(),
            Some("/admin/levels?error=service&detail=still%20referenced")
        );
    }
}
