use axum::{
    extract::{Form, Query, State},
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::{
    content::{
        account::{AccountForm, MIN_PASSWORD_LEN, update_account as apply_account_update},
        settings::{SettingsInput, SiteSettings, fetch_settings, save_settings as store_settings},
    },
    web::{
        AdminSession, AppState,
        admin_utils::{AdminQuery, redirect_with_error, redirect_with_status},
        escape_html,
        templates::AdminNav,
    },
};

use super::{AdminPageResult, AdminView, auth::require_admin, load_failure_flash};

const PAGE: &str = "/admin/settings";

#[derive(Deserialize)]
pub(crate) struct SettingsForm {
    #[serde(default)]
    site_title: String,
    #[serde(default)]
    timetable_url: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct AccountUpdateForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    new_password: String,
    #[serde(default)]
    confirm_password: String,
}

pub async fn settings_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<AdminQuery>,
) -> AdminPageResult {
    let session = require_admin(&state, &jar).await?;

    let mut flash_html = params.flash_html();
    let settings = fetch_settings(state.backend())
        .await
        .unwrap_or_else(|err| {
            flash_html.push_str(&load_failure_flash(&err, "settings"));
            SiteSettings::default()
        });

    let body = format!(
        "{site}\n{account}",
        site = render_site_form(&settings),
        account = render_account_form(&session),
    );

    let view = AdminView {
        session: &session,
        nav: AdminNav::Settings,
        heading: "Paramètres",
        note: "Identité du site et sécurité du compte.",
    };
    Ok(view.render(flash_html, body, Vec::new()))
}

fn render_site_form(settings: &SiteSettings) -> String {
    format!(
        r#"<section class="panel">
    <h2>Site</h2>
    <form method="post" action="{PAGE}" data-busy-label="Enregistrement...">
        <div class="field">
            <label for="site-title">Titre du site</label>
            <input id="site-title" name="site_title" value="{title}" required>
        </div>
        <div class="field">
            <label for="timetable-url">Lien de l'emploi du temps</label>
            <input id="timetable-url" type="url" name="timetable_url" value="{timetable}" placeholder="https://...">
            <span class="muted">Laissez vide pour masquer le bouton « Emploi du temps ».</span>
        </div>
        <button type="submit">Enregistrer</button>
    </form>
</section>"#,
        title = escape_html(settings.title()),
        timetable = escape_html(settings.timetable().unwrap_or_default()),
    )
}

fn render_account_form(session: &AdminSession) -> String {
    format!(
        r#"<section class="panel">
    <h2>Sécurité du compte</h2>
    <form method="post" action="{PAGE}/account" data-busy-label="Mise à jour...">
        <div class="field">
            <label for="account-email">Nouvelle adresse e-mail</label>
            <input id="account-email" type="email" name="email" placeholder="{email}" autocomplete="email">
        </div>
        <div class="field">
            <label for="account-password">Nouveau mot de passe</label>
            <input id="account-password" type="password" name="new_password" minlength="{min}" autocomplete="new-password">
        </div>
        <div class="field">
            <label for="account-confirm">Confirmer le mot de passe</label>
            <input id="account-confirm" type="password" name="confirm_password" minlength="{min}" autocomplete="new-password">
        </div>
        <p class="muted">Laissez un champ vide pour ne pas le modifier.</p>
        <button type="submit">Mettre à jour le compte</button>
    </form>
</section>"#,
        email = escape_html(session.email()),
        min = MIN_PASSWORD_LEN,
    )
}

pub async fn save_settings(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SettingsForm>,
) -> Result<Redirect, Redirect> {
    let session = require_admin(&state, &jar).await?;

    let input = SettingsInput {
        site_title: form.site_title,
        timetable_url: form.timetable_url,
    };

    match store_settings(state.backend(), session.token(), &input).await {
        Ok(_) => Ok(redirect_with_status(PAGE, "settings_saved")),
        Err(err) => Ok(redirect_with_error(PAGE, &err, "save settings")),
    }
}

pub async fn update_account(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<AccountUpdateForm>,
) -> Result<Redirect, Redirect> {
    let session = require_admin(&state, &jar).await?;

    let account = AccountForm {
        email: form.email,
        new_password: form.new_password,
        confirm_password: form.confirm_password,
    };

    match apply_account_update(state.backend(), session.token(), &account).await {
        Ok(outcome) => Ok(redirect_with_status(PAGE, outcome.flash_code())),
        Err(err) => Ok(redirect_with_error(PAGE, &err, "update account")),
    }
}
