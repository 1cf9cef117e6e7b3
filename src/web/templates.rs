use std::borrow::Cow;

use chrono::{Datelike, Utc};

use crate::{
    content::settings::{DEFAULT_SITE_TITLE, SiteSettings},
    web::{
        gesture::{GESTURE_SCRIPT, render_logo_button},
        session::AdminSession,
    },
};

pub const FORMS_SCRIPT: &str = concat!("<script>\n", include_str!("forms_client.js"), "\n</script>");
pub const AUDIO_PLAYER_SCRIPT: &str =
    concat!("<script>\n", include_str!("audio_player.js"), "\n</script>");
pub const SESSION_SCRIPT: &str =
    concat!("<script>\n", include_str!("session_client.js"), "\n</script>");
pub const RECORDER_SCRIPT: &str =
    concat!("<script>\n", include_str!("recorder_client.js"), "\n</script>");

const PUBLIC_BASE_STYLES: &str = r#"
        :root { color-scheme: dark; --accent: #dc2626; --accent-soft: rgba(220, 38, 38, 0.15); --panel: rgba(255, 255, 255, 0.04); --line: rgba(255, 255, 255, 0.08); }
        body { font-family: "Helvetica Neue", Arial, sans-serif; margin: 0; background: #050505; color: #e2e8f0; min-height: 100vh; display: flex; flex-direction: column; }
        a { color: inherit; }
        header.site-header { position: sticky; top: 0; z-index: 50; background: rgba(5, 5, 5, 0.85); backdrop-filter: blur(12px); border-bottom: 1px solid var(--line); }
        .header-bar { max-width: 1200px; margin: 0 auto; padding: 1rem 1.5rem; display: flex; justify-content: space-between; align-items: center; gap: 1rem; }
        .brand { display: flex; align-items: center; gap: 1rem; text-decoration: none; }
        .brand h1 { margin: 0; font-family: Georgia, serif; font-size: 1.25rem; letter-spacing: 0.2em; text-transform: uppercase; }
        .brand h1 span { color: var(--accent); }
        .logo { width: 3rem; height: 3rem; border-radius: 0.85rem; border: 1px solid var(--line); background: linear-gradient(135deg, #111, #1f1f1f); color: var(--accent); font-weight: 800; font-size: 1.35rem; cursor: pointer; transition: transform 0.1s ease; }
        .logo:active { transform: scale(0.95); }
        .timetable-link { display: inline-flex; align-items: center; gap: 0.5rem; padding: 0.55rem 1rem; border-radius: 0.85rem; border: 1px solid var(--line); background: var(--panel); color: #fff; font-size: 0.8rem; font-weight: 700; text-decoration: none; }
        .timetable-link:hover { background: rgba(255, 255, 255, 0.1); }
        main { flex: 1; width: 100%; max-width: 1200px; margin: 0 auto; padding: 2rem 1.5rem; box-sizing: border-box; }
        .page-title { font-family: Georgia, serif; font-size: clamp(1.6rem, 3vw, 2.3rem); margin: 0 0 0.5rem; color: #fff; }
        .page-lead { color: #94a3b8; margin: 0 0 2rem; }
        .breadcrumbs { display: flex; flex-wrap: wrap; gap: 0.4rem; font-size: 0.8rem; color: #64748b; margin-bottom: 1.25rem; text-transform: uppercase; letter-spacing: 0.08em; }
        .breadcrumbs a { text-decoration: none; color: #94a3b8; }
        .breadcrumbs a:hover { color: #fff; }
        .card-grid { display: grid; gap: 1.25rem; grid-template-columns: repeat(auto-fill, minmax(240px, 1fr)); }
        .card { display: block; padding: 1.5rem; border-radius: 1.25rem; border: 1px solid var(--line); background: var(--panel); text-decoration: none; transition: border 0.15s ease, transform 0.15s ease; }
        .card:hover { border-color: var(--accent); transform: translateY(-3px); }
        .card h3 { margin: 0 0 0.5rem; color: #fff; }
        .card p { margin: 0; color: #94a3b8; font-size: 0.92rem; line-height: 1.5; }
        .card .cta { display: inline-block; margin-top: 1rem; color: var(--accent); font-weight: 700; font-size: 0.85rem; }
        .empty { padding: 2rem; text-align: center; color: #64748b; border: 1px dashed var(--line); border-radius: 1rem; }
        .announcement { padding: 1.5rem; border-radius: 1.25rem; border: 1px solid var(--line); background: var(--panel); margin-bottom: 1rem; }
        .announcement.featured { border-color: var(--accent); background: var(--accent-soft); }
        .announcement time { display: block; font-size: 0.75rem; color: #94a3b8; margin-bottom: 0.5rem; }
        .announcement p { margin: 0.5rem 0 0; white-space: pre-line; line-height: 1.6; }
        .announcement img { display: block; max-width: 100%; max-height: 420px; margin-top: 1rem; border-radius: 0.85rem; }
        details.older summary { cursor: pointer; color: #94a3b8; font-weight: 700; margin: 0.5rem 0 1rem; }
        .audio-player { display: flex; align-items: center; gap: 0.85rem; margin-top: 1rem; }
        .audio-player button { width: 2.5rem; height: 2.5rem; border-radius: 999px; border: none; background: var(--accent); color: #fff; cursor: pointer; }
        .audio-track { flex: 1; height: 0.4rem; border-radius: 999px; background: rgba(255, 255, 255, 0.1); cursor: pointer; overflow: hidden; }
        .audio-progress { height: 100%; width: 0%; background: var(--accent); }
        .audio-time { font-size: 0.75rem; color: #94a3b8; min-width: 2.5rem; }
        .section-tabs { display: flex; flex-wrap: wrap; gap: 0.5rem; margin: 1.5rem 0; }
        .section-tabs a { padding: 0.6rem 1.2rem; border-radius: 0.85rem; border: 1px solid var(--line); text-decoration: none; font-weight: 700; font-size: 0.85rem; color: #94a3b8; }
        .section-tabs a.active { background: var(--accent); border-color: var(--accent); color: #fff; }
        .file-list { list-style: none; margin: 0; padding: 0; display: grid; gap: 0.75rem; }
        .file-list li { display: flex; align-items: center; gap: 1rem; padding: 1rem 1.25rem; border-radius: 1rem; border: 1px solid var(--line); background: var(--panel); }
        .file-icon { font-size: 1.4rem; }
        .file-meta { flex: 1; }
        .file-meta strong { display: block; color: #fff; }
        .file-meta span { font-size: 0.75rem; color: #64748b; text-transform: uppercase; letter-spacing: 0.08em; }
        .download { padding: 0.5rem 0.9rem; border-radius: 0.75rem; background: var(--accent); color: #fff; text-decoration: none; font-weight: 700; font-size: 0.8rem; }
        .two-columns { display: grid; gap: 2rem; grid-template-columns: minmax(0, 2fr) minmax(0, 1fr); }
        .app-footer { margin-top: 3rem; padding: 2rem 1rem; text-align: center; font-size: 0.85rem; color: #64748b; border-top: 1px solid var(--line); }
        @media (max-width: 768px) {
            .header-bar { padding: 0.85rem 1rem; }
            .timetable-link { display: none; }
            main { padding: 1.5rem 1rem; }
            .two-columns { grid-template-columns: 1fr; }
        }
"#;

const ADMIN_BASE_STYLES: &str = r#"
        :root { color-scheme: light; }
        body { font-family: "Helvetica Neue", Arial, sans-serif; margin: 0; background: #f8fafc; color: #0f172a; display: flex; min-height: 100vh; }
        aside.sidebar { width: 15rem; background: #0f172a; color: #e2e8f0; display: flex; flex-direction: column; }
        .sidebar-brand { padding: 1.5rem; border-bottom: 1px solid rgba(255, 255, 255, 0.08); font-weight: 700; letter-spacing: 0.2em; text-transform: uppercase; font-size: 0.85rem; }
        .sidebar-brand span { color: #f87171; }
        .sidebar nav { flex: 1; padding: 1rem; display: flex; flex-direction: column; gap: 0.3rem; }
        .sidebar nav a { padding: 0.7rem 1rem; border-radius: 0.7rem; color: #cbd5e1; text-decoration: none; font-size: 0.92rem; }
        .sidebar nav a:hover { background: rgba(255, 255, 255, 0.06); color: #fff; }
        .sidebar nav a.active { background: #dc2626; color: #fff; }
        .sidebar-footer { padding: 1rem; border-top: 1px solid rgba(255, 255, 255, 0.08); font-size: 0.8rem; color: #94a3b8; }
        .sidebar-footer form { margin-top: 0.6rem; }
        .sidebar-footer button { width: 100%; background: transparent; color: #f87171; border: 1px solid rgba(248, 113, 113, 0.4); }
        .sidebar-footer button:hover { background: rgba(248, 113, 113, 0.12); }
        main { flex: 1; padding: 2rem; box-sizing: border-box; overflow: auto; }
        .page-header h1 { margin: 0 0 0.35rem; font-size: 1.6rem; }
        .page-header p { margin: 0 0 1.5rem; color: #64748b; }
        .panel { background: #ffffff; border-radius: 12px; border: 1px solid #e2e8f0; padding: 1.5rem; box-shadow: 0 18px 40px rgba(15, 23, 42, 0.06); margin-bottom: 1.5rem; }
        .panel h2 { margin-top: 0; font-size: 1.15rem; }
        .flash { padding: 1rem 1.25rem; border-radius: 10px; margin-bottom: 1.5rem; font-weight: 600; border: 1px solid transparent; }
        .flash.success { background: #ecfdf3; border-color: #bbf7d0; color: #166534; }
        .flash.error { background: #fef2f2; border-color: #fecaca; color: #b91c1c; }
        .flash small { display: block; margin-top: 0.35rem; font-weight: 400; }
        .field { display: flex; flex-direction: column; gap: 0.35rem; margin-bottom: 1rem; }
        .field label { font-weight: 600; color: #0f172a; }
        .field input, .field select, .field textarea { padding: 0.75rem; border-radius: 8px; border: 1px solid #cbd5f5; background: #ffffff; color: #0f172a; font: inherit; }
        .field textarea { min-height: 7rem; }
        .field input:focus, .field select:focus, .field textarea:focus { outline: none; border-color: #2563eb; box-shadow: 0 0 0 3px rgba(37, 99, 235, 0.12); }
        .field.checkbox label { display: flex; align-items: center; gap: 0.5rem; font-weight: 500; }
        button { padding: 0.75rem 1.2rem; border: none; border-radius: 8px; background: #2563eb; color: #ffffff; font-weight: 600; cursor: pointer; transition: background 0.15s ease; }
        button:hover { background: #1d4ed8; }
        button:disabled { opacity: 0.6; cursor: not-allowed; }
        .btn-sm { padding: 0.45rem 0.8rem; font-size: 0.85rem; }
        .btn-secondary { background: #e2e8f0; color: #0f172a; }
        .btn-secondary:hover { background: #cbd5e1; }
        .btn-danger { background: #dc2626; }
        .btn-danger:hover { background: #b91c1c; }
        a.btn-link { color: #1d4ed8; font-weight: 600; text-decoration: none; font-size: 0.85rem; }
        table { width: 100%; border-collapse: collapse; background: #ffffff; border-radius: 12px; overflow: hidden; border: 1px solid #e2e8f0; }
        thead { background: #f1f5f9; }
        th, td { padding: 0.85rem 1rem; border-bottom: 1px solid #e2e8f0; text-align: left; vertical-align: top; }
        td.actions { display: flex; gap: 0.5rem; justify-content: flex-end; align-items: center; flex-wrap: wrap; }
        .inline-form { margin: 0; display: inline; }
        .badge { display: inline-flex; padding: 0.2rem 0.65rem; border-radius: 999px; font-size: 0.78rem; font-weight: 600; }
        .badge.active { background: #dcfce7; color: #166534; }
        .badge.inactive { background: #fee2e2; color: #b91c1c; }
        .selector { display: flex; gap: 0.75rem; align-items: flex-end; flex-wrap: wrap; margin-bottom: 1.5rem; }
        .selector .field { margin: 0; min-width: 16rem; }
        .stats-grid { display: grid; gap: 1rem; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); margin-bottom: 1.5rem; }
        .stat-card { background: #ffffff; border: 1px solid #e2e8f0; border-radius: 12px; padding: 1.25rem; }
        .stat-card span { display: block; color: #64748b; font-size: 0.85rem; }
        .stat-card strong { font-size: 2rem; }
        .muted { color: #64748b; font-size: 0.9rem; }
        .mode-switch { display: flex; gap: 0.75rem; margin-bottom: 1rem; }
        .mode-switch label { flex: 1; display: flex; align-items: center; justify-content: center; gap: 0.4rem; padding: 0.75rem; border-radius: 10px; border: 1px solid #cbd5e1; cursor: pointer; font-weight: 600; }
        .mode-switch label:has(input:checked) { background: #dc2626; color: #fff; border-color: #dc2626; }
        .recorder { display: flex; align-items: center; gap: 0.75rem; flex-wrap: wrap; margin-bottom: 1rem; }
        button.recording { background: #dc2626; animation: pulse 1s infinite; }
        @keyframes pulse { 50% { opacity: 0.6; } }
        .preview-image { max-width: 240px; border-radius: 10px; margin-top: 0.5rem; }
        .announcement-row img { max-width: 160px; border-radius: 8px; display: block; margin-top: 0.5rem; }
        .app-footer { margin-top: 3rem; text-align: center; font-size: 0.85rem; color: #94a3b8; }
        @media (max-width: 900px) {
            body { flex-direction: column; }
            aside.sidebar { width: 100%; }
            .sidebar nav { flex-direction: row; flex-wrap: wrap; }
            main { padding: 1.25rem; }
        }
"#;

pub struct PublicPageLayout<'a> {
    pub meta_title: &'a str,
    pub settings: &'a SiteSettings,
    pub body_html: Cow<'a, str>,
    pub body_scripts: Vec<Cow<'a, str>>,
}

pub fn render_public_page(layout: PublicPageLayout<'_>) -> String {
    let PublicPageLayout {
        meta_title,
        settings,
        body_html,
        body_scripts,
    } = layout;

    let site_title = settings.title();
    let title = if meta_title.is_empty() {
        escape_html(site_title)
    } else {
        format!("{} · {}", escape_html(meta_title), escape_html(site_title))
    };

    let timetable_html = settings
        .timetable()
        .map(|url| {
            format!(
                r#"<a class="timetable-link" href="{href}" target="_blank" rel="noopener noreferrer">📅 Emploi du temps</a>"#,
                href = escape_html(url),
            )
        })
        .unwrap_or_default();

    let scripts = std::iter::once(Cow::Borrowed(GESTURE_SCRIPT))
        .chain(body_scripts)
        .map(|script| script.into_owned())
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
{styles}
    </style>
</head>
<body>
    <header class="site-header">
        <div class="header-bar">
            <div class="brand">
                {logo}
                <a href="/" style="text-decoration:none;"><h1>{brand}</h1></a>
            </div>
            {timetable_html}
        </div>
    </header>
    <main>
{body_html}
    </main>
    {footer}
{scripts}
</body>
</html>"#,
        title = title,
        styles = PUBLIC_BASE_STYLES,
        logo = render_logo_button(site_title),
        brand = render_brand(site_title),
        timetable_html = timetable_html,
        body_html = body_html,
        footer = render_footer(site_title),
        scripts = scripts,
    )
}

/// Site title with its last word highlighted, e.g. `Platform <span>APEX</span>`.
fn render_brand(site_title: &str) -> String {
    match site_title.trim().rsplit_once(' ') {
        Some((head, last)) => format!("{} <span>{}</span>", escape_html(head), escape_html(last)),
        None => escape_html(site_title),
    }
}

/// Breadcrumb trail; the last entry is rendered as plain text.
pub fn render_breadcrumbs(entries: &[(&str, &str)]) -> String {
    let last = entries.len().saturating_sub(1);
    let items = entries
        .iter()
        .enumerate()
        .map(|(index, (href, label))| {
            if index == last {
                format!("<span>{}</span>", escape_html(label))
            } else {
                format!(
                    r#"<a href="{href}">{label}</a><span>›</span>"#,
                    href = escape_html(href),
                    label = escape_html(label),
                )
            }
        })
        .collect::<String>();
    format!(r#"<nav class="breadcrumbs">{items}</nav>"#)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminNav {
    Dashboard,
    Levels,
    Groups,
    Modules,
    Announcements,
    Files,
    Settings,
}

impl AdminNav {
    pub const ALL: [AdminNav; 7] = [
        AdminNav::Dashboard,
        AdminNav::Levels,
        AdminNav::Groups,
        AdminNav::Modules,
        AdminNav::Announcements,
        AdminNav::Files,
        AdminNav::Settings,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            AdminNav::Dashboard => "/admin/dashboard",
            AdminNav::Levels => "/admin/levels",
            AdminNav::Groups => "/admin/groups",
            AdminNav::Modules => "/admin/modules",
            AdminNav::Announcements => "/admin/announcements",
            AdminNav::Files => "/admin/files",
            AdminNav::Settings => "/admin/settings",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AdminNav::Dashboard => "Tableau de bord",
            AdminNav::Levels => "Niveaux",
            AdminNav::Groups => "Groupes",
            AdminNav::Modules => "Modules",
            AdminNav::Announcements => "Annonces",
            AdminNav::Files => "Fichiers",
            AdminNav::Settings => "Paramètres",
        }
    }
}

pub struct AdminPageLayout<'a> {
    pub meta_title: &'a str,
    pub page_heading: &'a str,
    pub page_note: &'a str,
    pub active: AdminNav,
    pub session: &'a AdminSession,
    pub flash_html: Cow<'a, str>,
    pub body_html: Cow<'a, str>,
    pub body_scripts: Vec<Cow<'a, str>>,
}

pub fn render_admin_page(layout: AdminPageLayout<'_>) -> String {
    let AdminPageLayout {
        meta_title,
        page_heading,
        page_note,
        active,
        session,
        flash_html,
        body_html,
        body_scripts,
    } = layout;

    let nav_links = AdminNav::ALL
        .iter()
        .map(|item| {
            format!(
                r#"<a href="{href}"{class}>{label}</a>"#,
                href = item.path(),
                class = if *item == active { r#" class="active""# } else { "" },
                label = item.label(),
            )
        })
        .collect::<String>();

    let scripts = [Cow::Borrowed(FORMS_SCRIPT), Cow::Borrowed(SESSION_SCRIPT)]
        .into_iter()
        .chain(body_scripts)
        .map(|script| script.into_owned())
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
    <meta charset="UTF-8">
    <title>{meta_title} · Administration</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="robots" content="noindex,nofollow">
    <style>
{styles}
    </style>
</head>
<body>
    <aside class="sidebar">
        <div class="sidebar-brand">Platform <span>APEX</span></div>
        <nav>{nav_links}</nav>
        <div class="sidebar-footer">
            <div>{email}</div>
            <form method="post" action="/admin/logout">
                <button type="submit">Déconnexion</button>
            </form>
        </div>
    </aside>
    <main>
        <div class="page-header">
            <h1>{page_heading}</h1>
            <p>{page_note}</p>
        </div>
        {flash_html}
{body_html}
        {footer}
    </main>
{scripts}
</body>
</html>"#,
        meta_title = escape_html(meta_title),
        styles = ADMIN_BASE_STYLES,
        nav_links = nav_links,
        email = escape_html(session.email()),
        page_heading = escape_html(page_heading),
        page_note = escape_html(page_note),
        flash_html = flash_html,
        body_html = body_html,
        footer = render_footer(DEFAULT_SITE_TITLE),
        scripts = scripts,
    )
}

pub fn render_login_page(error: Option<&str>, email: &str) -> String {
    let error_html = error
        .map(|message| format!(r#"<div class="flash error">{}</div>"#, escape_html(message)))
        .unwrap_or_default();
    let footer = render_footer(DEFAULT_SITE_TITLE);
    format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
    <meta charset="UTF-8">
    <title>Connexion · Administration</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="robots" content="noindex,nofollow">
    <style>
        :root {{ color-scheme: dark; }}
        body {{ font-family: "Helvetica Neue", Arial, sans-serif; display: flex; flex-direction: column; align-items: center; justify-content: center; min-height: 100vh; margin: 0; background: #050505; color: #e2e8f0; padding: 1.5rem; box-sizing: border-box; gap: 1.5rem; }}
        main {{ width: 100%; max-width: 420px; display: flex; flex-direction: column; align-items: center; gap: 1.5rem; }}
        .panel {{ background: rgba(255, 255, 255, 0.04); padding: 2.5rem 2.25rem; border-radius: 18px; width: 100%; border: 1px solid rgba(255, 255, 255, 0.08); box-sizing: border-box; }}
        h1 {{ margin: 0 0 0.5rem; font-size: 1.6rem; text-align: center; font-family: Georgia, serif; letter-spacing: 0.15em; text-transform: uppercase; }}
        h1 span {{ color: #dc2626; }}
        p.description {{ margin: 0 0 1.5rem; color: #94a3b8; text-align: center; font-size: 0.9rem; }}
        label {{ display: block; margin-top: 1.2rem; font-weight: 600; font-size: 0.85rem; color: #cbd5e1; }}
        input {{ width: 100%; padding: 0.85rem; margin-top: 0.5rem; border-radius: 10px; border: 1px solid rgba(255, 255, 255, 0.12); background: rgba(255, 255, 255, 0.05); color: #fff; font-size: 1rem; box-sizing: border-box; }}
        input:focus {{ outline: none; border-color: #dc2626; }}
        button {{ margin-top: 2rem; width: 100%; padding: 0.95rem; border: none; border-radius: 10px; background: #dc2626; color: #ffffff; font-weight: 700; font-size: 1rem; cursor: pointer; }}
        button:hover {{ background: #b91c1c; }}
        button:disabled {{ opacity: 0.6; }}
        .flash.error {{ padding: 0.85rem 1rem; border-radius: 10px; background: rgba(220, 38, 38, 0.12); border: 1px solid rgba(220, 38, 38, 0.4); color: #fca5a5; font-weight: 600; font-size: 0.9rem; }}
        .back {{ color: #64748b; font-size: 0.85rem; text-decoration: none; }}
        .app-footer {{ text-align: center; font-size: 0.8rem; color: #475569; }}
    </style>
</head>
<body>
    <main>
        <section class="panel">
            <h1>Platform <span>APEX</span></h1>
            <p class="description">Espace d'administration</p>
            {error_html}
            <form method="post" action="/admin/login" data-busy-label="Connexion...">
                <label for="email">Adresse e-mail</label>
                <input id="email" type="email" name="email" value="{email}" autocomplete="username" required>
                <label for="password">Mot de passe</label>
                <input id="password" type="password" name="password" autocomplete="current-password" required>
                <button type="submit">Se connecter</button>
            </form>
        </section>
        <a class="back" href="/">← Retour au site</a>
        {footer}
    </main>
{forms_script}
</body>
</html>"#,
        error_html = error_html,
        email = escape_html(email),
        footer = footer,
        forms_script = FORMS_SCRIPT,
    )
}

pub fn render_not_found_page(settings: &SiteSettings) -> String {
    render_public_page(PublicPageLayout {
        meta_title: "Page introuvable",
        settings,
        body_html: Cow::Borrowed(
            r#"<h2 class="page-title">Page introuvable</h2>
<p class="page-lead">Le contenu demandé n'existe pas ou a été supprimé.</p>
<a class="download" href="/">Retour à l'accueil</a>"#,
        ),
        body_scripts: Vec::new(),
    })
}

pub fn render_error_page(settings: &SiteSettings) -> String {
    render_public_page(PublicPageLayout {
        meta_title: "Erreur",
        settings,
        body_html: Cow::Borrowed(
            r#"<h2 class="page-title">Une erreur est survenue</h2>
<p class="page-lead">Le contenu n'a pas pu être chargé. Réessayez dans quelques instants.</p>
<a class="download" href="/">Retour à l'accueil</a>"#,
        ),
        body_scripts: Vec::new(),
    })
}

pub fn render_footer(site_title: &str) -> String {
    let current_year = Utc::now().year();
    format!(
        r#"<footer class="app-footer">© 2024-{year} {site}</footer>"#,
        year = current_year,
        site = escape_html(site_title),
    )
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Short French date used in listings, e.g. `12/03/2025 14:05`.
pub fn format_timestamp(timestamp: &chrono::DateTime<Utc>) -> String {
    timestamp.format("%d/%m/%Y %H:%M").to_string()
}
