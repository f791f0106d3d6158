//! Default rows inserted by `initialize_database`. Every step is idempotent.

use super::db::Session;
use super::documents::NewCoverPageTemplate;
use super::error::DbResult;
use super::migrations::MigrationManager;
use super::rows::now_iso;
use super::settings::{KEY_DEFAULT_LANGUAGE, KEY_SEEDED_VERSION};
use super::users::{NewUser, Role};
use crate::libs::config::AppConfig;
use crate::libs::messages::Message;
use crate::{msg_debug, msg_info};
use rusqlite::{params, Connection};

struct StatusSeed {
    name: &'static str,
    status_type: &'static str,
    color: &'static str,
    icon: &'static str,
    duration_days: Option<i64>,
    archival: bool,
    completion: bool,
}

const fn status(
    name: &'static str,
    status_type: &'static str,
    color: &'static str,
    icon: &'static str,
    duration_days: Option<i64>,
    archival: bool,
    completion: bool,
) -> StatusSeed {
    StatusSeed {
        name,
        status_type,
        color,
        icon,
        duration_days,
        archival,
        completion,
    }
}

const STATUS_CATALOGUE: &[StatusSeed] = &[
    status("En cours", "Client", "#3498db", "view-refresh", Some(30), false, false),
    status("Prospect", "Client", "#f1c40f", "user-available", Some(15), false, false),
    status("Prospect (Proforma Envoyé)", "Client", "#e67e22", "document-send", Some(7), false, false),
    status("Actif", "Client", "#2ecc71", "emblem-default", None, false, false),
    status("Vendu", "Client", "#27ae60", "emblem-ok", None, false, true),
    status("Urgent", "Client", "#e74c3c", "dialog-warning", Some(3), false, false),
    status("Archivé", "Client", "#95a5a6", "archive", None, true, false),
    status("Planning", "Project", "#1abc9c", "view-calendar", Some(14), false, false),
    status("En cours", "Project", "#3498db", "view-refresh", None, false, false),
    status("En attente", "Project", "#f39c12", "media-playback-pause", None, false, false),
    status("Terminé", "Project", "#2ecc71", "emblem-ok", None, false, true),
    status("Annulé", "Project", "#7f8c8d", "process-stop", None, true, false),
    status("Archivé", "Project", "#95a5a6", "archive", None, true, false),
    status("To Do", "Task", "#bdc3c7", "view-list", None, false, false),
    status("In Progress", "Task", "#3498db", "view-refresh", None, false, false),
    status("Blocked", "Task", "#e74c3c", "dialog-error", None, false, false),
    status("Done", "Task", "#2ecc71", "emblem-ok", None, false, true),
    status("Cancelled", "Task", "#7f8c8d", "process-stop", None, true, false),
    status("Open", "JobOpening", "#2ecc71", "document-open", None, false, false),
    status("On Hold", "JobOpening", "#f39c12", "media-playback-pause", None, false, false),
    status("Closed", "JobOpening", "#95a5a6", "archive", None, true, true),
];

const TEMPLATE_CATEGORIES: &[(&str, &str)] = &[
    ("General", "General purpose templates"),
    ("Document Utilitaires", "Utility documents such as contact pages and packing lists"),
    ("Modèles Email", "Templates used to compose emails"),
];

struct CoverSeed {
    name: &'static str,
    description: &'static str,
    title: &'static str,
    style: &'static str,
}

const COVER_PAGE_TEMPLATES: &[CoverSeed] = &[
    CoverSeed {
        name: "Standard Report Cover",
        description: "Plain report cover with title, subtitle and author",
        title: "Report Title",
        style: r##"{"title_font_size": 28, "subtitle_font_size": 18, "primary_color": "#2c3e50", "logo_position": "top_center"}"##,
    },
    CoverSeed {
        name: "Technical Document Cover",
        description: "Cover for specifications and technical manuals",
        title: "Technical Specification",
        style: r##"{"title_font_size": 24, "subtitle_font_size": 16, "primary_color": "#34495e", "logo_position": "top_left"}"##,
    },
    CoverSeed {
        name: "Proposal Cover",
        description: "Commercial proposal cover",
        title: "Project Proposal",
        style: r##"{"title_font_size": 30, "subtitle_font_size": 18, "primary_color": "#16a085", "logo_position": "top_right"}"##,
    },
];

pub fn seed_defaults(conn: &Connection, config: &AppConfig) -> DbResult<()> {
    seed_statuses(conn)?;
    seed_template_categories(conn)?;
    seed_admin_user(conn, config)?;
    seed_cover_page_templates(conn)?;
    seed_settings(conn, config)?;
    Ok(())
}

fn seed_statuses(conn: &Connection) -> DbResult<()> {
    let mut inserted = 0;
    let mut order_in_type = 0;
    let mut previous_type = "";
    for seed in STATUS_CATALOGUE {
        if seed.status_type != previous_type {
            previous_type = seed.status_type;
            order_in_type = 0;
        }
        inserted += conn.execute(
            "INSERT OR IGNORE INTO StatusSettings
                (status_name, status_type, color_hex, icon_name, default_duration_days, is_archival_status, is_completion_status, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                seed.name,
                seed.status_type,
                seed.color,
                seed.icon,
                seed.duration_days,
                seed.archival,
                seed.completion,
                order_in_type
            ],
        )?;
        order_in_type += 1;
    }
    if inserted > 0 {
        msg_info!(Message::StatusesSeeded(inserted));
    }
    Ok(())
}

fn seed_template_categories(conn: &Connection) -> DbResult<()> {
    let now = now_iso();
    let mut inserted = 0;
    for (name, description) in TEMPLATE_CATEGORIES {
        inserted += conn.execute(
            "INSERT OR IGNORE INTO TemplateCategories (category_name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![name, description, now],
        )?;
    }
    if inserted > 0 {
        msg_info!(Message::TemplateCategoriesSeeded(inserted));
    }
    Ok(())
}

fn seed_admin_user(conn: &Connection, config: &AppConfig) -> DbResult<()> {
    let users: i64 = conn.query_row("SELECT COUNT(*) FROM Users", [], |row| row.get(0))?;
    if users > 0 {
        return Ok(());
    }

    Session::within(conn).users().add(&NewUser {
        username: config.default_admin_username.clone(),
        email: config.default_admin_email.clone(),
        password: config.default_admin_password.clone(),
        full_name: Some("Administrator".to_string()),
        role: Role::Admin,
    })?;
    msg_info!(Message::AdminUserSeeded(config.default_admin_username.clone()));
    Ok(())
}

fn seed_cover_page_templates(conn: &Connection) -> DbResult<()> {
    let repo = Session::within(conn).cover_page_templates();
    let mut inserted = 0;
    for seed in COVER_PAGE_TEMPLATES {
        if repo.get_by_name(seed.name)?.is_some() {
            continue;
        }
        repo.add(&NewCoverPageTemplate {
            template_name: seed.name.to_string(),
            description: Some(seed.description.to_string()),
            default_title: Some(seed.title.to_string()),
            style_config_json: Some(seed.style.to_string()),
            ..Default::default()
        })?;
        inserted += 1;
    }

    if repo.get_default()?.is_none() {
        if let Some(first) = repo.get_by_name(COVER_PAGE_TEMPLATES[0].name)? {
            repo.set_default(&first.template_id)?;
        }
    }
    if inserted > 0 {
        msg_info!(Message::CoverPageTemplatesSeeded(inserted));
    }
    Ok(())
}

fn seed_settings(conn: &Connection, config: &AppConfig) -> DbResult<()> {
    let settings = Session::within(conn).settings();
    if settings.get(KEY_DEFAULT_LANGUAGE)?.is_none() {
        settings.set(KEY_DEFAULT_LANGUAGE, &config.default_language)?;
    }

    let version = MigrationManager::new().latest_version().to_string();
    settings.set(KEY_SEEDED_VERSION, &version)?;
    msg_debug!(Message::SchemaVersionRecorded(version));
    msg_debug!(Message::SettingsSeeded);
    Ok(())
}
