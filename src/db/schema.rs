//! Table and index definitions plus the `initialize_database` entry point.
//!
//! Every statement is create-if-absent, so initialisation can run on every
//! start. Upgrades of older files (missing columns, the Templates category
//! rebuild) live in [`super::migrations`]; default rows live in
//! [`super::seed`].

use super::db::Db;
use super::error::DbResult;
use super::migrations::MigrationManager;
use super::seed;
use crate::libs::config::AppConfig;
use crate::libs::messages::Message;
use crate::msg_info;
use rusqlite::Connection;

// === REFERENCE DATA ===

pub const SCHEMA_COUNTRIES: &str = "CREATE TABLE IF NOT EXISTS Countries (
    country_id INTEGER PRIMARY KEY AUTOINCREMENT,
    country_name TEXT NOT NULL UNIQUE
)";

pub const SCHEMA_CITIES: &str = "CREATE TABLE IF NOT EXISTS Cities (
    city_id INTEGER PRIMARY KEY AUTOINCREMENT,
    country_id INTEGER NOT NULL REFERENCES Countries(country_id) ON DELETE CASCADE,
    city_name TEXT NOT NULL,
    UNIQUE (country_id, city_name)
)";

pub const SCHEMA_STATUS_SETTINGS: &str = "CREATE TABLE IF NOT EXISTS StatusSettings (
    status_id INTEGER PRIMARY KEY AUTOINCREMENT,
    status_name TEXT NOT NULL,
    status_type TEXT NOT NULL,
    color_hex TEXT,
    icon_name TEXT,
    default_duration_days INTEGER,
    is_archival_status INTEGER NOT NULL DEFAULT 0,
    is_completion_status INTEGER NOT NULL DEFAULT 0,
    sort_order INTEGER NOT NULL DEFAULT 0,
    UNIQUE (status_name, status_type)
)";

pub const SCHEMA_TEMPLATE_CATEGORIES: &str = "CREATE TABLE IF NOT EXISTS TemplateCategories (
    category_id INTEGER PRIMARY KEY AUTOINCREMENT,
    category_name TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_PARTNER_CATEGORIES: &str = "CREATE TABLE IF NOT EXISTS PartnerCategories (
    partner_category_id INTEGER PRIMARY KEY AUTOINCREMENT,
    category_name TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

// === PARTIES ===

pub const SCHEMA_USERS: &str = "CREATE TABLE IF NOT EXISTS Users (
    user_id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    salt TEXT NOT NULL,
    full_name TEXT,
    role TEXT NOT NULL DEFAULT 'member',
    is_active INTEGER NOT NULL DEFAULT 1,
    last_login_at TEXT,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_COMPANIES: &str = "CREATE TABLE IF NOT EXISTS Companies (
    company_id TEXT PRIMARY KEY,
    company_name TEXT NOT NULL,
    address TEXT,
    payment_info TEXT,
    logo_path TEXT,
    other_info TEXT,
    is_default INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_COMPANY_PERSONNEL: &str = "CREATE TABLE IF NOT EXISTS CompanyPersonnel (
    personnel_id INTEGER PRIMARY KEY AUTOINCREMENT,
    company_id TEXT NOT NULL REFERENCES Companies(company_id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    role TEXT NOT NULL,
    phone TEXT,
    email TEXT,
    created_at TEXT NOT NULL
)";

pub const SCHEMA_TEAM_MEMBERS: &str = "CREATE TABLE IF NOT EXISTS TeamMembers (
    team_member_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT UNIQUE REFERENCES Users(user_id) ON DELETE SET NULL,
    full_name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    role_or_title TEXT,
    department TEXT,
    phone_number TEXT,
    profile_picture_url TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    notes TEXT,
    hire_date TEXT,
    performance INTEGER NOT NULL DEFAULT 0,
    skills TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_CLIENTS: &str = "CREATE TABLE IF NOT EXISTS Clients (
    client_id TEXT PRIMARY KEY,
    client_name TEXT NOT NULL,
    company_name TEXT,
    primary_need_description TEXT,
    project_identifier TEXT,
    country_id INTEGER REFERENCES Countries(country_id),
    city_id INTEGER REFERENCES Cities(city_id),
    default_base_folder_path TEXT UNIQUE,
    status_id INTEGER REFERENCES StatusSettings(status_id),
    selected_languages TEXT,
    price REAL NOT NULL DEFAULT 0,
    notes TEXT,
    category TEXT,
    created_by_user_id TEXT REFERENCES Users(user_id) ON DELETE SET NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_CLIENT_NOTES: &str = "CREATE TABLE IF NOT EXISTS ClientNotes (
    note_id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id TEXT NOT NULL REFERENCES Clients(client_id) ON DELETE CASCADE,
    timestamp TEXT NOT NULL,
    note_text TEXT NOT NULL,
    user_id TEXT REFERENCES Users(user_id) ON DELETE SET NULL
)";

pub const SCHEMA_CONTACTS: &str = "CREATE TABLE IF NOT EXISTS Contacts (
    contact_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    given_name TEXT,
    family_name TEXT,
    email TEXT,
    phone TEXT,
    position TEXT,
    company_name TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_CLIENT_CONTACTS: &str = "CREATE TABLE IF NOT EXISTS ClientContacts (
    client_contact_id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id TEXT NOT NULL REFERENCES Clients(client_id) ON DELETE CASCADE,
    contact_id INTEGER NOT NULL REFERENCES Contacts(contact_id) ON DELETE CASCADE,
    is_primary_for_client INTEGER NOT NULL DEFAULT 0,
    can_receive_documents INTEGER NOT NULL DEFAULT 1,
    UNIQUE (client_id, contact_id)
)";

pub const SCHEMA_CONTACT_LISTS: &str = "CREATE TABLE IF NOT EXISTS ContactLists (
    list_id INTEGER PRIMARY KEY AUTOINCREMENT,
    list_name TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_CONTACT_LIST_MEMBERS: &str = "CREATE TABLE IF NOT EXISTS ContactListMembers (
    list_member_id INTEGER PRIMARY KEY AUTOINCREMENT,
    list_id INTEGER NOT NULL REFERENCES ContactLists(list_id) ON DELETE CASCADE,
    contact_id INTEGER NOT NULL REFERENCES Contacts(contact_id) ON DELETE CASCADE,
    added_at TEXT NOT NULL,
    UNIQUE (list_id, contact_id)
)";

pub const SCHEMA_PARTNERS: &str = "CREATE TABLE IF NOT EXISTS Partners (
    partner_id TEXT PRIMARY KEY,
    partner_name TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    address TEXT,
    location TEXT,
    website_url TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_PARTNER_CONTACTS: &str = "CREATE TABLE IF NOT EXISTS PartnerContacts (
    partner_contact_id INTEGER PRIMARY KEY AUTOINCREMENT,
    partner_id TEXT NOT NULL REFERENCES Partners(partner_id) ON DELETE CASCADE,
    contact_id INTEGER NOT NULL REFERENCES Contacts(contact_id) ON DELETE CASCADE,
    role_in_partner TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (partner_id, contact_id)
)";

pub const SCHEMA_PARTNER_CATEGORY_LINK: &str = "CREATE TABLE IF NOT EXISTS PartnerCategoryLink (
    partner_id TEXT NOT NULL REFERENCES Partners(partner_id) ON DELETE CASCADE,
    partner_category_id INTEGER NOT NULL REFERENCES PartnerCategories(partner_category_id) ON DELETE CASCADE,
    PRIMARY KEY (partner_id, partner_category_id)
)";

pub const SCHEMA_PARTNER_INTERACTIONS: &str = "CREATE TABLE IF NOT EXISTS PartnerInteractions (
    interaction_id INTEGER PRIMARY KEY AUTOINCREMENT,
    partner_id TEXT NOT NULL REFERENCES Partners(partner_id) ON DELETE CASCADE,
    interaction_date TEXT NOT NULL,
    interaction_type TEXT NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_FREIGHT_FORWARDERS: &str = "CREATE TABLE IF NOT EXISTS FreightForwarders (
    forwarder_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    contact_person TEXT,
    phone TEXT,
    email TEXT,
    address TEXT,
    services_offered TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_TRANSPORTERS: &str = "CREATE TABLE IF NOT EXISTS Transporters (
    transporter_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    contact_person TEXT,
    phone TEXT,
    email TEXT,
    address TEXT,
    service_area TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

// === COMMERCIAL ===

pub const SCHEMA_PRODUCTS: &str = "CREATE TABLE IF NOT EXISTS Products (
    product_id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_name TEXT NOT NULL,
    product_code TEXT,
    description TEXT,
    category TEXT,
    language_code TEXT NOT NULL DEFAULT 'fr',
    base_unit_price REAL NOT NULL DEFAULT 0 CHECK (base_unit_price >= 0),
    unit_of_measure TEXT,
    weight REAL,
    dimensions TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_PRODUCT_DIMENSIONS: &str = "CREATE TABLE IF NOT EXISTS ProductDimensions (
    product_id INTEGER PRIMARY KEY REFERENCES Products(product_id) ON DELETE CASCADE,
    dim_a TEXT,
    dim_b TEXT,
    dim_c TEXT,
    dim_d TEXT,
    dim_e TEXT,
    dim_f TEXT,
    dim_g TEXT,
    dim_h TEXT,
    dim_i TEXT,
    dim_j TEXT,
    technical_image_path TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_PRODUCT_EQUIVALENCIES: &str = "CREATE TABLE IF NOT EXISTS ProductEquivalencies (
    equivalence_id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id_a INTEGER NOT NULL REFERENCES Products(product_id) ON DELETE CASCADE,
    product_id_b INTEGER NOT NULL REFERENCES Products(product_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (product_id_a, product_id_b),
    CHECK (product_id_a < product_id_b)
)";

pub const SCHEMA_PRODUCT_MEDIA_LINKS: &str = "CREATE TABLE IF NOT EXISTS ProductMediaLinks (
    link_id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL REFERENCES Products(product_id) ON DELETE CASCADE,
    media_item_id TEXT NOT NULL,
    display_order INTEGER NOT NULL DEFAULT 0,
    alt_text TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (product_id, media_item_id)
)";

pub const SCHEMA_PROJECTS: &str = "CREATE TABLE IF NOT EXISTS Projects (
    project_id TEXT PRIMARY KEY,
    client_id TEXT NOT NULL REFERENCES Clients(client_id) ON DELETE CASCADE,
    project_name TEXT NOT NULL,
    description TEXT,
    start_date TEXT,
    deadline_date TEXT,
    budget REAL,
    status_id INTEGER REFERENCES StatusSettings(status_id),
    progress_percentage INTEGER NOT NULL DEFAULT 0,
    manager_team_member_id INTEGER REFERENCES TeamMembers(team_member_id) ON DELETE SET NULL,
    priority INTEGER NOT NULL DEFAULT 0,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_TASKS: &str = "CREATE TABLE IF NOT EXISTS Tasks (
    task_id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL REFERENCES Projects(project_id) ON DELETE CASCADE,
    task_name TEXT NOT NULL,
    description TEXT,
    status_id INTEGER REFERENCES StatusSettings(status_id),
    assignee_team_member_id INTEGER REFERENCES TeamMembers(team_member_id) ON DELETE SET NULL,
    reporter_team_member_id INTEGER REFERENCES TeamMembers(team_member_id) ON DELETE SET NULL,
    due_date TEXT,
    priority INTEGER NOT NULL DEFAULT 0,
    estimated_hours REAL,
    actual_hours_spent REAL,
    parent_task_id INTEGER REFERENCES Tasks(task_id) ON DELETE SET NULL,
    completed_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_CLIENT_PROJECT_PRODUCTS: &str = "CREATE TABLE IF NOT EXISTS ClientProjectProducts (
    client_project_product_id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id TEXT NOT NULL REFERENCES Clients(client_id) ON DELETE CASCADE,
    project_id TEXT REFERENCES Projects(project_id) ON DELETE CASCADE,
    product_id INTEGER NOT NULL REFERENCES Products(product_id) ON DELETE CASCADE,
    quantity REAL NOT NULL DEFAULT 1 CHECK (quantity >= 0),
    unit_price_override REAL CHECK (unit_price_override IS NULL OR unit_price_override >= 0),
    total_price_calculated REAL NOT NULL DEFAULT 0,
    serial_number TEXT,
    purchase_confirmed_at TEXT,
    added_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (client_id, project_id, product_id)
)";

pub const SCHEMA_CLIENT_DOCUMENTS: &str = "CREATE TABLE IF NOT EXISTS ClientDocuments (
    document_id TEXT PRIMARY KEY,
    client_id TEXT NOT NULL REFERENCES Clients(client_id) ON DELETE CASCADE,
    project_id TEXT REFERENCES Projects(project_id) ON DELETE SET NULL,
    document_name TEXT NOT NULL,
    file_name_on_disk TEXT NOT NULL,
    file_path_relative TEXT NOT NULL,
    document_type_generated TEXT,
    source_template_id INTEGER REFERENCES Templates(template_id) ON DELETE SET NULL,
    version_tag TEXT,
    notes TEXT,
    created_by_user_id TEXT REFERENCES Users(user_id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_INVOICES: &str = "CREATE TABLE IF NOT EXISTS Invoices (
    invoice_id TEXT PRIMARY KEY,
    client_id TEXT NOT NULL REFERENCES Clients(client_id) ON DELETE CASCADE,
    project_id TEXT REFERENCES Projects(project_id) ON DELETE SET NULL,
    document_id TEXT REFERENCES ClientDocuments(document_id) ON DELETE SET NULL,
    invoice_number TEXT NOT NULL UNIQUE,
    issue_date TEXT NOT NULL,
    due_date TEXT NOT NULL,
    total_amount REAL NOT NULL CHECK (total_amount >= 0),
    currency TEXT NOT NULL DEFAULT 'EUR',
    payment_status TEXT NOT NULL DEFAULT 'unpaid'
        CHECK (payment_status IN ('unpaid', 'partially paid', 'paid')),
    payment_date TEXT,
    payment_method TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

// === RECRUITMENT ===

pub const SCHEMA_JOB_OPENINGS: &str = "CREATE TABLE IF NOT EXISTS JobOpenings (
    job_opening_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    status_id INTEGER REFERENCES StatusSettings(status_id),
    department TEXT,
    location TEXT,
    created_by_user_id TEXT REFERENCES Users(user_id) ON DELETE SET NULL,
    closing_date TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_CANDIDATES: &str = "CREATE TABLE IF NOT EXISTS Candidates (
    candidate_id TEXT PRIMARY KEY,
    job_opening_id TEXT NOT NULL REFERENCES JobOpenings(job_opening_id) ON DELETE CASCADE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL,
    phone TEXT,
    resume_file_path TEXT,
    cover_letter_path TEXT,
    application_source TEXT,
    current_status TEXT NOT NULL DEFAULT 'Applied',
    notes TEXT,
    linkedin_profile_url TEXT,
    portfolio_url TEXT,
    years_of_experience INTEGER,
    application_date TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (job_opening_id, email)
)";

pub const SCHEMA_RECRUITMENT_STEPS: &str = "CREATE TABLE IF NOT EXISTS RecruitmentSteps (
    recruitment_step_id TEXT PRIMARY KEY,
    job_opening_id TEXT NOT NULL REFERENCES JobOpenings(job_opening_id) ON DELETE CASCADE,
    step_name TEXT NOT NULL,
    step_order INTEGER NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (job_opening_id, step_order)
)";

pub const SCHEMA_INTERVIEWS: &str = "CREATE TABLE IF NOT EXISTS Interviews (
    interview_id TEXT PRIMARY KEY,
    candidate_id TEXT NOT NULL REFERENCES Candidates(candidate_id) ON DELETE CASCADE,
    job_opening_id TEXT NOT NULL REFERENCES JobOpenings(job_opening_id) ON DELETE CASCADE,
    recruitment_step_id TEXT REFERENCES RecruitmentSteps(recruitment_step_id) ON DELETE SET NULL,
    interviewer_team_member_id INTEGER REFERENCES TeamMembers(team_member_id) ON DELETE SET NULL,
    scheduled_at TEXT NOT NULL,
    duration_minutes INTEGER,
    interview_type TEXT,
    location_or_link TEXT,
    status TEXT NOT NULL DEFAULT 'Scheduled',
    feedback_notes_overall TEXT,
    feedback_rating INTEGER,
    created_by_user_id TEXT REFERENCES Users(user_id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_CANDIDATE_PROGRESS: &str = "CREATE TABLE IF NOT EXISTS CandidateProgress (
    candidate_progress_id TEXT PRIMARY KEY,
    candidate_id TEXT NOT NULL REFERENCES Candidates(candidate_id) ON DELETE CASCADE,
    recruitment_step_id TEXT NOT NULL REFERENCES RecruitmentSteps(recruitment_step_id) ON DELETE CASCADE,
    status TEXT NOT NULL DEFAULT 'Pending',
    notes TEXT,
    completed_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (candidate_id, recruitment_step_id)
)";

// === INVENTORY ===

pub const SCHEMA_ITEM_LOCATIONS: &str = "CREATE TABLE IF NOT EXISTS ItemLocations (
    location_id TEXT PRIMARY KEY,
    location_name TEXT NOT NULL,
    parent_location_id TEXT REFERENCES ItemLocations(location_id) ON DELETE RESTRICT,
    location_type TEXT,
    description TEXT,
    visual_coordinates TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (location_name, parent_location_id)
)";

pub const SCHEMA_PRODUCT_STORAGE_LOCATIONS: &str = "CREATE TABLE IF NOT EXISTS ProductStorageLocations (
    product_storage_location_id TEXT PRIMARY KEY,
    product_id INTEGER NOT NULL REFERENCES Products(product_id) ON DELETE CASCADE,
    location_id TEXT NOT NULL REFERENCES ItemLocations(location_id) ON DELETE CASCADE,
    quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (product_id, location_id)
)";

// === TEMPLATES AND DOCUMENTS ===

pub const SCHEMA_TEMPLATES: &str = "CREATE TABLE IF NOT EXISTS Templates (
    template_id INTEGER PRIMARY KEY AUTOINCREMENT,
    template_name TEXT NOT NULL,
    template_type TEXT NOT NULL,
    description TEXT,
    base_file_name TEXT,
    language_code TEXT NOT NULL DEFAULT 'fr',
    is_default_for_type_lang INTEGER NOT NULL DEFAULT 0,
    category_id INTEGER REFERENCES TemplateCategories(category_id) ON DELETE SET NULL,
    content_definition TEXT,
    email_subject_template TEXT,
    email_variables_info TEXT,
    cover_page_config_json TEXT,
    document_mapping_config_json TEXT,
    raw_template_file_data BLOB,
    version TEXT NOT NULL DEFAULT '1.0',
    created_by_user_id TEXT REFERENCES Users(user_id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (template_name, template_type, language_code, version)
)";

pub const SCHEMA_COVER_PAGE_TEMPLATES: &str = "CREATE TABLE IF NOT EXISTS CoverPageTemplates (
    template_id TEXT PRIMARY KEY,
    template_name TEXT NOT NULL UNIQUE,
    description TEXT,
    default_title TEXT,
    default_subtitle TEXT,
    default_author TEXT,
    style_config_json TEXT,
    is_default_template INTEGER NOT NULL DEFAULT 0,
    created_by_user_id TEXT REFERENCES Users(user_id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_COVER_PAGES: &str = "CREATE TABLE IF NOT EXISTS CoverPages (
    cover_page_id TEXT PRIMARY KEY,
    cover_page_name TEXT,
    client_id TEXT REFERENCES Clients(client_id) ON DELETE CASCADE,
    project_id TEXT REFERENCES Projects(project_id) ON DELETE SET NULL,
    template_id TEXT REFERENCES CoverPageTemplates(template_id) ON DELETE SET NULL,
    title TEXT NOT NULL,
    subtitle TEXT,
    author_text TEXT,
    institution_text TEXT,
    department_text TEXT,
    document_type_text TEXT,
    document_version TEXT,
    creation_date TEXT,
    logo_name TEXT,
    logo_data BLOB,
    custom_style_config_json TEXT,
    created_by_user_id TEXT REFERENCES Users(user_id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

// === SUPPORT ===

pub const SCHEMA_SMTP_CONFIGS: &str = "CREATE TABLE IF NOT EXISTS SmtpConfigs (
    smtp_config_id INTEGER PRIMARY KEY AUTOINCREMENT,
    config_name TEXT NOT NULL UNIQUE,
    smtp_server TEXT NOT NULL,
    smtp_port INTEGER NOT NULL,
    username TEXT,
    password_encrypted TEXT,
    use_tls INTEGER NOT NULL DEFAULT 1,
    is_default INTEGER NOT NULL DEFAULT 0,
    sender_email_address TEXT NOT NULL,
    sender_display_name TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_APPLICATION_SETTINGS: &str = "CREATE TABLE IF NOT EXISTS ApplicationSettings (
    setting_key TEXT PRIMARY KEY,
    setting_value TEXT
)";

pub const SCHEMA_ACTIVITY_LOG: &str = "CREATE TABLE IF NOT EXISTS ActivityLog (
    log_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT REFERENCES Users(user_id) ON DELETE SET NULL,
    action_type TEXT NOT NULL,
    details TEXT,
    related_entity_type TEXT,
    related_entity_id TEXT,
    related_client_id TEXT REFERENCES Clients(client_id) ON DELETE SET NULL,
    ip_address TEXT,
    user_agent TEXT,
    created_at TEXT NOT NULL
)";

pub const SCHEMA_SCHEDULED_EMAILS: &str = "CREATE TABLE IF NOT EXISTS ScheduledEmails (
    scheduled_email_id INTEGER PRIMARY KEY AUTOINCREMENT,
    recipient_email TEXT NOT NULL,
    subject TEXT NOT NULL,
    body_html TEXT,
    body_text TEXT,
    scheduled_send_at TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'sent', 'failed', 'cancelled')),
    sent_at TEXT,
    error_message TEXT,
    related_client_id TEXT REFERENCES Clients(client_id) ON DELETE SET NULL,
    related_project_id TEXT REFERENCES Projects(project_id) ON DELETE SET NULL,
    created_by_user_id TEXT REFERENCES Users(user_id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_EMAIL_REMINDERS: &str = "CREATE TABLE IF NOT EXISTS EmailReminders (
    reminder_id INTEGER PRIMARY KEY AUTOINCREMENT,
    scheduled_email_id INTEGER NOT NULL REFERENCES ScheduledEmails(scheduled_email_id) ON DELETE CASCADE,
    reminder_type TEXT NOT NULL,
    reminder_send_at TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'sent', 'failed', 'cancelled')),
    created_at TEXT NOT NULL
)";

pub const SCHEMA_USER_GOOGLE_ACCOUNTS: &str = "CREATE TABLE IF NOT EXISTS UserGoogleAccounts (
    user_google_account_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES Users(user_id) ON DELETE CASCADE,
    google_account_id TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL,
    refresh_token TEXT,
    access_token TEXT,
    token_expiry TEXT,
    scopes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_CONTACT_SYNC_LOG: &str = "CREATE TABLE IF NOT EXISTS ContactSyncLog (
    sync_log_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_google_account_id TEXT NOT NULL REFERENCES UserGoogleAccounts(user_google_account_id) ON DELETE CASCADE,
    local_contact_id TEXT NOT NULL,
    local_contact_type TEXT NOT NULL,
    google_contact_id TEXT,
    etag TEXT,
    sync_status TEXT NOT NULL,
    sync_direction TEXT,
    error_message TEXT,
    last_sync_timestamp TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

// === EXPERIENCES ===

pub const SCHEMA_EXPERIENCES: &str = "CREATE TABLE IF NOT EXISTS Experiences (
    experience_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    experience_date TEXT,
    experience_type TEXT,
    user_id TEXT REFERENCES Users(user_id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub const SCHEMA_TAGS: &str = "CREATE TABLE IF NOT EXISTS Tags (
    tag_id INTEGER PRIMARY KEY AUTOINCREMENT,
    tag_name TEXT NOT NULL UNIQUE
)";

pub const SCHEMA_EXPERIENCE_TAGS: &str = "CREATE TABLE IF NOT EXISTS ExperienceTags (
    experience_id TEXT NOT NULL REFERENCES Experiences(experience_id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES Tags(tag_id) ON DELETE CASCADE,
    PRIMARY KEY (experience_id, tag_id)
)";

pub const SCHEMA_EXPERIENCE_RELATED_ENTITIES: &str = "CREATE TABLE IF NOT EXISTS ExperienceRelatedEntities (
    experience_related_entity_id INTEGER PRIMARY KEY AUTOINCREMENT,
    experience_id TEXT NOT NULL REFERENCES Experiences(experience_id) ON DELETE CASCADE,
    entity_type TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    UNIQUE (experience_id, entity_type, entity_id)
)";

pub const SCHEMA_EXPERIENCE_MEDIA: &str = "CREATE TABLE IF NOT EXISTS ExperienceMedia (
    experience_id TEXT NOT NULL REFERENCES Experiences(experience_id) ON DELETE CASCADE,
    media_item_id TEXT NOT NULL,
    display_order INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (experience_id, media_item_id)
)";

/// Creation order: referenced tables first.
pub const TABLES: &[&str] = &[
    SCHEMA_COUNTRIES,
    SCHEMA_CITIES,
    SCHEMA_STATUS_SETTINGS,
    SCHEMA_TEMPLATE_CATEGORIES,
    SCHEMA_PARTNER_CATEGORIES,
    SCHEMA_USERS,
    SCHEMA_COMPANIES,
    SCHEMA_COMPANY_PERSONNEL,
    SCHEMA_TEAM_MEMBERS,
    SCHEMA_CLIENTS,
    SCHEMA_CLIENT_NOTES,
    SCHEMA_CONTACTS,
    SCHEMA_CLIENT_CONTACTS,
    SCHEMA_CONTACT_LISTS,
    SCHEMA_CONTACT_LIST_MEMBERS,
    SCHEMA_PARTNERS,
    SCHEMA_PARTNER_CONTACTS,
    SCHEMA_PARTNER_CATEGORY_LINK,
    SCHEMA_PARTNER_INTERACTIONS,
    SCHEMA_FREIGHT_FORWARDERS,
    SCHEMA_TRANSPORTERS,
    SCHEMA_PRODUCTS,
    SCHEMA_PRODUCT_DIMENSIONS,
    SCHEMA_PRODUCT_EQUIVALENCIES,
    SCHEMA_PRODUCT_MEDIA_LINKS,
    SCHEMA_PROJECTS,
    SCHEMA_TASKS,
    SCHEMA_CLIENT_PROJECT_PRODUCTS,
    SCHEMA_TEMPLATES,
    SCHEMA_CLIENT_DOCUMENTS,
    SCHEMA_INVOICES,
    SCHEMA_COVER_PAGE_TEMPLATES,
    SCHEMA_COVER_PAGES,
    SCHEMA_JOB_OPENINGS,
    SCHEMA_CANDIDATES,
    SCHEMA_RECRUITMENT_STEPS,
    SCHEMA_INTERVIEWS,
    SCHEMA_CANDIDATE_PROGRESS,
    SCHEMA_ITEM_LOCATIONS,
    SCHEMA_PRODUCT_STORAGE_LOCATIONS,
    SCHEMA_SMTP_CONFIGS,
    SCHEMA_APPLICATION_SETTINGS,
    SCHEMA_ACTIVITY_LOG,
    SCHEMA_SCHEDULED_EMAILS,
    SCHEMA_EMAIL_REMINDERS,
    SCHEMA_USER_GOOGLE_ACCOUNTS,
    SCHEMA_CONTACT_SYNC_LOG,
    SCHEMA_EXPERIENCES,
    SCHEMA_TAGS,
    SCHEMA_EXPERIENCE_TAGS,
    SCHEMA_EXPERIENCE_RELATED_ENTITIES,
    SCHEMA_EXPERIENCE_MEDIA,
];

/// Indexes run after upgrades, since some cover columns older files lack.
pub const INDEXES: &[&str] = &[
    // Natural keys bind live products only, so a deleted name can be reused.
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_products_live_name ON Products(product_name, language_code) WHERE is_deleted = 0",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_products_live_code ON Products(product_code) WHERE is_deleted = 0",
    "CREATE INDEX IF NOT EXISTS idx_products_active ON Products(is_active, is_deleted)",
    "CREATE INDEX IF NOT EXISTS idx_cities_country ON Cities(country_id)",
    "CREATE INDEX IF NOT EXISTS idx_clients_status ON Clients(status_id)",
    "CREATE INDEX IF NOT EXISTS idx_clients_country ON Clients(country_id)",
    "CREATE INDEX IF NOT EXISTS idx_clients_deleted ON Clients(is_deleted)",
    "CREATE INDEX IF NOT EXISTS idx_client_notes_client ON ClientNotes(client_id)",
    "CREATE INDEX IF NOT EXISTS idx_projects_client ON Projects(client_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_project ON Tasks(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_cpp_client ON ClientProjectProducts(client_id)",
    "CREATE INDEX IF NOT EXISTS idx_cpp_project ON ClientProjectProducts(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_invoices_client ON Invoices(client_id)",
    "CREATE INDEX IF NOT EXISTS idx_invoices_issue_date ON Invoices(issue_date)",
    "CREATE INDEX IF NOT EXISTS idx_invoices_status ON Invoices(payment_status)",
    "CREATE INDEX IF NOT EXISTS idx_templates_category ON Templates(category_id)",
    "CREATE INDEX IF NOT EXISTS idx_templates_type_lang ON Templates(template_type, language_code)",
    "CREATE INDEX IF NOT EXISTS idx_candidates_job ON Candidates(job_opening_id)",
    "CREATE INDEX IF NOT EXISTS idx_interviews_candidate ON Interviews(candidate_id)",
    "CREATE INDEX IF NOT EXISTS idx_item_locations_parent ON ItemLocations(parent_location_id)",
    "CREATE INDEX IF NOT EXISTS idx_psl_location ON ProductStorageLocations(location_id)",
    "CREATE INDEX IF NOT EXISTS idx_activity_created ON ActivityLog(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_scheduled_send_at ON ScheduledEmails(status, scheduled_send_at)",
    "CREATE INDEX IF NOT EXISTS idx_experience_entities ON ExperienceRelatedEntities(entity_type, entity_id)",
    // At most one default per scope.
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_companies_single_default ON Companies(is_default) WHERE is_default = 1",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_smtp_single_default ON SmtpConfigs(is_default) WHERE is_default = 1",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_cover_templates_single_default ON CoverPageTemplates(is_default_template) WHERE is_default_template = 1",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_templates_single_default ON Templates(template_type, language_code) WHERE is_default_for_type_lang = 1",
];

pub fn create_tables(conn: &Connection) -> DbResult<()> {
    for ddl in TABLES {
        conn.execute(ddl, [])?;
    }
    Ok(())
}

pub fn create_indexes(conn: &Connection) -> DbResult<()> {
    for ddl in INDEXES {
        conn.execute(ddl, [])?;
    }
    Ok(())
}

/// Creates or upgrades the schema and seeds default rows. Idempotent.
///
/// Order matters for older files: tables, then upgrades (which may add the
/// columns indexes cover), then indexes, then seed data.
pub fn initialize_database(db: &Db, config: &AppConfig) -> DbResult<()> {
    db.with_connection(|conn| {
        let tx = conn.transaction()?;
        create_tables(&tx)?;
        tx.commit()?;

        MigrationManager::new().run_migrations(conn)?;

        let tx = conn.transaction()?;
        create_indexes(&tx)?;
        seed::seed_defaults(&tx, config)?;
        tx.commit()?;
        Ok(())
    })?;

    msg_info!(Message::DatabaseInitialized(db.describe()));
    Ok(())
}
