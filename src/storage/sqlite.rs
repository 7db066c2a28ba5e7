//! Embedded `SQLite` content store.
//!
//! Backs the search and notify pipelines with a single-file database.
//! Reads go through the [`ContentStore`] trait; the write side is a small
//! inherent API used by seeding, signup intake, and the status command.

use crate::models::{
    AppStage, ContentKind, PublishStatus, Recipient, SearchHit, SignupStatus, StatusSignal,
    is_valid_email,
};
use crate::storage::ContentStore;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tracing::instrument;

/// Helper to acquire the connection mutex with poison recovery.
///
/// A poisoned mutex means a previous caller panicked mid-operation. No
/// multi-statement invariant spans a panic here, so the connection is still
/// usable; recover the guard and count the event.
fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("content store mutex was poisoned, recovering");
            metrics::counter!("store_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Escapes SQL LIKE wildcards in a string.
///
/// `SQLite` LIKE patterns treat `%` as "any characters" and `_` as "single
/// character". Query text containing these characters must match literally,
/// so they are escaped with `\` and every LIKE clause carries `ESCAPE '\'`.
fn escape_like_wildcards(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' | '_' | '\\' => {
                result.push('\\');
                result.push(c);
            },
            _ => result.push(c),
        }
    }
    result
}

/// Builds a contains-anywhere LIKE pattern from raw query text.
fn contains_pattern(text: &str) -> String {
    format!("%{}%", escape_like_wildcards(text))
}

/// Clamps a row limit into an `SQLite`-bindable integer.
fn bind_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn timestamp_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// A blog post to be inserted.
#[derive(Debug, Clone)]
pub struct NewBlogPost {
    /// Post title.
    pub title: String,
    /// URL slug, unique across posts.
    pub slug: String,
    /// Short summary shown in listings.
    pub excerpt: Option<String>,
    /// Full body text.
    pub content: String,
    /// Publication status.
    pub status: PublishStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl NewBlogPost {
    /// Creates a draft post created now.
    pub fn new(
        title: impl Into<String>,
        slug: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            slug: slug.into(),
            excerpt: None,
            content: content.into(),
            status: PublishStatus::Draft,
            created_at: Utc::now(),
        }
    }

    /// Sets the excerpt.
    #[must_use]
    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = Some(excerpt.into());
        self
    }

    /// Sets the publication status.
    #[must_use]
    pub fn with_status(mut self, status: PublishStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the creation time.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// A webinar to be inserted.
#[derive(Debug, Clone)]
pub struct NewWebinar {
    /// Webinar title.
    pub title: String,
    /// Description shown in listings.
    pub description: Option<String>,
    /// Whether the webinar is publicly visible.
    pub active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl NewWebinar {
    /// Creates an active webinar created now.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the visibility flag.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Sets the creation time.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// A research app to be inserted.
#[derive(Debug, Clone)]
pub struct NewApp {
    /// App name.
    pub name: String,
    /// Description shown in listings.
    pub description: Option<String>,
    /// Lifecycle stage.
    pub stage: AppStage,
    /// Intended audience, free text.
    pub target_audience: Option<String>,
    /// Whether the app is publicly visible.
    pub active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl NewApp {
    /// Creates an active in-development app created now.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            stage: AppStage::Development,
            target_audience: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the lifecycle stage.
    #[must_use]
    pub fn with_stage(mut self, stage: AppStage) -> Self {
        self.stage = stage;
        self
    }

    /// Sets the target audience.
    #[must_use]
    pub fn with_target_audience(mut self, audience: impl Into<String>) -> Self {
        self.target_audience = Some(audience.into());
        self
    }

    /// Sets the visibility flag.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Sets the creation time.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// An early-access signup to be inserted.
///
/// New signups always start in [`SignupStatus::Pending`] review.
#[derive(Debug, Clone)]
pub struct NewSignup {
    /// App the signup is for.
    pub app_id: i64,
    /// Contact address.
    pub email: String,
    /// Display name used for personalization.
    pub name: Option<String>,
}

impl NewSignup {
    /// Creates a signup.
    pub fn new(app_id: i64, email: impl Into<String>) -> Self {
        Self {
            app_id,
            email: email.into(),
            name: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// SQLite-backed [`ContentStore`].
pub struct SqliteStore {
    /// Connection to the `SQLite` database.
    conn: Mutex<Connection>,
    /// Path to the `SQLite` database (None for in-memory).
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens (or creates) a store at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = Connection::open(&db_path).map_err(|e| Error::OperationFailed {
            operation: "open_store".to_string(),
            cause: e.to_string(),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };

        store.initialize()?;
        Ok(store)
    }

    /// Creates an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
            operation: "open_store_memory".to_string(),
            cause: e.to_string(),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };

        store.initialize()?;
        Ok(store)
    }

    /// Returns the database path.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Initializes the database schema.
    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);

        // Enable WAL mode for better concurrent read performance.
        // pragma_update returns a row (journal_mode answers with a string),
        // so the result is deliberately ignored.
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let _ = conn.pragma_update(None, "synchronous", "NORMAL");

        conn.execute(
            "CREATE TABLE IF NOT EXISTS blog_posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                excerpt TEXT,
                content TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'draft',
                created_at INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "create_blog_posts_table".to_string(),
            cause: e.to_string(),
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS webinars (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "create_webinars_table".to_string(),
            cause: e.to_string(),
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS apps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL DEFAULT 'development',
                target_audience TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "create_apps_table".to_string(),
            cause: e.to_string(),
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS early_access_signups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                app_id INTEGER NOT NULL REFERENCES apps(id),
                email TEXT NOT NULL,
                name TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at INTEGER NOT NULL,
                UNIQUE(app_id, email)
            )",
            [],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "create_signups_table".to_string(),
            cause: e.to_string(),
        })?;

        Self::create_indexes(&conn);

        Ok(())
    }

    /// Creates indexes for the common query patterns.
    fn create_indexes(conn: &Connection) {
        // Visibility filters run on every search request
        let _ = conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_blog_posts_status ON blog_posts(status)",
            [],
        );

        let _ = conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_blog_posts_created_at ON blog_posts(created_at DESC)",
            [],
        );

        let _ = conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_webinars_active ON webinars(is_active)",
            [],
        );

        let _ = conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_apps_active ON apps(is_active)",
            [],
        );

        // Recipient resolution filters on (app_id, status)
        let _ = conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_signups_app_status
             ON early_access_signups(app_id, status)",
            [],
        );
    }

    /// Inserts a blog post, returning its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the slug is already taken, or
    /// [`Error::OperationFailed`] if the insert fails.
    #[instrument(skip(self, post), fields(slug = %post.slug))]
    pub fn add_blog_post(&self, post: &NewBlogPost) -> Result<i64> {
        let conn = acquire_lock(&self.conn);

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM blog_posts WHERE slug = ?1",
                params![post.slug],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::OperationFailed {
                operation: "check_slug".to_string(),
                cause: e.to_string(),
            })?;
        if existing.is_some() {
            return Err(Error::InvalidInput(format!(
                "blog post slug '{}' already exists",
                post.slug
            )));
        }

        conn.execute(
            "INSERT INTO blog_posts (title, slug, excerpt, content, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                post.title,
                post.slug,
                post.excerpt.as_deref(),
                post.content,
                post.status.as_str(),
                post.created_at.timestamp()
            ],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "insert_blog_post".to_string(),
            cause: e.to_string(),
        })?;

        Ok(conn.last_insert_rowid())
    }

    /// Inserts a webinar, returning its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the insert fails.
    #[instrument(skip(self, webinar), fields(title = %webinar.title))]
    pub fn add_webinar(&self, webinar: &NewWebinar) -> Result<i64> {
        let conn = acquire_lock(&self.conn);

        conn.execute(
            "INSERT INTO webinars (title, description, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                webinar.title,
                webinar.description.as_deref(),
                webinar.active,
                webinar.created_at.timestamp()
            ],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "insert_webinar".to_string(),
            cause: e.to_string(),
        })?;

        Ok(conn.last_insert_rowid())
    }

    /// Inserts an app, returning its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the insert fails.
    #[instrument(skip(self, app), fields(name = %app.name))]
    pub fn add_app(&self, app: &NewApp) -> Result<i64> {
        let conn = acquire_lock(&self.conn);

        conn.execute(
            "INSERT INTO apps (name, description, status, target_audience, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                app.name,
                app.description.as_deref(),
                app.stage.as_str(),
                app.target_audience.as_deref(),
                app.active,
                app.created_at.timestamp()
            ],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "insert_app".to_string(),
            cause: e.to_string(),
        })?;

        Ok(conn.last_insert_rowid())
    }

    /// Registers an early-access signup in pending status, returning its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the app does not exist or is not
    /// visible, [`Error::InvalidInput`] if the address is malformed or
    /// already signed up, or [`Error::OperationFailed`] if the insert fails.
    #[instrument(skip(self, signup), fields(app_id = signup.app_id))]
    pub fn add_signup(&self, signup: &NewSignup) -> Result<i64> {
        if !is_valid_email(&signup.email) {
            return Err(Error::InvalidInput(format!(
                "invalid email address: {}",
                signup.email
            )));
        }

        let conn = acquire_lock(&self.conn);

        let app: Option<i64> = conn
            .query_row(
                "SELECT id FROM apps WHERE id = ?1 AND is_active = 1",
                params![signup.app_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::OperationFailed {
                operation: "check_app".to_string(),
                cause: e.to_string(),
            })?;
        if app.is_none() {
            return Err(Error::NotFound(format!("app {} not found", signup.app_id)));
        }

        let duplicate: Option<i64> = conn
            .query_row(
                "SELECT id FROM early_access_signups WHERE app_id = ?1 AND email = ?2",
                params![signup.app_id, signup.email],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::OperationFailed {
                operation: "check_signup".to_string(),
                cause: e.to_string(),
            })?;
        if duplicate.is_some() {
            return Err(Error::InvalidInput(
                "email already signed up for this app".to_string(),
            ));
        }

        conn.execute(
            "INSERT INTO early_access_signups (app_id, email, name, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                signup.app_id,
                signup.email,
                signup.name.as_deref(),
                SignupStatus::Pending.as_str(),
                Utc::now().timestamp()
            ],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "insert_signup".to_string(),
            cause: e.to_string(),
        })?;

        Ok(conn.last_insert_rowid())
    }

    /// Moves a signup to a new review status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the signup does not exist, or
    /// [`Error::OperationFailed`] if the update fails.
    #[instrument(skip(self), fields(signup_id, status = status.as_str()))]
    pub fn set_signup_status(&self, signup_id: i64, status: SignupStatus) -> Result<()> {
        let conn = acquire_lock(&self.conn);

        let changed = conn
            .execute(
                "UPDATE early_access_signups SET status = ?1 WHERE id = ?2",
                params![status.as_str(), signup_id],
            )
            .map_err(|e| Error::OperationFailed {
                operation: "update_signup_status".to_string(),
                cause: e.to_string(),
            })?;

        if changed == 0 {
            return Err(Error::NotFound(format!("signup {signup_id} not found")));
        }
        Ok(())
    }

    /// Counts signups, optionally restricted to one review status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the query fails.
    pub fn count_signups(&self, status: Option<SignupStatus>) -> Result<u64> {
        let conn = acquire_lock(&self.conn);

        let count: i64 = match status {
            Some(status) => conn.query_row(
                "SELECT COUNT(*) FROM early_access_signups WHERE status = ?1",
                params![status.as_str()],
                |row| row.get(0),
            ),
            None => conn.query_row("SELECT COUNT(*) FROM early_access_signups", [], |row| {
                row.get(0)
            }),
        }
        .map_err(|e| Error::OperationFailed {
            operation: "count_signups".to_string(),
            cause: e.to_string(),
        })?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn record_operation_metrics(
        &self,
        operation: &'static str,
        start: Instant,
        status: &'static str,
    ) {
        metrics::counter!(
            "content_store_operations_total",
            "backend" => "sqlite",
            "operation" => operation,
            "status" => status
        )
        .increment(1);
        metrics::histogram!(
            "content_store_operation_duration_ms",
            "backend" => "sqlite",
            "operation" => operation,
            "status" => status
        )
        .record(start.elapsed().as_secs_f64() * 1000.0);
    }
}

fn query_blog_hits(conn: &Connection, pattern: &str, limit: i64) -> rusqlite::Result<Vec<SearchHit>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, excerpt, slug, created_at, status
         FROM blog_posts
         WHERE status = 'published'
           AND (title LIKE ?1 ESCAPE '\\'
                OR excerpt LIKE ?1 ESCAPE '\\'
                OR content LIKE ?1 ESCAPE '\\')
         ORDER BY created_at DESC, id DESC
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![pattern, limit], |row| {
        let excerpt: Option<String> = row.get(2)?;
        let slug: String = row.get(3)?;
        let status: String = row.get(5)?;
        let mut hit = SearchHit::new(
            row.get(0)?,
            ContentKind::Blog,
            row.get::<_, String>(1)?,
            timestamp_to_datetime(row.get(4)?),
            StatusSignal::publication(status),
        )
        .with_slug(slug);
        if let Some(excerpt) = excerpt {
            hit = hit.with_excerpt(excerpt);
        }
        Ok(hit)
    })?;
    rows.collect()
}

fn query_webinar_hits(
    conn: &Connection,
    pattern: &str,
    limit: i64,
) -> rusqlite::Result<Vec<SearchHit>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description, is_active, created_at
         FROM webinars
         WHERE is_active = 1
           AND (title LIKE ?1 ESCAPE '\\' OR description LIKE ?1 ESCAPE '\\')
         ORDER BY created_at DESC, id DESC
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![pattern, limit], |row| {
        let description: Option<String> = row.get(2)?;
        let active: bool = row.get(3)?;
        let mut hit = SearchHit::new(
            row.get(0)?,
            ContentKind::Webinar,
            row.get::<_, String>(1)?,
            timestamp_to_datetime(row.get(4)?),
            StatusSignal::Active(active),
        );
        if let Some(description) = description {
            hit = hit.with_excerpt(description);
        }
        Ok(hit)
    })?;
    rows.collect()
}

fn query_app_hits(conn: &Connection, pattern: &str, limit: i64) -> rusqlite::Result<Vec<SearchHit>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, status, created_at
         FROM apps
         WHERE is_active = 1
           AND (name LIKE ?1 ESCAPE '\\'
                OR description LIKE ?1 ESCAPE '\\'
                OR target_audience LIKE ?1 ESCAPE '\\')
         ORDER BY created_at DESC, id DESC
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![pattern, limit], |row| {
        let description: Option<String> = row.get(2)?;
        let stage: String = row.get(3)?;
        let mut hit = SearchHit::new(
            row.get(0)?,
            ContentKind::App,
            row.get::<_, String>(1)?,
            timestamp_to_datetime(row.get(4)?),
            StatusSignal::stage(stage),
        );
        if let Some(description) = description {
            hit = hit.with_excerpt(description);
        }
        Ok(hit)
    })?;
    rows.collect()
}

impl ContentStore for SqliteStore {
    #[instrument(
        skip(self, query_text),
        fields(operation = "fetch_public_hits", backend = "sqlite", kind = kind.as_str(), limit)
    )]
    fn fetch_public_hits(
        &self,
        kind: ContentKind,
        query_text: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let start = Instant::now();
        let result = (|| {
            let conn = acquire_lock(&self.conn);
            let pattern = contains_pattern(query_text);
            match kind {
                ContentKind::Blog => query_blog_hits(&conn, &pattern, bind_limit(limit)),
                ContentKind::Webinar => query_webinar_hits(&conn, &pattern, bind_limit(limit)),
                ContentKind::App => query_app_hits(&conn, &pattern, bind_limit(limit)),
            }
            .map_err(|e| Error::StoreUnavailable {
                cause: format!("{} fetch failed: {e}", kind.as_str()),
            })
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        self.record_operation_metrics("fetch_public_hits", start, status);
        result
    }

    #[instrument(
        skip(self, query_text),
        fields(operation = "suggest_titles", backend = "sqlite", kind = kind.as_str(), limit)
    )]
    fn suggest_titles(
        &self,
        kind: ContentKind,
        query_text: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        let start = Instant::now();
        let result = (|| {
            let conn = acquire_lock(&self.conn);
            let pattern = contains_pattern(query_text);
            let sql = match kind {
                ContentKind::Blog => {
                    "SELECT title FROM blog_posts
                     WHERE status = 'published' AND title LIKE ?1 ESCAPE '\\'
                     ORDER BY id LIMIT ?2"
                },
                ContentKind::Webinar => {
                    "SELECT title FROM webinars
                     WHERE is_active = 1 AND title LIKE ?1 ESCAPE '\\'
                     ORDER BY id LIMIT ?2"
                },
                ContentKind::App => {
                    "SELECT name FROM apps
                     WHERE is_active = 1 AND name LIKE ?1 ESCAPE '\\'
                     ORDER BY id LIMIT ?2"
                },
            };

            let unavailable = |e: rusqlite::Error| Error::StoreUnavailable {
                cause: format!("{} title query failed: {e}", kind.as_str()),
            };
            let mut stmt = conn.prepare(sql).map_err(unavailable)?;
            let titles = stmt
                .query_map(params![pattern, bind_limit(limit)], |row| row.get(0))
                .map_err(unavailable)?
                .collect::<rusqlite::Result<Vec<String>>>()
                .map_err(unavailable)?;
            Ok(titles)
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        self.record_operation_metrics("suggest_titles", start, status);
        result
    }

    #[instrument(
        skip(self),
        fields(operation = "count_public", backend = "sqlite", kind = kind.as_str())
    )]
    fn count_public(&self, kind: ContentKind) -> Result<u64> {
        let start = Instant::now();
        let result = (|| {
            let conn = acquire_lock(&self.conn);
            let sql = match kind {
                ContentKind::Blog => "SELECT COUNT(*) FROM blog_posts WHERE status = 'published'",
                ContentKind::Webinar => "SELECT COUNT(*) FROM webinars WHERE is_active = 1",
                ContentKind::App => "SELECT COUNT(*) FROM apps WHERE is_active = 1",
            };

            let count: i64 = conn.query_row(sql, [], |row| row.get(0)).map_err(|e| {
                Error::StoreUnavailable {
                    cause: format!("{} count failed: {e}", kind.as_str()),
                }
            })?;
            Ok(u64::try_from(count).unwrap_or(0))
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        self.record_operation_metrics("count_public", start, status);
        result
    }

    #[instrument(
        skip(self),
        fields(operation = "approved_recipients", backend = "sqlite", app_id)
    )]
    fn approved_recipients(&self, app_id: i64) -> Result<Vec<Recipient>> {
        let start = Instant::now();
        let result = (|| {
            let conn = acquire_lock(&self.conn);
            let unavailable = |e: rusqlite::Error| Error::StoreUnavailable {
                cause: format!("recipient query failed: {e}"),
            };
            let mut stmt = conn
                .prepare(
                    "SELECT email, name FROM early_access_signups
                     WHERE app_id = ?1 AND status = 'approved'
                     ORDER BY id",
                )
                .map_err(unavailable)?;
            let recipients = stmt
                .query_map(params![app_id], |row| {
                    let email: String = row.get(0)?;
                    let name: Option<String> = row.get(1)?;
                    let mut recipient = Recipient::new(email);
                    if let Some(name) = name {
                        recipient = recipient.with_name(name);
                    }
                    Ok(recipient)
                })
                .map_err(unavailable)?
                .collect::<rusqlite::Result<Vec<Recipient>>>()
                .map_err(unavailable)?;
            Ok(recipients)
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        self.record_operation_metrics("approved_recipients", start, status);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn published_post(title: &str, slug: &str, body: &str) -> NewBlogPost {
        NewBlogPost::new(title, slug, body)
            .with_status(PublishStatus::Published)
            .with_created_at(ts(1_700_000_000))
    }

    #[test]
    fn test_fetch_filters_unpublished_blogs() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .add_blog_post(&published_post("Rust for biologists", "rust-bio", "intro"))
            .unwrap();
        store
            .add_blog_post(
                &NewBlogPost::new("Rust roadmap", "rust-roadmap", "draft body")
                    .with_created_at(ts(1_700_000_000)),
            )
            .unwrap();

        let hits = store
            .fetch_public_hits(ContentKind::Blog, "rust", 10)
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Rust for biologists");
        assert_eq!(hits[0].slug.as_deref(), Some("rust-bio"));
    }

    #[test]
    fn test_fetch_matches_body_text() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .add_blog_post(&published_post(
                "Lab notebook",
                "lab-notebook",
                "a deep dive into spectroscopy",
            ))
            .unwrap();

        let hits = store
            .fetch_public_hits(ContentKind::Blog, "spectroscopy", 10)
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Lab notebook");
    }

    #[test]
    fn test_fetch_hides_inactive_webinars() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .add_webinar(&NewWebinar::new("Genomics live session"))
            .unwrap();
        store
            .add_webinar(&NewWebinar::new("Genomics retired session").with_active(false))
            .unwrap();

        let hits = store
            .fetch_public_hits(ContentKind::Webinar, "genomics", 10)
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Genomics live session");
    }

    #[test]
    fn test_fetch_app_matches_target_audience() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .add_app(&NewApp::new("Protein viewer").with_target_audience("structural biologists"))
            .unwrap();

        let hits = store
            .fetch_public_hits(ContentKind::App, "structural", 10)
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Protein viewer");
    }

    #[test]
    fn test_fetch_orders_newest_first() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .add_webinar(&NewWebinar::new("Imaging part one").with_created_at(ts(1_000)))
            .unwrap();
        store
            .add_webinar(&NewWebinar::new("Imaging part three").with_created_at(ts(3_000)))
            .unwrap();
        store
            .add_webinar(&NewWebinar::new("Imaging part two").with_created_at(ts(2_000)))
            .unwrap();

        let hits = store
            .fetch_public_hits(ContentKind::Webinar, "imaging", 10)
            .unwrap();

        let titles: Vec<_> = hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Imaging part three", "Imaging part two", "Imaging part one"]
        );
    }

    #[test]
    fn test_fetch_respects_limit() {
        let store = SqliteStore::in_memory().unwrap();

        for i in 0..5 {
            store
                .add_webinar(&NewWebinar::new(format!("Series episode {i}")))
                .unwrap();
        }

        let hits = store
            .fetch_public_hits(ContentKind::Webinar, "series", 3)
            .unwrap();

        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_like_wildcards_match_literally() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .add_blog_post(&published_post("100% reproducible", "repro", "methods"))
            .unwrap();
        store
            .add_blog_post(&published_post("100x speedup", "speedup", "methods"))
            .unwrap();

        let hits = store
            .fetch_public_hits(ContentKind::Blog, "100%", 10)
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "100% reproducible");
    }

    #[test]
    fn test_fetch_is_case_insensitive() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .add_blog_post(&published_post("Neural Networks", "nn", "perceptrons"))
            .unwrap();

        let hits = store
            .fetch_public_hits(ContentKind::Blog, "neural", 10)
            .unwrap();

        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_suggest_titles_public_only_in_insertion_order() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .add_app(&NewApp::new("Cell counter").with_created_at(ts(9_000)))
            .unwrap();
        store
            .add_app(&NewApp::new("Cell tracker").with_created_at(ts(1_000)))
            .unwrap();
        store
            .add_app(&NewApp::new("Cell archive").with_active(false))
            .unwrap();

        let titles = store.suggest_titles(ContentKind::App, "cell", 3).unwrap();

        assert_eq!(titles, vec!["Cell counter", "Cell tracker"]);
    }

    #[test]
    fn test_count_public_per_kind() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .add_blog_post(&published_post("Published", "p1", "body"))
            .unwrap();
        store
            .add_blog_post(&NewBlogPost::new("Draft", "d1", "body"))
            .unwrap();
        store.add_webinar(&NewWebinar::new("Live")).unwrap();
        store
            .add_webinar(&NewWebinar::new("Retired").with_active(false))
            .unwrap();
        store.add_app(&NewApp::new("Visible")).unwrap();

        assert_eq!(store.count_public(ContentKind::Blog).unwrap(), 1);
        assert_eq!(store.count_public(ContentKind::Webinar).unwrap(), 1);
        assert_eq!(store.count_public(ContentKind::App).unwrap(), 1);
    }

    #[test]
    fn test_approved_recipients_filters_and_orders() {
        let store = SqliteStore::in_memory().unwrap();
        let app_id = store.add_app(&NewApp::new("Beta app")).unwrap();

        let first = store
            .add_signup(&NewSignup::new(app_id, "ada@example.com").with_name("Ada"))
            .unwrap();
        store
            .add_signup(&NewSignup::new(app_id, "grace@example.com").with_name("Grace"))
            .unwrap();
        let third = store
            .add_signup(&NewSignup::new(app_id, "alan@example.com"))
            .unwrap();

        store.set_signup_status(first, SignupStatus::Approved).unwrap();
        store.set_signup_status(third, SignupStatus::Approved).unwrap();

        let recipients = store.approved_recipients(app_id).unwrap();

        assert_eq!(recipients.len(), 2);
        assert_eq!(recipients[0].email, "ada@example.com");
        assert_eq!(recipients[0].name.as_deref(), Some("Ada"));
        assert_eq!(recipients[1].email, "alan@example.com");
        assert_eq!(recipients[1].name, None);
    }

    #[test]
    fn test_approved_recipients_empty_for_other_app() {
        let store = SqliteStore::in_memory().unwrap();
        let app_id = store.add_app(&NewApp::new("First app")).unwrap();
        let other_id = store.add_app(&NewApp::new("Second app")).unwrap();

        let signup = store
            .add_signup(&NewSignup::new(app_id, "ada@example.com"))
            .unwrap();
        store
            .set_signup_status(signup, SignupStatus::Approved)
            .unwrap();

        assert!(store.approved_recipients(other_id).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_signup_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        let app_id = store.add_app(&NewApp::new("Beta app")).unwrap();

        store
            .add_signup(&NewSignup::new(app_id, "ada@example.com"))
            .unwrap();
        let err = store
            .add_signup(&NewSignup::new(app_id, "ada@example.com"))
            .unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_signup_for_unknown_app_rejected() {
        let store = SqliteStore::in_memory().unwrap();

        let err = store
            .add_signup(&NewSignup::new(42, "ada@example.com"))
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_signup_with_malformed_email_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        let app_id = store.add_app(&NewApp::new("Beta app")).unwrap();

        let err = store
            .add_signup(&NewSignup::new(app_id, "not-an-email"))
            .unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_duplicate_slug_rejected() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .add_blog_post(&published_post("First", "shared-slug", "body"))
            .unwrap();
        let err = store
            .add_blog_post(&published_post("Second", "shared-slug", "body"))
            .unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_count_signups_by_status() {
        let store = SqliteStore::in_memory().unwrap();
        let app_id = store.add_app(&NewApp::new("Beta app")).unwrap();

        let first = store
            .add_signup(&NewSignup::new(app_id, "ada@example.com"))
            .unwrap();
        store
            .add_signup(&NewSignup::new(app_id, "grace@example.com"))
            .unwrap();
        store.set_signup_status(first, SignupStatus::Approved).unwrap();

        assert_eq!(store.count_signups(None).unwrap(), 2);
        assert_eq!(
            store.count_signups(Some(SignupStatus::Approved)).unwrap(),
            1
        );
        assert_eq!(
            store.count_signups(Some(SignupStatus::Rejected)).unwrap(),
            0
        );
    }

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like_wildcards("100%"), "100\\%");
        assert_eq!(escape_like_wildcards("user_name"), "user\\_name");
        assert_eq!(escape_like_wildcards("path\\file"), "path\\\\file");
        assert_eq!(escape_like_wildcards("plain"), "plain");
    }
}
