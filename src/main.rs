//! Binary entry point for lectern.
//!
//! This binary provides the CLI interface for the lectern content backend.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow unnecessary_wraps for consistent command function signatures
#![allow(clippy::unnecessary_wraps)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand, ValueEnum};
use lectern::config::LecternConfig;
use lectern::mail::{MailContent, early_access_invite, launch_announcement, placeholder_fields};
use lectern::observability::{self, InitOptions};
use lectern::storage::{NewApp, NewBlogPost, NewSignup, NewWebinar};
use lectern::{
    AppStage, ContentStore, HttpMailer, KindFilters, NotificationJob, NotifyService,
    PublishStatus, SearchRequest, SearchService, SignupStatus, SqliteStore, render,
};
use std::process::ExitCode;
use std::sync::Arc;

/// Lectern - content search and notification backend.
#[derive(Parser)]
#[command(name = "lectern")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server.
    Serve {
        /// Bind address (overrides config).
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides config).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Search public content in the local store.
    Search {
        /// The search query.
        query: String,

        /// Restrict to kinds (comma-separated: blog,webinar,app).
        #[arg(short, long)]
        kinds: Option<String>,

        /// Maximum number of results.
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Output format: text or json.
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Notify an app's approved early access signups.
    Notify {
        /// Target app id.
        app_id: i64,

        /// Mail subject (not needed with --template).
        #[arg(short, long, required_unless_present = "template", conflicts_with = "template")]
        subject: Option<String>,

        /// Message template; {{name}} is replaced per recipient.
        #[arg(short, long, required_unless_present = "template", conflicts_with = "template")]
        message: Option<String>,

        /// Canned mail to send instead of --subject/--message.
        #[arg(long, value_enum, requires = "app_name")]
        template: Option<CannedTemplate>,

        /// App display name the canned mail mentions.
        #[arg(long, requires = "template")]
        app_name: Option<String>,

        /// Resolve recipients and render a preview without sending.
        #[arg(long)]
        dry_run: bool,
    },

    /// Initialize the content database.
    Init {
        /// Seed demo content and signups.
        #[arg(long)]
        demo: bool,
    },

    /// Show store status and content counts.
    Status,
}

/// Canned notification mails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CannedTemplate {
    /// Early-access invitation.
    Invite,
    /// Public launch announcement.
    Launch,
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before anything reads the environment
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match LecternConfig::load(cli.config.as_deref().map(std::path::Path::new)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let expose_metrics = matches!(cli.command, Commands::Serve { .. });
    let _observability = match observability::init_from_config(
        &config.observability,
        InitOptions {
            verbose: cli.verbose,
            metrics_expose: expose_metrics,
        },
    ) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(
    command: Commands,
    config: LecternConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Serve { host, port } => cmd_serve(config, host, port).await.map_err(Into::into),

        Commands::Search {
            query,
            kinds,
            limit,
            format,
        } => on_blocking(move || cmd_search(&config, &query, kinds.as_deref(), limit, &format))
            .await,

        Commands::Notify {
            app_id,
            subject,
            message,
            template,
            app_name,
            dry_run,
        } => {
            on_blocking(move || {
                cmd_notify(&config, app_id, subject, message, template, app_name, dry_run)
            })
            .await
        },

        Commands::Init { demo } => on_blocking(move || cmd_init(&config, demo)).await,

        Commands::Status => on_blocking(move || cmd_status(&config)).await,
    }
}

/// Runs a store-backed command on the blocking pool.
///
/// SQLite access and the mail provider client both block.
async fn on_blocking<F>(task: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce() -> lectern::Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(task).await??;
    Ok(())
}

/// Serve command.
#[cfg(feature = "http")]
async fn cmd_serve(
    config: LecternConfig,
    host: Option<String>,
    port: Option<u16>,
) -> lectern::Result<()> {
    use lectern::http::{self, AppState, JwtAuthenticator, JwtConfig, RateLimitConfig};

    config.validate()?;

    let store: Arc<dyn ContentStore> = Arc::new(SqliteStore::new(&config.db_path)?);

    let mailer = Arc::new(HttpMailer::new(
        config.mail.endpoint.clone(),
        config.mail.from_address.clone(),
        config.mail.api_key()?,
    ));

    let authenticator = JwtAuthenticator::new(&JwtConfig::from_env()?);

    let state = AppState::new(
        Arc::new(SearchService::new(Arc::clone(&store))),
        Arc::new(NotifyService::new(store, mailer)),
        authenticator,
        RateLimitConfig::from_env(),
    );

    let mut server = config.server.clone();
    if let Some(host) = host {
        server.host = host;
    }
    if let Some(port) = port {
        server.port = port;
    }

    http::serve(state, &server.bind_addr()).await
}

/// Serve command stub when the HTTP feature is compiled out.
#[cfg(not(feature = "http"))]
async fn cmd_serve(
    _config: LecternConfig,
    _host: Option<String>,
    _port: Option<u16>,
) -> lectern::Result<()> {
    Err(lectern::Error::FeatureNotEnabled("http".to_string()))
}

/// Parses a comma-separated kind list ("blog,webinar,app").
///
/// Unknown names are ignored; an empty or all-unknown list falls back to
/// every kind.
fn parse_kind_filters(kinds: Option<&str>) -> KindFilters {
    let Some(kinds) = kinds else {
        return KindFilters::default();
    };

    let mut filters = KindFilters {
        blogs: false,
        webinars: false,
        apps: false,
    };

    for kind in kinds.split(',') {
        match kind.trim().to_lowercase().as_str() {
            "blog" | "blogs" => filters.blogs = true,
            "webinar" | "webinars" => filters.webinars = true,
            "app" | "apps" => filters.apps = true,
            _ => {},
        }
    }

    if !filters.blogs && !filters.webinars && !filters.apps {
        return KindFilters::default();
    }

    filters
}

/// Search command.
fn cmd_search(
    config: &LecternConfig,
    query: &str,
    kinds: Option<&str>,
    limit: usize,
    format: &str,
) -> lectern::Result<()> {
    let store: Arc<dyn ContentStore> = Arc::new(SqliteStore::new(&config.db_path)?);
    let service = SearchService::new(store);

    let request = SearchRequest::new(query)
        .with_filters(parse_kind_filters(kinds))
        .with_limit(limit.clamp(1, lectern::models::MAX_LIMIT));

    let response = service.search(&request)?;

    if format == "json" {
        let rendered = serde_json::to_string_pretty(&response).map_err(|e| {
            lectern::Error::OperationFailed {
                operation: "render_json".to_string(),
                cause: e.to_string(),
            }
        })?;
        println!("{rendered}");
        return Ok(());
    }

    println!("Found {} results for \"{}\":", response.total, response.query);
    println!();

    for scored in &response.results {
        println!(
            "  [{:>3}] {} ({})",
            scored.relevance,
            scored.hit.title,
            scored.hit.kind.as_str()
        );
        if let Some(excerpt) = &scored.hit.excerpt {
            // Truncate long excerpts for display
            let mut shown: String = excerpt.chars().take(100).collect();
            if shown.len() < excerpt.len() {
                shown.push_str("...");
            }
            println!("        {shown}");
        }
    }

    Ok(())
}

/// Resolves the subject/body pair for a notify invocation.
///
/// A canned template takes the app's display name; otherwise the explicit
/// subject and message are used as given.
fn notify_content(
    subject: Option<String>,
    message: Option<String>,
    template: Option<CannedTemplate>,
    app_name: Option<String>,
) -> lectern::Result<MailContent> {
    if let Some(template) = template {
        let app_name = app_name.ok_or_else(|| {
            lectern::Error::InvalidInput("--app-name is required with --template".to_string())
        })?;
        return Ok(match template {
            CannedTemplate::Invite => early_access_invite(&app_name),
            CannedTemplate::Launch => launch_announcement(&app_name),
        });
    }

    match (subject, message) {
        (Some(subject), Some(body)) => Ok(MailContent { subject, body }),
        _ => Err(lectern::Error::InvalidInput(
            "subject and message are required".to_string(),
        )),
    }
}

/// Notify command.
fn cmd_notify(
    config: &LecternConfig,
    app_id: i64,
    subject: Option<String>,
    message: Option<String>,
    template: Option<CannedTemplate>,
    app_name: Option<String>,
    dry_run: bool,
) -> lectern::Result<()> {
    config.validate()?;

    let content = notify_content(subject, message, template, app_name)?;
    let store: Arc<dyn ContentStore> = Arc::new(SqliteStore::new(&config.db_path)?);

    if dry_run {
        return preview_notification(store.as_ref(), app_id, &content);
    }

    let mailer = Arc::new(HttpMailer::new(
        config.mail.endpoint.clone(),
        config.mail.from_address.clone(),
        config.mail.api_key()?,
    ));
    let service = NotifyService::new(store, mailer);

    let summary = service.notify_app_signups(app_id, &content.subject, &content.body)?;

    println!("Notification job complete:");
    println!("  Sent: {}", summary.sent_count);
    println!("  Failed: {}", summary.failed_count);
    for error in &summary.errors {
        eprintln!("  {}: {}", error.email, error.error_message);
    }

    Ok(())
}

/// Placeholders the per-recipient merge will leave untouched.
fn unrendered_placeholders(message: &str, personalization_field: &str) -> Vec<String> {
    placeholder_fields(message)
        .into_iter()
        .filter(|field| field != personalization_field)
        .collect()
}

/// Resolves recipients and renders a merge preview without sending.
fn preview_notification(
    store: &dyn ContentStore,
    app_id: i64,
    content: &MailContent,
) -> lectern::Result<()> {
    let recipients = store.approved_recipients(app_id)?;
    if recipients.is_empty() {
        return Err(lectern::Error::NotFound(
            "no approved early access users found for this app".to_string(),
        ));
    }

    let job = NotificationJob::new(&content.subject, &content.body, recipients);
    job.validate()?;

    println!(
        "Dry run: {} approved recipients for app {app_id}",
        job.recipients.len()
    );
    println!();
    println!("Subject: {}", job.subject);
    if let Some(first) = job.recipients.first() {
        println!("Body ({}):", first.email);
        println!("{}", render(&job.message, &job.personalization_field, first));
    }

    let unrendered = unrendered_placeholders(&job.message, &job.personalization_field);
    if !unrendered.is_empty() {
        println!();
        println!(
            "Warning: placeholders that will reach recipients as-is: {}",
            unrendered.join(", ")
        );
    }

    Ok(())
}

/// Init command.
fn cmd_init(config: &LecternConfig, demo: bool) -> lectern::Result<()> {
    config.validate()?;

    let store = SqliteStore::new(&config.db_path)?;
    println!("Database initialized: {}", config.db_path.display());

    if demo {
        seed_demo_content(&store)?;
        println!("Demo content seeded:");
        println!("  3 blog posts, 2 webinars, 2 apps, 4 early access signups");
    }

    Ok(())
}

/// Seeds a small demo data set: published and draft posts, webinars, apps
/// at different stages, and signups in every review status.
fn seed_demo_content(store: &SqliteStore) -> lectern::Result<()> {
    store.add_blog_post(
        &NewBlogPost::new(
            "Getting Started with Qualitative Coding",
            "getting-started-qualitative-coding",
            "Coding is the bridge between raw interview data and findings you \
             can defend. This post walks through first-cycle coding choices \
             and when to stop adding codes.",
        )
        .with_excerpt("A practical introduction to coding interview transcripts.")
        .with_status(PublishStatus::Published),
    )?;

    store.add_blog_post(
        &NewBlogPost::new(
            "Writing Analytic Memos That Age Well",
            "writing-analytic-memos",
            "Memos record the thinking behind a code while it is still fresh. \
             Future you will thank present you for dating them and linking \
             each memo to the excerpts that prompted it.",
        )
        .with_excerpt("Memoing habits that keep a study auditable.")
        .with_status(PublishStatus::Published),
    )?;

    // Draft post: invisible to search until published
    store.add_blog_post(&NewBlogPost::new(
        "Member Checking, Revisited",
        "member-checking-revisited",
        "An unfinished look at when participant validation helps and when it \
         muddies analysis.",
    ))?;

    store.add_webinar(
        &NewWebinar::new("Thematic Analysis Walkthrough")
            .with_description("Live coding of a real transcript, start to finish."),
    )?;

    store.add_webinar(
        &NewWebinar::new("Archived: Intro Session 2023")
            .with_description("Superseded recording kept for reference.")
            .with_active(false),
    )?;

    let transcript_app = store.add_app(
        &NewApp::new("Transcript Coder")
            .with_description("Collaborative coding workspace for interview transcripts.")
            .with_stage(AppStage::Beta)
            .with_target_audience("Graduate researchers and teaching labs"),
    )?;

    store.add_app(
        &NewApp::new("Survey Sampler")
            .with_description("Draw stratified samples from survey frames.")
            .with_stage(AppStage::Development),
    )?;

    let ada = store.add_signup(
        &NewSignup::new(transcript_app, "ada@example.org").with_name("Ada"),
    )?;
    let grace = store.add_signup(
        &NewSignup::new(transcript_app, "grace@example.org").with_name("Grace"),
    )?;
    let pending = store.add_signup(&NewSignup::new(transcript_app, "lin@example.org"))?;
    let rejected = store.add_signup(
        &NewSignup::new(transcript_app, "noreply@example.org").with_name("Bot"),
    )?;

    store.set_signup_status(ada, SignupStatus::Approved)?;
    store.set_signup_status(grace, SignupStatus::Approved)?;
    store.set_signup_status(pending, SignupStatus::Pending)?;
    store.set_signup_status(rejected, SignupStatus::Rejected)?;

    Ok(())
}

/// Status command.
fn cmd_status(config: &LecternConfig) -> lectern::Result<()> {
    println!("Lectern Status");
    println!("==============");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("Database: {}", config.db_path.display());
    if !config.db_path.exists() {
        println!("  Not initialized (run 'lectern init')");
        return Ok(());
    }

    let store = Arc::new(SqliteStore::new(&config.db_path)?);
    let service = SearchService::new(Arc::clone(&store) as Arc<dyn ContentStore>);
    let stats = service.stats()?;

    println!();
    println!("Public Content: {} items", stats.total_content);
    println!("  Blog Posts: {}", stats.total_blogs);
    println!("  Webinars: {}", stats.total_webinars);
    println!("  Apps: {}", stats.total_apps);
    println!();

    let total_signups = store.count_signups(None)?;
    let approved = store.count_signups(Some(SignupStatus::Approved))?;
    println!("Early Access Signups: {total_signups}");
    println!("  Approved: {approved}");
    println!();
    println!("Use 'lectern search <query>' to query the store");

    Ok(())
}
